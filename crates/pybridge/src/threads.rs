//! Thread handoff helpers for multi-threaded hosts.
//!
//! The bridge itself takes no locks across boundary crossings; a host
//! that drives the interpreter from more than one thread serializes the
//! crossings itself. These guards wrap the interpreter's own handoff
//! primitives for that purpose.

use pyo3_ffi as ffi;

/// The calling thread's saved interpreter state, released so another
/// thread may drive the runtime. Restored on [`acquire`](Self::acquire)
/// or drop.
pub struct SavedThread {
    state: *mut ffi::PyThreadState,
}

impl SavedThread {
    /// Releases the calling thread's hold on the interpreter. The thread
    /// must currently hold it (it does after `Bridge::initialize`).
    #[must_use]
    pub fn release() -> Self {
        Self {
            state: unsafe { ffi::PyEval_SaveThread() },
        }
    }

    /// Re-acquires the interpreter on the calling thread.
    pub fn acquire(self) {
        drop(self);
    }
}

impl Drop for SavedThread {
    fn drop(&mut self) {
        unsafe { ffi::PyEval_RestoreThread(self.state) };
    }
}

/// Scoped interpreter hold for callbacks arriving on threads the
/// interpreter has not seen before.
pub struct GilGuard {
    state: ffi::PyGILState_STATE,
}

impl GilGuard {
    /// Acquires the interpreter for the calling thread, creating thread
    /// state on first use.
    #[must_use]
    pub fn ensure() -> Self {
        Self {
            state: unsafe { ffi::PyGILState_Ensure() },
        }
    }
}

impl Drop for GilGuard {
    fn drop(&mut self) {
        unsafe { ffi::PyGILState_Release(self.state) };
    }
}
