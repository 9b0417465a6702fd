//! Call marshaling gateway: the `_pybridge.call(name, args)` entry point
//! exposed to interpreter code, and the host-side dispatcher it forwards
//! every well-formed request to.
//!
//! The gateway is a pure pass-through. It enforces the `(str, tuple)`
//! request shape before anything else, hands the pair to the dispatcher
//! verbatim, and returns whatever comes back. It never retries, caches,
//! or inspects argument contents, and a dispatcher error crosses to the
//! interpreter caller unmodified, as a raised exception.

use std::collections::HashMap;
use std::ffi::{CStr, CString, c_char};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::ptr;
use std::sync::Arc;

use parking_lot::RwLock;
use pyo3_ffi as ffi;
use tracing::error;

use crate::TRACE_TARGET_DISPATCH;
use crate::error::Result;
use crate::object::Object;
use crate::types::Tuple;

/// Host-side dispatch function: maps a callable name and its argument
/// tuple to a result value.
pub type DispatchFn = dyn Fn(&str, Tuple) -> Result<Object> + Send + Sync;

static DISPATCHER: RwLock<Option<Arc<DispatchFn>>> = RwLock::new(None);

/// Installs the process-wide host dispatcher the gateway forwards to.
/// Replaces any previous dispatcher. Cleared automatically when the
/// bridge finalizes.
pub fn set_dispatcher<F>(dispatch: F)
where
    F: Fn(&str, Tuple) -> Result<Object> + Send + Sync + 'static,
{
    *DISPATCHER.write() = Some(Arc::new(dispatch));
}

/// Removes the installed dispatcher. Subsequent gateway calls log and
/// answer `None`.
pub fn clear_dispatcher() {
    *DISPATCHER.write() = None;
}

/// The `call` method of the `_pybridge` module.
///
/// Shape enforcement happens entirely in the argument parse: anything but
/// a `(str, tuple)` pair raises `TypeError` right here and the dispatcher
/// is never consulted.
pub(crate) unsafe extern "C" fn bridge_call(
    _slf: *mut ffi::PyObject,
    args: *mut ffi::PyObject,
) -> *mut ffi::PyObject {
    let mut name: *const c_char = ptr::null();
    let mut call_args: *mut ffi::PyObject = ptr::null_mut();
    if unsafe {
        ffi::PyArg_ParseTuple(
            args,
            c"sO!:call".as_ptr(),
            &raw mut name,
            &raw mut ffi::PyTuple_Type,
            &raw mut call_args,
        )
    } == 0
    {
        return ptr::null_mut();
    }
    // "s" guarantees UTF-8 text.
    let Ok(name) = unsafe { CStr::from_ptr(name) }.to_str() else {
        raise_runtime_error("call name is not valid UTF-8");
        return ptr::null_mut();
    };

    let dispatcher = DISPATCHER.read().clone();
    let Some(dispatcher) = dispatcher else {
        error!(target: TRACE_TARGET_DISPATCH, name, "call with no dispatcher registered");
        return Object::none().into_ptr();
    };

    let request = Tuple::from_object(unsafe { Object::from_borrowed_unchecked(call_args) });
    match catch_unwind(AssertUnwindSafe(|| dispatcher(name, request))) {
        Ok(Ok(result)) => result.into_ptr(),
        Ok(Err(err)) => {
            error!(target: TRACE_TARGET_DISPATCH, name, %err, "dispatch failed");
            // An exception the dispatcher left pending crosses as-is;
            // otherwise the error text becomes the raised exception.
            if unsafe { ffi::PyErr_Occurred() }.is_null() {
                raise_runtime_error(&err.to_string());
            }
            ptr::null_mut()
        }
        Err(_) => {
            error!(target: TRACE_TARGET_DISPATCH, name, "dispatcher panicked");
            raise_runtime_error("host dispatcher panicked");
            ptr::null_mut()
        }
    }
}

fn raise_runtime_error(message: &str) {
    let text =
        CString::new(message).unwrap_or_else(|_| CString::from(c"dispatch error (NUL in message)"));
    unsafe { ffi::PyErr_SetString(ffi::PyExc_RuntimeError, text.as_ptr()) };
}

/// Callback signature for [`CallbackRegistry`].
pub type CallbackFn = Box<dyn Fn(Tuple) -> Result<Object> + Send + Sync>;

/// Name-to-callback table in the shape the gateway expects, for hosts
/// whose dispatch really is a flat lookup. Register the handlers, then
/// [`install`](Self::install) the registry as the dispatcher.
#[derive(Default)]
pub struct CallbackRegistry {
    callbacks: HashMap<String, CallbackFn>,
}

impl CallbackRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a callback under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, callback: F)
    where
        F: Fn(Tuple) -> Result<Object> + Send + Sync + 'static,
    {
        self.callbacks.insert(name.into(), Box::new(callback));
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.callbacks.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Looks up `name` and runs its callback. An unknown name is logged
    /// and answered with `None` so a misrouted interpreter-side call does
    /// not take the process down.
    ///
    /// # Errors
    /// Whatever the callback itself returns.
    pub fn dispatch(&self, name: &str, args: Tuple) -> Result<Object> {
        self.callbacks.get(name).map_or_else(
            || {
                error!(target: TRACE_TARGET_DISPATCH, name, "call for unknown callback");
                Ok(Object::none())
            },
            |callback| callback(args),
        )
    }

    /// Installs this registry as the process dispatcher.
    pub fn install(self) {
        set_dispatcher(move |name, args| self.dispatch(name, args));
    }
}

#[cfg(test)]
mod tests {
    use super::CallbackRegistry;
    use crate::object::Object;

    #[test]
    fn registry_bookkeeping() {
        let mut registry = CallbackRegistry::new();
        assert!(registry.is_empty());

        registry.register("echo", |args| Ok(args.into()));
        registry.register("nil", |_args| Ok(Object::none()));
        registry.register("echo", |args| Ok(args.into()));

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("echo"));
        assert!(registry.contains("nil"));
        assert!(!registry.contains("missing"));
    }
}
