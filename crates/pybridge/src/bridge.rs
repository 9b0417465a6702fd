//! Bridge lifecycle: one-time interpreter startup, durable sentinel
//! references, and exactly-once teardown.
//!
//! The [`Bridge`] value is the ownership token for the embedded runtime:
//! [`Bridge::initialize`] is the only way to obtain one, and
//! [`Bridge::finalize`] (or drop) is the only way back to the
//! uninitialized state. The token holds raw interpreter handles and is
//! therefore neither `Send` nor `Sync`; the runtime is single-owner and
//! every crossing must be serialized by the host.

use std::ffi::CStr;
use std::ptr;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};

use pyo3_ffi as ffi;
use tracing::debug;

use crate::dispatch;
use crate::error::{Error, Result, fetch};
use crate::object::{self, Object};
use crate::types;

const MODULE_NAME: &CStr = c"_pybridge";

/// One live bridge per process; `initialize` refuses a second.
static BRIDGE_LIVE: AtomicBool = AtomicBool::new(false);

/// The inittab entry survives interpreter re-initialization, so it is
/// registered once per process, before the first `Py_Initialize`.
static INITTAB: Once = Once::new();

static mut METHODS: [ffi::PyMethodDef; 2] = [
    ffi::PyMethodDef {
        ml_name: c"call".as_ptr(),
        ml_meth: ffi::PyMethodDefPointer {
            PyCFunction: dispatch::bridge_call,
        },
        ml_flags: ffi::METH_VARARGS,
        ml_doc: c"Invoke a host-registered callback.".as_ptr(),
    },
    ffi::PyMethodDef::zeroed(),
];

static mut MODULE_DEF: ffi::PyModuleDef = ffi::PyModuleDef {
    m_base: ffi::PyModuleDef_HEAD_INIT,
    m_name: MODULE_NAME.as_ptr(),
    m_doc: c"pybridge host-call internals.".as_ptr(),
    m_size: 0,
    m_methods: ptr::null_mut(),
    m_slots: ptr::null_mut(),
    m_traverse: None,
    m_clear: None,
    m_free: None,
};

unsafe extern "C" fn module_init() -> *mut ffi::PyObject {
    unsafe {
        MODULE_DEF.m_methods = (&raw mut METHODS).cast::<ffi::PyMethodDef>();
        ffi::PyModule_Create(&raw mut MODULE_DEF)
    }
}

type Hook = Box<dyn FnOnce() -> Result<()>>;

/// Configures a [`Bridge`] before startup.
///
/// Hooks let collaborating layers piggyback on the bridge lifecycle: an
/// init hook typically loads interpreter-side shims, a finalize hook
/// releases whatever durable handles that layer took. Each hook runs at
/// most once; failures are collected, not short-circuited.
#[derive(Default)]
pub struct BridgeBuilder {
    init_hooks: Vec<Hook>,
    finalize_hooks: Vec<Hook>,
}

impl BridgeBuilder {
    /// Runs after the runtime is up and the sentinels are held. A failure
    /// aborts initialization and tears the runtime back down.
    #[must_use]
    pub fn on_init(mut self, hook: impl FnOnce() -> Result<()> + 'static) -> Self {
        self.init_hooks.push(Box::new(hook));
        self
    }

    /// Runs first during finalize, while the runtime is still up.
    #[must_use]
    pub fn on_finalize(mut self, hook: impl FnOnce() -> Result<()> + 'static) -> Self {
        self.finalize_hooks.push(Box::new(hook));
        self
    }

    /// Starts the embedded runtime.
    ///
    /// # Errors
    /// As [`Bridge::initialize`], plus [`Error::Hooks`] if init hooks
    /// fail.
    pub fn initialize(self) -> Result<Bridge> {
        Bridge::start(self)
    }
}

/// Ownership token for the live embedded runtime.
///
/// Holds one durable strong reference each to the interpreter's `None`,
/// `True` and `False` sentinels and to the `_pybridge` module, from
/// initialization until finalization, independent of however many
/// transient references call marshaling creates and releases.
pub struct Bridge {
    none: *mut ffi::PyObject,
    bool_true: *mut ffi::PyObject,
    bool_false: *mut ffi::PyObject,
    module: *mut ffi::PyObject,
    finalize_hooks: Vec<Hook>,
    finalized: bool,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("none", &self.none)
            .field("bool_true", &self.bool_true)
            .field("bool_false", &self.bool_false)
            .field("module", &self.module)
            .field("finalize_hooks", &self.finalize_hooks.len())
            .field("finalized", &self.finalized)
            .finish()
    }
}

impl Bridge {
    #[must_use]
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::default()
    }

    /// Starts the embedded runtime, registers the `_pybridge` entry
    /// point, and acquires the durable sentinel references.
    ///
    /// # Errors
    /// [`Error::Init`] if the runtime fails to start or a bridge is
    /// already live in this process. A start failure is never silently
    /// swallowed; the caller must not use the bridge after one.
    pub fn initialize() -> Result<Self> {
        Self::start(BridgeBuilder::default())
    }

    fn start(builder: BridgeBuilder) -> Result<Self> {
        if BRIDGE_LIVE.swap(true, Ordering::SeqCst) {
            return Err(Error::Init {
                reason: "a bridge is already live in this process".into(),
            });
        }
        Self::start_runtime(builder).inspect_err(|_| {
            BRIDGE_LIVE.store(false, Ordering::SeqCst);
        })
    }

    fn start_runtime(builder: BridgeBuilder) -> Result<Self> {
        INITTAB.call_once(|| unsafe {
            ffi::PyImport_AppendInittab(MODULE_NAME.as_ptr(), Some(module_init));
        });
        unsafe { ffi::Py_Initialize() };
        if unsafe { ffi::Py_IsInitialized() } == 0 {
            return Err(Error::Init {
                reason: "embedded runtime did not start".into(),
            });
        }

        let mut bridge = Self {
            none: ptr::null_mut(),
            bool_true: ptr::null_mut(),
            bool_false: ptr::null_mut(),
            module: ptr::null_mut(),
            finalize_hooks: builder.finalize_hooks,
            finalized: false,
        };
        if let Err(err) = bridge.attach(builder.init_hooks) {
            // Partial failures roll back through the same null-guarded
            // teardown; whatever was acquired is released exactly once.
            let _ = bridge.shutdown();
            return Err(err);
        }
        debug!("embedded runtime initialized");
        Ok(bridge)
    }

    fn attach(&mut self, init_hooks: Vec<Hook>) -> Result<()> {
        let module = unsafe { ffi::PyImport_ImportModule(MODULE_NAME.as_ptr()) };
        if module.is_null() {
            return Err(fetch());
        }
        self.module = module;
        unsafe {
            self.none = ffi::Py_None();
            ffi::Py_IncRef(self.none);
            self.bool_true = ffi::Py_True();
            ffi::Py_IncRef(self.bool_true);
            self.bool_false = ffi::Py_False();
            ffi::Py_IncRef(self.bool_false);
        }

        let failures: Vec<Error> = init_hooks
            .into_iter()
            .filter_map(|hook| hook().err())
            .collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Hooks(failures))
        }
    }

    /// Fresh strong reference to the interpreter's `None`.
    #[must_use]
    pub fn none(&self) -> Object {
        unsafe { Object::from_borrowed_unchecked(self.none) }
    }

    /// Fresh strong reference to the interpreter's `True`.
    #[must_use]
    pub fn bool_true(&self) -> Object {
        unsafe { Object::from_borrowed_unchecked(self.bool_true) }
    }

    /// Fresh strong reference to the interpreter's `False`.
    #[must_use]
    pub fn bool_false(&self) -> Object {
        unsafe { Object::from_borrowed_unchecked(self.bool_false) }
    }

    /// Fresh strong reference to the `_pybridge` module.
    #[must_use]
    pub fn module(&self) -> Object {
        unsafe { Object::from_borrowed_unchecked(self.module) }
    }

    /// Imports an interpreter module by name.
    ///
    /// # Errors
    /// If the import machinery raises.
    pub fn import_module(&self, name: &str) -> Result<Object> {
        object::import_module(name)
    }

    /// Compiles `src` and executes it as a module registered under
    /// `name`, returning the module handle.
    ///
    /// # Errors
    /// If compilation or execution raises.
    pub fn compile_module(&self, name: &str, src: &str) -> Result<Object> {
        object::compile_module(name, src)
    }

    /// Tears the bridge down: runs finalize hooks, releases every durable
    /// handle, drains the interned-string pool, clears the dispatcher,
    /// and shuts the runtime down. A later [`Bridge::initialize`] is
    /// legal again afterward.
    ///
    /// Dropping the token without calling this does the same teardown;
    /// the explicit form additionally reports hook and shutdown failures.
    ///
    /// # Errors
    /// [`Error::Hooks`] for hook failures, [`Error::Shutdown`] if the
    /// runtime reports an unclean exit.
    pub fn finalize(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }
        self.finalized = true;

        let mut failures: Vec<Error> = self
            .finalize_hooks
            .drain(..)
            .filter_map(|hook| hook().err())
            .collect();

        release(&mut self.none);
        release(&mut self.bool_true);
        release(&mut self.bool_false);
        release(&mut self.module);
        types::drain_intern_pool();
        dispatch::clear_dispatcher();

        if unsafe { ffi::Py_IsInitialized() } != 0 && unsafe { ffi::Py_FinalizeEx() } < 0 {
            failures.push(Error::Shutdown);
        }
        BRIDGE_LIVE.store(false, Ordering::SeqCst);
        debug!("embedded runtime finalized");

        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            _ => Err(Error::Hooks(failures)),
        }
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

/// Releases one durable handle. Guarded per handle so teardown is safe
/// after partial initialization and a second pass is a no-op.
fn release(slot: &mut *mut ffi::PyObject) {
    if !slot.is_null() {
        unsafe { ffi::Py_DecRef(*slot) };
        *slot = ptr::null_mut();
    }
}
