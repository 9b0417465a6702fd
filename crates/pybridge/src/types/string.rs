use std::collections::HashMap;
use std::ops::Deref;
use std::sync::LazyLock;

use parking_lot::Mutex;
use pyo3_ffi as ffi;

use crate::error::{Error, Result, fetch};
use crate::object::Object;
use crate::types::List;

/// Interpreter string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Str(Object);

impl Str {
    pub(crate) fn from_object(object: Object) -> Self {
        Self(object)
    }

    /// Converts a host string into an interpreter string.
    ///
    /// # Errors
    /// If allocation inside the interpreter fails.
    pub fn new(s: &str) -> Result<Self> {
        unsafe {
            Object::from_owned_ptr(ffi::PyUnicode_FromStringAndSize(
                s.as_ptr().cast(),
                s.len() as ffi::Py_ssize_t,
            ))
        }
        .map(Self)
    }

    /// Converts a host string into an interpreter string, keeping it in a
    /// process-wide pool so repeated conversions of hot strings (header
    /// names, environ keys) reuse one interpreter value. The pool holds
    /// its own reference from first use until the bridge finalizes; the
    /// returned value is an additional one owned by the caller.
    ///
    /// # Errors
    /// If allocation inside the interpreter fails.
    pub fn intern(s: &str) -> Result<Self> {
        let mut pool = INTERNED.lock();
        let ptr = match pool.get(s) {
            Some(entry) => entry.0,
            None => {
                let created = Object::from(Self::new(s)?).into_ptr();
                pool.insert(s.to_owned(), PoolEntry(created));
                created
            }
        };
        Ok(Self(unsafe { Object::from_borrowed_unchecked(ptr) }))
    }

    /// Copies the interpreter string into an owned host `String`.
    ///
    /// # Errors
    /// If the interpreter cannot produce a UTF-8 view of the value.
    pub fn to_str(&self) -> Result<String> {
        let mut size: ffi::Py_ssize_t = 0;
        let data = unsafe { ffi::PyUnicode_AsUTF8AndSize(self.0.as_ptr(), &raw mut size) };
        if data.is_null() {
            return Err(fetch());
        }
        let bytes = unsafe { std::slice::from_raw_parts(data.cast::<u8>(), size as usize) };
        String::from_utf8(bytes.to_vec()).map_err(|_| Error::Convert {
            what: "non-UTF-8 interpreter string",
        })
    }

    /// Joins the items of `list` with this string as the separator,
    /// `sep.join(list)`.
    ///
    /// # Errors
    /// If any list item is not a string.
    pub fn join(&self, list: &List) -> Result<Self> {
        unsafe { Object::from_owned_ptr(ffi::PyUnicode_Join(self.0.as_ptr(), list.as_ptr())) }
            .map(Self)
    }
}

impl Deref for Str {
    type Target = Object;

    fn deref(&self) -> &Object {
        &self.0
    }
}

impl From<Str> for Object {
    fn from(value: Str) -> Self {
        value.0
    }
}

struct PoolEntry(*mut ffi::PyObject);

// Entries are only created and released with the interpreter live and the
// calling thread holding it; the pointer itself never escapes the pool.
unsafe impl Send for PoolEntry {}

static INTERNED: LazyLock<Mutex<HashMap<String, PoolEntry>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Releases the pool's reference to every interned string. Called during
/// bridge finalize, before the runtime shuts down.
pub(crate) fn drain_intern_pool() {
    let mut pool = INTERNED.lock();
    for (_, entry) in pool.drain() {
        unsafe { ffi::Py_DecRef(entry.0) };
    }
}
