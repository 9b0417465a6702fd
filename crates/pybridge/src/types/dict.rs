use std::ops::Deref;

use pyo3_ffi as ffi;

use crate::error::{Result, fetch};
use crate::object::Object;
use crate::types::{Int, Str};

/// Interpreter dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dict(Object);

impl Dict {
    /// Creates an empty dictionary.
    ///
    /// # Errors
    /// If allocation inside the interpreter fails.
    pub fn new() -> Result<Self> {
        unsafe { Object::from_owned_ptr(ffi::PyDict_New()) }.map(Self)
    }

    /// Looks up `key`, returning a strong reference to the value. Absence
    /// is reported as `None` rather than an error; the underlying call
    /// raises nothing.
    #[must_use]
    pub fn get(&self, key: &Object) -> Option<Object> {
        let value = unsafe { ffi::PyDict_GetItem(self.0.as_ptr(), key.as_ptr()) };
        if value.is_null() {
            None
        } else {
            Some(unsafe { Object::from_borrowed_unchecked(value) })
        }
    }

    /// Sets `key` to `value`; both references stay with the caller.
    ///
    /// # Errors
    /// If `key` is not hashable.
    pub fn set(&self, key: &Object, value: &Object) -> Result<()> {
        if unsafe { ffi::PyDict_SetItem(self.0.as_ptr(), key.as_ptr(), value.as_ptr()) } != 0 {
            return Err(fetch());
        }
        Ok(())
    }

    /// Sets `key` to a host integer.
    ///
    /// # Errors
    /// As [`Self::set`], plus integer allocation failure.
    pub fn set_int(&self, key: &Object, n: i64) -> Result<()> {
        self.set(key, &Int::new(n)?.into())
    }

    /// Sets `key` to a host string.
    ///
    /// # Errors
    /// As [`Self::set`], plus string allocation failure.
    pub fn set_str(&self, key: &Object, s: &str) -> Result<()> {
        self.set(key, &Str::new(s)?.into())
    }
}

impl Deref for Dict {
    type Target = Object;

    fn deref(&self) -> &Object {
        &self.0
    }
}

impl From<Dict> for Object {
    fn from(value: Dict) -> Self {
        value.0
    }
}
