use std::ops::Deref;

use pyo3_ffi as ffi;

use crate::error::{Result, fetch};
use crate::object::Object;

/// Interpreter integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Int(Object);

impl Int {
    pub(crate) fn from_object(object: Object) -> Self {
        Self(object)
    }

    /// Converts a host `i64` into an interpreter integer.
    ///
    /// # Errors
    /// If allocation inside the interpreter fails.
    pub fn new(n: i64) -> Result<Self> {
        unsafe { Object::from_owned_ptr(ffi::PyLong_FromLongLong(n)) }.map(Self)
    }

    /// Converts the interpreter integer into a host `i64`.
    ///
    /// # Errors
    /// If the value overflows an `i64`. The underlying call signals
    /// failure with `-1`, which is also a valid result, so the pending
    /// exception disambiguates.
    pub fn value(&self) -> Result<i64> {
        let n = unsafe { ffi::PyLong_AsLongLong(self.0.as_ptr()) };
        if n == -1 && !unsafe { ffi::PyErr_Occurred() }.is_null() {
            return Err(fetch());
        }
        Ok(n)
    }
}

impl Deref for Int {
    type Target = Object;

    fn deref(&self) -> &Object {
        &self.0
    }
}

impl From<Int> for Object {
    fn from(value: Int) -> Self {
        value.0
    }
}
