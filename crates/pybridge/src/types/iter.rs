use std::ops::Deref;

use pyo3_ffi as ffi;

use crate::error::{Result, fetch};
use crate::object::Object;

/// Interpreter iterator, from [`Object::iter`](crate::Object::iter).
#[derive(Debug, Clone)]
pub struct Iter(Object);

impl Iter {
    pub(crate) fn from_object(object: Object) -> Self {
        Self(object)
    }

    /// Advances the iteration. `Ok(None)` means exhausted; a raised
    /// exception during advancement is an error.
    ///
    /// # Errors
    /// If the iterator's `__next__` raises.
    pub fn next(&self) -> Result<Option<Object>> {
        let item = unsafe { ffi::PyIter_Next(self.0.as_ptr()) };
        if item.is_null() {
            if unsafe { ffi::PyErr_Occurred() }.is_null() {
                Ok(None)
            } else {
                Err(fetch())
            }
        } else {
            Ok(Some(unsafe { Object::from_owned_unchecked(item) }))
        }
    }
}

impl Deref for Iter {
    type Target = Object;

    fn deref(&self) -> &Object {
        &self.0
    }
}

impl From<Iter> for Object {
    fn from(value: Iter) -> Self {
        value.0
    }
}
