use std::ops::Deref;

use pyo3_ffi as ffi;

use crate::error::{Result, fetch};
use crate::object::Object;

/// Interpreter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct List(Object);

impl List {
    pub(crate) fn from_object(object: Object) -> Self {
        Self(object)
    }

    /// Creates a list of `len` slots; every slot is unset until a `set`.
    ///
    /// # Errors
    /// If allocation inside the interpreter fails.
    pub fn new(len: usize) -> Result<Self> {
        unsafe { Object::from_owned_ptr(ffi::PyList_New(len as ffi::Py_ssize_t)) }.map(Self)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        unsafe { ffi::PyList_Size(self.0.as_ptr()) as usize }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gets an item by index. Unlike the underlying call, which lends a
    /// reference, the caller always receives its own strong reference.
    ///
    /// # Errors
    /// If `index` is out of range.
    pub fn get(&self, index: usize) -> Result<Object> {
        let item = unsafe { ffi::PyList_GetItem(self.0.as_ptr(), index as ffi::Py_ssize_t) };
        if item.is_null() {
            return Err(fetch());
        }
        Ok(unsafe { Object::from_borrowed_unchecked(item) })
    }

    /// Sets an item by index. The underlying call steals a reference, so
    /// one is taken up front; the caller keeps its own.
    ///
    /// # Errors
    /// If `index` is out of range.
    pub fn set(&self, index: usize, value: &Object) -> Result<()> {
        unsafe { ffi::Py_IncRef(value.as_ptr()) };
        if unsafe { ffi::PyList_SetItem(self.0.as_ptr(), index as ffi::Py_ssize_t, value.as_ptr()) }
            != 0
        {
            unsafe { ffi::Py_DecRef(value.as_ptr()) };
            return Err(fetch());
        }
        Ok(())
    }
}

impl Deref for List {
    type Target = Object;

    fn deref(&self) -> &Object {
        &self.0
    }
}

impl From<List> for Object {
    fn from(value: List) -> Self {
        value.0
    }
}
