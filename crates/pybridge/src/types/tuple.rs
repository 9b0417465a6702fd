use std::ops::Deref;

use pyo3_ffi as ffi;

use crate::error::{Result, fetch};
use crate::object::Object;
use crate::types::Int;

/// Interpreter tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple(Object);

impl Tuple {
    pub(crate) fn from_object(object: Object) -> Self {
        Self(object)
    }

    /// Creates a tuple of `len` slots; every slot is unset until a `set`.
    ///
    /// # Errors
    /// If allocation inside the interpreter fails.
    pub fn new(len: usize) -> Result<Self> {
        unsafe { Object::from_owned_ptr(ffi::PyTuple_New(len as ffi::Py_ssize_t)) }.map(Self)
    }

    /// Packs a slice of values into a fresh tuple.
    ///
    /// # Errors
    /// If allocation inside the interpreter fails.
    pub fn from_slice(items: &[Object]) -> Result<Self> {
        let tuple = Self::new(items.len())?;
        for (index, item) in items.iter().enumerate() {
            tuple.set(index, item)?;
        }
        Ok(tuple)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        unsafe { ffi::PyTuple_Size(self.0.as_ptr()) as usize }
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
        let item = unsafe { ffi::PyTuple_GetItem(self.0.as_ptr(), index as ffi::Py_ssize_t) };
        if item.is_null() {
            return Err(fetch());
        }
        Ok(unsafe { Object::from_borrowed_unchecked(item) })
    }

    /// Sets an item by index. The underlying call steals a reference, so
    /// one is taken up front; the caller keeps its own.
    ///
    /// # Errors
    /// If `index` is out of range, or the tuple is already visible to
    /// interpreter code.
    pub fn set(&self, index: usize, value: &Object) -> Result<()> {
        unsafe { ffi::Py_IncRef(value.as_ptr()) };
        if unsafe {
            ffi::PyTuple_SetItem(self.0.as_ptr(), index as ffi::Py_ssize_t, value.as_ptr())
        } != 0
        {
            unsafe { ffi::Py_DecRef(value.as_ptr()) };
            return Err(fetch());
        }
        Ok(())
    }

    /// Sets an item by index from a host integer.
    ///
    /// # Errors
    /// As [`Self::set`], plus integer allocation failure.
    pub fn set_int(&self, index: usize, n: i64) -> Result<()> {
        self.set(index, &Int::new(n)?.into())
    }
}

impl Deref for Tuple {
    type Target = Object;

    fn deref(&self) -> &Object {
        &self.0
    }
}

impl From<Tuple> for Object {
    fn from(value: Tuple) -> Self {
        value.0
    }
}
