use std::ffi::CString;
use std::fmt;
use std::ptr::{self, NonNull};

use pyo3_ffi as ffi;

use crate::error::{Error, Result, fetch};
use crate::types::{Int, Iter, List, Str, Tuple};
use crate::value::ValueKind;

/// Owned strong reference to one interpreter value.
///
/// Cloning takes an additional interpreter reference; dropping releases
/// one. Both touch the interpreter, so every `Object` must be released
/// before the owning [`Bridge`](crate::Bridge) finalizes; an `Object`
/// dropped after finalize dereferences a dead runtime.
pub struct Object {
    ptr: NonNull<ffi::PyObject>,
}

impl Object {
    /// Wraps a pointer whose strong reference the caller transfers in.
    /// A null pointer yields `None`.
    pub(crate) fn try_from_owned_ptr(ptr: *mut ffi::PyObject) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr })
    }

    /// Wraps an owned pointer; a null pointer drains the pending
    /// interpreter exception into the returned error.
    ///
    /// # Safety
    /// `ptr` must be null or carry a strong reference the caller owns.
    pub unsafe fn from_owned_ptr(ptr: *mut ffi::PyObject) -> Result<Self> {
        Self::try_from_owned_ptr(ptr).ok_or_else(fetch)
    }

    /// Wraps a borrowed pointer, taking a new strong reference. A null
    /// pointer drains the pending interpreter exception.
    ///
    /// # Safety
    /// `ptr` must be null or point to a live interpreter value.
    pub unsafe fn from_borrowed_ptr(ptr: *mut ffi::PyObject) -> Result<Self> {
        let object = Self::try_from_owned_ptr(ptr).ok_or_else(fetch)?;
        unsafe { ffi::Py_IncRef(object.as_ptr()) };
        Ok(object)
    }

    /// As [`Self::from_owned_ptr`] for pointers known to be non-null.
    pub(crate) unsafe fn from_owned_unchecked(ptr: *mut ffi::PyObject) -> Self {
        Self {
            ptr: unsafe { NonNull::new_unchecked(ptr) },
        }
    }

    /// As [`Self::from_borrowed_ptr`] for pointers known to be non-null.
    pub(crate) unsafe fn from_borrowed_unchecked(ptr: *mut ffi::PyObject) -> Self {
        unsafe {
            ffi::Py_IncRef(ptr);
            Self::from_owned_unchecked(ptr)
        }
    }

    /// Fresh strong reference to the interpreter's `None`.
    #[must_use]
    pub fn none() -> Self {
        unsafe { Self::from_borrowed_unchecked(ffi::Py_None()) }
    }

    /// Borrows the underlying pointer; the reference stays with `self`.
    #[must_use]
    pub fn as_ptr(&self) -> *mut ffi::PyObject {
        self.ptr.as_ptr()
    }

    /// Releases ownership of the strong reference to the caller.
    #[must_use]
    pub fn into_ptr(self) -> *mut ffi::PyObject {
        let ptr = self.ptr.as_ptr();
        std::mem::forget(self);
        ptr
    }

    /// True if the value is an interpreter integer.
    #[must_use]
    pub fn is_int(&self) -> bool {
        unsafe { ffi::PyLong_Check(self.as_ptr()) != 0 }
    }

    /// True if the value is an interpreter list.
    #[must_use]
    pub fn is_list(&self) -> bool {
        unsafe { ffi::PyList_Check(self.as_ptr()) != 0 }
    }

    /// True if the value is an interpreter string.
    #[must_use]
    pub fn is_str(&self) -> bool {
        unsafe { ffi::PyUnicode_Check(self.as_ptr()) != 0 }
    }

    /// True if the value is an interpreter tuple.
    #[must_use]
    pub fn is_tuple(&self) -> bool {
        unsafe { ffi::PyTuple_Check(self.as_ptr()) != 0 }
    }

    /// Classifies the value into the closed set of recognized shapes.
    /// Exactly one predicate holds for a recognized value; everything
    /// else is [`ValueKind::Other`].
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        if self.is_int() {
            ValueKind::Int
        } else if self.is_str() {
            ValueKind::Str
        } else if self.is_list() {
            ValueKind::List
        } else if self.is_tuple() {
            ValueKind::Tuple
        } else {
            ValueKind::Other
        }
    }

    /// Narrows to an integer wrapper.
    ///
    /// # Errors
    /// [`Error::Type`] if the value is not an integer.
    pub fn as_int(&self) -> Result<Int> {
        if self.is_int() {
            Ok(Int::from_object(self.clone()))
        } else {
            Err(Error::Type {
                expected: "an integer",
            })
        }
    }

    /// Narrows to a list wrapper.
    ///
    /// # Errors
    /// [`Error::Type`] if the value is not a list.
    pub fn as_list(&self) -> Result<List> {
        if self.is_list() {
            Ok(List::from_object(self.clone()))
        } else {
            Err(Error::Type { expected: "a list" })
        }
    }

    /// Narrows to a string wrapper.
    ///
    /// # Errors
    /// [`Error::Type`] if the value is not a string.
    pub fn as_str(&self) -> Result<Str> {
        if self.is_str() {
            Ok(Str::from_object(self.clone()))
        } else {
            Err(Error::Type {
                expected: "a string",
            })
        }
    }

    /// Narrows to a tuple wrapper.
    ///
    /// # Errors
    /// [`Error::Type`] if the value is not a tuple.
    pub fn as_tuple(&self) -> Result<Tuple> {
        if self.is_tuple() {
            Ok(Tuple::from_object(self.clone()))
        } else {
            Err(Error::Type { expected: "a tuple" })
        }
    }

    /// Converts an interpreter integer into an `i64`.
    ///
    /// # Errors
    /// If the value is not an integer or does not fit.
    pub fn to_i64(&self) -> Result<i64> {
        self.as_int()?.value()
    }

    /// Copies an interpreter string into an owned `String`.
    ///
    /// # Errors
    /// If the value is not a string.
    pub fn to_str(&self) -> Result<String> {
        self.as_str()?.to_str()
    }

    /// Invokes the value as a callable with positional arguments.
    ///
    /// # Errors
    /// Any exception the callee raises, rendered via [`Error::Python`].
    pub fn call(&self, args: &[Object]) -> Result<Object> {
        let packed = if args.is_empty() {
            None
        } else {
            Some(Tuple::from_slice(args)?)
        };
        let args_ptr = packed.as_ref().map_or(ptr::null_mut(), |t| t.as_ptr());
        unsafe { Self::from_owned_ptr(ffi::PyObject_CallObject(self.as_ptr(), args_ptr)) }
    }

    /// Looks up an attribute by name, `getattr(o, name)`.
    ///
    /// # Errors
    /// If the attribute does not exist or the name contains a NUL.
    pub fn getattr(&self, name: &str) -> Result<Object> {
        let name = CString::new(name).map_err(|_| Error::Convert {
            what: "attribute name with interior NUL",
        })?;
        unsafe { Self::from_owned_ptr(ffi::PyObject_GetAttrString(self.as_ptr(), name.as_ptr())) }
    }

    /// True if the value can be invoked.
    #[must_use]
    pub fn is_callable(&self) -> bool {
        unsafe { ffi::PyCallable_Check(self.as_ptr()) != 0 }
    }

    /// Returns an iterator over the value, `iter(o)`.
    ///
    /// # Errors
    /// If the value is not iterable.
    pub fn iter(&self) -> Result<Iter> {
        let it = unsafe { Self::from_owned_ptr(ffi::PyObject_GetIter(self.as_ptr())) }?;
        Ok(Iter::from_object(it))
    }
}

impl Clone for Object {
    fn clone(&self) -> Self {
        unsafe { Self::from_borrowed_unchecked(self.as_ptr()) }
    }
}

impl Drop for Object {
    fn drop(&mut self) {
        unsafe { ffi::Py_DecRef(self.as_ptr()) };
    }
}

/// Identity comparison: two `Object`s are equal when they reference the
/// same interpreter value.
impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl Eq for Object {}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Object").field(&self.ptr).finish()
    }
}

/// Imports an interpreter module by name.
///
/// # Errors
/// If the import machinery raises, or `name` contains a NUL.
pub fn import_module(name: &str) -> Result<Object> {
    let name = CString::new(name).map_err(|_| Error::Convert {
        what: "module name with interior NUL",
    })?;
    unsafe { Object::from_owned_ptr(ffi::PyImport_ImportModule(name.as_ptr())) }
}

/// Compiles `src` and executes it as a module registered under `name`,
/// returning the module handle.
///
/// # Errors
/// If compilation or execution raises.
pub fn compile_module(name: &str, src: &str) -> Result<Object> {
    let csrc = CString::new(src).map_err(|_| Error::Convert {
        what: "module source with interior NUL",
    })?;
    let cfile = CString::new(format!("<string src for {name}>")).map_err(|_| Error::Convert {
        what: "module source filename with interior NUL",
    })?;
    let code = unsafe {
        Object::from_owned_ptr(ffi::Py_CompileString(
            csrc.as_ptr(),
            cfile.as_ptr(),
            ffi::Py_file_input,
        ))
    }?;
    let cname = CString::new(name).map_err(|_| Error::Convert {
        what: "module name with interior NUL",
    })?;
    unsafe { Object::from_owned_ptr(ffi::PyImport_ExecCodeModule(cname.as_ptr(), code.as_ptr())) }
}
