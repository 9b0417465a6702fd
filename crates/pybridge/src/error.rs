use std::cell::Cell;

use thiserror::Error;

use crate::object::{self, Object};
use crate::types::Str;

/// Result type used throughout `pybridge`.
pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    /// The embedded runtime failed to start, or a second bridge was
    /// requested while one is already live.
    #[error("interpreter initialization failed: {reason}")]
    Init { reason: String },

    /// An exception raised inside the interpreter, rendered to text via
    /// the `traceback` module.
    #[error("{0}")]
    Python(String),

    /// A dynamic value did not have the shape a conversion required.
    #[error("object is not {expected}")]
    Type { expected: &'static str },

    /// A host value could not cross into the interpreter.
    #[error("cannot convert {what}")]
    Convert { what: &'static str },

    /// One or more user hooks failed during initialize or finalize.
    #[error("{} lifecycle hook failure(s)", .0.len())]
    Hooks(Vec<Error>),

    /// Interpreter shutdown reported a failure.
    #[error("embedded runtime did not shut down cleanly")]
    Shutdown,
}

thread_local! {
    static FETCHING: Cell<bool> = const { Cell::new(false) };
}

/// Drains the pending interpreter exception into an [`Error::Python`].
///
/// The interpreter has no direct exception-to-text call, so the pending
/// exception is fetched and handed to `traceback.format_exception` (or
/// `format_exception_only` when no traceback exists). Formatting itself
/// runs interpreter code and can fail the same way, so one nested level is
/// allowed; anything deeper is printed to stderr and summarized.
pub(crate) fn fetch() -> Error {
    if FETCHING.get() {
        unsafe { pyo3_ffi::PyErr_Print() };
        return Error::Python("nested interpreter error, see stderr".into());
    }
    FETCHING.set(true);
    let err = fetch_pending();
    FETCHING.set(false);
    err
}

fn fetch_pending() -> Error {
    let mut exc_type: *mut pyo3_ffi::PyObject = std::ptr::null_mut();
    let mut exc_value: *mut pyo3_ffi::PyObject = std::ptr::null_mut();
    let mut exc_tb: *mut pyo3_ffi::PyObject = std::ptr::null_mut();
    unsafe {
        pyo3_ffi::PyErr_Fetch(&raw mut exc_type, &raw mut exc_value, &raw mut exc_tb);
    }
    let Some(exc_type) = Object::try_from_owned_ptr(exc_type) else {
        return Error::Python("interpreter signalled failure with no exception set".into());
    };
    // Re-wrap through mutable slots so normalization can replace them.
    let mut exc_type = exc_type.into_ptr();
    unsafe {
        pyo3_ffi::PyErr_NormalizeException(&raw mut exc_type, &raw mut exc_value, &raw mut exc_tb);
    }
    let exc_type = unsafe { Object::from_owned_unchecked(exc_type) };
    let exc_value = Object::try_from_owned_ptr(exc_value);
    let exc_tb = Object::try_from_owned_ptr(exc_tb);

    match render(&exc_type, exc_value.as_ref(), exc_tb.as_ref()) {
        Ok(text) => Error::Python(text),
        Err(err) => err,
    }
}

fn render(exc_type: &Object, exc_value: Option<&Object>, exc_tb: Option<&Object>) -> Result<String> {
    let traceback = object::import_module("traceback")?;
    let value = exc_value.cloned().unwrap_or_else(Object::none);
    let lines = match exc_tb {
        Some(tb) => traceback
            .getattr("format_exception")?
            .call(&[exc_type.clone(), value, tb.clone()])?,
        None => traceback
            .getattr("format_exception_only")?
            .call(&[exc_type.clone(), value])?,
    };
    let lines = lines.as_list()?;
    let text = Str::new("\n")?.join(&lines)?.to_str()?;
    Ok(text.trim_end().to_owned())
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn display_formats() {
        let err = Error::Init {
            reason: "runtime refused".into(),
        };
        assert_eq!(
            err.to_string(),
            "interpreter initialization failed: runtime refused"
        );

        let err = Error::Type {
            expected: "a tuple",
        };
        assert_eq!(err.to_string(), "object is not a tuple");

        let err = Error::Hooks(vec![Error::Shutdown, Error::Python("x".into())]);
        assert_eq!(err.to_string(), "2 lifecycle hook failure(s)");
    }
}
