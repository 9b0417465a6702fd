//! Shape-checked wrappers over [`Object`](crate::Object).
//!
//! Each wrapper is a newtype around an owned [`Object`](crate::Object)
//! whose shape has been verified, dereferencing to it for the generic
//! operations. Item accessors always hand back a new strong reference,
//! never a borrowed one, and setters take their own reference before the
//! underlying stealing call so the caller keeps theirs.

mod dict;
mod int;
mod iter;
mod list;
mod string;
mod tuple;

pub use dict::Dict;
pub use int::Int;
pub use iter::Iter;
pub use list::List;
pub use string::Str;
pub(crate) use string::drain_intern_pool;
pub use tuple::Tuple;
