//! Bidirectional call bridge between a host process and an embedded
//! CPython interpreter.
//!
//! Typical flow:
//! 1. Register a host dispatcher with
//!    [`set_dispatcher`](crate::dispatch::set_dispatcher) (or build a
//!    [`CallbackRegistry`](crate::dispatch::CallbackRegistry) and install
//!    it).
//! 2. Start the interpreter with [`Bridge::initialize`](crate::Bridge::initialize)
//!    (or [`Bridge::builder`](crate::Bridge::builder) for init/finalize
//!    hooks). The returned [`Bridge`](crate::Bridge) owns the durable
//!    sentinel references and the `_pybridge` module handle.
//! 3. Interpreter code calls `_pybridge.call(name, args)`; the gateway
//!    forwards every well-formed request to the dispatcher. Host code
//!    calls into the interpreter through [`Object::call`](crate::Object::call).
//! 4. [`Bridge::finalize`](crate::Bridge::finalize) (or drop) releases
//!    every durable handle exactly once and shuts the interpreter down.
//!
//! The bridge takes no locks across boundary crossings. The interpreter is
//! process-global and single-owner: a multi-threaded host must serialize
//! every crossing (initialize, calls, finalize) itself, either through a
//! lock of its own or by confining the [`Bridge`](crate::Bridge) to one
//! thread (the token is not `Send`, which makes the confinement variant a
//! compile-time guarantee). [`threads`](crate::threads) has the handoff
//! helpers for the lock-based variant.

pub mod bridge;
pub mod dispatch;
pub mod error;
pub mod object;
pub mod threads;
pub mod types;
pub mod value;

/// Trace target used by the call gateway.
pub const TRACE_TARGET_DISPATCH: &str = "pybridge::dispatch";

pub use bridge::{Bridge, BridgeBuilder};
pub use dispatch::{CallbackRegistry, clear_dispatcher, set_dispatcher};
pub use error::{Error, Result};
pub use object::Object;
pub use types::{Dict, Int, Iter, List, Str, Tuple};
pub use value::{Value, ValueKind};
