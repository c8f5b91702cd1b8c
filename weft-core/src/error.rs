//! Error types for the tracking runtime.
//!
//! Only genuine misuse of the container surface produces an error: asking a
//! node for an operation its kind does not support, keying a container with a
//! key it cannot hold, or using the iteration protocol on a weak collection.
//! Everything else either succeeds or propagates as a panic from
//! caller-supplied code. The runtime never logs or swallows a failure
//! internally.

use thiserror::Error;

use crate::value::NodeKind;

/// Errors produced by the container surface.
#[derive(Debug, Error)]
pub enum Error {
    /// An operation was invoked on a node kind that does not support it,
    /// e.g. `push` on a map or `add` on a record.
    #[error("operation `{op}` is not supported on a {kind:?} node")]
    KindMismatch { op: &'static str, kind: NodeKind },

    /// The key cannot address this container (non-integer list index,
    /// out-of-bounds list write, non-identity key on a weak collection).
    #[error("invalid key: {reason}")]
    InvalidKey { reason: &'static str },

    /// Weak collections expose only `has`/`get`/`set`/`add`/`delete`.
    #[error("weak collections do not support `{0}`")]
    UnsupportedWeakOp(&'static str),

    /// A delegation parent must itself be a record node.
    #[error("delegation parent must be a record node")]
    InvalidParent,

    /// Only record slots carry the fixed flag.
    #[error("`freeze` requires a record node with an existing slot")]
    NotFreezable,

    /// An opaque leaf was downcast to the wrong concrete type.
    #[error("opaque value is not a `{expected}`")]
    OpaqueType { expected: &'static str },
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
