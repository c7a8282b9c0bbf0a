//! Error types for the k-DHT.
//!
//! Variants are split between the semantic kinds a caller is expected to
//! match on (`Shutdown`, `Storage`, `Value`, `InvalidNode`, `Transport`) and
//! the ambient I/O and wire-codec failures that surface alongside them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// An operation was attempted on a node that has already shut down (or
    /// `Shutdown` was called twice).
    #[error("node has already been shut down")]
    Shutdown,

    /// `Store` completed but reached fewer than k nodes.
    #[error("value could not be stored on k nodes")]
    Storage,

    /// `FindValue` could not locate the requested key on any reachable node.
    #[error("value could not be found")]
    Value,

    /// `Ping` or `RemoveNode` referenced an id not present in the routing
    /// table, or an attempt was made to remove the owner.
    #[error("node does not exist")]
    InvalidNode,

    /// Underlying I/O failure on a specific call.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// A malformed or type-mismatched message.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Wire decode failure.
    #[error("decode error: {0}")]
    Decode(#[from] prost::DecodeError),
}

pub type Result<T> = std::result::Result<T, Error>;
