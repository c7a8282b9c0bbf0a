//! Core types shared by the k-DHT routing engine and node binary: id
//! arithmetic, node identity, the wire protocol, and the framed transport
//! built on top of it.

pub mod error;
pub mod id;
pub mod node_info;
pub mod proto;
pub mod transport;

pub use error::{Error, Result};
pub use id::{Id, KEY_BITS, KEY_BYTES};
pub use node_info::NodeInfo;
pub use proto::{Message, MessageType};
