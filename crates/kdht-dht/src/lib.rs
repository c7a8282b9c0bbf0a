//! The Kademlia engine: routing table, local storage, the iterative
//! lookup, and the node that ties them to the wire protocol.

mod lookup;
pub mod node;
pub mod routing;
pub mod storage;

pub use node::Node;
pub use routing::RoutingTable;
pub use storage::LocalStorage;

/// Generate a random 160-bit id, for nodes that don't derive their id from
/// other material.
pub fn generate_random_id() -> kdht_core::Id {
    let mut id = [0u8; kdht_core::KEY_BYTES];
    getrandom::getrandom(&mut id).expect("failed to generate random bytes");
    id
}
