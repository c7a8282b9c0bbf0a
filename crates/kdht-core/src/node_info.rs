//! The advertisable identity of a node.

use std::fmt;

use crate::id::Id;

/// A pair `(id, address)` identifying a node on the network.
///
/// `NodeInfo` values are immutable once constructed and compared by `id`
/// only — two `NodeInfo`s with the same id but different addresses are
/// considered equal, matching the routing table's "distinct id" invariant.
#[derive(Clone)]
pub struct NodeInfo {
    id: Id,
    address: String,
}

impl NodeInfo {
    pub fn new(id: Id, address: impl Into<String>) -> Self {
        Self {
            id,
            address: address.into(),
        }
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl PartialEq for NodeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NodeInfo {}

impl fmt::Debug for NodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeInfo({}, {})", hex::encode(self.id), self.address)
    }
}
