//! Wire message definitions.
//!
//! These are manually written to match the protocol described in §6 of the
//! specification, avoiding a `protoc`/`prost-build` step at build time —
//! the same trade-off the rest of this corpus makes for its own protocols.

use prost::Message as _;

use crate::error::{Error, Result};
use crate::id::{Id, KEY_BYTES};
use crate::node_info::NodeInfo;

/// The eight message types exchanged between nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, prost::Enumeration)]
#[repr(i32)]
pub enum MessageType {
    Ping = 0,
    Store = 1,
    Get = 2,
    FindNode = 3,
    FindValue = 4,
    Ack = 5,
    Value = 6,
    Nodes = 7,
}

#[derive(Clone, PartialEq, prost::Message)]
struct WireNodeInfo {
    #[prost(bytes, tag = "1")]
    id: Vec<u8>,
    #[prost(string, tag = "2")]
    address: String,
}

#[derive(Clone, PartialEq, prost::Message)]
struct WireMessage {
    #[prost(enumeration = "MessageType", tag = "1")]
    r#type: i32,
    #[prost(message, optional, tag = "2")]
    sender: Option<WireNodeInfo>,
    #[prost(bytes, tag = "3")]
    key: Vec<u8>,
    #[prost(bytes, tag = "4")]
    value: Vec<u8>,
    #[prost(message, repeated, tag = "5")]
    nodes: Vec<WireNodeInfo>,
}

/// A message in flight between two nodes.
///
/// Every message carries a sender `NodeInfo` (§4.4's invariant: the sender
/// is the only routing-table learning mechanism). `key`, `value`, and
/// `nodes` are populated according to the message's `kind`.
#[derive(Clone, Debug)]
pub struct Message {
    pub kind: MessageType,
    pub sender: NodeInfo,
    pub key: Option<Id>,
    pub value: Option<Vec<u8>>,
    pub nodes: Vec<NodeInfo>,
}

impl Message {
    pub fn new(kind: MessageType, sender: NodeInfo) -> Self {
        Self {
            kind,
            sender,
            key: None,
            value: None,
            nodes: Vec::new(),
        }
    }

    pub fn with_key(mut self, key: Id) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_value(mut self, value: Vec<u8>) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_nodes(mut self, nodes: Vec<NodeInfo>) -> Self {
        self.nodes = nodes;
        self
    }

    /// Encode this message to its wire representation.
    pub fn encode(&self) -> Vec<u8> {
        let wire = WireMessage {
            r#type: self.kind as i32,
            sender: Some(node_info_to_wire(&self.sender)),
            key: self.key.map(|k| k.to_vec()).unwrap_or_default(),
            value: self.value.clone().unwrap_or_default(),
            nodes: self.nodes.iter().map(node_info_to_wire).collect(),
        };
        wire.encode_to_vec()
    }

    /// Decode a message from its wire representation.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let wire = WireMessage::decode(buf)?;

        let kind = MessageType::try_from(wire.r#type)
            .map_err(|_| Error::Protocol(format!("unknown message type {}", wire.r#type)))?;

        let sender = wire
            .sender
            .as_ref()
            .ok_or_else(|| Error::Protocol("message missing sender".into()))
            .and_then(wire_to_node_info)?;

        let key = if wire.key.is_empty() {
            None
        } else {
            Some(bytes_to_id(&wire.key)?)
        };

        let value = if wire.value.is_empty() {
            None
        } else {
            Some(wire.value)
        };

        let nodes = wire
            .nodes
            .iter()
            .map(wire_to_node_info)
            .collect::<Result<Vec<_>>>()?;

        Ok(Message {
            kind,
            sender,
            key,
            value,
            nodes,
        })
    }
}

fn node_info_to_wire(info: &NodeInfo) -> WireNodeInfo {
    WireNodeInfo {
        id: info.id().to_vec(),
        address: info.address().to_string(),
    }
}

fn wire_to_node_info(info: &WireNodeInfo) -> Result<NodeInfo> {
    let id = bytes_to_id(&info.id)?;
    Ok(NodeInfo::new(id, info.address.clone()))
}

fn bytes_to_id(bytes: &[u8]) -> Result<Id> {
    if bytes.len() != KEY_BYTES {
        return Err(Error::Protocol(format!(
            "expected a {}-byte id, got {}",
            KEY_BYTES,
            bytes.len()
        )));
    }
    let mut id = [0u8; KEY_BYTES];
    id.copy_from_slice(bytes);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> NodeInfo {
        NodeInfo::new([7u8; KEY_BYTES], "127.0.0.1:9000")
    }

    #[test]
    fn ping_roundtrip() {
        let original = Message::new(MessageType::Ping, sender()).with_value(b"hello".to_vec());
        let decoded = Message::decode(&original.encode()).unwrap();

        assert_eq!(decoded.kind, MessageType::Ping);
        assert_eq!(decoded.sender, sender());
        assert_eq!(decoded.value, Some(b"hello".to_vec()));
        assert!(decoded.key.is_none());
    }

    #[test]
    fn find_node_roundtrip_with_nodes() {
        let key = [1u8; KEY_BYTES];
        let nodes = vec![
            NodeInfo::new([2u8; KEY_BYTES], "127.0.0.1:1"),
            NodeInfo::new([3u8; KEY_BYTES], "127.0.0.1:2"),
        ];
        let original = Message::new(MessageType::Nodes, sender())
            .with_key(key)
            .with_nodes(nodes.clone());

        let decoded = Message::decode(&original.encode()).unwrap();
        assert_eq!(decoded.kind, MessageType::Nodes);
        assert_eq!(decoded.key, Some(key));
        assert_eq!(decoded.nodes, nodes);
    }

    #[test]
    fn decode_rejects_bad_id_length() {
        let wire = WireMessage {
            r#type: MessageType::Ping as i32,
            sender: Some(WireNodeInfo {
                id: vec![1, 2, 3],
                address: "x".into(),
            }),
            key: Vec::new(),
            value: Vec::new(),
            nodes: Vec::new(),
        };
        let err = Message::decode(&wire.encode_to_vec()).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}
