//! The DHT node engine: binds a listener, serves inbound requests, and
//! exposes the public `Ping`/`Store`/`FindNode`/`FindValue`/`Shutdown`/
//! `Neighbors` operations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, warn};

use kdht_core::id::KEY_BITS;
use kdht_core::proto::{Message, MessageType};
use kdht_core::transport::{read_message, write_message};
use kdht_core::{Error, Id, NodeInfo, Result};

use crate::lookup::node_lookup;
use crate::routing::RoutingTable;
use crate::storage::LocalStorage;

/// A single DHT participant: routing table, local storage, and the TCP
/// listener serving both.
pub struct Node {
    info: NodeInfo,
    alpha: usize,
    routing_table: Arc<RoutingTable>,
    storage: LocalStorage,
    closed: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
}

impl Node {
    /// Bind a listener at `addr`, start serving requests, and fire
    /// bootstrap pings at `neighbors`. Returns as soon as the listener is
    /// up — it does not wait for any neighbor to respond.
    pub async fn bind(
        id: Id,
        addr: &str,
        k: usize,
        alpha: usize,
        neighbors: Vec<String>,
    ) -> Result<Arc<Self>> {
        if alpha < 1 {
            return Err(Error::Protocol("alpha must be at least 1".into()));
        }

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?.to_string();
        let info = NodeInfo::new(id, local_addr);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let node = Arc::new(Node {
            info: info.clone(),
            alpha,
            routing_table: Arc::new(RoutingTable::new(info.clone(), k)),
            storage: LocalStorage::new(),
            closed: AtomicBool::new(false),
            shutdown_tx,
        });

        tokio::spawn(Arc::clone(&node).accept_loop(listener, shutdown_rx));

        for neighbor in neighbors {
            let node = Arc::clone(&node);
            tokio::spawn(async move {
                node.bootstrap(&neighbor).await;
            });
        }

        Ok(node)
    }

    /// Ping `addr` so it (and, via its reply, this node) learns of the
    /// other's identity. Failures are logged and swallowed: bootstrapping
    /// against an unreachable address is not fatal.
    pub async fn bootstrap(&self, addr: &str) {
        let request = Message::new(MessageType::Ping, self.info.clone());
        if let Err(err) = self.contact_address(request, addr).await {
            warn!(%addr, error = %err, "bootstrap ping failed");
        }
    }

    pub fn info(&self) -> &NodeInfo {
        &self.info
    }

    /// Send a ping carrying `message` to the node known by `id`.
    pub async fn ping(&self, id: &Id, message: Vec<u8>) -> Result<()> {
        self.ensure_open()?;

        let target = self
            .routing_table
            .lookup(id)
            .ok_or(Error::InvalidNode)?;

        let request = Message::new(MessageType::Ping, self.info.clone()).with_value(message);
        let response = self.contact_address(request, target.address()).await?;
        if response.kind != MessageType::Ack {
            return Err(Error::Transport(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("expected an Ack reply, got {:?}", response.kind),
            )));
        }
        Ok(())
    }

    /// Store `value` in the DHT at the address `compute(value)`, by
    /// sending `STORE` to the k closest nodes found via lookup.
    ///
    /// Returns `Storage` if fewer than k nodes could be found to hold it,
    /// even if it was placed on some of them.
    pub async fn store(self: &Arc<Self>, value: Vec<u8>) -> Result<()> {
        self.ensure_open()?;

        let key = kdht_core::id::compute(&value);
        let (_, _, closest) = node_lookup(Arc::clone(self), key, false).await;

        for target in &closest {
            let node = Arc::clone(self);
            let target = target.clone();
            let value = value.clone();
            tokio::spawn(async move {
                let request = Message::new(MessageType::Store, node.info.clone())
                    .with_key(key)
                    .with_value(value);
                let _ = node.contact_address(request, target.address()).await;
            });
        }

        if closest.len() < self.routing_table.k() {
            return Err(Error::Storage);
        }
        Ok(())
    }

    /// Look up the k nodes closest to `id`. Cannot fail: the local node is
    /// always a candidate.
    pub async fn find_node(self: &Arc<Self>, id: Id) -> Vec<NodeInfo> {
        let (_, _, closest) = node_lookup(Arc::clone(self), id, false).await;
        closest
    }

    /// Retrieve the value stored at `id`, and the node it was found on.
    pub async fn find_value(self: &Arc<Self>, id: Id) -> Result<(Vec<u8>, NodeInfo)> {
        self.ensure_open()?;

        let (value, sender, _) = node_lookup(Arc::clone(self), id, true).await;
        match (value, sender) {
            (Some(value), Some(sender)) => Ok((value, sender)),
            _ => Err(Error::Value),
        }
    }

    /// Stop serving requests. Idempotent calls after the first return
    /// `Shutdown`.
    pub fn shutdown(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(Error::Shutdown);
        }
        // A `watch` channel retains its last value, so the accept loop
        // observes this even if it hasn't reached its `changed()` await yet.
        let _ = self.shutdown_tx.send(true);
        Ok(())
    }

    /// All known neighbors, drawn from the populated buckets nearest the
    /// local id.
    pub fn neighbors(&self) -> Vec<NodeInfo> {
        if self.closed.load(Ordering::SeqCst) {
            return Vec::new();
        }

        let max_bucket = KEY_BITS - 1;
        let min_bucket = max_bucket.saturating_sub(self.routing_table.buckets());

        let mut neighbors = Vec::new();
        for bucket in min_bucket..=max_bucket {
            for info in self.routing_table.get_nodes(bucket) {
                if info.id() != self.info.id() {
                    neighbors.push(info);
                }
            }
        }
        neighbors
    }

    pub(crate) fn alpha(&self) -> usize {
        self.alpha
    }

    pub(crate) fn routing_table(&self) -> &RoutingTable {
        self.routing_table.as_ref()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(Error::Shutdown)
        } else {
            Ok(())
        }
    }

    /// Dial `addr`, send `message`, and wait for the reply. Every
    /// successful exchange learns the replying node's identity, the same
    /// as an inbound request does.
    pub(crate) async fn contact_address(&self, message: Message, addr: &str) -> Result<Message> {
        let mut stream = TcpStream::connect(addr).await?;
        write_message(&mut stream, &message).await?;
        let response = read_message(&mut stream).await?;

        let routing_table = Arc::clone(&self.routing_table);
        let sender = response.sender.clone();
        tokio::spawn(async move {
            routing_table.insert_node(sender);
        });

        Ok(response)
    }

    async fn accept_loop(self: Arc<Self>, listener: TcpListener, mut shutdown_rx: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _)) => {
                            let node = Arc::clone(&self);
                            tokio::spawn(node.serve_connection(stream));
                        }
                        Err(err) => {
                            warn!(error = %err, "accept failed");
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    debug!("listener shutting down");
                    return;
                }
            }
        }
    }

    async fn serve_connection(self: Arc<Self>, mut stream: TcpStream) {
        loop {
            let message = match read_message(&mut stream).await {
                Ok(message) => message,
                Err(_) => return,
            };

            let routing_table = Arc::clone(&self.routing_table);
            let sender = message.sender.clone();
            tokio::spawn(async move {
                routing_table.insert_node(sender);
            });

            let response = match message.kind {
                MessageType::Ping => self.process_ping(&message),
                MessageType::Store => self.process_store(&message),
                MessageType::Get => self.process_get(&message),
                MessageType::FindNode => self.process_find_node(&message),
                MessageType::FindValue => self.process_find_value(&message),
                other => {
                    warn!(?other, "unexpected request message type");
                    continue;
                }
            };

            if write_message(&mut stream, &response).await.is_err() {
                return;
            }
        }
    }

    fn process_ping(&self, message: &Message) -> Message {
        Message::new(MessageType::Ack, self.info.clone()).with_value(message.value.clone().unwrap_or_default())
    }

    fn process_store(&self, message: &Message) -> Message {
        if let (Some(key), Some(value)) = (message.key, message.value.clone()) {
            self.storage.store(key, value);
        }
        Message::new(MessageType::Ack, self.info.clone())
    }

    fn process_get(&self, message: &Message) -> Message {
        let Some(key) = message.key else {
            return Message::new(MessageType::Ack, self.info.clone());
        };
        match self.storage.get(&key) {
            Some(value) => Message::new(MessageType::Value, self.info.clone()).with_value(value),
            None => Message::new(MessageType::Ack, self.info.clone()),
        }
    }

    fn process_find_node(&self, message: &Message) -> Message {
        let nodes = match message.key {
            Some(key) => self.routing_table.closest_k(&key),
            None => Vec::new(),
        };
        Message::new(MessageType::Nodes, self.info.clone()).with_nodes(nodes)
    }

    fn process_find_value(&self, message: &Message) -> Message {
        if let Some(key) = message.key {
            if let Some(value) = self.storage.get(&key) {
                return Message::new(MessageType::Value, self.info.clone()).with_value(value);
            }
        }
        self.process_find_node(message)
    }
}
