//! The iterative node lookup: α-parallel rounds of `FIND_NODE`/`FIND_VALUE`
//! probes against the current closest-k set, converging until a round adds
//! nothing new (or, for value lookups, until some node answers with the
//! value itself).

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::task::JoinSet;

use kdht_core::id::distance;
use kdht_core::proto::{Message, MessageType};
use kdht_core::{Id, NodeInfo};

use crate::node::Node;

/// Run the lookup for `id`. When `want_value` is set and some contacted
/// node answers with a stored value, the search stops immediately and
/// returns `(Some(value), Some(holder), _)`; otherwise it returns
/// `(None, None, closest)` with `closest` the best `k` nodes found.
pub(crate) async fn node_lookup(
    node: Arc<Node>,
    id: Id,
    want_value: bool,
) -> (Option<Vec<u8>>, Option<NodeInfo>, Vec<NodeInfo>) {
    let mut closest = node.routing_table().closest_k(&id);

    let visited: Arc<Mutex<HashSet<Id>>> = Arc::new(Mutex::new(HashSet::new()));
    visited.lock().unwrap().insert(*node.info().id());

    let mut idx = 0usize;
    let mut batch = take_at_most(&closest, node.alpha());

    loop {
        if batch.is_empty() {
            return (None, None, closest);
        }

        let mut tasks: JoinSet<Option<Message>> = JoinSet::new();
        for candidate in &batch {
            let node = Arc::clone(&node);
            let visited = Arc::clone(&visited);
            let candidate = candidate.clone();
            let target = id;
            tasks.spawn(async move { probe(node, target, want_value, visited, candidate).await });
        }

        let mut productive = false;
        while let Some(joined) = tasks.join_next().await {
            let Ok(Some(response)) = joined else {
                continue;
            };

            if want_value {
                if let Some(value) = response.value.clone() {
                    // A node holds the value: stop immediately and abandon
                    // the remaining in-flight probes.
                    return (Some(value), Some(response.sender), Vec::new());
                }
            }

            for info in &response.nodes {
                if closest.iter().any(|n| n.id() == info.id()) {
                    continue;
                }
                if closest.len() < node.routing_table().k() {
                    closest.push(info.clone());
                    productive = true;
                } else if let Some((far_idx, far_dist)) = furthest(&closest, &id) {
                    if distance(info.id(), &id) < far_dist {
                        closest[far_idx] = info.clone();
                        productive = true;
                    }
                }
            }
        }

        if productive {
            idx = 0;
            batch = take_at_most(&closest, node.alpha());
        } else {
            idx += 1;
            let rest = if idx < closest.len() { &closest[idx..] } else { &[] };
            batch = take_at_most(rest, node.alpha());
        }
    }
}

async fn probe(
    node: Arc<Node>,
    target: Id,
    want_value: bool,
    visited: Arc<Mutex<HashSet<Id>>>,
    candidate: NodeInfo,
) -> Option<Message> {
    let is_new = visited.lock().unwrap().insert(*candidate.id());
    if !is_new {
        return None;
    }

    let kind = if want_value {
        MessageType::FindValue
    } else {
        MessageType::FindNode
    };
    let request = Message::new(kind, node.info().clone()).with_key(target);
    let response = node.contact_address(request, candidate.address()).await.ok()?;

    // A FIND_VALUE may come back as either a hit (VALUE) or a miss (NODES);
    // a FIND_NODE may only come back as NODES. Anything else is treated as
    // a transport failure: the probe contributes nothing.
    let well_formed = match response.kind {
        MessageType::Value => want_value,
        MessageType::Nodes => true,
        _ => false,
    };
    if !well_formed {
        return None;
    }
    Some(response)
}

fn take_at_most(nodes: &[NodeInfo], max: usize) -> Vec<NodeInfo> {
    nodes[..nodes.len().min(max)].to_vec()
}

fn furthest(nodes: &[NodeInfo], target: &Id) -> Option<(usize, Id)> {
    nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (i, distance(n.id(), target)))
        .max_by(|a, b| a.1.cmp(&b.1))
}
