//! Read-only snapshots of ring state for drivers and debugging output.

use serde::Deserialize;
use serde::Serialize;

use crate::dht::Did;
use crate::dht::Ring;
use crate::error::Result;

/// Snapshot of one node: neighbor links, run-length compressed finger
/// table, and stored keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInspect {
    pub did: Did,
    pub successor: Did,
    #[serde(default)]
    pub predecessor: Option<Did>,
    /// `(entry, first_slot, last_slot)` runs, slots 1-based. Adjacent
    /// slots routing to the same node collapse into one run.
    pub finger_table: Vec<(Option<Did>, usize, usize)>,
    pub keys: Vec<(Did, Option<i64>)>,
}

/// Snapshot of every node in successor order from a start node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingInspect {
    pub nodes: Vec<NodeInspect>,
}

impl NodeInspect {
    /// Snapshot one node.
    pub fn inspect(ring: &Ring, did: Did) -> Result<Self> {
        let node = ring.node(did)?;
        let finger_table = compress_runs(node.finger().list().iter().copied())
            .into_iter()
            .map(|(entry, first, last)| (entry, first + 1, last + 1))
            .collect();
        Ok(Self {
            did: node.did(),
            successor: node.successor(),
            predecessor: node.predecessor(),
            finger_table,
            keys: node.storage().iter().map(|(k, v)| (*k, *v)).collect(),
        })
    }
}

impl RingInspect {
    /// Snapshot the whole ring.
    pub fn inspect(ring: &Ring, start: Did) -> Result<Self> {
        let mut nodes = Vec::new();
        for did in ring.collect_all_nodes(start)? {
            nodes.push(NodeInspect::inspect(ring, did)?);
        }
        Ok(Self { nodes })
    }
}

// Collapse consecutive equal slots into (entry, first, last) runs.
// Adjacent finger slots usually route to the same node, so the compressed
// form is what a driver wants to print.
fn compress_runs<T>(slots: impl Iterator<Item = T>) -> Vec<(T, usize, usize)>
where T: PartialEq {
    let mut runs: Vec<(T, usize, usize)> = vec![];
    for (i, slot) in slots.enumerate() {
        match runs.last_mut() {
            Some((entry, _, last)) if *entry == slot => *last = i,
            _ => runs.push((slot, i, i)),
        }
    }
    runs
}
