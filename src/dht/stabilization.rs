//! Ring-wide batch protocols over the successor chain.
//!
//! The simulation models the paper's periodic tasks as caller-driven
//! rounds: collect the members once, then repeat single-node protocol
//! steps over all of them until a full pass changes nothing.

use crate::consts::BIT_LEN;
use crate::consts::FINGER_TABLE_SIZE;
use crate::dht::chord::Ring;
use crate::dht::types::Chord;
use crate::dht::Did;
use crate::error::Result;

/// Lazy walk of the successor chain from a start node, yielding each
/// member once and stopping when the cycle closes. Restartable: ask the
/// ring for a fresh one.
pub struct SuccessorWalk<'a> {
    ring: &'a Ring,
    start: Did,
    next: Option<Did>,
}

impl<'a> Iterator for SuccessorWalk<'a> {
    type Item = Did;

    fn next(&mut self) -> Option<Did> {
        let cur = self.next?;
        let node = match self.ring.node(cur) {
            Ok(n) => n,
            Err(_) => panic!("successor chain left the arena at {cur}"),
        };
        let succ = node.successor();
        self.next = if succ == self.start { None } else { Some(succ) };
        Some(cur)
    }
}

impl Ring {
    /// Every ring member in successor order from `start`.
    pub fn collect_all_nodes(&self, start: Did) -> Result<SuccessorWalk<'_>> {
        self.node(start)?;
        Ok(SuccessorWalk {
            ring: self,
            start,
            next: Some(start),
        })
    }

    // Backstop for the quiescence loops: long enough to drain pending
    // corrections across any chain of joins, short enough to bound a
    // corrupted run.
    fn max_rounds(&self) -> usize {
        BIT_LEN.max(self.len() * 2)
    }

    /// Run stabilization over every member until a full pass makes no
    /// change. Returns the number of passes executed; a ring at rest
    /// takes exactly one.
    pub fn stabilize_network(&mut self, start: Did) -> Result<usize> {
        let members: Vec<Did> = self.collect_all_nodes(start)?.collect();
        let cap = self.max_rounds();
        let mut rounds = 0;
        loop {
            rounds += 1;
            let mut changed = false;
            for &did in &members {
                changed |= self.stabilize(did)?;
            }
            tracing::debug!("stabilize_network: round {}, changed: {}", rounds, changed);
            if !changed {
                break;
            }
            if rounds >= cap {
                tracing::warn!("stabilize_network: still changing after {} rounds", rounds);
                break;
            }
        }
        Ok(rounds)
    }

    /// Refresh every finger table until a full pass makes no change. Each
    /// pass cycles every member through all of its slots. Returns the
    /// number of passes executed.
    pub fn fix_all_fingers(&mut self, start: Did) -> Result<usize> {
        let members: Vec<Did> = self.collect_all_nodes(start)?.collect();
        let cap = self.max_rounds();
        let mut rounds = 0;
        loop {
            rounds += 1;
            let mut changed = false;
            for &did in &members {
                for _ in 0..FINGER_TABLE_SIZE {
                    changed |= self.fix_fingers(did)?;
                }
            }
            tracing::debug!("fix_all_fingers: round {}, changed: {}", rounds, changed);
            if !changed {
                break;
            }
            if rounds >= cap {
                tracing::warn!("fix_all_fingers: still changing after {} rounds", rounds);
                break;
            }
        }
        Ok(rounds)
    }

    /// Every stored key as `(owner, key, value)`, owners in successor
    /// order from `start`.
    pub fn collect_all_keys(&self, start: Did) -> Result<Vec<(Did, Did, Option<i64>)>> {
        let members: Vec<Did> = self.collect_all_nodes(start)?.collect();
        let mut out = Vec::new();
        for did in members {
            let node = self.node(did)?;
            for (key, value) in node.storage() {
                out.push((did, *key, *value));
            }
        }
        Ok(out)
    }

    /// Release every member reachable from `start`. Returns how many were
    /// dropped.
    pub fn delete_all_nodes(&mut self, start: Did) -> Result<usize> {
        let members: Vec<Did> = self.collect_all_nodes(start)?.collect();
        for &did in &members {
            self.release(did);
        }
        Ok(members.len())
    }
}
