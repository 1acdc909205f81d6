//! Chord ring state and protocol operations.
#![warn(missing_docs)]

use std::collections::BTreeMap;

use crate::consts::FINGER_TABLE_SIZE;
use crate::dht::types::Chord;
use crate::dht::types::ChordStorage;
use crate::dht::Did;
use crate::dht::FingerTable;
use crate::error::Error;
use crate::error::Result;

/// A member of the ring. All links to other members are plain [Did]s
/// resolved through the owning [Ring] arena, so the cyclic
/// successor/predecessor/finger graph carries no ownership.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    did: Did,
    successor: Did,
    predecessor: Option<Did>,
    finger: FingerTable,
    storage: BTreeMap<Did, Option<i64>>,
}

impl Node {
    fn new(did: Did) -> Self {
        Self {
            did,
            successor: did,
            predecessor: None,
            finger: FingerTable::new(did),
            storage: BTreeMap::new(),
        }
    }

    /// The did of this node.
    pub fn did(&self) -> Did {
        self.did
    }

    /// The next node clockwise. Self for a solitary node.
    pub fn successor(&self) -> Did {
        self.successor
    }

    /// The previous node clockwise, once known.
    pub fn predecessor(&self) -> Option<Did> {
        self.predecessor
    }

    /// Routing shortcuts of this node.
    pub fn finger(&self) -> &FingerTable {
        &self.finger
    }

    /// Keys this node is responsible for. A `None` value records a key
    /// inserted without a value.
    pub fn storage(&self) -> &BTreeMap<Did, Option<i64>> {
        &self.storage
    }
}

/// Arena owning every node of the simulated ring. Members reference each
/// other by [Did]; all state is mutated through methods here, acting on
/// behalf of one member at a time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ring {
    nodes: BTreeMap<Did, Node>,
}

impl Ring {
    /// An empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a solitary node. It owns the whole ring until it joins
    /// one.
    pub fn create(&mut self, did: Did) -> Result<Did> {
        if self.nodes.contains_key(&did) {
            return Err(Error::DuplicateNode(did));
        }
        self.nodes.insert(did, Node::new(did));
        Ok(did)
    }

    /// Whether `did` is present in the arena.
    pub fn contains(&self, did: Did) -> bool {
        self.nodes.contains_key(&did)
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resolve a node, or report it missing from the arena (never
    /// created, or already left).
    pub fn node(&self, did: Did) -> Result<&Node> {
        self.nodes.get(&did).ok_or(Error::NodeNotFound(did))
    }

    fn node_mut(&mut self, did: Did) -> Result<&mut Node> {
        self.nodes.get_mut(&did).ok_or(Error::NodeNotFound(did))
    }

    pub(crate) fn release(&mut self, did: Did) -> Option<Node> {
        self.nodes.remove(&did)
    }

    /// Iterative lookup: walk toward `key` through finger shortcuts,
    /// falling back to the successor link whenever no finger makes
    /// progress. Returns the responsible node and the hop count.
    ///
    /// Every hop moves strictly clockwise toward the key, so the walk
    /// terminates within one ring circumference even while finger tables
    /// are stale; on a stabilized ring the shortcuts bound it by the
    /// identifier bit width.
    pub(crate) fn route(&self, origin: Did, key: Did) -> Result<(Did, usize)> {
        let mut cur = origin;
        let mut hops = 0;
        loop {
            let node = self.node(cur)?;
            if key == node.did {
                return Ok((cur, hops));
            }
            if key.in_open_closed(node.did, node.successor) {
                return Ok((node.successor, hops));
            }
            let finger = node.finger.closest_predecessor(key);
            let next = if finger == cur { node.successor } else { finger };
            hops += 1;
            assert!(
                hops <= self.nodes.len() + FINGER_TABLE_SIZE,
                "routing cycle while resolving {key} from {origin}"
            );
            cur = next;
        }
    }

    /// Point every finger slot of `did` at the current owner of its span.
    fn init_fingers(&mut self, did: Did) -> Result<()> {
        for i in 1..=FINGER_TABLE_SIZE {
            let start = self.node(did)?.finger.start(i);
            let (owner, _) = self.route(did, start)?;
            self.node_mut(did)?.finger.set(i, owner);
        }
        Ok(())
    }

    /// The member whose successor link points at `did`, found by walking
    /// the chain. Only needed when `did`'s own predecessor link is gone.
    fn scan_predecessor(&self, did: Did) -> Result<Did> {
        let mut cur = self.node(did)?.successor;
        for _ in 0..self.nodes.len() {
            let node = self.node(cur)?;
            if node.successor == did {
                return Ok(cur);
            }
            cur = node.successor;
        }
        panic!("successor chain never returns to {did}");
    }
}

impl Chord for Ring {
    /// Join a ring containing a node identified by `known`. The new
    /// member links itself between its successor and predecessor right
    /// away; stabilization only has to spread the news to finger tables.
    fn join(&mut self, did: Did, known: Option<Did>) -> Result<()> {
        self.node(did)?;
        let known = match known {
            // A node cannot join through itself.
            Some(k) if k != did => k,
            _ => {
                // Founding member: already its own successor, fingers
                // cover the whole ring by pointing home.
                tracing::debug!("join: {} founds the ring", did);
                self.init_fingers(did)?;
                return Ok(());
            }
        };

        let (successor, _) = self.route(known, did)?;
        let predecessor = match self.node(successor)?.predecessor {
            Some(p) if p != successor && self.contains(p) => p,
            _ => known,
        };
        tracing::debug!(
            "join: {} via {}, successor: {}, predecessor: {}",
            did,
            known,
            successor,
            predecessor
        );

        {
            let node = self.node_mut(did)?;
            node.successor = successor;
            node.predecessor = Some(predecessor);
        }
        self.node_mut(successor)?.predecessor = Some(did);
        self.node_mut(predecessor)?.successor = did;

        // Take over the span (predecessor, did] from the successor.
        let migrated: Vec<(Did, Option<i64>)> = {
            let succ = self.node_mut(successor)?;
            let moving: Vec<Did> = succ
                .storage
                .keys()
                .copied()
                .filter(|k| k.in_open_closed(predecessor, did))
                .collect();
            moving
                .into_iter()
                .filter_map(|k| succ.storage.remove(&k).map(|v| (k, v)))
                .collect()
        };
        if !migrated.is_empty() {
            tracing::debug!(
                "join: {} takes {} keys from successor {}",
                did,
                migrated.len(),
                successor
            );
            self.node_mut(did)?.storage.extend(migrated);
        }

        self.init_fingers(did)
    }

    /// Leave the ring: hand every stored key to the successor, rewire
    /// both neighbors, and scrub the departed did from every table that
    /// still names it. Idempotent for a solitary node.
    fn leave(&mut self, did: Did) -> Result<()> {
        let node = self.node(did)?;
        let successor = node.successor;
        if successor == did && node.predecessor.is_none() {
            return Ok(());
        }
        let predecessor = match node.predecessor {
            Some(p) if self.contains(p) => p,
            _ => self.scan_predecessor(did)?,
        };

        let mut leaving = match self.release(did) {
            Some(n) => n,
            None => return Err(Error::NodeNotFound(did)),
        };
        let keys = std::mem::take(&mut leaving.storage);
        tracing::debug!(
            "leave: {} hands {} keys and its span to {}",
            did,
            keys.len(),
            successor
        );

        // The successor owns every span the departed node did.
        for n in self.nodes.values_mut() {
            n.finger.replace(did, successor);
            if n.successor == did {
                n.successor = successor;
            }
            if n.predecessor == Some(did) {
                n.predecessor = None;
            }
        }

        if self.nodes.len() == 1 {
            // Back to a solitary node.
            let last = self.node_mut(successor)?;
            last.predecessor = None;
        } else {
            self.node_mut(successor)?.predecessor = Some(predecessor);
            self.node_mut(predecessor)?.successor = successor;
        }

        if !keys.is_empty() {
            self.node_mut(successor)?.storage.extend(keys);
        }
        Ok(())
    }

    /// Find the node responsible for `key`, routing from `origin`.
    fn find_successor(&self, origin: Did, key: Did) -> Result<Did> {
        let (owner, hops) = self.route(origin, key)?;
        tracing::debug!(
            "find_successor: origin: {}, key: {}, owner: {}, hops: {}",
            origin,
            key,
            owner,
            hops
        );
        Ok(owner)
    }

    /// Handle notification from a node that thinks it is the predecessor
    /// of `did`. Adopt it if it is closer than the current predecessor,
    /// or if there is none.
    fn notify(&mut self, did: Did, candidate: Did) -> Result<bool> {
        if candidate == did {
            return Ok(false);
        }
        let node = self.node(did)?;
        let adopt = match node.predecessor {
            None => true,
            Some(p) => candidate.in_open(p, node.did),
        };
        if adopt {
            self.node_mut(did)?.predecessor = Some(candidate);
        }
        Ok(adopt)
    }

    /// One stabilization round. Reports whether any link changed, so the
    /// ring-wide driver can run rounds to quiescence.
    fn stabilize(&mut self, did: Did) -> Result<bool> {
        let successor = self.node(did)?.successor;
        if successor == did {
            return Ok(false);
        }
        let mut changed = false;

        // Adopt a node that slid in between us and our successor.
        let x = self.node(successor)?.predecessor;
        if let Some(x) = x {
            if x != successor && self.contains(x) && x.in_open(did, successor) {
                tracing::debug!("stabilize: {} adopts successor {}", did, x);
                self.node_mut(did)?.successor = x;
                changed = true;
            }
        }

        // The successor may have lost its predecessor link, or still name
        // one inside (did, successor); point it back here until notify
        // settles the true owner.
        let successor = self.node(did)?.successor;
        let sp = self.node(successor)?.predecessor;
        let repair = match sp {
            None => true,
            Some(p) => p.in_open(did, successor),
        };
        if repair && sp != Some(did) {
            self.node_mut(successor)?.predecessor = Some(did);
            changed = true;
        }

        changed |= self.notify(successor, did)?;
        Ok(changed)
    }

    /// Refresh the slot under the fix cursor and advance it.
    fn fix_fingers(&mut self, did: Did) -> Result<bool> {
        let (index, start) = {
            let finger = &mut self.node_mut(did)?.finger;
            let index = finger.next_fix_slot();
            (index, finger.start(index))
        };
        let (owner, _) = self.route(did, start)?;
        let finger = &mut self.node_mut(did)?.finger;
        let changed = finger.get(index) != Some(owner);
        finger.set(index, owner);
        Ok(changed)
    }
}

impl ChordStorage for Ring {
    fn insert(&mut self, origin: Did, key: Did, value: Option<i64>) -> Result<Did> {
        let (owner, _) = self.route(origin, key)?;
        self.node_mut(owner)?.storage.insert(key, value);
        tracing::debug!("insert: key {} stored at {}", key, owner);
        Ok(owner)
    }

    fn remove(&mut self, origin: Did, key: Did) -> Result<()> {
        let (owner, _) = self.route(origin, key)?;
        self.node_mut(owner)?.storage.remove(&key);
        Ok(())
    }

    fn find(&self, origin: Did, key: Did) -> Result<(Did, Option<i64>)> {
        let (owner, _) = self.route(origin, key)?;
        let value = self.node(owner)?.storage.get(&key).copied().flatten();
        Ok((owner, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::BIT_LEN;
    use crate::dht::tests::gen_stabilized_ring;

    #[test]
    fn test_solitary_node() -> Result<()> {
        let mut ring = Ring::new();
        let did = ring.create(Did::from(42))?;
        ring.join(did, None)?;

        let node = ring.node(did)?;
        assert_eq!(node.successor(), did);
        assert_eq!(node.predecessor(), None);
        for i in 1..=FINGER_TABLE_SIZE {
            assert_eq!(node.finger().get(i), Some(did));
        }
        for key in [0u64, 41, 42, 43, 255] {
            assert_eq!(ring.find_successor(did, Did::from(key))?, did);
        }
        Ok(())
    }

    #[test]
    fn test_duplicate_create() {
        let mut ring = Ring::new();
        ring.create(Did::from(1)).unwrap();
        assert_eq!(
            ring.create(Did::from(1)),
            Err(Error::DuplicateNode(Did::from(1)))
        );
    }

    #[test]
    fn test_two_node_wiring() -> Result<()> {
        let mut ring = Ring::new();
        let a = ring.create(Did::from(0))?;
        let b = ring.create(Did::from(30))?;
        ring.join(a, None)?;
        ring.join(b, Some(a))?;

        assert_eq!(ring.node(a)?.successor(), b);
        assert_eq!(ring.node(a)?.predecessor(), Some(b));
        assert_eq!(ring.node(b)?.successor(), a);
        assert_eq!(ring.node(b)?.predecessor(), Some(a));
        Ok(())
    }

    #[test]
    fn test_join_migrates_span() -> Result<()> {
        let mut ring = Ring::new();
        let a = ring.create(Did::from(0))?;
        ring.join(a, None)?;
        ring.insert(a, Did::from(10), Some(1))?;
        ring.insert(a, Did::from(20), Some(2))?;
        ring.insert(a, Did::from(200), Some(3))?;

        let b = ring.create(Did::from(30))?;
        ring.join(b, Some(a))?;

        // (a, b] = (0, 30] moved to the new member; 200 stays at 0.
        let keys_b: Vec<u64> = ring.node(b)?.storage().keys().map(|k| (*k).into()).collect();
        assert_eq!(keys_b, vec![10, 20]);
        let keys_a: Vec<u64> = ring.node(a)?.storage().keys().map(|k| (*k).into()).collect();
        assert_eq!(keys_a, vec![200]);
        Ok(())
    }

    #[test]
    fn test_join_routes_along_stale_fingers() -> Result<()> {
        // No batch refresh between joins: routing still lands on the
        // right owner because the successor chain is ground truth.
        let mut ring = Ring::new();
        let ids: Vec<Did> = [0u64, 30, 65].iter().map(|&v| Did::from(v)).collect();
        ring.create(ids[0])?;
        ring.join(ids[0], None)?;
        for w in ids.windows(2) {
            ring.create(w[1])?;
            ring.join(w[1], Some(w[0]))?;
        }

        let d200 = ring.create(Did::from(200))?;
        ring.join(d200, Some(ids[0]))?;

        assert_eq!(ring.node(Did::from(65))?.successor(), d200);
        assert_eq!(ring.node(d200)?.successor(), ids[0]);
        assert_eq!(ring.node(d200)?.predecessor(), Some(Did::from(65)));
        Ok(())
    }

    #[test]
    fn test_use_after_leave() -> Result<()> {
        let mut ring = Ring::new();
        let a = ring.create(Did::from(0))?;
        let b = ring.create(Did::from(100))?;
        ring.join(a, None)?;
        ring.join(b, Some(a))?;
        ring.leave(b)?;

        assert_eq!(ring.find_successor(b, Did::from(5)), Err(Error::NodeNotFound(b)));
        assert_eq!(ring.stabilize(b), Err(Error::NodeNotFound(b)));

        // The survivor is solitary again.
        assert_eq!(ring.node(a)?.successor(), a);
        assert_eq!(ring.node(a)?.predecessor(), None);
        Ok(())
    }

    #[test]
    fn test_leave_solitary_is_noop() -> Result<()> {
        let mut ring = Ring::new();
        let a = ring.create(Did::from(7))?;
        ring.join(a, None)?;
        ring.leave(a)?;
        ring.leave(a)?;
        assert!(ring.contains(a));
        Ok(())
    }

    #[test]
    fn test_route_hop_bound() -> Result<()> {
        let ids = [0u64, 9, 30, 47, 65, 88, 110, 133, 160, 201, 230, 250];
        let ring = gen_stabilized_ring(&ids)?;
        for &origin in &ids {
            for key in 0..8u64 {
                let (_, hops) = ring.route(Did::from(origin), Did::from(key * 31))?;
                assert!(hops <= BIT_LEN + 1, "{} hops from {}", hops, origin);
            }
        }
        Ok(())
    }

    #[test]
    fn test_find_reports_missing_value() -> Result<()> {
        let mut ring = Ring::new();
        let a = ring.create(Did::from(0))?;
        ring.join(a, None)?;
        ring.insert(a, Did::from(5), None)?;

        assert_eq!(ring.find(a, Did::from(5))?, (a, None));
        assert_eq!(ring.find(a, Did::from(6))?, (a, None));
        ring.insert(a, Did::from(5), Some(9))?;
        assert_eq!(ring.find(a, Did::from(5))?, (a, Some(9)));
        ring.remove(a, Did::from(5))?;
        assert_eq!(ring.find(a, Did::from(5))?, (a, None));
        Ok(())
    }
}
