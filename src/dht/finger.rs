//! Finger table of the Chord ring.
#![warn(missing_docs)]

use derivative::Derivative;
use serde::Deserialize;
use serde::Serialize;

use crate::consts::FINGER_TABLE_SIZE;
use crate::dht::Did;

/// Per-node routing shortcuts. Slot `i` (1..=BIT_LEN) points at the first
/// node clockwise at or after `start(i) = owner + 2^(i-1)`, so following
/// the highest useful slot jumps at least half of the remaining distance.
#[derive(Derivative, Clone, Debug, Serialize, Deserialize)]
#[derivative(PartialEq)]
pub struct FingerTable {
    did: Did,
    size: usize,
    finger: Vec<Option<Did>>,
    #[derivative(PartialEq = "ignore")]
    fix_index: usize,
}

impl FingerTable {
    /// builder
    pub fn new(did: Did) -> Self {
        Self {
            did,
            size: FINGER_TABLE_SIZE,
            finger: vec![None; FINGER_TABLE_SIZE],
            fix_index: 1,
        }
    }

    /// Start of the span covered by slot `index`.
    pub fn start(&self, index: usize) -> Did {
        self.did.finger_start(index)
    }

    /// getter; out-of-range indices read as vacant
    pub fn get(&self, index: usize) -> Option<Did> {
        if index < 1 || index > self.size {
            return None;
        }
        self.finger[index - 1]
    }

    /// setter; out-of-range indices are ignored
    pub fn set(&mut self, index: usize, did: Did) {
        if index < 1 || index > self.size {
            tracing::warn!("set finger index out of range, index: {}", index);
            return;
        }
        self.finger[index - 1] = Some(did);
    }

    /// Slot that the next incremental refresh targets; advances the
    /// cursor, wrapping BIT_LEN -> 1.
    pub(crate) fn next_fix_slot(&mut self) -> usize {
        let index = self.fix_index;
        self.fix_index = if index >= self.size { 1 } else { index + 1 };
        index
    }

    /// Closest finger strictly between the owner and `key`, scanning from
    /// the highest slot down. Owner did when no finger qualifies.
    pub fn closest_predecessor(&self, key: Did) -> Did {
        for i in (1..=self.size).rev() {
            if let Some(f) = self.get(i) {
                if f != self.did && f.in_open(self.did, key) {
                    return f;
                }
            }
        }
        self.did
    }

    /// Rewrite every slot holding `old` to `new`. When `old` departs, its
    /// successor inherits exactly the spans `old` used to own.
    pub fn replace(&mut self, old: Did, new: Did) {
        for slot in self.finger.iter_mut() {
            if *slot == Some(old) {
                *slot = Some(new);
            }
        }
    }

    /// Whether any slot names `did`.
    pub fn contains(&self, did: Did) -> bool {
        self.finger.contains(&Some(did))
    }

    /// Occupied slot count (vacant slots excluded).
    pub fn len(&self) -> usize {
        self.finger.iter().flatten().count()
    }

    /// is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All slots in order, slot 1 first.
    pub fn list(&self) -> &[Option<Did>] {
        &self.finger
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_clamped() {
        let mut table = FingerTable::new(Did::from(0));
        assert_eq!(table.len(), 0);
        assert!(table.get(0).is_none());
        assert!(table.get(FINGER_TABLE_SIZE + 1).is_none());

        table.set(1, Did::from(30));
        table.set(8, Did::from(160));
        assert_eq!(table.get(1), Some(Did::from(30)));
        assert_eq!(table.get(8), Some(Did::from(160)));
        assert_eq!(table.len(), 2);

        // Out of range writes are dropped, not resized in.
        table.set(0, Did::from(99));
        table.set(9, Did::from(99));
        assert_eq!(table.len(), 2);
        assert!(!table.contains(Did::from(99)));
    }

    #[test]
    fn test_start() {
        let table = FingerTable::new(Did::from(230));
        assert_eq!(table.start(1), Did::from(231));
        assert_eq!(table.start(6), Did::from(6));
    }

    #[test]
    fn test_closest_predecessor() {
        let mut table = FingerTable::new(Did::from(0));
        for i in 1..=5 {
            table.set(i, Did::from(30));
        }
        table.set(6, Did::from(65));
        table.set(7, Did::from(65));
        table.set(8, Did::from(160));

        assert_eq!(table.closest_predecessor(Did::from(100)), Did::from(65));
        assert_eq!(table.closest_predecessor(Did::from(200)), Did::from(160));
        assert_eq!(table.closest_predecessor(Did::from(40)), Did::from(30));
        // Nothing strictly inside (0, 20): fall back to the owner.
        assert_eq!(table.closest_predecessor(Did::from(20)), Did::from(0));
    }

    #[test]
    fn test_replace() {
        let mut table = FingerTable::new(Did::from(0));
        table.set(1, Did::from(30));
        table.set(2, Did::from(30));
        table.set(3, Did::from(65));
        table.replace(Did::from(30), Did::from(65));
        assert_eq!(table.get(1), Some(Did::from(65)));
        assert_eq!(table.get(2), Some(Did::from(65)));
        assert_eq!(table.get(3), Some(Did::from(65)));
        assert!(!table.contains(Did::from(30)));
    }

    #[test]
    fn test_fix_cursor_wraps() {
        let mut table = FingerTable::new(Did::from(0));
        let slots: Vec<usize> = (0..FINGER_TABLE_SIZE + 2)
            .map(|_| table.next_fix_slot())
            .collect();
        assert_eq!(slots[0], 1);
        assert_eq!(slots[FINGER_TABLE_SIZE - 1], FINGER_TABLE_SIZE);
        assert_eq!(slots[FINGER_TABLE_SIZE], 1);
    }

    #[test]
    fn test_eq_ignores_cursor() {
        let mut a = FingerTable::new(Did::from(0));
        let mut b = FingerTable::new(Did::from(0));
        a.set(1, Did::from(30));
        b.set(1, Did::from(30));
        a.next_fix_slot();
        assert_eq!(a, b);
    }
}
