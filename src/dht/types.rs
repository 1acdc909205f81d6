//! Protocol traits of the ring.
#![warn(missing_docs)]

use crate::dht::Did;
use crate::error::Result;

/// Chord is a distributed hash table algorithm built on consistent
/// hashing: nodes form a ring over a fixed identifier space and every
/// identifier is owned by its successor, the first node clockwise at or
/// after it. Each member tracks one successor, one predecessor, and
/// logarithmically many finger shortcuts, which is enough to resolve any
/// key in O(log N) hops once the ring has settled.
///
/// This trait is the membership and routing surface of the simulation.
/// Every method acts on behalf of one node, named by its [Did]; the
/// receiver is the arena that owns all of them, so operations that in a
/// deployed network would be remote calls are direct method calls here.
/// The mutating protocol steps report whether they changed any state,
/// which is what the ring-wide batch drivers use to detect quiescence.
pub trait Chord {
    /// Add `did` to the ring through the member `known`, or found a new
    /// ring when `known` is none. Wires both neighbors and takes over the
    /// keys that now fall in `(predecessor, did]`.
    fn join(&mut self, did: Did, known: Option<Did>) -> Result<()>;

    /// Remove `did` from the ring, handing its keys and its span to its
    /// successor. No-op for a solitary node.
    fn leave(&mut self, did: Did) -> Result<()>;

    /// Resolve the node responsible for `key`, routing from `origin`.
    fn find_successor(&self, origin: Did, key: Did) -> Result<Did>;

    /// Tell `did` that `candidate` believes it is `did`'s predecessor.
    /// Issued by every stabilization round on behalf of the predecessor;
    /// a driver may also call it directly.
    fn notify(&mut self, did: Did, candidate: Did) -> Result<bool>;

    /// One stabilization round on `did`: adopt a closer successor if one
    /// slid in between, repair the successor's predecessor link, then
    /// notify the successor. Periodic in a deployed network; here the
    /// caller sequences the rounds itself.
    fn stabilize(&mut self, did: Did) -> Result<bool>;

    /// Refresh one finger slot of `did` and advance the slot cursor, so
    /// repeated calls cycle through the whole table one entry at a time.
    fn fix_fingers(&mut self, did: Did) -> Result<bool>;
}

/// Key-value operations layered over [Chord] routing: every key is stored
/// on its successor, so each operation is a lookup followed by a local
/// map access on the responsible node.
pub trait ChordStorage: Chord {
    /// Store `key` on its responsible node, routing from `origin`.
    /// `None` records a key inserted without a value. Returns the
    /// responsible node.
    fn insert(&mut self, origin: Did, key: Did, value: Option<i64>) -> Result<Did>;

    /// Drop `key` from its responsible node. No-op if absent.
    fn remove(&mut self, origin: Did, key: Did) -> Result<()>;

    /// Resolve `key` to its responsible node and stored value, if any.
    fn find(&self, origin: Did, key: Did) -> Result<(Did, Option<i64>)>;
}
