//! In-process implementation of the Chord DHT ring.
//!
//! Based on CHORD, ref: <https://pdos.csail.mit.edu/papers/ton:chord/paper-ton.pdf>
//! With high probability, the number of nodes that must be contacted to
//! find a successor in an N-node ring is O(log N).
pub mod did;
pub use did::Did;
pub use did::SortRing;
/// Finger table for ring routing.
pub mod finger;
pub use finger::FingerTable;
mod types;
pub use types::Chord;
pub use types::ChordStorage;
mod chord;
pub use chord::Node;
pub use chord::Ring;
mod stabilization;
pub use stabilization::SuccessorWalk;
