//! Convenient types and traits for driver code.
pub use crate::consts::BIT_LEN;
pub use crate::consts::FINGER_TABLE_SIZE;
pub use crate::consts::RING_SIZE;
pub use crate::dht::Chord;
pub use crate::dht::ChordStorage;
pub use crate::dht::Did;
pub use crate::dht::FingerTable;
pub use crate::dht::Node;
pub use crate::dht::Ring;
pub use crate::dht::SortRing;
pub use crate::dht::SuccessorWalk;
pub use crate::error::Error;
pub use crate::error::Result;
pub use crate::inspect::NodeInspect;
pub use crate::inspect::RingInspect;
