//! chord-ring: an in-memory simulation of the Chord DHT core.
//! --------------
//! - [Chord](crate::dht::Chord) is the membership and routing protocol over
//!   a finite identifier ring of 2^[BIT_LEN](crate::consts::BIT_LEN) slots.
//! - [ChordStorage](crate::dht::ChordStorage) layers key-value placement on
//!   top: every key lives on its successor, the first node clockwise at or
//!   after it.
//! - [Ring](crate::dht::Ring) is the arena owning every simulated node;
//!   members reference each other by [Did](crate::dht::Did), so the cyclic
//!   successor/predecessor/finger graph carries no ownership.
//!
//! # Membership
//! A node is [create](crate::dht::Ring::create)d solitary, then
//! [join](crate::dht::Chord::join)s through any existing member: the join
//! resolves its successor, wires both neighbors, and takes over the keys in
//! its new span. [leave](crate::dht::Chord::leave) is the inverse: keys and
//! span go back to the successor. Between membership changes, the caller
//! drives the paper's periodic tasks directly:
//! [stabilize_network](crate::dht::Ring::stabilize_network) and
//! [fix_all_fingers](crate::dht::Ring::fix_all_fingers) run rounds over the
//! whole ring until a full pass changes nothing.
//!
//! # Routing
//! [find_successor](crate::dht::Chord::find_successor) walks toward the key
//! through finger shortcuts, falling back along the successor chain when no
//! shortcut makes progress. The chain is ground truth, so lookups stay
//! correct while finger tables are stale; once they converge, a lookup
//! costs O(log N) hops.
//!
//! The simulation is single-threaded and synchronous: no transport, no
//! persistence, no failure detection beyond voluntary leave.

pub mod consts;
pub mod dht;
pub mod error;
pub mod inspect;
pub mod prelude;
