//! Constant parameters of the identifier ring.

/// Identifier bit width M. The ring covers [0, 2^BIT_LEN).
pub const BIT_LEN: usize = 8;
/// Number of slots on the identifier ring.
pub const RING_SIZE: u64 = 1 << BIT_LEN;
/// Routing slots per finger table, one per identifier bit.
pub const FINGER_TABLE_SIZE: usize = BIT_LEN;
