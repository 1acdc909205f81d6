//! Error of chord-ring.

use crate::dht::Did;

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors collections in chord-ring.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error("node {0} is not a member of the ring")]
    NodeNotFound(Did),

    #[error("node {0} already exists in the ring")]
    DuplicateNode(Did),
}
