//! Error surface for the word ring and its typed channel.
//!
//! Producers see capacity problems synchronously at push time; consumers see
//! decoding problems when a batch runs out before the caller's expected shape.

use thiserror::Error;

/// Convenience result alias for fallible transport operations.
pub type TransportResult<T, E = TransportError> = Result<T, E>;

/// Errors surfaced by ring allocation, pushes, and typed reads.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Requested ring is too small to hold a value plus its commit sentinel.
    #[error("ring capacity of {requested} words is below the minimum of {minimum}")]
    InvalidCapacity { requested: usize, minimum: usize },

    /// Allocation of a shared region failed for the given size/alignment pair.
    #[error("failed to allocate shared region of {size} bytes aligned to {alignment}")]
    AllocationFailed { size: usize, alignment: usize },

    /// A byte blob can never fit, even into an empty ring.
    #[error("blob of {len} bytes exceeds the ring's usable capacity of {max} bytes")]
    BlobTooLarge { len: usize, max: usize },

    /// The uncommitted batch would wrap onto its own frontier slot.
    #[error(
        "{requested} more words on top of {pending} uncommitted words overrun a {capacity}-word ring"
    )]
    BatchOverflow {
        pending: usize,
        requested: usize,
        capacity: usize,
    },

    /// Committed words the consumer has not read yet leave no room for the push.
    #[error("{requested} staged words on top of {unread} unread words would lap a {capacity}-word ring")]
    RingFull {
        unread: usize,
        requested: usize,
        capacity: usize,
    },

    /// A frontier slot points outside the ring.
    #[error("corrupt frontier {value} at slot {slot}")]
    CorruptFrontier { slot: u32, value: u32 },

    /// The consumer asked for a value after the batch frontier.
    #[error("batch exhausted before the expected value")]
    BatchExhausted,

    /// A blob's declared length runs past the batch frontier.
    #[error("blob of {needed} words truncated at the batch frontier ({available} available)")]
    Truncated { needed: usize, available: usize },

    /// A string payload was not valid UTF-8.
    #[error("invalid utf-8 string payload: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}
