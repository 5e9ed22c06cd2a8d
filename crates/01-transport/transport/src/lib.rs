#![cfg_attr(
    all(target_arch = "wasm32", not(feature = "loom")),
    feature(stdarch_wasm_atomic_wait)
)]
//! Shared-memory transport primitives for the rayframe runtime.
//!
//! * [`SharedRegion`]: zeroed, word-addressed memory (mmap or heap backed).
//! * [`RingBuffer`]: single-producer/single-consumer word ring whose batches
//!   become visible atomically on [`RingProducer::commit`].
//! * [`TypedWriter`] / [`TypedReader`]: uint/int/float/bytes/string values
//!   layered over the ring.
//! * [`StatusWord`]: one shared word with park/notify, used for request flags.

mod error;
mod region;
mod ring;
mod status;
mod sync;
mod typed;
pub mod wait;

pub use error::{TransportError, TransportResult};
pub use region::{SharedRegion, WORD_BYTES};
pub use ring::{
    Batch, RingBuffer, RingConsumer, RingProducer, MAX_CAPACITY_WORDS,
    MIN_CAPACITY_WORDS,
};
pub use status::{StatusWord, STATUS_IDLE};
pub use typed::{TypedReader, TypedWriter, Value};
