//! Single-producer/single-consumer word ring with batched commits.
//!
//! The ring is a circular array of `N` 32-bit words with no separate header.
//! Each side keeps its cursors locally; the only shared state is the words
//! themselves. A committed batch is published by storing the index of the new
//! frontier into the slot where the previous batch ended, so the consumer
//! learns the batch extent from one acquire load:
//!
//! ```text
//!  read_cursor                                     frontier
//!      │                                               │
//!      ▼                                               ▼
//!  ┌───────┬───────┬─────────┬─────────┬───────┬─────────────┐
//!  │ = F   │ word  │ len = 6 │ b0..b3  │ b4 b5 │ = F (self)  │
//!  └───────┴───────┴─────────┴─────────┴───────┴─────────────┘
//! ```
//!
//! A slot that holds its own index is a frontier with nothing after it yet.
//!
//! After each batch the consumer stores the slot it is parked on into a
//! progress word next to the ring. The producer checks it before staging, so
//! a push that would overwrite unread words fails with
//! [`TransportError::RingFull`] instead of lapping the consumer.

use crate::region::{SharedRegion, WORD_BYTES};
use crate::sync::{Arc, AtomicU32, Ordering};
use crate::wait;
use crate::{TransportError, TransportResult};

/// Smallest ring that can carry one value and its commit sentinel.
pub const MIN_CAPACITY_WORDS: usize = 4;

/// Largest ring whose byte length still fits a length word.
pub const MAX_CAPACITY_WORDS: usize = u32::MAX as usize / WORD_BYTES;

/// Bytes reserved around a blob: its length word plus two frontier slots.
const BLOB_OVERHEAD_BYTES: usize = 3 * WORD_BYTES;

/// Shared word storage for one ring.
///
/// Obtain the two endpoints through [`RingBuffer::with_capacity_words`] or
/// [`RingBuffer::with_capacity_bytes`]; the buffer itself is never handled
/// directly. Neither endpoint is `Clone`.
#[derive(Debug)]
pub struct RingBuffer {
    region: SharedRegion,
    /// Slot the consumer is parked on, as of its last finished batch.
    consumed: AtomicU32,
}

impl RingBuffer {
    /// Allocates a ring of `capacity_words` zeroed words.
    pub fn with_capacity_words(
        capacity_words: usize,
    ) -> TransportResult<(RingProducer, RingConsumer)> {
        if !(MIN_CAPACITY_WORDS..=MAX_CAPACITY_WORDS).contains(&capacity_words) {
            return Err(TransportError::InvalidCapacity {
                requested: capacity_words,
                minimum: MIN_CAPACITY_WORDS,
            });
        }
        let ring = Arc::new(RingBuffer {
            region: SharedRegion::zeroed_words(capacity_words)?,
            consumed: AtomicU32::new(0),
        });
        log::debug!("allocated ring of {capacity_words} words");
        let producer = RingProducer {
            ring: ring.clone(),
            write_cursor: 0,
            last_committed: 0,
        };
        let consumer = RingConsumer {
            ring,
            read_cursor: 0,
        };
        Ok((producer, consumer))
    }

    /// Allocates a ring spanning `capacity_bytes`, rounded down to whole words.
    pub fn with_capacity_bytes(
        capacity_bytes: usize,
    ) -> TransportResult<(RingProducer, RingConsumer)> {
        Self::with_capacity_words(capacity_bytes / WORD_BYTES)
    }

    /// Number of words in the ring.
    pub fn capacity_words(&self) -> usize {
        self.region.len_words()
    }

    /// Largest blob a ring of this size accepts.
    pub fn max_blob_bytes(&self) -> usize {
        self.region.len_bytes() - BLOB_OVERHEAD_BYTES
    }

    fn slot(&self, index: u32) -> &AtomicU32 {
        &self.region.words()[index as usize]
    }

    fn next_index(&self, index: u32) -> u32 {
        ((index as usize + 1) % self.capacity_words()) as u32
    }

    /// Steps `to - from` around the ring.
    fn distance(&self, from: u32, to: u32) -> usize {
        let n = self.capacity_words();
        (to as usize + n - from as usize) % n
    }
}

/// Write endpoint. Values are staged until [`RingProducer::commit`].
#[derive(Debug)]
pub struct RingProducer {
    ring: Arc<RingBuffer>,
    write_cursor: u32,
    last_committed: u32,
}

impl RingProducer {
    pub fn capacity_words(&self) -> usize {
        self.ring.capacity_words()
    }

    pub fn max_blob_bytes(&self) -> usize {
        self.ring.max_blob_bytes()
    }

    /// Slot of the most recently staged word.
    pub fn write_cursor(&self) -> u32 {
        self.write_cursor
    }

    /// Frontier slot of the last committed batch.
    pub fn last_committed(&self) -> u32 {
        self.last_committed
    }

    /// Words staged since the last commit.
    pub fn pending_words(&self) -> usize {
        self.ring.distance(self.last_committed, self.write_cursor)
    }

    /// Committed words the consumer has not finished reading.
    pub fn unread_words(&self) -> usize {
        let consumed = self.ring.consumed.load(Ordering::Acquire);
        self.ring.distance(consumed, self.last_committed)
    }

    pub fn has_pending(&self) -> bool {
        self.write_cursor != self.last_committed
    }

    /// Stages one word.
    pub fn push_word(&mut self, word: u32) -> TransportResult<()> {
        self.ensure_room(1)?;
        self.store_next(word);
        Ok(())
    }

    /// Stages a length-prefixed byte blob, zero padded to whole words.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> TransportResult<()> {
        let max = self.max_blob_bytes();
        if bytes.len() > max {
            return Err(TransportError::BlobTooLarge {
                len: bytes.len(),
                max,
            });
        }
        self.ensure_room(1 + bytes.len().div_ceil(WORD_BYTES))?;
        self.store_next(bytes.len() as u32);
        for chunk in bytes.chunks(WORD_BYTES) {
            let mut word = [0u8; WORD_BYTES];
            word[..chunk.len()].copy_from_slice(chunk);
            self.store_next(u32::from_le_bytes(word));
        }
        Ok(())
    }

    /// Publishes everything staged since the previous commit as one batch.
    ///
    /// Returns `false` (and touches nothing) when nothing was staged. Wakes any
    /// consumer parked on the previous frontier.
    pub fn commit(&mut self) -> bool {
        if !self.has_pending() {
            return false;
        }
        let frontier = self.ring.next_index(self.write_cursor);
        self.ring.slot(frontier).store(frontier, Ordering::Relaxed);
        let published = self.ring.slot(self.last_committed);
        published.store(frontier, Ordering::Release);
        wait::wake_all(published);
        log::trace!(
            "committed batch {}..{} ({} words)",
            self.last_committed,
            frontier,
            self.pending_words()
        );
        self.write_cursor = frontier;
        self.last_committed = frontier;
        true
    }

    /// Drops everything staged since the last commit.
    ///
    /// Staged words were never published, so the consumer cannot have seen
    /// them. Used to abandon a batch whose encoding failed half way.
    pub fn discard_pending(&mut self) -> usize {
        let dropped = self.pending_words();
        self.write_cursor = self.last_committed;
        dropped
    }

    fn ensure_room(&self, words: usize) -> TransportResult<()> {
        let pending = self.pending_words();
        let capacity = self.capacity_words();
        // Two slots stay free: the published frontier and the new sentinel.
        if pending + words + 2 > capacity {
            return Err(TransportError::BatchOverflow {
                pending,
                requested: words,
                capacity,
            });
        }
        let unread = self.unread_words();
        if unread + pending + words + 2 > capacity {
            return Err(TransportError::RingFull {
                unread,
                requested: pending + words,
                capacity,
            });
        }
        Ok(())
    }

    fn store_next(&mut self, word: u32) {
        self.write_cursor = self.ring.next_index(self.write_cursor);
        self.ring
            .slot(self.write_cursor)
            .store(word, Ordering::Relaxed);
    }
}

/// Read endpoint.
#[derive(Debug)]
pub struct RingConsumer {
    ring: Arc<RingBuffer>,
    read_cursor: u32,
}

impl RingConsumer {
    pub fn capacity_words(&self) -> usize {
        self.ring.capacity_words()
    }

    /// Frontier slot the consumer is parked on.
    pub fn read_cursor(&self) -> u32 {
        self.read_cursor
    }

    /// Whether a committed batch is waiting.
    pub fn has_batch(&self) -> bool {
        matches!(self.published_frontier(), Ok(Some(_)))
    }

    /// Opens the next committed batch, if any, without blocking.
    ///
    /// A frontier slot holding an out-of-range index means the ring's memory
    /// was clobbered; it is reported as [`TransportError::CorruptFrontier`].
    pub fn read(&mut self) -> TransportResult<Option<Batch<'_>>> {
        match self.published_frontier()? {
            Some(frontier) => Ok(Some(Batch::new(self, frontier))),
            None => Ok(None),
        }
    }

    /// Parks until a batch is committed, then opens it.
    pub fn wait_and_read(&mut self) -> TransportResult<Batch<'_>> {
        let frontier = loop {
            if let Some(frontier) = self.published_frontier()? {
                break frontier;
            }
            wait::wait_u32(self.ring.slot(self.read_cursor), self.read_cursor);
        };
        Ok(Batch::new(self, frontier))
    }

    fn published_frontier(&self) -> TransportResult<Option<u32>> {
        let published = self
            .ring
            .slot(self.read_cursor)
            .load(Ordering::Acquire);
        if published == self.read_cursor {
            return Ok(None);
        }
        if published as usize >= self.capacity_words() {
            return Err(TransportError::CorruptFrontier {
                slot: self.read_cursor,
                value: published,
            });
        }
        Ok(Some(published))
    }

    fn step(&mut self) -> u32 {
        self.read_cursor = self.ring.next_index(self.read_cursor);
        self.read_cursor
    }
}

/// One committed batch, read front to back.
///
/// Dropping the batch moves the consumer to the frontier, so unread values
/// are discarded rather than seen twice.
#[derive(Debug)]
pub struct Batch<'a> {
    consumer: &'a mut RingConsumer,
    frontier: u32,
    exhausted: bool,
}

impl<'a> Batch<'a> {
    fn new(consumer: &'a mut RingConsumer, frontier: u32) -> Self {
        Self {
            consumer,
            frontier,
            exhausted: false,
        }
    }

    /// Slot that ends this batch.
    pub fn frontier(&self) -> u32 {
        self.frontier
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Next word, or `None` once the frontier is reached.
    pub fn next_word(&mut self) -> Option<u32> {
        if self.exhausted {
            return None;
        }
        let cursor = self.consumer.step();
        if cursor == self.frontier {
            self.exhausted = true;
            return None;
        }
        Some(self.consumer.ring.slot(cursor).load(Ordering::Relaxed))
    }

    /// Next length-prefixed blob.
    pub fn next_blob(&mut self) -> TransportResult<Vec<u8>> {
        let len = self.next_word().ok_or(TransportError::BatchExhausted)? as usize;
        let needed = len.div_ceil(WORD_BYTES);
        let available = self
            .consumer
            .ring
            .distance(self.consumer.read_cursor, self.frontier)
            - 1;
        if needed > available {
            self.skip_to_frontier();
            return Err(TransportError::Truncated { needed, available });
        }
        let mut bytes = Vec::with_capacity(needed * WORD_BYTES);
        for _ in 0..needed {
            let cursor = self.consumer.step();
            let word = self.consumer.ring.slot(cursor).load(Ordering::Relaxed);
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes.truncate(len);
        Ok(bytes)
    }

    fn skip_to_frontier(&mut self) {
        self.consumer.read_cursor = self.frontier;
        self.exhausted = true;
    }

    /// Hands every slot up to the frontier back to the producer.
    fn release(&mut self) {
        self.skip_to_frontier();
        self.consumer
            .ring
            .consumed
            .store(self.frontier, Ordering::Release);
    }
}

impl Iterator for Batch<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        self.next_word()
    }
}

impl Drop for Batch<'_> {
    fn drop(&mut self) {
        self.release();
    }
}
