//! A single shared word used for signalling between two threads.
//!
//! Zero means idle. The synchronous bridge uses it as its request flag and
//! lockstep pacing uses it as a "new input" flag.

use crate::sync::{AtomicU32, Ordering};
use crate::wait;

/// Value of an idle status word.
pub const STATUS_IDLE: u32 = 0;

#[derive(Debug)]
pub struct StatusWord {
    word: AtomicU32,
}

impl Default for StatusWord {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusWord {
    pub fn new() -> Self {
        Self {
            word: AtomicU32::new(STATUS_IDLE),
        }
    }

    pub fn load(&self) -> u32 {
        self.word.load(Ordering::Acquire)
    }

    pub fn is_idle(&self) -> bool {
        self.load() == STATUS_IDLE
    }

    /// Stores `value` and wakes every waiter.
    pub fn signal(&self, value: u32) {
        self.word.store(value, Ordering::Release);
        wait::wake_all(&self.word);
    }

    /// Atomically moves `current` to `new`, waking waiters on success.
    pub fn transition(&self, current: u32, new: u32) -> Result<(), u32> {
        self.word
            .compare_exchange(current, new, Ordering::AcqRel, Ordering::Acquire)?;
        wait::wake_all(&self.word);
        Ok(())
    }

    /// Resets to idle, returning the previous value.
    pub fn take(&self) -> u32 {
        self.word.swap(STATUS_IDLE, Ordering::AcqRel)
    }

    /// Adds one, wakes waiters, and returns the new value.
    pub fn bump(&self) -> u32 {
        let next = self.word.fetch_add(1, Ordering::AcqRel).wrapping_add(1);
        wait::wake_all(&self.word);
        next
    }

    /// Parks while the word holds `value`; returns the value that ended the wait.
    pub fn wait_while(&self, value: u32) -> u32 {
        wait::wait_while_eq(&self.word, value)
    }
}
