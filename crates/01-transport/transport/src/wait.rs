//! Park/notify shims for the ring frontier and status words.
//!
//! Native targets park through the `atomic-wait` crate (futex-backed where the
//! OS offers one). WebAssembly workers park on linear-memory atomics. Under
//! loom the wait degrades to a cooperative yield so models stay deterministic.

use crate::sync::{AtomicU32, Ordering};

/// Outcome of parking on a word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitResult {
    /// The caller parked and was woken (possibly spuriously).
    Woken,
    /// The word no longer held the expected value.
    Changed,
    /// The wait gave up before a wakeup arrived.
    TimedOut,
}

#[cfg(feature = "loom")]
mod imp {
    use super::{AtomicU32, Ordering, WaitResult};

    pub(crate) fn wait_u32(word: &AtomicU32, expected: u32) -> WaitResult {
        if word.load(Ordering::Acquire) != expected {
            return WaitResult::Changed;
        }
        loom::thread::yield_now();
        WaitResult::Woken
    }

    pub(crate) fn wake_all(word: &AtomicU32) {
        let _ = word;
    }
}

#[cfg(all(not(feature = "loom"), target_arch = "wasm32"))]
mod imp {
    use super::{AtomicU32, WaitResult};
    use core::arch::wasm32::{memory_atomic_notify, memory_atomic_wait32};

    pub(crate) fn wait_u32(word: &AtomicU32, expected: u32) -> WaitResult {
        // SAFETY: the word lives in the shared linear memory backing the ring.
        let code =
            unsafe { memory_atomic_wait32(word as *const _ as *mut i32, expected as i32, -1_i64) };
        match code {
            0 => WaitResult::Woken,
            2 => WaitResult::TimedOut,
            _ => WaitResult::Changed,
        }
    }

    pub(crate) fn wake_all(word: &AtomicU32) {
        // SAFETY: same shared linear memory as the waiters.
        unsafe {
            memory_atomic_notify(word as *const _ as *mut i32, u32::MAX);
        }
    }
}

#[cfg(all(not(feature = "loom"), not(target_arch = "wasm32")))]
mod imp {
    use super::{AtomicU32, Ordering, WaitResult};

    pub(crate) fn wait_u32(word: &AtomicU32, expected: u32) -> WaitResult {
        if word.load(Ordering::Acquire) != expected {
            return WaitResult::Changed;
        }
        atomic_wait::wait(word, expected);
        WaitResult::Woken
    }

    pub(crate) fn wake_all(word: &AtomicU32) {
        atomic_wait::wake_all(word as *const AtomicU32);
    }
}

/// Parks the caller while `word` still holds `expected`.
///
/// Returns early without parking when the value already differs. Callers must
/// re-check their condition afterwards; wakeups may be spurious.
#[inline]
pub fn wait_u32(word: &AtomicU32, expected: u32) -> WaitResult {
    imp::wait_u32(word, expected)
}

/// Wakes every thread parked on `word`.
#[inline]
pub fn wake_all(word: &AtomicU32) {
    imp::wake_all(word)
}

/// Blocks until `word` stops holding `value`, returning the new value.
pub fn wait_while_eq(word: &AtomicU32, value: u32) -> u32 {
    loop {
        let current = word.load(Ordering::Acquire);
        if current != value {
            return current;
        }
        wait_u32(word, value);
    }
}
