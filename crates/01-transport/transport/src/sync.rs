//! Atomic re-exports so loom models can swap in their checked types.

#[cfg(feature = "loom")]
pub(crate) use loom::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};
#[cfg(not(feature = "loom"))]
pub(crate) use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};
