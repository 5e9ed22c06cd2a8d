//! Producer side of a rayframe session.
//!
//! A [`ProducerWorker`] owns the producer ends of the session channels, runs
//! the [`Lifecycle`] machine, and drives a [`Program`] through the
//! [`Runtime`] API once `Start` arrives.

pub mod input;
pub mod lifecycle;
pub mod pacing;
mod program;
mod runtime;
pub mod worker;

pub use input::InputState;
pub use lifecycle::{lifecycle_table, Input, InputKind, Lifecycle, LifecycleContext, Phase};
pub use pacing::{FramePacer, FreeRunning, Lockstep, Pacing};
pub use program::{Program, ProgramLoader};
pub use runtime::Runtime;
pub use worker::{
    ProducerWorker, WorkerConfig, WorkerControl, WorkerMessage, DEFAULT_IDLE_POLL,
    DEFAULT_TARGET_FPS,
};
