//! Frame pacing strategies for the producer loop.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use transport::{StatusWord, STATUS_IDLE};

/// How the producer decides when the next frame may start.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pacing {
    /// Drain whatever input is available, then sleep out the frame budget.
    #[default]
    Blocking,
    /// Park until the control side signals that the frame's inputs are ready.
    Locking,
}

impl Pacing {
    pub fn pacer(self, inputs_ready: Arc<StatusWord>) -> Box<dyn FramePacer> {
        match self {
            Pacing::Blocking => Box::new(FreeRunning::new()),
            Pacing::Locking => Box::new(Lockstep::new(inputs_ready)),
        }
    }
}

impl fmt::Display for Pacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Pacing::Blocking => "blocking",
            Pacing::Locking => "locking",
        })
    }
}

/// Gate run at the top of every frame.
///
/// `drain` pulls pending input into the program's view; each strategy picks
/// where in its wait that happens.
pub trait FramePacer: Send + fmt::Debug {
    fn pace(&mut self, budget: Duration, drain: &mut dyn FnMut());

    fn pacing(&self) -> Pacing;
}

/// Never waits on the control side.
#[derive(Debug, Default)]
pub struct FreeRunning {
    last_frame: Option<Instant>,
}

impl FreeRunning {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FramePacer for FreeRunning {
    fn pace(&mut self, budget: Duration, drain: &mut dyn FnMut()) {
        drain();
        if let Some(last) = self.last_frame {
            if let Some(remaining) = budget.checked_sub(last.elapsed()) {
                thread::sleep(remaining);
            }
        }
        self.last_frame = Some(Instant::now());
    }

    fn pacing(&self) -> Pacing {
        Pacing::Blocking
    }
}

/// One frame per "inputs ready" signal.
#[derive(Debug)]
pub struct Lockstep {
    inputs_ready: Arc<StatusWord>,
}

impl Lockstep {
    pub fn new(inputs_ready: Arc<StatusWord>) -> Self {
        Self { inputs_ready }
    }
}

impl FramePacer for Lockstep {
    fn pace(&mut self, _budget: Duration, drain: &mut dyn FnMut()) {
        self.inputs_ready.wait_while(STATUS_IDLE);
        self.inputs_ready.take();
        drain();
    }

    fn pacing(&self) -> Pacing {
        Pacing::Locking
    }
}
