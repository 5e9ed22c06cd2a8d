use crate::error::HubError;
use app::{Pacing, WorkerConfig, DEFAULT_TARGET_FPS};
use runtime_native::ChannelSizes;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which thread presents frames to the platform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererPlacement {
    /// The dispatcher presents each frame when it learns it was published.
    #[default]
    Dispatcher,
    /// A separate thread parks on the frame ring and presents as frames land.
    Dedicated,
}

/// Per-session settings passed to [`Coordinator::init`](crate::Coordinator::init).
///
/// Every field has a default, so `{}` is a valid JSON config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub pacing: Pacing,
    pub renderer: RendererPlacement,
    pub event_ring_bytes: usize,
    pub loader_ring_bytes: usize,
    pub frame_ring_bytes: usize,
    pub target_fps: u32,
    pub idle_poll_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let sizes = ChannelSizes::default();
        Self {
            pacing: Pacing::default(),
            renderer: RendererPlacement::default(),
            event_ring_bytes: sizes.events_bytes,
            loader_ring_bytes: sizes.loader_bytes,
            frame_ring_bytes: sizes.frames_bytes,
            target_fps: DEFAULT_TARGET_FPS,
            idle_poll_ms: 16,
        }
    }
}

impl SessionConfig {
    pub fn channel_sizes(&self) -> ChannelSizes {
        ChannelSizes {
            events_bytes: self.event_ring_bytes,
            loader_bytes: self.loader_ring_bytes,
            frames_bytes: self.frame_ring_bytes,
        }
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            pacing: self.pacing,
            target_fps: self.target_fps,
            idle_poll: self.idle_poll(),
        }
    }

    /// Rejects values no session can run with. Ring sizes are checked when
    /// the rings are allocated.
    pub fn validate(&self) -> Result<(), HubError> {
        if self.target_fps == 0 {
            return Err(HubError::InvalidConfig("target_fps must be positive".into()));
        }
        if self.idle_poll_ms == 0 {
            return Err(HubError::InvalidConfig("idle_poll_ms must be positive".into()));
        }
        Ok(())
    }
}
