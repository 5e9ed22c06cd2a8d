//! Headless host pieces for driving a rayframe session without a window:
//! a [`RecordingPlatform`], a few demo [`app::Program`]s and a
//! [`StaticLoader`] that serves them by path.

mod loader;
mod platform;
mod programs;

pub use loader::StaticLoader;
pub use platform::{Recording, RecordingPlatform, RETAINED_FRAMES};
pub use programs::{BouncingBall, InputEcho, ResourceProbe};
