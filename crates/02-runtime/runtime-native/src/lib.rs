//! Native channel plumbing between the control side and a producer thread.
//!
//! Everything here is built from transport rings plus status words:
//! * [`sync_bridge`]: blocking resource requests answered from another thread.
//! * [`frame_stream`]: render frames with a one-in-flight fence.
//! * [`session_channels`]: the full set of ends for one session.

mod bridge;
mod error;
mod frames;
mod session;

pub use bridge::{sync_bridge, BridgeRequester, BridgeResponder, ResourceRequest, Ticket};
pub use error::{BridgeError, FrameError};
pub use frames::{frame_stream, FrameReceiver, FrameSender};
pub use session::{session_channels, ChannelSizes, ControlChannels, ProducerChannels};
