//! Channel bundle for one producer session.

use crate::bridge::{sync_bridge, BridgeRequester, BridgeResponder};
use crate::frames::{frame_stream, FrameReceiver, FrameSender};
use std::sync::Arc;
use transport::{RingBuffer, RingConsumer, RingProducer, StatusWord, TransportResult};

/// Byte sizes of the three rings a session allocates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelSizes {
    pub events_bytes: usize,
    pub loader_bytes: usize,
    pub frames_bytes: usize,
}

impl Default for ChannelSizes {
    fn default() -> Self {
        Self {
            events_bytes: 10 * 1024,
            loader_bytes: 640 * 1024,
            frames_bytes: 256 * 1024,
        }
    }
}

/// Ends owned by the producer thread.
#[derive(Debug)]
pub struct ProducerChannels {
    pub events: RingConsumer,
    pub inputs_ready: Arc<StatusWord>,
    pub loader: BridgeRequester,
    pub frames: FrameSender,
}

/// Ends owned by the control side.
///
/// `frames` is handed on to whichever thread presents.
#[derive(Debug)]
pub struct ControlChannels {
    pub events: RingProducer,
    pub inputs_ready: Arc<StatusWord>,
    pub loader: BridgeResponder,
    pub frames: FrameReceiver,
}

/// Allocates every ring a session needs and splits them by owner.
pub fn session_channels(sizes: ChannelSizes) -> TransportResult<(ProducerChannels, ControlChannels)> {
    let (events_tx, events_rx) = RingBuffer::with_capacity_bytes(sizes.events_bytes)?;
    let (requester, responder) = sync_bridge(sizes.loader_bytes)?;
    let (frame_tx, frame_rx) = frame_stream(sizes.frames_bytes)?;
    let inputs_ready = Arc::new(StatusWord::new());
    log::debug!("session channels allocated: {sizes:?}");
    Ok((
        ProducerChannels {
            events: events_rx,
            inputs_ready: inputs_ready.clone(),
            loader: requester,
            frames: frame_tx,
        },
        ControlChannels {
            events: events_tx,
            inputs_ready,
            loader: responder,
            frames: frame_rx,
        },
    ))
}
