//! Fenced render stream from the producer to whichever thread presents.
//!
//! One frame is in flight at most: the sender waits on the receiver's
//! presented counter before publishing the next frame, so the frame ring is
//! never lapped no matter how fast the producer runs.

use crate::error::FrameError;
use service_abi::RenderCommand;
use std::sync::Arc;
use transport::{RingBuffer, RingConsumer, RingProducer, StatusWord, TransportResult};
use transport_codecs::{Codec, CodecError, RenderCodec, RenderMessage};

/// Counter value stored by a receiver that has gone away.
const FENCE_CLOSED: u32 = u32::MAX;

/// Creates a frame stream whose ring spans `capacity_bytes`.
pub fn frame_stream(capacity_bytes: usize) -> TransportResult<(FrameSender, FrameReceiver)> {
    let (producer, consumer) = RingBuffer::with_capacity_bytes(capacity_bytes)?;
    let presented = Arc::new(StatusWord::new());
    Ok((
        FrameSender {
            ring: producer,
            presented: presented.clone(),
            published: 0,
        },
        FrameReceiver {
            ring: consumer,
            presented,
        },
    ))
}

/// Producer end.
#[derive(Debug)]
pub struct FrameSender {
    ring: RingProducer,
    presented: Arc<StatusWord>,
    published: u32,
}

impl FrameSender {
    /// Frames published so far.
    pub fn published(&self) -> u32 {
        self.published
    }

    /// Waits for the previous frame to be presented, then publishes `commands`.
    ///
    /// A frame too large for the ring is dropped with an error; nothing of it
    /// becomes visible.
    pub fn send(&mut self, commands: Vec<RenderCommand>) -> Result<(), FrameError> {
        self.publish(&RenderMessage::Frame(commands))
    }

    /// Publishes the end-of-stream marker.
    pub fn close(&mut self) -> Result<(), FrameError> {
        self.publish(&RenderMessage::Close)
    }

    fn publish(&mut self, message: &RenderMessage) -> Result<(), FrameError> {
        self.wait_presented()?;
        if let Err(err) = RenderCodec.encode(message, &mut self.ring) {
            let dropped = self.ring.discard_pending();
            log::warn!("dropping frame of {dropped} words: {err}");
            return Err(err.into());
        }
        self.ring.commit();
        self.published = self.published.wrapping_add(1);
        Ok(())
    }

    fn wait_presented(&self) -> Result<(), FrameError> {
        loop {
            let presented = self.presented.load();
            if presented == FENCE_CLOSED {
                return Err(FrameError::ReceiverClosed);
            }
            if presented == self.published {
                return Ok(());
            }
            self.presented.wait_while(presented);
        }
    }
}

/// Presenting end.
#[derive(Debug)]
pub struct FrameReceiver {
    ring: RingConsumer,
    presented: Arc<StatusWord>,
}

impl FrameReceiver {
    /// Whether a frame (or the close marker) is waiting.
    pub fn has_pending(&self) -> bool {
        self.ring.has_batch()
    }

    /// Presents the next frame if one is waiting.
    ///
    /// Returns `Some(true)` after presenting, `Some(false)` on the close marker
    /// and `None` when nothing is waiting.
    pub fn try_present(
        &mut self,
        present: impl FnOnce(&[RenderCommand]),
    ) -> Result<Option<bool>, CodecError> {
        let message = match self.ring.read()? {
            Some(mut batch) => RenderCodec.decode(&mut batch),
            None => return Ok(None),
        };
        self.finish(message, present).map(Some)
    }

    /// Parks until the next frame arrives and presents it.
    ///
    /// Returns `false` once the close marker is received.
    pub fn present_next(
        &mut self,
        present: impl FnOnce(&[RenderCommand]),
    ) -> Result<bool, CodecError> {
        let message = {
            let mut batch = self.ring.wait_and_read()?;
            RenderCodec.decode(&mut batch)
        };
        self.finish(message, present)
    }

    /// An undecodable frame still counts as consumed so the sender's fence
    /// keeps moving.
    fn finish(
        &mut self,
        message: Result<RenderMessage, CodecError>,
        present: impl FnOnce(&[RenderCommand]),
    ) -> Result<bool, CodecError> {
        match message {
            Ok(RenderMessage::Frame(commands)) => {
                present(&commands);
                self.presented.bump();
                Ok(true)
            }
            Ok(RenderMessage::Close) => Ok(false),
            Err(err) => {
                self.presented.bump();
                Err(err)
            }
        }
    }
}

impl Drop for FrameReceiver {
    fn drop(&mut self) {
        self.presented.signal(FENCE_CLOSED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use service_abi::Color;
    use std::thread;

    fn frame(n: u32) -> Vec<RenderCommand> {
        vec![
            RenderCommand::Clear {
                color: Color::from_word(n),
            },
            RenderCommand::FillRect {
                x: n as f32,
                y: 0.0,
                width: 4.0,
                height: 4.0,
            },
        ]
    }

    #[test]
    fn frames_arrive_in_order_and_close() {
        let (mut sender, mut receiver) = frame_stream(1024).unwrap();
        let renderer = thread::spawn(move || {
            let mut seen = Vec::new();
            while receiver
                .present_next(|commands| seen.push(commands.to_vec()))
                .unwrap()
            {}
            seen
        });
        for n in 0..50 {
            sender.send(frame(n)).unwrap();
        }
        sender.close().unwrap();
        let seen = renderer.join().unwrap();
        assert_eq!(seen.len(), 50);
        assert_eq!(seen[49], frame(49));
    }

    #[test]
    fn try_present_is_non_blocking() {
        let (mut sender, mut receiver) = frame_stream(1024).unwrap();
        assert_eq!(receiver.try_present(|_| {}).unwrap(), None);
        sender.send(frame(1)).unwrap();
        let mut presented = None;
        assert_eq!(
            receiver
                .try_present(|commands| presented = Some(commands.len()))
                .unwrap(),
            Some(true)
        );
        assert_eq!(presented, Some(2));
        sender.send(frame(2)).unwrap();
        assert_eq!(sender.published(), 2);
    }

    #[test]
    fn sender_fails_once_receiver_is_gone() {
        let (mut sender, receiver) = frame_stream(1024).unwrap();
        sender.send(frame(1)).unwrap();
        drop(receiver);
        assert!(matches!(
            sender.send(frame(2)),
            Err(FrameError::ReceiverClosed)
        ));
    }

    #[test]
    fn oversize_frames_are_dropped_whole() {
        let (mut sender, mut receiver) = frame_stream(64).unwrap();
        let huge = (0..64).flat_map(frame).collect();
        assert!(matches!(sender.send(huge), Err(FrameError::Codec(_))));
        sender.send(frame(7)).unwrap();
        let mut seen = Vec::new();
        receiver
            .try_present(|commands| seen.extend_from_slice(commands))
            .unwrap();
        assert_eq!(seen, frame(7));
    }
}
