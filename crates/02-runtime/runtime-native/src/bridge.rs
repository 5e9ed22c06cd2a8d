//! Synchronous resource bridge.
//!
//! Lets the producer thread call out to work done elsewhere (a host fetch)
//! as if it were a plain blocking call:
//!
//! 1. [`BridgeRequester::issue`] flips the shared status word to pending and
//!    posts a [`ResourceRequest`] on the side channel.
//! 2. [`BridgeRequester::complete`] parks in `wait_and_read` on the reply ring.
//! 3. The responder thread performs the work and calls
//!    [`BridgeResponder::respond`], which encodes the reply, marks the status
//!    word answered and commits; the commit wakes the requester.
//! 4. The requester reads the reply and returns the status word to idle.
//!
//! Exactly one request may be in flight per bridge. Every answered request
//! gets a reply on the ring, even when the payload itself cannot be carried.

use crate::error::BridgeError;
use crossbeam_channel::{Receiver, Sender};
use service_abi::ResourceLoad;
use std::sync::Arc;
use transport::{
    RingBuffer, RingConsumer, RingProducer, StatusWord, TransportResult, STATUS_IDLE, WORD_BYTES,
};
use transport_codecs::{Codec, ResourceReplyCodec};

/// Status value while a request is outstanding.
const STATUS_PENDING: u32 = 1;
/// Reply committed, not yet read by the requester.
const STATUS_ANSWERED: u32 = 2;

/// Side-channel message naming the resource to load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceRequest {
    pub name: String,
}

/// Proof that a request was issued; redeem it with [`BridgeRequester::complete`].
#[derive(Debug)]
#[must_use = "an issued request must be completed before another can be issued"]
pub struct Ticket {
    name: String,
}

impl Ticket {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Creates a bridge whose reply ring spans `capacity_bytes`.
pub fn sync_bridge(capacity_bytes: usize) -> TransportResult<(BridgeRequester, BridgeResponder)> {
    let (reply_tx, reply_rx) = RingBuffer::with_capacity_bytes(capacity_bytes)?;
    let (request_tx, request_rx) = crossbeam_channel::unbounded();
    let status = Arc::new(StatusWord::new());
    Ok((
        BridgeRequester {
            replies: reply_rx,
            requests: request_tx,
            status: status.clone(),
            outstanding: None,
        },
        BridgeResponder {
            replies: reply_tx,
            requests: request_rx,
            status,
        },
    ))
}

/// Blocking side, owned by the producer thread.
#[derive(Debug)]
pub struct BridgeRequester {
    replies: RingConsumer,
    requests: Sender<ResourceRequest>,
    status: Arc<StatusWord>,
    outstanding: Option<String>,
}

impl BridgeRequester {
    /// Posts a request for `name`. Fails if one is already outstanding.
    pub fn issue(&mut self, name: &str) -> Result<Ticket, BridgeError> {
        if let Some(pending) = &self.outstanding {
            return Err(BridgeError::RequestOutstanding {
                pending: pending.clone(),
            });
        }
        self.status
            .transition(STATUS_IDLE, STATUS_PENDING)
            .map_err(|_| BridgeError::RequestOutstanding {
                pending: name.to_owned(),
            })?;
        let request = ResourceRequest {
            name: name.to_owned(),
        };
        if self.requests.send(request).is_err() {
            self.status.signal(STATUS_IDLE);
            return Err(BridgeError::Disconnected);
        }
        log::debug!("resource request issued for {name}");
        self.outstanding = Some(name.to_owned());
        Ok(Ticket {
            name: name.to_owned(),
        })
    }

    /// Parks until the reply for `ticket` is committed and decodes it.
    pub fn complete(&mut self, ticket: Ticket) -> Result<ResourceLoad, BridgeError> {
        let reply = match self.replies.wait_and_read() {
            Ok(mut batch) => ResourceReplyCodec.decode(&mut batch),
            Err(err) => Err(err.into()),
        };
        self.outstanding = None;
        self.status.signal(STATUS_IDLE);
        let reply = reply?;
        log::debug!(
            "resource request for {} completed (loaded: {})",
            ticket.name,
            reply.is_loaded()
        );
        Ok(reply)
    }

    /// Issues a request and blocks for its reply.
    pub fn load(&mut self, name: &str) -> Result<ResourceLoad, BridgeError> {
        let ticket = self.issue(name)?;
        self.complete(ticket)
    }

    pub fn is_outstanding(&self) -> bool {
        self.outstanding.is_some()
    }
}

/// Answering side, owned by whichever thread can perform the work.
#[derive(Debug)]
pub struct BridgeResponder {
    replies: RingProducer,
    requests: Receiver<ResourceRequest>,
    status: Arc<StatusWord>,
}

impl BridgeResponder {
    /// Incoming requests, for use with `crossbeam_channel::select!`.
    pub fn requests(&self) -> &Receiver<ResourceRequest> {
        &self.requests
    }

    /// Largest payload that fits in one reply, next to its status word.
    pub fn max_payload_bytes(&self) -> usize {
        self.replies.max_blob_bytes() - WORD_BYTES
    }

    /// Commits `reply` for `request`, waking the requester.
    ///
    /// Payloads too large for the reply ring are answered as failures, with
    /// the reason clipped to what the ring can carry.
    pub fn respond(
        &mut self,
        request: &ResourceRequest,
        reply: ResourceLoad,
    ) -> Result<(), BridgeError> {
        if !self.is_pending() {
            return Err(BridgeError::NoPendingRequest);
        }

        let reply = match reply {
            ResourceLoad::Loaded(bytes) if bytes.len() > self.max_payload_bytes() => {
                log::warn!(
                    "resource {} is {} bytes, over the {} byte bridge limit",
                    request.name,
                    bytes.len(),
                    self.max_payload_bytes()
                );
                ResourceLoad::Failed(clip(
                    format!(
                        "resource `{}` is {} bytes; the bridge carries at most {}",
                        request.name,
                        bytes.len(),
                        self.max_payload_bytes()
                    ),
                    self.max_payload_bytes(),
                ))
            }
            reply => reply,
        };

        if let Err(err) = ResourceReplyCodec.encode(&reply, &mut self.replies) {
            self.replies.discard_pending();
            log::warn!("reply for {} not encodable: {err}", request.name);
            let reason = clip(
                format!("reply for `{}` not encodable: {err}", request.name),
                self.max_payload_bytes(),
            );
            // Status stays pending on failure so dropping the responder still
            // releases the requester.
            ResourceReplyCodec.encode(&ResourceLoad::Failed(reason), &mut self.replies)?;
        }
        if self.status.transition(STATUS_PENDING, STATUS_ANSWERED).is_err() {
            self.replies.discard_pending();
            return Err(BridgeError::NoPendingRequest);
        }
        self.replies.commit();
        Ok(())
    }

    /// Whether the requester is waiting on a reply.
    pub fn is_pending(&self) -> bool {
        self.status.load() == STATUS_PENDING
    }
}

/// Cuts `reason` to at most `max` bytes on a char boundary.
fn clip(mut reason: String, max: usize) -> String {
    if reason.len() > max {
        let mut end = max;
        while !reason.is_char_boundary(end) {
            end -= 1;
        }
        reason.truncate(end);
    }
    reason
}

impl Drop for BridgeResponder {
    fn drop(&mut self) {
        // Never leave a requester parked forever.
        if self.is_pending() {
            let request = ResourceRequest {
                name: String::from("<unanswered>"),
            };
            let _ = self.respond(&request, ResourceLoad::Failed("resource bridge closed".into()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn blocked_load_returns_only_after_commit() {
        let (mut requester, mut responder) = sync_bridge(1024).unwrap();
        let delay = Duration::from_millis(50);

        let host = thread::spawn(move || {
            let request = responder.requests().recv().expect("request");
            thread::sleep(delay);
            responder
                .respond(&request, ResourceLoad::Loaded(b"glyphs".to_vec()))
                .unwrap();
            request
        });

        let started = Instant::now();
        let reply = requester.load("fonts/mono.fnt").unwrap();
        assert!(started.elapsed() >= delay);
        assert_eq!(reply, ResourceLoad::Loaded(b"glyphs".to_vec()));
        assert_eq!(host.join().unwrap().name, "fonts/mono.fnt");
        assert!(!requester.is_outstanding());
    }

    #[test]
    fn second_request_while_outstanding_is_rejected() {
        let (mut requester, _responder) = sync_bridge(1024).unwrap();
        let _ticket = requester.issue("a.png").unwrap();
        match requester.issue("b.png") {
            Err(BridgeError::RequestOutstanding { pending }) => assert_eq!(pending, "a.png"),
            other => panic!("expected RequestOutstanding, got {other:?}"),
        }
    }

    #[test]
    fn respond_without_request_is_an_error() {
        let (_requester, mut responder) = sync_bridge(1024).unwrap();
        let request = ResourceRequest {
            name: "x".into(),
        };
        assert!(matches!(
            responder.respond(&request, ResourceLoad::Loaded(vec![])),
            Err(BridgeError::NoPendingRequest)
        ));
    }

    #[test]
    fn oversize_payloads_are_answered_as_failures() {
        let (mut requester, mut responder) = sync_bridge(64).unwrap();
        let ticket = requester.issue("huge.bin").unwrap();
        let request = responder.requests().try_recv().unwrap();
        responder
            .respond(&request, ResourceLoad::Loaded(vec![0; 1000]))
            .unwrap();
        match requester.complete(ticket).unwrap() {
            ResourceLoad::Failed(reason) => assert!(reason.contains("huge.bin")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn long_names_still_get_a_failure_reply() {
        let (mut requester, mut responder) = sync_bridge(64).unwrap();
        let name = "a".repeat(80);
        let host = thread::spawn(move || {
            let request = responder.requests().recv().expect("request");
            let answered = responder.respond(&request, ResourceLoad::Loaded(vec![0; 1000]));
            (answered.is_ok(), responder.max_payload_bytes())
        });
        let reply = requester.load(&name).unwrap();
        let (answered, max) = host.join().unwrap();
        assert!(answered);
        match reply {
            ResourceLoad::Failed(reason) => assert!(!reason.is_empty() && reason.len() <= max),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(!requester.is_outstanding());
    }

    #[test]
    fn long_failure_reasons_are_clipped() {
        let (mut requester, mut responder) = sync_bridge(64).unwrap();
        let ticket = requester.issue("missing.png").unwrap();
        let request = responder.requests().try_recv().unwrap();
        responder
            .respond(&request, ResourceLoad::Failed("x".repeat(500)))
            .unwrap();
        match requester.complete(ticket).unwrap() {
            ResourceLoad::Failed(reason) => {
                assert!(reason.starts_with("reply for `missing.png`"), "{reason}");
                assert!(reason.len() <= responder.max_payload_bytes());
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(requester.issue("next.png").is_ok());
    }

    #[test]
    fn largest_payload_is_delivered() {
        let (mut requester, mut responder) = sync_bridge(64).unwrap();
        let ticket = requester.issue("exact.bin").unwrap();
        let request = responder.requests().try_recv().unwrap();
        let body = vec![7; responder.max_payload_bytes()];
        responder
            .respond(&request, ResourceLoad::Loaded(body.clone()))
            .unwrap();
        assert_eq!(requester.complete(ticket).unwrap(), ResourceLoad::Loaded(body));
    }

    #[test]
    fn clipping_respects_char_boundaries() {
        assert_eq!(clip("héllo".into(), 2), "h");
        assert_eq!(clip("short".into(), 64), "short");
    }

    #[test]
    fn requests_can_follow_each_other() {
        let (mut requester, mut responder) = sync_bridge(256).unwrap();
        let host = thread::spawn(move || {
            for request in responder.requests().clone().iter().take(3) {
                let body = request.name.as_bytes().to_vec();
                responder.respond(&request, ResourceLoad::Loaded(body)).unwrap();
            }
        });
        for name in ["one", "two", "three"] {
            assert_eq!(
                requester.load(name).unwrap(),
                ResourceLoad::Loaded(name.as_bytes().to_vec())
            );
        }
        host.join().unwrap();
    }

    #[test]
    fn dropped_responder_releases_a_pending_request() {
        let (mut requester, responder) = sync_bridge(256).unwrap();
        let ticket = requester.issue("late.png").unwrap();
        drop(responder);
        assert!(matches!(
            requester.complete(ticket).unwrap(),
            ResourceLoad::Failed(_)
        ));
    }

    #[test]
    fn closed_side_channel_is_reported() {
        let (mut requester, responder) = sync_bridge(256).unwrap();
        drop(responder);
        assert!(matches!(
            requester.issue("gone.png"),
            Err(BridgeError::Disconnected)
        ));
        assert!(!requester.is_outstanding());
    }
}
