//! Control side of a session.

use crate::config::{RendererPlacement, SessionConfig};
use crate::dispatcher::{spawn_renderer, Dispatcher};
use crate::error::HubError;
use app::{Pacing, Phase, ProducerWorker, ProgramLoader, WorkerControl};
use crossbeam_channel::Sender;
use fsm::{StateFuture, Subscribers, SubscriptionId};
use parking_lot::Mutex;
use runtime_native::{session_channels, ControlChannels};
use service_abi::{Event, Platform};
use std::sync::Arc;
use std::thread::JoinHandle;
use transport::{RingProducer, StatusWord};
use transport_codecs::{Codec, EventCodec};

/// Value stored in the inputs-ready word when a frame's inputs are committed.
const INPUTS_READY: u32 = 1;

/// Last producer phase seen on the control side, plus its observers.
#[derive(Debug)]
pub(crate) struct Observed {
    pub(crate) phase: Phase,
    /// A `Start` was sent and the producer has not reported `Started` yet.
    pub(crate) start_pending: bool,
    pub(crate) subscribers: Subscribers<Phase>,
}

struct Session {
    pacing: Pacing,
    events: RingProducer,
    inputs_ready: Arc<StatusWord>,
    control: Sender<WorkerControl>,
    producer: JoinHandle<()>,
    dispatcher: JoinHandle<()>,
    renderer: Option<JoinHandle<()>>,
}

/// Owns at most one producer session and the threads serving it.
///
/// Phase observers run on the dispatcher thread while it holds the
/// coordinator's observer lock; they must not call back into the coordinator.
pub struct Coordinator {
    platform: Arc<dyn Platform>,
    programs: Arc<dyn ProgramLoader>,
    observed: Arc<Mutex<Observed>>,
    session: Option<Session>,
}

impl Coordinator {
    pub fn new(platform: Arc<dyn Platform>, programs: Arc<dyn ProgramLoader>) -> Self {
        Self {
            platform,
            programs,
            observed: Arc::new(Mutex::new(Observed {
                phase: Phase::Stopped,
                start_pending: false,
                subscribers: Subscribers::new(),
            })),
            session: None,
        }
    }

    /// Creates the session rings and spawns the producer, dispatcher and,
    /// for [`RendererPlacement::Dedicated`], renderer threads.
    ///
    /// A previous session that is back in `Stopped` is torn down first; one
    /// that is not yields [`HubError::SessionActive`], and one whose start
    /// request is still in flight yields [`HubError::StartPending`].
    pub fn init(&mut self, config: SessionConfig) -> Result<(), HubError> {
        if self.session.is_some() {
            let (phase, start_pending) = {
                let observed = self.observed.lock();
                (observed.phase, observed.start_pending)
            };
            if phase != Phase::Stopped {
                return Err(HubError::SessionActive { phase });
            }
            if start_pending {
                return Err(HubError::StartPending);
            }
            self.teardown();
        }
        config.validate()?;

        let (producer_ends, control_ends) = session_channels(config.channel_sizes())?;
        let ControlChannels {
            events,
            inputs_ready,
            loader,
            frames,
        } = control_ends;
        let (outbox_tx, outbox_rx) = crossbeam_channel::unbounded();
        let (control_tx, control_rx) = crossbeam_channel::unbounded();
        let worker = ProducerWorker::new(
            producer_ends,
            self.programs.clone(),
            outbox_tx,
            control_rx,
            config.worker_config(),
        )?;
        {
            let mut observed = self.observed.lock();
            observed.phase = worker.phase();
            observed.start_pending = false;
        }

        let (renderer, dispatcher_frames) = match config.renderer {
            RendererPlacement::Dedicated => {
                let renderer = spawn_renderer(self.platform.clone(), frames).map_err(|source| {
                    HubError::Spawn {
                        thread: "renderer",
                        source,
                    }
                })?;
                (Some(renderer), None)
            }
            RendererPlacement::Dispatcher => (None, Some(frames)),
        };
        let dispatcher = Dispatcher {
            platform: self.platform.clone(),
            observed: self.observed.clone(),
            outbox: outbox_rx,
            loader,
            frames: dispatcher_frames,
        }
        .spawn()
        .map_err(|source| HubError::Spawn {
            thread: "dispatcher",
            source,
        })?;
        let producer = worker.spawn().map_err(|source| HubError::Spawn {
            thread: "producer",
            source,
        })?;

        tracing::info!(
            pacing = %config.pacing,
            renderer = ?config.renderer,
            target_fps = config.target_fps,
            "session initialised"
        );
        self.session = Some(Session {
            pacing: config.pacing,
            events,
            inputs_ready,
            control: control_tx,
            producer,
            dispatcher,
            renderer,
        });
        Ok(())
    }

    /// Encodes `event` into the current input batch.
    ///
    /// Nothing is visible to the producer until [`Coordinator::commit_inputs`].
    /// If the event does not fit, the whole uncommitted batch is dropped.
    pub fn send(&mut self, event: &Event) -> Result<(), HubError> {
        let session = self.live_session()?;
        if let Err(err) = EventCodec.encode(event, &mut session.events) {
            let dropped = session.events.discard_pending();
            tracing::warn!(dropped, "input batch dropped: {err}");
            return Err(err.into());
        }
        Ok(())
    }

    /// Publishes the input batch. Under lockstep pacing this also releases the
    /// producer's next frame, even when the batch is empty.
    pub fn commit_inputs(&mut self) -> Result<bool, HubError> {
        let session = self.live_session()?;
        let published = session.events.commit();
        if session.pacing == Pacing::Locking {
            session.inputs_ready.signal(INPUTS_READY);
        }
        Ok(published)
    }

    /// Sends `Start` and resolves once the producer reports `Started`.
    pub fn start(&mut self, path: &str) -> Result<StateFuture<Phase>, HubError> {
        if self.session.is_none() {
            return Err(HubError::NoSession);
        }
        let started = {
            let mut observed = self.observed.lock();
            // Any other phase ignores `Start`.
            if observed.phase == Phase::Stopped {
                observed.start_pending = true;
            }
            observed.subscribers.until(Phase::Started)
        };
        let sent = self
            .send(&Event::Start {
                path: path.to_owned(),
            })
            .and_then(|()| self.commit_inputs());
        if let Err(err) = sent {
            // Nothing was committed, so the producer never sees this start.
            self.observed.lock().start_pending = false;
            return Err(err);
        }
        Ok(started)
    }

    /// Sends `Stop` and resolves once the producer is back in `Stopped`.
    ///
    /// An idle session with no start in flight resolves immediately.
    pub fn stop(&mut self) -> Result<StateFuture<Phase>, HubError> {
        if self.session.is_none() {
            return Err(HubError::NoSession);
        }
        let stopped = {
            let mut observed = self.observed.lock();
            if observed.phase == Phase::Stopped && !observed.start_pending {
                return Ok(StateFuture::ready(Phase::Stopped));
            }
            observed.subscribers.until(Phase::Stopped)
        };
        self.send(&Event::Stop)?;
        self.commit_inputs()?;
        Ok(stopped)
    }

    pub fn subscribe(&self, listener: impl FnMut(Phase) + Send + 'static) -> SubscriptionId {
        self.observed.lock().subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observed.lock().subscribers.unsubscribe(id)
    }

    /// Last phase reported by the producer.
    pub fn state(&self) -> Phase {
        self.observed.lock().phase
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Stops every session thread and drops all observers.
    ///
    /// A program still running is asked to close at its next frame; pending
    /// start/stop futures resolve as destroyed.
    pub fn destroy(&mut self) {
        self.teardown();
        let mut observed = self.observed.lock();
        observed.subscribers.clear();
        observed.phase = Phase::Stopped;
        observed.start_pending = false;
    }

    fn live_session(&mut self) -> Result<&mut Session, HubError> {
        let session = self.session.as_mut().ok_or(HubError::NoSession)?;
        if session.producer.is_finished() {
            return Err(HubError::ChannelClosed);
        }
        Ok(session)
    }

    fn teardown(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let Session {
            inputs_ready,
            control,
            producer,
            dispatcher,
            renderer,
            ..
        } = session;
        if control.send(WorkerControl::Destroy).is_err() {
            tracing::debug!("producer already gone");
        }
        inputs_ready.signal(INPUTS_READY);

        let producer_ok = join("producer", producer);
        join("dispatcher", dispatcher);
        match renderer {
            Some(renderer) if producer_ok => {
                join("renderer", renderer);
            }
            // Without a clean producer exit the render stream is never closed.
            Some(_) => tracing::warn!("detaching renderer after producer failure"),
            None => {}
        }
        tracing::info!("session torn down");
    }
}

fn join(name: &str, handle: JoinHandle<()>) -> bool {
    match handle.join() {
        Ok(()) => true,
        Err(_) => {
            tracing::error!("{name} thread panicked");
            false
        }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("state", &self.state())
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}
