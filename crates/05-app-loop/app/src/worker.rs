//! Producer thread body.
//!
//! The worker owns the producer ends of a session. While no program runs it
//! polls the event ring every `idle_poll` and feeds events to the lifecycle;
//! once `Running` is entered it loads the program and hands it a [`Runtime`],
//! which takes over event draining frame by frame.

use crate::lifecycle::{Lifecycle, Phase};
use crate::pacing::{FramePacer, Pacing};
use crate::program::ProgramLoader;
use crate::runtime::Runtime;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use fsm::TableError;
use runtime_native::{BridgeRequester, FrameSender, ProducerChannels};
use service_abi::{LogLevel, WindowUpdate};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use transport::RingConsumer;
use transport_codecs::{Codec, CodecError, EventCodec};

pub const DEFAULT_TARGET_FPS: u32 = 60;
pub const DEFAULT_IDLE_POLL: Duration = Duration::from_millis(16);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerConfig {
    pub pacing: Pacing,
    pub target_fps: u32,
    pub idle_poll: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pacing: Pacing::default(),
            target_fps: DEFAULT_TARGET_FPS,
            idle_poll: DEFAULT_IDLE_POLL,
        }
    }
}

/// Out-of-band notices from the producer to the control side.
#[derive(Clone, Debug, PartialEq)]
pub enum WorkerMessage {
    Transition(Phase),
    TraceLog { level: LogLevel, text: String },
    UpdateWindow(WindowUpdate),
    /// A frame was committed; carries the running publish count.
    FramePublished(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerControl {
    Destroy,
}

pub struct ProducerWorker {
    pub(crate) lifecycle: Lifecycle,
    pub(crate) events: RingConsumer,
    pub(crate) loader: BridgeRequester,
    pub(crate) frames: FrameSender,
    pub(crate) pacer: Box<dyn FramePacer>,
    pub(crate) outbox: Sender<WorkerMessage>,
    pub(crate) config: WorkerConfig,
    pub(crate) destroyed: bool,
    pub(crate) frames_closed: bool,
    programs: Arc<dyn ProgramLoader>,
    control: Receiver<WorkerControl>,
}

impl ProducerWorker {
    pub fn new(
        channels: ProducerChannels,
        programs: Arc<dyn ProgramLoader>,
        outbox: Sender<WorkerMessage>,
        control: Receiver<WorkerControl>,
        config: WorkerConfig,
    ) -> Result<Self, TableError<Phase>> {
        let ProducerChannels {
            events,
            inputs_ready,
            loader,
            frames,
        } = channels;
        let mut lifecycle = Lifecycle::new()?;
        let transitions = outbox.clone();
        lifecycle.subscribe(move |phase| {
            let _ = transitions.send(WorkerMessage::Transition(phase));
        });
        Ok(Self {
            lifecycle,
            events,
            loader,
            frames,
            pacer: config.pacing.pacer(inputs_ready),
            outbox,
            config,
            destroyed: false,
            frames_closed: false,
            programs,
            control,
        })
    }

    pub fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }

    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("rayframe-producer".into())
            .spawn(move || self.run())
    }

    /// Runs until a `Destroy` arrives or the control side disconnects.
    pub fn run(mut self) {
        log::debug!("producer worker up ({} pacing)", self.pacer.pacing());
        while !self.destroyed {
            if let Some(path) = self.lifecycle.take_launch() {
                self.run_program(&path);
                self.lifecycle.exited();
                continue;
            }
            match self.control.recv_timeout(self.config.idle_poll) {
                Ok(WorkerControl::Destroy) | Err(RecvTimeoutError::Disconnected) => {
                    self.destroyed = true;
                }
                Err(RecvTimeoutError::Timeout) => self.poll_events(),
            }
        }
        self.lifecycle.destroy();
        if !self.frames_closed {
            if let Err(err) = self.frames.close() {
                log::debug!("frame stream already closed: {err}");
            }
        }
        log::debug!("producer worker down");
    }

    fn run_program(&mut self, path: &str) {
        let mut program = match self.programs.load(path) {
            Ok(program) => program,
            Err(err) => {
                self.report(LogLevel::Error, format!("failed to load `{path}`: {err:#}"));
                return;
            }
        };
        let outcome = {
            let mut rt = Runtime::new(self);
            program.main(&mut rt)
        };
        if let Err(err) = outcome {
            self.report(LogLevel::Error, format!("`{path}` failed: {err:#}"));
        }
    }

    fn poll_events(&mut self) {
        if let Err(err) = drain_events(&mut self.events, &mut self.lifecycle) {
            self.report(LogLevel::Error, format!("dropping malformed input: {err}"));
        }
    }

    /// Checks for a destroy request without blocking.
    pub(crate) fn poll_control(&mut self) {
        match self.control.try_recv() {
            Ok(WorkerControl::Destroy) | Err(TryRecvError::Disconnected) => self.destroyed = true,
            Err(TryRecvError::Empty) => {}
        }
    }

    pub(crate) fn report(&self, level: LogLevel, text: String) {
        log::debug!("{level}: {text}");
        let _ = self.outbox.send(WorkerMessage::TraceLog { level, text });
    }
}

impl std::fmt::Debug for ProducerWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProducerWorker")
            .field("lifecycle", &self.lifecycle)
            .field("pacer", &self.pacer)
            .field("config", &self.config)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

/// Feeds every committed event batch to the lifecycle.
///
/// A batch that fails to decode is skipped whole and the error returned;
/// later batches stay queued for the next call. A clobbered ring is reported
/// the same way.
pub(crate) fn drain_events(
    events: &mut RingConsumer,
    lifecycle: &mut Lifecycle,
) -> Result<usize, CodecError> {
    let mut drained = 0;
    while let Some(mut batch) = events.read()? {
        let decoded = EventCodec.decode_batch(&mut batch);
        drop(batch);
        for event in decoded? {
            lifecycle.send(event);
            drained += 1;
        }
    }
    Ok(drained)
}
