//! Control-side thread answering the producer.

use crate::coordinator::Observed;
use app::{Phase, WorkerMessage};
use crossbeam_channel::{never, select, Receiver};
use parking_lot::Mutex;
use runtime_native::{BridgeResponder, FrameReceiver, ResourceRequest};
use service_abi::Platform;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Serves worker messages and resource requests until the producer is gone.
pub(crate) struct Dispatcher {
    pub(crate) platform: Arc<dyn Platform>,
    pub(crate) observed: Arc<Mutex<Observed>>,
    pub(crate) outbox: Receiver<WorkerMessage>,
    pub(crate) loader: BridgeResponder,
    /// Present only when frames are presented from this thread.
    pub(crate) frames: Option<FrameReceiver>,
}

impl Dispatcher {
    pub(crate) fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("rayframe-dispatcher".into())
            .spawn(move || self.run())
    }

    fn run(mut self) {
        let outbox = self.outbox.clone();
        let mut requests = self.loader.requests().clone();
        loop {
            select! {
                recv(outbox) -> message => match message {
                    Ok(message) => self.handle(message),
                    Err(_) => break,
                },
                recv(requests) -> request => match request {
                    Ok(request) => self.load(&request),
                    Err(_) => requests = never(),
                },
            }
        }
        tracing::debug!("dispatcher exiting");
    }

    fn handle(&mut self, message: WorkerMessage) {
        match message {
            WorkerMessage::Transition(phase) => {
                tracing::debug!(%phase, "producer transition");
                let mut observed = self.observed.lock();
                observed.phase = phase;
                if phase == Phase::Started {
                    observed.start_pending = false;
                }
                observed.subscribers.notify(phase);
            }
            WorkerMessage::TraceLog { level, text } => self.platform.trace_log(level, &text),
            WorkerMessage::UpdateWindow(update) => self.platform.update_window(&update),
            WorkerMessage::FramePublished(count) => {
                let Some(frames) = self.frames.as_mut() else {
                    return;
                };
                let platform = &self.platform;
                match frames.try_present(|commands| platform.present_frame(commands)) {
                    Ok(Some(_)) => {}
                    Ok(None) => tracing::warn!(count, "frame announced but not visible"),
                    Err(err) => tracing::error!("failed to decode frame {count}: {err}"),
                }
            }
        }
    }

    fn load(&mut self, request: &ResourceRequest) {
        tracing::debug!(name = %request.name, "loading resource");
        let reply = self.platform.load_resource_bytes(&request.name);
        if let Err(err) = self.loader.respond(request, reply) {
            tracing::error!("failed to answer resource request {}: {err}", request.name);
        }
    }
}

/// Presents frames as they land until the stream closes.
pub(crate) fn spawn_renderer(
    platform: Arc<dyn Platform>,
    mut frames: FrameReceiver,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("rayframe-renderer".into())
        .spawn(move || loop {
            match frames.present_next(|commands| platform.present_frame(commands)) {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => {
                    tracing::error!("renderer stopping on undecodable frame: {err}");
                    break;
                }
            }
        })
}
