use parking_lot::{Condvar, Mutex};
use service_abi::{LogLevel, Platform, RenderCommand, ResourceLoad, WindowUpdate};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Frames kept in [`Recording::frames`]; older ones are dropped.
pub const RETAINED_FRAMES: usize = 120;

/// Everything a [`RecordingPlatform`] has been asked to do.
#[derive(Clone, Debug, Default)]
pub struct Recording {
    pub logs: Vec<(LogLevel, String)>,
    pub windows: Vec<WindowUpdate>,
    /// The most recent frames, oldest first.
    pub frames: Vec<Vec<RenderCommand>>,
    pub frames_presented: usize,
    /// Resource names in request order.
    pub requests: Vec<String>,
}

impl Recording {
    pub fn has_log(&self, level: LogLevel, text: &str) -> bool {
        self.logs
            .iter()
            .any(|(logged, line)| *logged == level && line.contains(text))
    }
}

/// Headless platform that records calls and serves resources from memory.
#[derive(Debug, Default)]
pub struct RecordingPlatform {
    recording: Mutex<Recording>,
    changed: Condvar,
    resources: Mutex<HashMap<String, Vec<u8>>>,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(self, name: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert_resource(name, bytes);
        self
    }

    pub fn insert_resource(&self, name: &str, bytes: impl Into<Vec<u8>>) {
        self.resources.lock().insert(name.to_owned(), bytes.into());
    }

    pub fn snapshot(&self) -> Recording {
        self.recording.lock().clone()
    }

    pub fn frames_presented(&self) -> usize {
        self.recording.lock().frames_presented
    }

    /// Blocks until `done` accepts the recording or `timeout` passes.
    pub fn wait_until(&self, timeout: Duration, mut done: impl FnMut(&Recording) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut recording = self.recording.lock();
        while !done(&recording) {
            if self.changed.wait_until(&mut recording, deadline).timed_out() {
                return done(&recording);
            }
        }
        true
    }

    fn record(&self, update: impl FnOnce(&mut Recording)) {
        update(&mut self.recording.lock());
        self.changed.notify_all();
    }
}

impl Platform for RecordingPlatform {
    fn trace_log(&self, level: LogLevel, text: &str) {
        log::debug!("{level}: {text}");
        self.record(|recording| recording.logs.push((level, text.to_owned())));
    }

    fn load_resource_bytes(&self, name: &str) -> ResourceLoad {
        self.record(|recording| recording.requests.push(name.to_owned()));
        match self.resources.lock().get(name) {
            Some(bytes) => ResourceLoad::Loaded(bytes.clone()),
            None => ResourceLoad::Failed(format!("`{name}` not found")),
        }
    }

    fn update_window(&self, update: &WindowUpdate) {
        self.record(|recording| recording.windows.push(update.clone()));
    }

    fn present_frame(&self, commands: &[RenderCommand]) {
        self.record(|recording| {
            if recording.frames.len() == RETAINED_FRAMES {
                recording.frames.remove(0);
            }
            recording.frames.push(commands.to_vec());
            recording.frames_presented += 1;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn serves_known_resources_and_records_requests() {
        let platform = RecordingPlatform::new().with_resource("a.png", [1u8, 2]);
        assert_eq!(
            platform.load_resource_bytes("a.png"),
            ResourceLoad::Loaded(vec![1, 2])
        );
        assert!(!platform.load_resource_bytes("b.png").is_loaded());
        assert_eq!(platform.snapshot().requests, vec!["a.png", "b.png"]);
    }

    #[test]
    fn keeps_only_recent_frames() {
        let platform = RecordingPlatform::new();
        for _ in 0..RETAINED_FRAMES + 5 {
            platform.present_frame(&[RenderCommand::Fill]);
        }
        let recording = platform.snapshot();
        assert_eq!(recording.frames.len(), RETAINED_FRAMES);
        assert_eq!(recording.frames_presented, RETAINED_FRAMES + 5);
    }

    #[test]
    fn wait_until_wakes_on_new_calls() {
        let platform = Arc::new(RecordingPlatform::new());
        let writer = {
            let platform = platform.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                platform.trace_log(LogLevel::Info, "hello");
            })
        };
        assert!(platform.wait_until(Duration::from_secs(5), |r| r.has_log(LogLevel::Info, "hello")));
        assert!(!platform.wait_until(Duration::from_millis(5), |r| r.frames_presented > 0));
        writer.join().unwrap();
    }
}
