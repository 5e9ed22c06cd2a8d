//! Platform that writes everything to the tracing subscriber.

use service_abi::{LogLevel, Platform, RenderCommand, ResourceLoad, WindowUpdate};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct ConsolePlatform {
    assets: PathBuf,
    frames: AtomicU64,
}

impl ConsolePlatform {
    /// Resources are read from files under `assets`.
    pub fn new(assets: PathBuf) -> Self {
        Self {
            assets,
            frames: AtomicU64::new(0),
        }
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}

impl Platform for ConsolePlatform {
    fn trace_log(&self, level: LogLevel, text: &str) {
        match level {
            LogLevel::All | LogLevel::Trace => tracing::trace!(target: "program", "{text}"),
            LogLevel::Debug => tracing::debug!(target: "program", "{text}"),
            LogLevel::Info => tracing::info!(target: "program", "{text}"),
            LogLevel::Warning => tracing::warn!(target: "program", "{text}"),
            LogLevel::Error | LogLevel::Fatal => {
                tracing::error!(target: "program", %level, "{text}")
            }
            LogLevel::None => {}
        }
    }

    fn load_resource_bytes(&self, name: &str) -> ResourceLoad {
        let path = self.assets.join(name);
        match fs::read(&path) {
            Ok(bytes) => ResourceLoad::Loaded(bytes),
            Err(err) => ResourceLoad::Failed(format!("{}: {err}", path.display())),
        }
    }

    fn update_window(&self, update: &WindowUpdate) {
        tracing::info!(
            title = %update.title,
            width = update.width,
            height = update.height,
            "window updated"
        );
    }

    fn present_frame(&self, commands: &[RenderCommand]) {
        let frame = self.frames.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(frame, commands = commands.len(), "frame presented");
    }
}
