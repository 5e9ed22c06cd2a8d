//! The API a running program sees.

use crate::worker::{drain_events, ProducerWorker, WorkerMessage};
use runtime_native::{BridgeError, FrameError};
use service_abi::{Color, LogLevel, RenderCommand, ResourceLoad, WindowUpdate};
use std::f32::consts::TAU;
use std::time::{Duration, Instant};

const DEFAULT_FONT: &str = "grixel";

/// Borrowed view of the producer worker for the duration of one program run.
pub struct Runtime<'w> {
    worker: &'w mut ProducerWorker,
    frame: Vec<RenderCommand>,
    target_fps: u32,
    trace_level: LogLevel,
    previous: Instant,
    frame_time: Duration,
    screen: (u32, u32),
    input_fault: bool,
}

impl<'w> Runtime<'w> {
    pub(crate) fn new(worker: &'w mut ProducerWorker) -> Self {
        let target_fps = worker.config.target_fps.max(1);
        Self {
            worker,
            frame: Vec::new(),
            target_fps,
            trace_level: LogLevel::Info,
            previous: Instant::now(),
            frame_time: Duration::ZERO,
            screen: (0, 0),
            input_fault: false,
        }
    }

    /// Starts a frame and reports whether the program should wind down.
    ///
    /// Applies buffered key releases, waits according to the pacing strategy,
    /// drains pending events and checks for a destroy request.
    pub fn window_should_close(&mut self) -> bool {
        let budget = Duration::from_secs_f64(1.0 / f64::from(self.target_fps));
        let worker = &mut *self.worker;
        worker.lifecycle.input_mut().begin_frame();

        let ProducerWorker {
            pacer,
            events,
            lifecycle,
            ..
        } = &mut *worker;
        let mut fault = None;
        pacer.pace(budget, &mut || {
            if let Err(err) = drain_events(events, lifecycle) {
                fault = Some(err);
            }
        });
        if let Some(err) = fault {
            worker.report(LogLevel::Fatal, format!("input stream corrupted: {err}"));
            self.input_fault = true;
        }

        let now = Instant::now();
        self.frame_time = now - self.previous;
        self.previous = now;

        worker.poll_control();
        self.input_fault
            || worker.destroyed
            || worker.frames_closed
            || worker.lifecycle.window_should_close()
    }

    /// Seconds since the previous frame, capped at one frame budget.
    pub fn frame_time(&self) -> f32 {
        self.frame_time
            .as_secs_f32()
            .min(1.0 / self.target_fps as f32)
    }

    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    pub fn set_target_fps(&mut self, fps: u32) {
        self.target_fps = fps.max(1);
        self.trace_log(
            LogLevel::Info,
            &format!("The program wants to run at {} FPS.", self.target_fps),
        );
    }

    pub fn is_key_down(&self, key: u32) -> bool {
        self.worker.lifecycle.input().is_key_down(key)
    }

    pub fn is_key_pressed(&self, key: u32) -> bool {
        self.worker.lifecycle.input().is_key_pressed(key)
    }

    pub fn mouse_position(&self) -> (f32, f32) {
        self.worker.lifecycle.input().pointer()
    }

    pub fn mouse_wheel_move(&self) -> i32 {
        self.worker.lifecycle.input().wheel()
    }

    /// Bytes delivered earlier through an `AddResource` event.
    pub fn resource(&self, name: &str) -> Option<&[u8]> {
        self.worker.lifecycle.input().resource(name)
    }

    /// Asks the host for `name` and blocks until it answers.
    pub fn load_resource(&mut self, name: &str) -> Result<ResourceLoad, BridgeError> {
        self.worker.loader.load(name)
    }

    pub fn init_window(&mut self, width: u32, height: u32, title: &str) {
        self.screen = (width, height);
        let _ = self.worker.outbox.send(WorkerMessage::UpdateWindow(WindowUpdate {
            title: title.to_owned(),
            width,
            height,
        }));
        self.frame.push(RenderCommand::Resize { width, height });
    }

    pub fn screen_width(&self) -> u32 {
        self.screen.0
    }

    pub fn screen_height(&self) -> u32 {
        self.screen.1
    }

    /// Messages below `level` are dropped before reaching the host.
    pub fn set_trace_log_level(&mut self, level: LogLevel) {
        self.trace_level = level;
    }

    pub fn trace_log(&self, level: LogLevel, text: &str) {
        if level.passes(self.trace_level) {
            self.worker.report(level, text.to_owned());
        }
    }

    pub fn draw(&mut self, command: RenderCommand) {
        self.frame.push(command);
    }

    pub fn clear_background(&mut self, color: Color) {
        self.draw(RenderCommand::Clear { color });
    }

    pub fn draw_rectangle(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        self.draw(RenderCommand::SetFillColor { color });
        self.draw(RenderCommand::FillRect {
            x,
            y,
            width,
            height,
        });
    }

    pub fn draw_circle(&mut self, x: f32, y: f32, radius: f32, color: Color) {
        self.frame.extend([
            RenderCommand::BeginPath,
            RenderCommand::Arc {
                x,
                y,
                radius,
                start_angle: 0.0,
                end_angle: TAU,
            },
            RenderCommand::SetFillColor { color },
            RenderCommand::Fill,
        ]);
    }

    /// Draws `text` line by line with the default font.
    pub fn draw_text(&mut self, text: &str, x: f32, y: f32, size: f32, color: Color) {
        self.draw(RenderCommand::SetFillColor { color });
        self.draw(RenderCommand::SetFont {
            size,
            family: DEFAULT_FONT.to_owned(),
        });
        for (line_no, line) in text.lines().enumerate() {
            self.draw(RenderCommand::FillText {
                text: line.to_owned(),
                x,
                y: y + size + line_no as f32 * size,
            });
        }
    }

    /// Publishes the frame built since the last call and rolls input state.
    ///
    /// Blocks while the previous frame has not been presented. A closed
    /// renderer is not an error here; the next
    /// [`window_should_close`](Self::window_should_close) reports it.
    pub fn end_drawing(&mut self) -> Result<(), FrameError> {
        let commands = std::mem::take(&mut self.frame);
        let worker = &mut *self.worker;
        worker.lifecycle.input_mut().end_frame();
        if worker.frames_closed {
            return Ok(());
        }
        match worker.frames.send(commands) {
            Ok(()) => {
                let published = worker.frames.published();
                let _ = worker.outbox.send(WorkerMessage::FramePublished(published));
                Ok(())
            }
            Err(FrameError::ReceiverClosed) => {
                log::debug!("renderer gone; frames are no longer published");
                worker.frames_closed = true;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

impl std::fmt::Debug for Runtime<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("target_fps", &self.target_fps)
            .field("pending_commands", &self.frame.len())
            .field("screen", &self.screen)
            .finish_non_exhaustive()
    }
}
