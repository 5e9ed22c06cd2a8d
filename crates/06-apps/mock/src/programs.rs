//! Small programs that exercise the runtime API end to end.

use app::{Program, Runtime};
use service_abi::{keys, Color, LogLevel, ResourceLoad};

const BALL_RADIUS: f32 = 20.0;

/// A ball bouncing inside an 800x450 window. SPACE pauses it.
#[derive(Debug, Clone)]
pub struct BouncingBall {
    position: (f32, f32),
    speed: (f32, f32),
    paused: bool,
    frame_limit: Option<u64>,
}

impl BouncingBall {
    pub fn new() -> Self {
        Self {
            position: (400.0, 225.0),
            speed: (300.0, 240.0),
            paused: false,
            frame_limit: None,
        }
    }

    /// Exits on its own after `frames` frames.
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    fn step(&mut self, dt: f32, width: f32, height: f32) {
        let (x, y) = &mut self.position;
        *x += self.speed.0 * dt;
        *y += self.speed.1 * dt;
        if *x >= width - BALL_RADIUS || *x <= BALL_RADIUS {
            self.speed.0 = -self.speed.0;
            *x = x.clamp(BALL_RADIUS, width - BALL_RADIUS);
        }
        if *y >= height - BALL_RADIUS || *y <= BALL_RADIUS {
            self.speed.1 = -self.speed.1;
            *y = y.clamp(BALL_RADIUS, height - BALL_RADIUS);
        }
    }
}

impl Default for BouncingBall {
    fn default() -> Self {
        Self::new()
    }
}

impl Program for BouncingBall {
    fn main(&mut self, rt: &mut Runtime<'_>) -> anyhow::Result<()> {
        rt.init_window(800, 450, "bouncing ball");
        rt.set_target_fps(60);
        let mut frames = 0u64;
        while !rt.window_should_close() {
            if rt.is_key_pressed(keys::SPACE) {
                self.paused = !self.paused;
            }
            if !self.paused {
                let (width, height) = (rt.screen_width() as f32, rt.screen_height() as f32);
                self.step(rt.frame_time(), width, height);
            }

            rt.clear_background(Color::RAYWHITE);
            rt.draw_circle(self.position.0, self.position.1, BALL_RADIUS, Color::MAROON);
            rt.draw_text("PRESS SPACE to PAUSE BALL MOVEMENT", 10.0, 430.0, 20.0, Color::DARKGRAY);
            if self.paused {
                rt.draw_text("PAUSED", 350.0, 200.0, 30.0, Color::DARKGRAY);
            }
            rt.end_drawing()?;

            frames += 1;
            if self.frame_limit.is_some_and(|limit| frames >= limit) {
                break;
            }
        }
        rt.trace_log(LogLevel::Info, &format!("bouncing ball drew {frames} frames"));
        Ok(())
    }
}

/// Logs every key press and wheel move. ESCAPE ends the program.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputEcho;

const ECHOED_KEYS: [u32; 7] = [
    keys::SPACE,
    keys::ESCAPE,
    keys::ENTER,
    keys::RIGHT,
    keys::LEFT,
    keys::DOWN,
    keys::UP,
];

impl Program for InputEcho {
    fn main(&mut self, rt: &mut Runtime<'_>) -> anyhow::Result<()> {
        rt.init_window(320, 200, "input echo");
        while !rt.window_should_close() {
            for key in ECHOED_KEYS {
                if rt.is_key_pressed(key) {
                    rt.trace_log(LogLevel::Info, &format!("key {key} pressed"));
                }
            }
            let wheel = rt.mouse_wheel_move();
            if wheel != 0 {
                rt.trace_log(LogLevel::Info, &format!("wheel {wheel}"));
            }
            if rt.is_key_pressed(keys::ESCAPE) {
                rt.end_drawing()?;
                break;
            }

            let (x, y) = rt.mouse_position();
            rt.clear_background(Color::BLACK);
            rt.draw_rectangle(x - 2.0, y - 2.0, 4.0, 4.0, Color::WHITE);
            rt.end_drawing()?;
        }
        Ok(())
    }
}

/// Looks up each name among preloaded resources, then through the host.
#[derive(Debug, Clone, Default)]
pub struct ResourceProbe {
    names: Vec<String>,
}

impl ResourceProbe {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl Program for ResourceProbe {
    fn main(&mut self, rt: &mut Runtime<'_>) -> anyhow::Result<()> {
        // Let AddResource events sent alongside Start land first.
        rt.window_should_close();
        for name in &self.names {
            if let Some(bytes) = rt.resource(name) {
                let line = format!("{name}: preloaded {} bytes", bytes.len());
                rt.trace_log(LogLevel::Info, &line);
                continue;
            }
            match rt.load_resource(name)? {
                ResourceLoad::Loaded(bytes) => {
                    rt.trace_log(LogLevel::Info, &format!("{name}: loaded {} bytes", bytes.len()));
                }
                ResourceLoad::Failed(reason) => {
                    rt.trace_log(LogLevel::Warning, &format!("{name}: {reason}"));
                }
            }
        }
        Ok(())
    }
}
