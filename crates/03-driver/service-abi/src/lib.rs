//! Protocol boundary types shared by the control side, the producer runtime,
//! and the host platform.
//!
//! Nothing here knows about rings or threads. The codecs in layer 03 map these
//! types onto the wire; the app loop in layer 05 consumes them.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity attached to host log lines, ordered from most to least verbose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show every message.
    All = 0,
    Trace = 1,
    Debug = 2,
    Info = 3,
    Warning = 4,
    Error = 5,
    Fatal = 6,
    /// Show nothing.
    None = 7,
}

impl LogLevel {
    /// Wire/raw representation.
    pub fn as_raw(self) -> u32 {
        self as u32
    }

    /// Parses a raw level, returning `None` outside `0..=7`.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::All,
            1 => Self::Trace,
            2 => Self::Debug,
            3 => Self::Info,
            4 => Self::Warning,
            5 => Self::Error,
            6 => Self::Fatal,
            7 => Self::None,
            _ => return None,
        })
    }

    /// Whether a message at `self` passes a threshold of `minimum`.
    pub fn passes(self, minimum: LogLevel) -> bool {
        self != LogLevel::None && self >= minimum
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::All => "ALL",
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
            Self::None => "NONE",
        };
        f.write_str(label)
    }
}

/// Key codes used by the demo programs and tests. Hosts translate their own
/// key identifiers into this numbering.
pub mod keys {
    pub const SPACE: u32 = 32;
    pub const ESCAPE: u32 = 256;
    pub const ENTER: u32 = 257;
    pub const RIGHT: u32 = 262;
    pub const LEFT: u32 = 263;
    pub const DOWN: u32 = 264;
    pub const UP: u32 = 265;
}

/// Discriminant of an [`Event`]; doubles as the wire tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    KeyDown = 0,
    KeyUp = 1,
    WheelMove = 2,
    PointerMove = 3,
    Start = 4,
    Stop = 5,
    AddResource = 6,
}

impl EventKind {
    /// Every kind, in tag order.
    pub const ALL: [EventKind; 7] = [
        EventKind::KeyDown,
        EventKind::KeyUp,
        EventKind::WheelMove,
        EventKind::PointerMove,
        EventKind::Start,
        EventKind::Stop,
        EventKind::AddResource,
    ];

    pub fn tag(self) -> u32 {
        self as u32
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    /// Input kinds (as opposed to lifecycle requests).
    pub fn is_input(self) -> bool {
        !matches!(self, EventKind::Start | EventKind::Stop)
    }
}

/// A domain event sent from the control side to the producer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    KeyDown { key: u32 },
    KeyUp { key: u32 },
    /// Wheel movement; positive scrolls up.
    WheelMove { direction: i32 },
    PointerMove { x: f32, y: f32 },
    /// Launch the program found at `path`.
    Start { path: String },
    Stop,
    /// Make `data` available to the running program under `name`.
    AddResource { name: String, data: Vec<u8> },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::KeyDown { .. } => EventKind::KeyDown,
            Event::KeyUp { .. } => EventKind::KeyUp,
            Event::WheelMove { .. } => EventKind::WheelMove,
            Event::PointerMove { .. } => EventKind::PointerMove,
            Event::Start { .. } => EventKind::Start,
            Event::Stop => EventKind::Stop,
            Event::AddResource { .. } => EventKind::AddResource,
        }
    }
}

/// An RGBA colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const RAYWHITE: Color = Color::rgba(245, 245, 245, 255);
    pub const RED: Color = Color::rgba(230, 41, 55, 255);
    pub const MAROON: Color = Color::rgba(190, 33, 55, 255);
    pub const DARKGRAY: Color = Color::rgba(80, 80, 80, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Packs as `0xRRGGBBAA`.
    pub fn to_word(self) -> u32 {
        u32::from_be_bytes([self.r, self.g, self.b, self.a])
    }

    pub fn from_word(word: u32) -> Self {
        let [r, g, b, a] = word.to_be_bytes();
        Self { r, g, b, a }
    }
}

/// One retained-mode drawing instruction handed to the host canvas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RenderCommand {
    /// Resize the drawing surface.
    Resize { width: u32, height: u32 },
    /// Fill the whole surface.
    Clear { color: Color },
    FillRect { x: f32, y: f32, width: f32, height: f32 },
    StrokeRect { x: f32, y: f32, width: f32, height: f32 },
    SetFillColor { color: Color },
    SetStrokeColor { color: Color },
    SetLineWidth { width: f32 },
    BeginPath,
    Arc { x: f32, y: f32, radius: f32, start_angle: f32, end_angle: f32 },
    Fill,
    SetFont { size: f32, family: String },
    FillText { text: String, x: f32, y: f32 },
    /// Draw a previously loaded image by host id.
    DrawImage { image: u32, x: f32, y: f32 },
}

/// Result of asking the host for a resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceLoad {
    Loaded(Vec<u8>),
    /// The host could not produce the resource; carries a reason.
    Failed(String),
}

impl ResourceLoad {
    pub fn is_loaded(&self) -> bool {
        matches!(self, ResourceLoad::Loaded(_))
    }

    pub fn into_result(self) -> Result<Vec<u8>, String> {
        match self {
            ResourceLoad::Loaded(bytes) => Ok(bytes),
            ResourceLoad::Failed(reason) => Err(reason),
        }
    }
}

/// Window chrome requested by a program.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowUpdate {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

/// Capabilities the host supplies to the runtime.
///
/// The runtime never fetches, decodes, or draws by itself; every such effect
/// goes through one of these calls. Implementations are shared across the
/// control, dispatcher, and renderer threads.
pub trait Platform: Send + Sync {
    /// Host-visible log line from a running program.
    fn trace_log(&self, level: LogLevel, text: &str);

    /// Synchronously produce the bytes of `name`.
    fn load_resource_bytes(&self, name: &str) -> ResourceLoad;

    /// Apply window title and size.
    fn update_window(&self, update: &WindowUpdate);

    /// Present one complete frame.
    fn present_frame(&self, commands: &[RenderCommand]);
}
