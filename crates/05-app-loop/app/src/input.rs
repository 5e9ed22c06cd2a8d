//! Per-frame input snapshot seen by a running program.
//!
//! Key releases are buffered and only applied when the next frame begins, so
//! a press and release that both land between two frames still reads as
//! "down" for one frame.

use service_abi::Event;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct InputState {
    down: HashSet<u32>,
    down_last_frame: HashSet<u32>,
    released: SmallVec<[u32; 8]>,
    pointer: (f32, f32),
    wheel: i32,
    resources: HashMap<String, Vec<u8>>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one wire event into the snapshot. Returns `false` for lifecycle
    /// events, which carry no input.
    pub fn apply(&mut self, event: &Event) -> bool {
        match event {
            Event::KeyDown { key } => {
                self.down.insert(*key);
            }
            Event::KeyUp { key } => self.released.push(*key),
            Event::WheelMove { direction } => self.wheel = *direction,
            Event::PointerMove { x, y } => self.pointer = (*x, *y),
            Event::AddResource { name, data } => {
                self.resources.insert(name.clone(), data.clone());
            }
            Event::Start { .. } | Event::Stop => return false,
        }
        true
    }

    /// Applies key releases buffered since the previous frame.
    pub fn begin_frame(&mut self) {
        for key in self.released.drain(..) {
            self.down.remove(&key);
        }
    }

    /// Rolls key state into "last frame" and clears the wheel.
    pub fn end_frame(&mut self) {
        self.down_last_frame.clone_from(&self.down);
        self.wheel = 0;
    }

    pub fn is_key_down(&self, key: u32) -> bool {
        self.down.contains(&key)
    }

    /// Down now but not at the end of the previous frame.
    pub fn is_key_pressed(&self, key: u32) -> bool {
        self.down.contains(&key) && !self.down_last_frame.contains(&key)
    }

    pub fn pointer(&self) -> (f32, f32) {
        self.pointer
    }

    pub fn wheel(&self) -> i32 {
        self.wheel
    }

    pub fn resource(&self, name: &str) -> Option<&[u8]> {
        self.resources.get(name).map(Vec::as_slice)
    }

    /// Forgets keys, pointer and wheel. Resources survive across runs.
    pub fn reset(&mut self) {
        self.down.clear();
        self.down_last_frame.clear();
        self.released.clear();
        self.pointer = (0.0, 0.0);
        self.wheel = 0;
    }
}
