use serde::{Deserialize, Serialize};
use std::fmt;

/// Transport mode. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Stopped,
    Playing,
    Recording,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Stopped => "stopped",
            Mode::Playing => "playing",
            Mode::Recording => "recording",
        }
    }

    /// Playing and recording both advance the position.
    pub fn is_rolling(&self) -> bool {
        !matches!(self, Mode::Stopped)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a deck, safe to hand to any display thread.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Playhead in seconds.
    pub time: f64,
    /// Loop length in seconds.
    pub end: f64,
    pub mode: Mode,
    pub solo: bool,
    /// Decaying peak level, 0.0..=1.0.
    pub meter: f32,
    pub undo_available: bool,
    /// Playhead as a block index.
    pub pos: usize,
}
