use serde::{Deserialize, Serialize};

pub mod status;

pub use status::{Mode, StatusSnapshot};

// Native loop format: 16-bit interleaved stereo at a fixed rate.
pub const SAMPLE_RATE: u32 = 44100;
pub const CHANNEL_COUNT: u16 = 2;
pub const SAMPLE_WIDTH: usize = 2;
pub const FRAME_SIZE: usize = SAMPLE_WIDTH * CHANNEL_COUNT as usize;
pub const BYTES_PER_BLOCK: usize = 4096;
pub const FRAMES_PER_BLOCK: usize = BYTES_PER_BLOCK / FRAME_SIZE;

/// Shape of one loop block and the clock it runs at.
///
/// Every block exchanged with the device, stored in a loop buffer or written
/// to disk has exactly `samples_per_block()` interleaved samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub frames_per_block: usize,
}

impl Default for BlockFormat {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            channels: CHANNEL_COUNT,
            frames_per_block: FRAMES_PER_BLOCK,
        }
    }
}

impl BlockFormat {
    pub fn samples_per_block(&self) -> usize {
        self.frames_per_block * self.channels as usize
    }

    pub fn seconds_per_block(&self) -> f64 {
        self.frames_per_block as f64 / self.sample_rate as f64
    }

    pub fn blocks_per_second(&self) -> f64 {
        self.sample_rate as f64 / self.frames_per_block as f64
    }

    /// Nearest whole block count for a (possibly negative) duration.
    pub fn seconds_to_blocks(&self, seconds: f64) -> i64 {
        (seconds * self.blocks_per_second()).round() as i64
    }

    pub fn blocks_to_seconds(&self, blocks: usize) -> f64 {
        blocks as f64 * self.seconds_per_block()
    }
}
