//! Session configuration for the deck and its audio devices.

use overdub_shared::BlockFormat;
use serde::{Deserialize, Serialize};

use crate::error::DeckError;

/// Deck configuration.
///
/// Every field has a default, so a config file only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckConfig {
    pub format: BlockFormat,
    /// Meter fall per block, in full-scale units.
    pub meter_decay: f32,
    /// Blocks subtracted from the playhead when writing recorded input.
    /// `None` estimates it from the device buffers when the streams open.
    pub play_ahead: Option<usize>,
    /// Device indices as listed by `list_devices`; `None` uses the host default.
    pub input_device: Option<usize>,
    pub output_device: Option<usize>,
    /// Capacity of the queue between the input and output streams, in blocks.
    pub input_queue_blocks: usize,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            format: BlockFormat::default(),
            meter_decay: 0.02,
            play_ahead: None,
            input_device: None,
            output_device: None,
            input_queue_blocks: 16,
        }
    }
}

impl DeckConfig {
    pub fn validate(&self) -> Result<(), DeckError> {
        let format = &self.format;
        if format.sample_rate == 0 {
            return Err(DeckError::invalid("sample rate must be positive"));
        }
        if format.channels != 2 {
            return Err(DeckError::invalid(format!(
                "loop format must be stereo, got {} channels",
                format.channels
            )));
        }
        if format.frames_per_block == 0 {
            return Err(DeckError::invalid("frames per block must be positive"));
        }
        if !self.meter_decay.is_finite() || self.meter_decay < 0.0 {
            return Err(DeckError::invalid(format!(
                "meter decay must be a non-negative number, got {}",
                self.meter_decay
            )));
        }
        if self.input_queue_blocks < 2 {
            return Err(DeckError::invalid("input queue needs room for at least 2 blocks"));
        }
        Ok(())
    }
}
