//! Error types for the deck engine.
//!
//! Device failures end the session; invalid commands are reported to the
//! caller that issued them and never reach the audio callback.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DeckError {
    /// The audio backend failed to open, read or write.
    #[error("audio device error: {0}")]
    Device(String),

    /// A request was rejected before it was queued.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// The callback side has been dropped; synchronous calls cannot complete.
    #[error("deck is no longer running")]
    Disconnected,

    #[error("wav error: {path}: {source}")]
    Wav {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
}

impl DeckError {
    pub fn device(reason: impl std::fmt::Display) -> Self {
        Self::Device(reason.to_string())
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidCommand(reason.into())
    }

    pub fn wav(path: impl Into<PathBuf>, source: hound::Error) -> Self {
        Self::Wav {
            path: path.into(),
            source,
        }
    }
}
