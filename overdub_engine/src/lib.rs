pub mod block;
pub mod commands;
pub mod config;
pub mod deck;
pub mod engine; // AudioEngine lives here
pub mod error;
pub mod loop_buffer;
pub mod status;
pub mod stream;
pub mod transport;
pub mod wav;

#[cfg(test)]
mod tests_deck;

// Re-exports
pub use block::SampleBlock;
pub use commands::{DeckCommand, Reply};
pub use config::DeckConfig;
pub use deck::{Deck, DeckProcessor};
pub use engine::AudioEngine;
pub use error::DeckError;
pub use loop_buffer::LoopBuffer;
pub use overdub_shared::{BlockFormat, Mode, StatusSnapshot};
