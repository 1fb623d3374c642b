use anyhow::{Context, Result};
use overdub_engine::{wav, DeckConfig, LoopBuffer};
use overdub_shared::BlockFormat;
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT: &str = "overdub-out.wav";
pub const SNAPSHOT_OUTPUT: &str = "overdub-snapshot-out.wav";

fn output_dir() -> PathBuf {
    dirs::desktop_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Where the session is saved on exit.
pub fn output_path(file: Option<&Path>) -> PathBuf {
    match file {
        Some(path) => path.to_path_buf(),
        None => output_dir().join(DEFAULT_OUTPUT),
    }
}

/// Snapshot saves land next to the session file.
pub fn snapshot_path(output: &Path) -> PathBuf {
    match output.parent() {
        Some(dir) => dir.join(SNAPSHOT_OUTPUT),
        None => PathBuf::from(SNAPSHOT_OUTPUT),
    }
}

pub fn load_config(path: Option<&Path>) -> Result<DeckConfig> {
    let Some(path) = path else {
        return Ok(DeckConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: DeckConfig = serde_json::from_str(&content)
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}

/// Existing take to continue from, or an empty loop for a new file.
pub fn load_initial(path: &Path, format: &BlockFormat) -> Result<LoopBuffer> {
    if !path.exists() {
        log::info!("[Host] {} does not exist yet, starting empty", path.display());
        return Ok(LoopBuffer::new());
    }
    let blocks = wav::load(path, format)?;
    log::info!("[Host] Loaded {} blocks from {}", blocks.len(), path.display());
    Ok(blocks)
}

/// Writes the loop unless it is empty. Returns whether anything was written.
pub fn save(path: &Path, blocks: &LoopBuffer, format: &BlockFormat) -> Result<bool> {
    if blocks.is_empty() {
        log::info!("[Host] Nothing to save");
        return Ok(false);
    }
    wav::save(path, blocks, format)?;
    log::info!("[Host] Saved {} blocks to {}", blocks.len(), path.display());
    Ok(true)
}
