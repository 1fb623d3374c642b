//! WAV load/save for loop buffers.
//! Files are 16-bit PCM with the loop's channel count; the last block of a
//! file that does not end on a block boundary is padded with silence.

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use overdub_shared::BlockFormat;
use std::path::Path;

use crate::block::SampleBlock;
use crate::error::DeckError;
use crate::loop_buffer::LoopBuffer;

fn wav_spec(format: &BlockFormat) -> WavSpec {
    WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

fn check_path(path: &Path) -> Result<(), DeckError> {
    if path.as_os_str().is_empty() {
        return Err(DeckError::invalid("empty file path"));
    }
    if path.is_dir() {
        return Err(DeckError::invalid(format!("{} is a directory", path.display())));
    }
    Ok(())
}

/// Reads a WAV file into blocks of `format`.
pub fn load(path: impl AsRef<Path>, format: &BlockFormat) -> Result<LoopBuffer, DeckError> {
    let path = path.as_ref();
    check_path(path)?;

    let reader = WavReader::open(path).map_err(|e| DeckError::wav(path, e))?;
    let spec = reader.spec();

    if spec.channels != format.channels
        || spec.bits_per_sample != 16
        || spec.sample_format != SampleFormat::Int
    {
        return Err(DeckError::invalid(format!(
            "{}: expected {}-channel 16-bit PCM, got {} channels, {} bits {:?}",
            path.display(),
            format.channels,
            spec.channels,
            spec.bits_per_sample,
            spec.sample_format
        )));
    }
    if spec.sample_rate != format.sample_rate {
        log::warn!(
            "[Wav] {} is {} Hz, loop runs at {} Hz; playing it unconverted",
            path.display(),
            spec.sample_rate,
            format.sample_rate
        );
    }

    let samples = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DeckError::wav(path, e))?;

    let block_len = format.samples_per_block();
    let blocks: Vec<SampleBlock> = samples
        .chunks(block_len)
        .map(|chunk| {
            let mut data = chunk.to_vec();
            data.resize(block_len, 0);
            SampleBlock::from_samples(data)
        })
        .collect();

    log::info!("[Wav] Loaded {} blocks from {}", blocks.len(), path.display());
    Ok(LoopBuffer::from_blocks(blocks))
}

/// Writes every block of `blocks` to a WAV file, replacing it if it exists.
pub fn save(path: impl AsRef<Path>, blocks: &LoopBuffer, format: &BlockFormat) -> Result<(), DeckError> {
    let path = path.as_ref();
    check_path(path)?;

    let mut writer = WavWriter::create(path, wav_spec(format)).map_err(|e| DeckError::wav(path, e))?;
    for block in blocks {
        for &sample in block.samples() {
            writer.write_sample(sample).map_err(|e| DeckError::wav(path, e))?;
        }
    }
    writer.finalize().map_err(|e| DeckError::wav(path, e))?;

    log::info!("[Wav] Saved {} blocks to {}", blocks.len(), path.display());
    Ok(())
}
