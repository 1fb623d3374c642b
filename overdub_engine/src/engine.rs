use crate::config::DeckConfig;
use crate::deck::{Deck, DeckProcessor};
use crate::error::DeckError;
use crate::loop_buffer::LoopBuffer;
use crate::stream::{push_frame, BlockAdapter};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use crossbeam_channel::{bounded, Receiver, Sender};
use overdub_shared::BlockFormat;
use ringbuf::traits::Split;
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::{Arc, Mutex, PoisonError};

/// Running audio session: the device streams plus the deck processor they drive.
///
/// Dropping the engine closes both streams.
pub struct AudioEngine {
    output: cpal::Stream,
    input: Option<cpal::Stream>,
    processor: Arc<Mutex<DeckProcessor>>,
    fault_rx: Receiver<DeckError>,
    pub sample_rate: u32,
    pub play_ahead: usize,
}

/// Device indices and names for the default host.
#[derive(Debug, Clone, Default)]
pub struct DeviceList {
    pub inputs: Vec<(usize, String)>,
    pub outputs: Vec<(usize, String)>,
}

#[allow(deprecated)]
fn device_name(device: &cpal::Device) -> String {
    device.name().unwrap_or_else(|_| "unknown".to_string())
}

pub fn list_devices() -> Result<DeviceList, DeckError> {
    let host = cpal::default_host();
    let inputs = host
        .input_devices()
        .map_err(DeckError::device)?
        .enumerate()
        .map(|(i, d)| (i, device_name(&d)))
        .collect();
    let outputs = host
        .output_devices()
        .map_err(DeckError::device)?
        .enumerate()
        .map(|(i, d)| (i, device_name(&d)))
        .collect();
    Ok(DeviceList { inputs, outputs })
}

impl AudioEngine {
    /// Opens the configured devices and starts feeding `processor`.
    ///
    /// A missing or broken input device is logged and the deck runs without
    /// input. Failing to open the output is fatal.
    pub fn start(config: &DeckConfig, deck: &Deck, processor: DeckProcessor) -> Result<Self, DeckError> {
        config.validate()?;
        let format = config.format;
        let host = cpal::default_host();

        let output_device = match config.output_device {
            Some(index) => host
                .output_devices()
                .map_err(DeckError::device)?
                .nth(index)
                .ok_or_else(|| DeckError::invalid(format!("no output device #{}", index)))?,
            None => host
                .default_output_device()
                .ok_or_else(|| DeckError::device("no output device available"))?,
        };
        log::info!("[Engine] Output device: {}", device_name(&output_device));

        let (output_config, output_format) = stream_config(&output_device, &format, Direction::Output)?;
        log::info!("[Engine] Output config: {:?} {:?}", output_config, output_format);

        let queue_len = format.samples_per_block() * config.input_queue_blocks;
        let (producer, consumer) = HeapRb::<i16>::new(queue_len).split();

        let processor = Arc::new(Mutex::new(processor));
        let (fault_tx, fault_rx) = bounded(4);

        let output = match output_format {
            SampleFormat::I16 => build_output::<i16>(&output_device, &output_config, &format, processor.clone(), consumer, fault_tx)?,
            SampleFormat::U16 => build_output::<u16>(&output_device, &output_config, &format, processor.clone(), consumer, fault_tx)?,
            SampleFormat::I32 => build_output::<i32>(&output_device, &output_config, &format, processor.clone(), consumer, fault_tx)?,
            SampleFormat::F32 => build_output::<f32>(&output_device, &output_config, &format, processor.clone(), consumer, fault_tx)?,
            other => return Err(DeckError::device(format!("unsupported output sample format {:?}", other))),
        };

        // Input is optional: the deck keeps running without it.
        let input = match open_input(&host, config, producer) {
            Ok(stream) => Some(stream),
            Err(e) => {
                log::warn!("[Engine] Running without input: {}", e);
                None
            }
        };

        let play_ahead = match config.play_ahead {
            Some(blocks) => blocks,
            None => {
                let input_frames = input.as_ref().map_or(0, |(_, frames)| *frames);
                estimate_play_ahead(&format, input_frames, buffer_frames(&output_config, &format))
            }
        };
        deck.set_play_ahead(play_ahead)?;
        log::info!("[Engine] Play-ahead: {} blocks", play_ahead);

        output.play().map_err(DeckError::device)?;
        let input = match input {
            Some((stream, _)) => match stream.play() {
                Ok(()) => Some(stream),
                Err(e) => {
                    log::warn!("[Engine] Input stream failed to start: {}", e);
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            output,
            input,
            processor,
            fault_rx,
            sample_rate: format.sample_rate,
            play_ahead,
        })
    }

    pub fn has_input(&self) -> bool {
        self.input.is_some()
    }

    /// Fatal output failure reported by the backend, if any.
    pub fn device_error(&self) -> Option<DeckError> {
        self.fault_rx.try_recv().ok()
    }

    /// Closes the streams and hands back the loop for saving.
    pub fn shutdown(self) -> LoopBuffer {
        let AudioEngine {
            output,
            input,
            processor,
            ..
        } = self;
        drop(input);
        drop(output);
        log::info!("[Engine] Streams closed");

        match Arc::try_unwrap(processor) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(PoisonError::into_inner).into_blocks(),
            Err(shared) => shared.lock().unwrap_or_else(PoisonError::into_inner).blocks().clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Input,
    Output,
}

/// Picks a device config running at the loop's sample rate, preferring
/// stereo and 16-bit, with a fixed buffer of one block where supported.
fn stream_config(
    device: &cpal::Device,
    format: &BlockFormat,
    direction: Direction,
) -> Result<(cpal::StreamConfig, SampleFormat), DeckError> {
    let ranges: Vec<cpal::SupportedStreamConfigRange> = match direction {
        Direction::Output => device.supported_output_configs().map_err(DeckError::device)?.collect(),
        Direction::Input => device.supported_input_configs().map_err(DeckError::device)?.collect(),
    };

    let rate = format.sample_rate;
    let best = ranges
        .into_iter()
        .filter(|r| r.min_sample_rate() <= rate && rate <= r.max_sample_rate())
        .min_by_key(|r| {
            let channel_rank = if r.channels() == 2 { 0 } else { 1 };
            let format_rank = match r.sample_format() {
                SampleFormat::I16 => 0,
                SampleFormat::F32 => 1,
                _ => 2,
            };
            (channel_rank, format_rank)
        })
        .ok_or_else(|| DeckError::device(format!("{:?} device does not support {} Hz", direction, rate)))?;

    let frames = format.frames_per_block as u32;
    let buffer_size = match best.buffer_size() {
        cpal::SupportedBufferSize::Range { min, max } if *min <= frames && frames <= *max => {
            cpal::BufferSize::Fixed(frames)
        }
        _ => cpal::BufferSize::Default,
    };

    let supported = best.with_sample_rate(rate);
    let sample_format = supported.sample_format();
    let mut config: cpal::StreamConfig = supported.into();
    config.buffer_size = buffer_size;
    Ok((config, sample_format))
}

fn buffer_frames(config: &cpal::StreamConfig, format: &BlockFormat) -> usize {
    match config.buffer_size {
        cpal::BufferSize::Fixed(frames) => frames as usize,
        cpal::BufferSize::Default => format.frames_per_block,
    }
}

/// Blocks between capturing a frame and hearing the block written at the
/// same position: both device buffers plus the block being staged.
pub fn estimate_play_ahead(format: &BlockFormat, input_frames: usize, output_frames: usize) -> usize {
    (input_frames + output_frames).div_ceil(format.frames_per_block) + 1
}

fn open_input(
    host: &cpal::Host,
    config: &DeckConfig,
    producer: HeapProd<i16>,
) -> Result<(cpal::Stream, usize), DeckError> {
    let device = match config.input_device {
        Some(index) => host
            .input_devices()
            .map_err(DeckError::device)?
            .nth(index)
            .ok_or_else(|| DeckError::invalid(format!("no input device #{}", index)))?,
        None => host
            .default_input_device()
            .ok_or_else(|| DeckError::device("no input device available"))?,
    };
    log::info!("[Engine] Input device: {}", device_name(&device));

    let (input_config, input_format) = stream_config(&device, &config.format, Direction::Input)?;
    let frames = buffer_frames(&input_config, &config.format);

    let stream = match input_format {
        SampleFormat::I16 => build_input::<i16>(&device, &input_config, producer)?,
        SampleFormat::U16 => build_input::<u16>(&device, &input_config, producer)?,
        SampleFormat::I32 => build_input::<i32>(&device, &input_config, producer)?,
        SampleFormat::F32 => build_input::<f32>(&device, &input_config, producer)?,
        other => return Err(DeckError::device(format!("unsupported input sample format {:?}", other))),
    };
    Ok((stream, frames))
}

fn build_input<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut producer: HeapProd<i16>,
) -> Result<cpal::Stream, DeckError>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let channels = config.channels as usize;

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                for frame in data.chunks(channels) {
                    let left = i16::from_sample(frame[0]);
                    let right = frame.get(1).map_or(left, |&s| i16::from_sample(s));
                    push_frame(&mut producer, left, right);
                }
            },
            |err: cpal::StreamError| {
                // Input loss is not fatal; the deck records silence.
                log::warn!("[Engine] Input stream error: {}", err);
            },
            None,
        )
        .map_err(DeckError::device)
}

fn build_output<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    format: &BlockFormat,
    processor: Arc<Mutex<DeckProcessor>>,
    mut consumer: HeapCons<i16>,
    fault_tx: Sender<DeckError>,
) -> Result<cpal::Stream, DeckError>
where
    T: SizedSample + FromSample<i16>,
{
    let channels = config.channels as usize;
    let mut adapter = BlockAdapter::new(format.samples_per_block());
    let silence = crate::block::SampleBlock::silence(format.samples_per_block());

    let err_fn = move |err: cpal::StreamError| {
        let s = err.to_string();
        // Suppress buffer under/overrun noise; anything else ends the session.
        if s.contains("underrun") || s.contains("overrun") {
            return;
        }
        log::error!("[Engine] Output stream error: {}", s);
        let _ = fault_tx.try_send(DeckError::Device(s));
    };

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                // Never wait on the lock: only shutdown takes it, after the stream is gone.
                let mut guard = processor.try_lock().ok();

                for frame in data.chunks_mut(channels) {
                    let (left, right) = adapter.next_frame(&mut consumer, |input| match guard.as_deref_mut() {
                        Some(processor) => processor.process(input),
                        None => silence.clone(),
                    });

                    match frame {
                        [mono] => *mono = T::from_sample(((left as i32 + right as i32) / 2) as i16),
                        [l, r, rest @ ..] => {
                            *l = T::from_sample(left);
                            *r = T::from_sample(right);
                            for s in rest {
                                *s = T::EQUILIBRIUM;
                            }
                        }
                        [] => {}
                    }
                }
            },
            err_fn,
            None,
        )
        .map_err(DeckError::device)
}
