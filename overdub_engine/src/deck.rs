use std::sync::Arc;

use arc_swap::ArcSwap;
use overdub_shared::{BlockFormat, Mode, StatusSnapshot};

use crate::block::{mixed_peak, peak_level, sum_into, SampleBlock};
use crate::commands::{command_queue, CommandDrain, CommandQueue, DeckCommand, Reply};
use crate::config::DeckConfig;
use crate::error::DeckError;
use crate::loop_buffer::LoopBuffer;
use crate::status;
use crate::transport::{Transport, TransportEvent};

/// Controller-side handle to a running deck.
///
/// Every operation goes through the command queue and is applied by the
/// audio callback; the handle never touches loop or transport state itself.
#[derive(Clone)]
pub struct Deck {
    queue: CommandQueue,
    status: Arc<ArcSwap<StatusSnapshot>>,
    format: BlockFormat,
}

impl Deck {
    /// Builds a deck around `blocks`, returning the controller handle and the
    /// callback-side processor.
    pub fn new(config: &DeckConfig, blocks: LoopBuffer) -> Result<(Deck, DeckProcessor), DeckError> {
        config.validate()?;
        check_blocks(&config.format, &blocks)?;

        let (queue, drain) = command_queue();
        let state = DeckState {
            format: config.format,
            silence: SampleBlock::silence(config.format.samples_per_block()),
            mixed: SampleBlock::silence(config.format.samples_per_block()),
            blocks,
            backing: LoopBuffer::new(),
            undo: None,
            transport: Transport::new(),
            play_ahead: config.play_ahead.unwrap_or(0),
            meter: 0.0,
            meter_decay: config.meter_decay,
        };
        let status = Arc::new(ArcSwap::from_pointee(state.status()));

        let deck = Deck {
            queue,
            status: status.clone(),
            format: config.format,
        };
        let processor = DeckProcessor {
            drain,
            state,
            status,
            spare: Arc::new(StatusSnapshot::default()),
        };
        Ok((deck, processor))
    }

    pub fn format(&self) -> BlockFormat {
        self.format
    }

    /// Latest status published by the callback. May be one block stale.
    pub fn get_status(&self) -> StatusSnapshot {
        **self.status.load()
    }

    /// Queues `command` without waiting.
    pub fn send(&self, command: DeckCommand) -> Result<(), DeckError> {
        self.queue.send(command)
    }

    /// Queues `command` and waits until the callback has applied it.
    pub fn call(&self, command: DeckCommand) -> Result<Reply, DeckError> {
        self.queue.call(command)
    }

    pub fn goto(&self, seconds: f64) -> Result<(), DeckError> {
        self.send(DeckCommand::Goto { seconds })
    }

    pub fn skip(&self, seconds: f64) -> Result<(), DeckError> {
        self.send(DeckCommand::Skip { seconds })
    }

    pub fn scrub(&self, speed: f64) -> Result<(), DeckError> {
        self.send(DeckCommand::Scrub { speed })
    }

    pub fn play(&self) -> Result<(), DeckError> {
        self.send(DeckCommand::Play)
    }

    pub fn stop(&self) -> Result<(), DeckError> {
        self.send(DeckCommand::Stop)
    }

    pub fn record(&self) -> Result<(), DeckError> {
        self.send(DeckCommand::Record)
    }

    pub fn toggle_play(&self) -> Result<(), DeckError> {
        self.send(DeckCommand::TogglePlay)
    }

    pub fn toggle_record(&self) -> Result<(), DeckError> {
        self.send(DeckCommand::ToggleRecord)
    }

    pub fn punch_in(&self) -> Result<(), DeckError> {
        self.send(DeckCommand::PunchIn)
    }

    pub fn punch_out(&self) -> Result<(), DeckError> {
        self.send(DeckCommand::PunchOut)
    }

    pub fn set_solo(&self, solo: bool) -> Result<(), DeckError> {
        self.send(DeckCommand::SetSolo(solo))
    }

    pub fn toggle_solo(&self) -> Result<(), DeckError> {
        self.send(DeckCommand::ToggleSolo)
    }

    /// Reverts the loop to how it was when the last take started.
    /// Returns false when there is nothing to undo.
    pub fn undo(&self) -> Result<bool, DeckError> {
        match self.call(DeckCommand::Undo)? {
            Reply::Undone(restored) => Ok(restored),
            _ => Ok(false),
        }
    }

    /// Copy of the loop as of the next callback.
    pub fn snapshot(&self) -> Result<LoopBuffer, DeckError> {
        match self.call(DeckCommand::Snapshot)? {
            Reply::Blocks(blocks) => Ok(blocks),
            _ => Ok(LoopBuffer::new()),
        }
    }

    /// Swaps in a new loop, dropping the undo snapshot and rewinding to 0.
    pub fn replace(&self, blocks: LoopBuffer) -> Result<(), DeckError> {
        check_blocks(&self.format, &blocks)?;
        self.send(DeckCommand::Replace(blocks))
    }

    pub fn set_play_ahead(&self, blocks: usize) -> Result<(), DeckError> {
        self.send(DeckCommand::SetPlayAhead(blocks))
    }

    /// Returns once every command queued before this call has been applied.
    pub fn sync(&self) -> Result<(), DeckError> {
        self.call(DeckCommand::Sync).map(|_| ())
    }
}

fn check_blocks(format: &BlockFormat, blocks: &LoopBuffer) -> Result<(), DeckError> {
    let expected = format.samples_per_block();
    match blocks.iter().position(|b| b.len() != expected) {
        Some(idx) => Err(DeckError::invalid(format!(
            "block {} has {} samples, expected {}",
            idx,
            blocks.get(idx).map_or(0, SampleBlock::len),
            expected
        ))),
        None => Ok(()),
    }
}

/// Callback-side half of the deck. Owns the loop and the transport.
pub struct DeckProcessor {
    drain: CommandDrain,
    state: DeckState,
    status: Arc<ArcSwap<StatusSnapshot>>,
    // Previously published snapshot, refilled in place when no reader holds it.
    spare: Arc<StatusSnapshot>,
}

impl DeckProcessor {
    /// Adds a read-only track mixed under the loop at the same position.
    pub fn with_backing(mut self, backing: LoopBuffer) -> Result<Self, DeckError> {
        check_blocks(&self.state.format, &backing)?;
        self.state.backing = backing;
        Ok(self)
    }

    /// One callback: apply pending commands, then render one block.
    ///
    /// `input` must be exactly one block long.
    pub fn process(&mut self, input: &SampleBlock) -> SampleBlock {
        let state = &mut self.state;
        self.drain.drain(|command| state.apply(command));

        let output = self.state.render(input);
        self.publish();
        output
    }

    fn publish(&mut self) {
        let snapshot = self.state.status();
        match Arc::get_mut(&mut self.spare) {
            Some(slot) => *slot = snapshot,
            None => self.spare = Arc::new(snapshot),
        }
        self.spare = self.status.swap(self.spare.clone());
    }

    pub fn format(&self) -> BlockFormat {
        self.state.format
    }

    pub fn blocks(&self) -> &LoopBuffer {
        &self.state.blocks
    }

    pub fn mode(&self) -> Mode {
        self.state.transport.mode()
    }

    pub fn pos(&self) -> usize {
        self.state.transport.pos()
    }

    pub fn play_ahead(&self) -> usize {
        self.state.play_ahead
    }

    pub fn undo_available(&self) -> bool {
        self.state.undo.is_some()
    }

    pub fn into_blocks(self) -> LoopBuffer {
        self.state.blocks
    }
}

struct DeckState {
    format: BlockFormat,
    silence: SampleBlock,
    // Output scratch; only reallocated while a caller still holds the last block.
    mixed: SampleBlock,
    blocks: LoopBuffer,
    backing: LoopBuffer,
    undo: Option<LoopBuffer>,
    transport: Transport,
    play_ahead: usize,
    meter: f32,
    meter_decay: f32,
}

impl DeckState {
    fn apply(&mut self, command: DeckCommand) -> Reply {
        match command {
            DeckCommand::Goto { seconds } => {
                self.transport.goto(self.format.seconds_to_blocks(seconds));
            }
            DeckCommand::Skip { seconds } => {
                self.transport.skip(self.format.seconds_to_blocks(seconds));
            }
            DeckCommand::Scrub { speed } => self.transport.set_scrub(speed),
            DeckCommand::Play => self.event(TransportEvent::Play),
            DeckCommand::Stop => self.event(TransportEvent::Stop),
            DeckCommand::Record => self.event(TransportEvent::Record),
            DeckCommand::TogglePlay => self.event(TransportEvent::TogglePlay),
            DeckCommand::ToggleRecord => self.event(TransportEvent::ToggleRecord),
            DeckCommand::PunchIn => self.event(TransportEvent::PunchIn),
            DeckCommand::PunchOut => self.event(TransportEvent::PunchOut),
            DeckCommand::SetSolo(solo) => self.transport.set_solo(solo),
            DeckCommand::ToggleSolo => self.transport.toggle_solo(),
            DeckCommand::Undo => return Reply::Undone(self.undo()),
            DeckCommand::Snapshot => return Reply::Blocks(self.blocks.clone()),
            DeckCommand::Replace(blocks) => {
                self.blocks = blocks;
                self.undo = None;
                self.transport.goto(0);
                log::info!("[Deck] Loop replaced ({} blocks)", self.blocks.len());
            }
            DeckCommand::SetPlayAhead(blocks) => {
                self.play_ahead = blocks;
                log::info!("[Deck] Play-ahead set to {} blocks", blocks);
            }
            DeckCommand::Sync => {}
        }
        Reply::Applied
    }

    fn event(&mut self, event: TransportEvent) {
        if self.transport.apply(event) {
            self.undo = Some(self.blocks.clone());
            log::info!("[Deck] Take started at block {}", self.transport.pos());
        }
    }

    fn undo(&mut self) -> bool {
        self.event(TransportEvent::PunchOut);
        match self.undo.take() {
            Some(previous) => {
                self.blocks = previous;
                log::info!("[Deck] Undo: loop restored to {} blocks", self.blocks.len());
                true
            }
            None => false,
        }
    }

    fn render(&mut self, input: &SampleBlock) -> SampleBlock {
        self.transport.scrub_step();
        let pos = self.transport.pos();

        let output = if self.transport.is_audible() {
            sum_into(self.mixed.samples_mut(), &[self.blocks.get(pos), self.backing.get(pos)]);
            self.mixed.clone()
        } else {
            self.silence.clone()
        };

        // Record after reading so a take at the playhead is not heard twice.
        // Solo only mutes the loop, it still records.
        if self.transport.mode() == Mode::Recording {
            let target = pos as i64 - self.play_ahead as i64;
            self.blocks.record(target, input);
        }

        self.transport.advance();

        let level = if self.transport.solo() {
            peak_level(input)
        } else {
            mixed_peak(input, &output)
        };
        self.meter = (self.meter - self.meter_decay).max(level);

        output
    }

    fn status(&self) -> StatusSnapshot {
        status::project(
            &self.transport,
            self.blocks.len(),
            &self.format,
            self.meter,
            self.undo.is_some(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> DeckConfig {
        DeckConfig {
            format: BlockFormat {
                sample_rate: 400,
                channels: 2,
                frames_per_block: 4,
            },
            play_ahead: Some(0),
            ..Default::default()
        }
    }

    fn block(value: i16) -> SampleBlock {
        SampleBlock::from_samples(vec![value; 8])
    }

    #[test]
    fn test_new_rejects_malformed_blocks() {
        let blocks = LoopBuffer::from_blocks(vec![block(1), SampleBlock::silence(3)]);
        assert!(matches!(
            Deck::new(&small_config(), blocks),
            Err(DeckError::InvalidCommand(_))
        ));
    }

    #[test]
    fn test_stopped_deck_outputs_silence() {
        let blocks = LoopBuffer::from_blocks(vec![block(100)]);
        let (_deck, mut processor) = Deck::new(&small_config(), blocks).unwrap();
        let out = processor.process(&block(0));
        assert!(out.is_silent());
        assert_eq!(processor.pos(), 0);
    }

    #[test]
    fn test_playback_mixes_backing_track() {
        let blocks = LoopBuffer::from_blocks(vec![block(100), block(200)]);
        let backing = LoopBuffer::from_blocks(vec![block(1)]);
        let (deck, processor) = Deck::new(&small_config(), blocks).unwrap();
        let mut processor = processor.with_backing(backing).unwrap();

        deck.play().unwrap();
        assert_eq!(processor.process(&block(0)), block(101));
        assert_eq!(processor.process(&block(0)), block(200));
        assert!(processor.process(&block(0)).is_silent());
        assert_eq!(processor.pos(), 3);
    }

    #[test]
    fn test_recording_honours_play_ahead() {
        let config = DeckConfig {
            play_ahead: Some(2),
            ..small_config()
        };
        let (deck, mut processor) = Deck::new(&config, LoopBuffer::new()).unwrap();

        deck.record().unwrap();
        // Targets -2 and -1 are dropped, then block 2 lands at index 0.
        processor.process(&block(1));
        processor.process(&block(2));
        processor.process(&block(3));
        assert_eq!(processor.blocks().len(), 1);
        assert_eq!(processor.blocks().get(0), Some(&block(3)));
        assert_eq!(processor.pos(), 3);
    }

    #[test]
    fn test_solo_mutes_loop_but_still_records() {
        let blocks = LoopBuffer::from_blocks(vec![block(50)]);
        let (deck, mut processor) = Deck::new(&small_config(), blocks).unwrap();

        deck.set_solo(true).unwrap();
        deck.record().unwrap();
        let out = processor.process(&block(7));
        assert!(out.is_silent());
        assert_eq!(processor.blocks().get(0), Some(&block(57)));
        assert!(deck.get_status().solo);
    }

    #[test]
    fn test_meter_tracks_peak_and_decays() {
        let config = DeckConfig {
            meter_decay: 0.25,
            ..small_config()
        };
        let (deck, mut processor) = Deck::new(&config, LoopBuffer::new()).unwrap();

        processor.process(&block(16384));
        assert_eq!(deck.get_status().meter, 0.5);
        processor.process(&block(0));
        assert_eq!(deck.get_status().meter, 0.25);
        processor.process(&block(0));
        processor.process(&block(0));
        assert_eq!(deck.get_status().meter, 0.0);
    }

    #[test]
    fn test_meter_includes_output_unless_soloed() {
        let blocks = LoopBuffer::from_blocks(vec![block(8192), block(8192)]);
        let config = DeckConfig {
            meter_decay: 1.0,
            ..small_config()
        };
        let (deck, mut processor) = Deck::new(&config, blocks).unwrap();

        deck.play().unwrap();
        processor.process(&block(8192));
        assert_eq!(deck.get_status().meter, 0.5);

        deck.set_solo(true).unwrap();
        processor.process(&block(8192));
        assert_eq!(deck.get_status().meter, 0.25);
    }

    #[test]
    fn test_replace_rewinds_and_clears_undo() {
        let (deck, mut processor) = Deck::new(&small_config(), LoopBuffer::new()).unwrap();
        deck.record().unwrap();
        processor.process(&block(1));
        processor.process(&block(1));
        assert!(processor.undo_available());

        deck.replace(LoopBuffer::from_blocks(vec![block(9)])).unwrap();
        processor.process(&block(0));
        assert!(!processor.undo_available());
        assert_eq!(processor.mode(), Mode::Playing);
        assert_eq!(processor.blocks().len(), 1);
        assert_eq!(processor.pos(), 1);
    }

    #[test]
    fn test_replace_rejects_wrong_block_size() {
        let (deck, _processor) = Deck::new(&small_config(), LoopBuffer::new()).unwrap();
        let bad = LoopBuffer::from_blocks(vec![SampleBlock::silence(2048)]);
        assert!(matches!(deck.replace(bad), Err(DeckError::InvalidCommand(_))));
    }

    #[test]
    fn test_goto_rejects_non_finite_time() {
        let (deck, _processor) = Deck::new(&small_config(), LoopBuffer::new()).unwrap();
        assert!(matches!(deck.goto(f64::NAN), Err(DeckError::InvalidCommand(_))));
        assert!(matches!(deck.skip(f64::NEG_INFINITY), Err(DeckError::InvalidCommand(_))));
    }

    #[test]
    fn test_set_play_ahead_applies_on_next_block() {
        let (deck, mut processor) = Deck::new(&small_config(), LoopBuffer::new()).unwrap();
        deck.set_play_ahead(4).unwrap();
        assert_eq!(processor.play_ahead(), 0);
        processor.process(&block(0));
        assert_eq!(processor.play_ahead(), 4);
    }

    #[test]
    fn test_status_is_published_after_each_block() {
        let blocks = LoopBuffer::from_blocks(vec![block(1); 10]);
        let (deck, mut processor) = Deck::new(&small_config(), blocks).unwrap();

        let initial = deck.get_status();
        assert_eq!(initial.mode, Mode::Stopped);
        assert!((initial.end - 0.1).abs() < 1e-12);

        deck.play().unwrap();
        deck.goto(0.05).unwrap();
        assert_eq!(deck.get_status(), initial);

        processor.process(&block(0));
        let status = deck.get_status();
        assert_eq!(status.mode, Mode::Playing);
        assert_eq!(status.pos, 6);
    }

    #[test]
    fn test_playback_reuses_output_and_status_storage() {
        let blocks = LoopBuffer::from_blocks(vec![block(1), block(2), block(3), block(4)]);
        let (deck, mut processor) = Deck::new(&small_config(), blocks).unwrap();
        deck.play().unwrap();

        let first = processor.process(&block(0)).samples().as_ptr();
        let second = processor.process(&block(0)).samples().as_ptr();
        assert_eq!(first, second);

        // A block still held by the caller is never written over.
        let held = processor.process(&block(0));
        let next = processor.process(&block(2));
        assert_eq!(held, block(3));
        assert_eq!(next, block(4));

        let status_a = Arc::as_ptr(&processor.status.load_full());
        processor.process(&block(0));
        processor.process(&block(0));
        assert_eq!(Arc::as_ptr(&processor.status.load_full()), status_a);
        assert_eq!(deck.get_status().pos, 6);
    }
}
