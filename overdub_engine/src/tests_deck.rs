#[cfg(test)]
mod tests {
    use crate::block::{mix, SampleBlock};
    use crate::config::DeckConfig;
    use crate::deck::{Deck, DeckProcessor};
    use crate::error::DeckError;
    use crate::loop_buffer::LoopBuffer;
    use overdub_shared::{BlockFormat, Mode};
    use std::thread;

    // 100 blocks per second keeps the seconds <-> blocks arithmetic readable.
    fn config() -> DeckConfig {
        DeckConfig {
            format: BlockFormat {
                sample_rate: 800,
                channels: 2,
                frames_per_block: 8,
            },
            play_ahead: Some(0),
            ..Default::default()
        }
    }

    fn block(seed: i16) -> SampleBlock {
        SampleBlock::from_samples((0..16).map(|i| seed.wrapping_mul(i + 1)).collect())
    }

    fn silence() -> SampleBlock {
        SampleBlock::silence(16)
    }

    /// Runs `f` on a controller thread while the callback keeps ticking.
    fn while_running<T: Send>(processor: &mut DeckProcessor, f: impl FnOnce() -> T + Send) -> T {
        thread::scope(|s| {
            let caller = s.spawn(f);
            while !caller.is_finished() {
                processor.process(&silence());
                thread::yield_now();
            }
            caller.join().unwrap()
        })
    }

    #[test]
    fn test_scenario_record_play_undo() {
        let (deck, mut processor) = Deck::new(&config(), LoopBuffer::new()).unwrap();
        let x = block(3);

        deck.record().unwrap();
        processor.process(&x);
        assert_eq!(processor.mode(), Mode::Recording);
        assert!(processor.undo_available());
        assert_eq!(processor.blocks(), &LoopBuffer::from_blocks(vec![x.clone()]));
        assert_eq!(processor.pos(), 1);

        deck.stop().unwrap();
        deck.goto(0.0).unwrap();
        deck.play().unwrap();
        let out = processor.process(&silence());
        assert_eq!(processor.mode(), Mode::Playing);
        assert_eq!(out, x);

        let restored = while_running(&mut processor, || deck.undo());
        assert!(restored.unwrap());
        assert!(processor.blocks().is_empty());
        assert!(!processor.undo_available());

        let again = while_running(&mut processor, || deck.undo());
        assert!(!again.unwrap());
    }

    #[test]
    fn test_scenario_scrub_while_playing() {
        let (deck, mut processor) = Deck::new(&config(), LoopBuffer::new()).unwrap();
        deck.goto(0.1).unwrap();
        deck.play().unwrap();
        processor.process(&silence());
        let initial = processor.pos();
        assert_eq!(initial, 11);

        deck.scrub(2.0).unwrap();
        for _ in 0..5 {
            processor.process(&silence());
        }
        assert_eq!(processor.pos(), initial + 15);
    }

    #[test]
    fn test_scrub_while_stopped_is_audible() {
        let blocks = LoopBuffer::from_blocks(vec![block(1), block(2), block(3)]);
        let (deck, mut processor) = Deck::new(&config(), blocks).unwrap();

        deck.scrub(1.0).unwrap();
        let out = processor.process(&silence());
        assert_eq!(processor.mode(), Mode::Stopped);
        assert_eq!(out, block(2));
        assert_eq!(processor.pos(), 1);

        deck.scrub(0.0).unwrap();
        assert!(processor.process(&silence()).is_silent());
    }

    #[test]
    fn test_undo_reverses_exactly_one_take() {
        let original = LoopBuffer::from_blocks(vec![block(10), block(20)]);
        let (deck, mut processor) = Deck::new(&config(), original.clone()).unwrap();

        deck.record().unwrap();
        for seed in [1, 2, 3] {
            processor.process(&block(seed));
        }
        assert_eq!(processor.blocks().len(), 3);
        let after_first_take = processor.blocks().clone();

        // Second take supersedes the first snapshot.
        deck.punch_out().unwrap();
        deck.punch_in().unwrap();
        processor.process(&block(4));
        assert_eq!(processor.blocks().len(), 4);

        assert!(while_running(&mut processor, || deck.undo()).unwrap());
        assert_eq!(processor.blocks(), &after_first_take);
        assert_ne!(processor.blocks(), &original);
        assert!(!while_running(&mut processor, || deck.undo()).unwrap());
    }

    #[test]
    fn test_undo_while_recording_stops_the_take_first() {
        let (deck, mut processor) = Deck::new(&config(), LoopBuffer::new()).unwrap();
        deck.record().unwrap();
        processor.process(&block(5));

        assert!(while_running(&mut processor, || deck.undo()).unwrap());
        assert_eq!(processor.mode(), Mode::Playing);
        assert!(processor.blocks().is_empty());

        // Ticks after the undo play back, they do not record.
        processor.process(&block(6));
        assert!(processor.blocks().is_empty());
    }

    #[test]
    fn test_record_then_read_back_mixes_with_existing() {
        let existing = LoopBuffer::from_blocks(vec![block(7), block(8)]);
        let (deck, mut processor) = Deck::new(&config(), existing).unwrap();

        deck.goto(0.01).unwrap();
        deck.record().unwrap();
        processor.process(&block(2));
        processor.process(&block(9));

        deck.goto(0.01).unwrap();
        deck.play().unwrap();
        assert_eq!(processor.process(&silence()), mix(&block(8), &block(2)));
        assert_eq!(processor.process(&silence()), block(9));
    }

    #[test]
    fn test_recording_past_end_pads_with_silence() {
        let (deck, mut processor) = Deck::new(&config(), LoopBuffer::from_blocks(vec![block(1)])).unwrap();

        deck.goto(0.04).unwrap();
        deck.record().unwrap();
        processor.process(&block(2));

        let blocks = processor.blocks();
        assert_eq!(blocks.len(), 5);
        assert_eq!(blocks.get(0), Some(&block(1)));
        for pos in 1..4 {
            assert!(blocks.get(pos).unwrap().is_silent());
        }
        assert_eq!(blocks.get(4), Some(&block(2)));
    }

    #[test]
    fn test_goto_while_recording_keeps_playing() {
        let (deck, mut processor) = Deck::new(&config(), LoopBuffer::new()).unwrap();
        deck.record().unwrap();
        processor.process(&block(1));
        deck.skip(-1.0).unwrap();
        processor.process(&block(1));
        assert_eq!(processor.mode(), Mode::Playing);
        assert_eq!(processor.pos(), 1);
        assert_eq!(processor.blocks().len(), 1);
    }

    #[test]
    fn test_concurrent_controllers_serialize() {
        let (deck, mut processor) = Deck::new(&config(), LoopBuffer::new()).unwrap();

        thread::scope(|s| {
            let workers: Vec<_> = (0..4)
                .map(|_| {
                    let deck = deck.clone();
                    s.spawn(move || {
                        for _ in 0..25 {
                            deck.skip(0.01).unwrap();
                        }
                        deck.sync().unwrap();
                    })
                })
                .collect();
            while !workers.iter().all(|w| w.is_finished()) {
                processor.process(&silence());
                thread::yield_now();
            }
        });

        assert_eq!(processor.mode(), Mode::Stopped);
        assert_eq!(processor.pos(), 100);
    }

    #[test]
    fn test_sync_orders_against_later_reads() {
        let (deck, mut processor) = Deck::new(&config(), LoopBuffer::new()).unwrap();
        while_running(&mut processor, || {
            deck.goto(0.5).unwrap();
            deck.sync().unwrap();
        });
        assert_eq!(processor.pos(), 50);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let (deck, mut processor) = Deck::new(&config(), LoopBuffer::new()).unwrap();
        deck.record().unwrap();
        processor.process(&block(1));

        let snapshot = while_running(&mut processor, || deck.snapshot()).unwrap();
        let len_at_snapshot = snapshot.len();
        processor.process(&block(1));
        processor.process(&block(1));
        assert_eq!(snapshot.len(), len_at_snapshot);
        assert!(processor.blocks().len() > len_at_snapshot);
    }

    #[test]
    fn test_synchronous_call_fails_once_processor_is_gone() {
        let (deck, processor) = Deck::new(&config(), LoopBuffer::new()).unwrap();
        drop(processor);
        assert!(matches!(deck.undo(), Err(DeckError::Disconnected)));
        assert!(matches!(deck.play(), Err(DeckError::Disconnected)));
    }
}
