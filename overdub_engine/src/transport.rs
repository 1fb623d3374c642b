/// Transport state machine: mode, playhead and the solo/scrub flags.
use overdub_shared::Mode;

/// Inputs to the mode state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    TogglePlay,
    ToggleRecord,
    Play,
    Record,
    Stop,
    PunchIn,
    PunchOut,
    /// goto/skip
    Reposition,
    /// scrub with a nonzero speed
    Scrub,
}

impl TransportEvent {
    pub const ALL: [TransportEvent; 9] = [
        TransportEvent::TogglePlay,
        TransportEvent::ToggleRecord,
        TransportEvent::Play,
        TransportEvent::Record,
        TransportEvent::Stop,
        TransportEvent::PunchIn,
        TransportEvent::PunchOut,
        TransportEvent::Reposition,
        TransportEvent::Scrub,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub mode: Mode,
    /// A new take begins: the loop must be snapshotted for undo.
    pub starts_take: bool,
}

/// Next mode for `event` in `mode`. Pairs with no listed effect leave the mode alone.
pub fn transition(mode: Mode, event: TransportEvent) -> Transition {
    use Mode::{Playing, Recording, Stopped};
    use TransportEvent as E;

    let next = match (mode, event) {
        (Stopped, E::TogglePlay) => Playing,
        (Playing | Recording, E::TogglePlay) => Stopped,
        (Stopped | Playing, E::ToggleRecord) => Recording,
        (Recording, E::ToggleRecord) => Playing,
        (_, E::Play) => Playing,
        (_, E::Record) => Recording,
        (_, E::Stop) => Stopped,
        (_, E::PunchIn) => Recording,
        (Recording, E::PunchOut | E::Reposition | E::Scrub) => Playing,
        (Stopped | Playing, E::PunchOut | E::Reposition | E::Scrub) => mode,
    };

    // An explicit record always re-arms undo, even mid-take.
    let starts_take = match event {
        E::Record => true,
        _ => next == Recording && mode != Recording,
    };

    Transition {
        mode: next,
        starts_take,
    }
}

#[derive(Debug, Clone, Default)]
pub struct Transport {
    mode: Mode,
    pos: usize,
    solo: bool,
    scrub_speed: f64,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn solo(&self) -> bool {
        self.solo
    }

    pub fn scrub_speed(&self) -> f64 {
        self.scrub_speed
    }

    pub fn is_scrubbing(&self) -> bool {
        self.scrub_speed != 0.0
    }

    /// Loop output is heard while rolling or scrubbing, unless soloed.
    pub fn is_audible(&self) -> bool {
        (self.mode.is_rolling() || self.is_scrubbing()) && !self.solo
    }

    /// Returns true when a new take starts.
    pub fn apply(&mut self, event: TransportEvent) -> bool {
        let t = transition(self.mode, event);
        self.mode = t.mode;
        t.starts_take
    }

    pub fn goto(&mut self, pos: i64) {
        self.apply(TransportEvent::Reposition);
        self.pos = pos.max(0) as usize;
    }

    pub fn skip(&mut self, delta: i64) {
        self.apply(TransportEvent::Reposition);
        self.pos = offset(self.pos, delta);
    }

    pub fn set_scrub(&mut self, speed: f64) {
        if speed != 0.0 {
            self.apply(TransportEvent::Scrub);
        }
        self.scrub_speed = speed;
    }

    pub fn set_solo(&mut self, solo: bool) {
        self.solo = solo;
    }

    pub fn toggle_solo(&mut self) {
        self.solo = !self.solo;
    }

    /// Winds the playhead by the rounded scrub speed.
    pub fn scrub_step(&mut self) {
        if self.is_scrubbing() {
            self.pos = offset(self.pos, self.scrub_speed.round() as i64);
        }
    }

    /// Moves one block forward when rolling.
    pub fn advance(&mut self) {
        if self.mode.is_rolling() {
            self.pos += 1;
        }
    }
}

fn offset(pos: usize, delta: i64) -> usize {
    (pos as i64).saturating_add(delta).max(0) as usize
}
