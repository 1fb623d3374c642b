//! Maps performer input to deck operations.
//!
//! Each controller only translates events; sending is left to the caller so
//! the mappings can be checked without a running deck. The terminal is wired
//! up in the binary; gamepad and pedal event sources plug in through
//! [`map_gamepad`] and [`map_pedal`].

use overdub_engine::{DeckCommand, DeckError};

/// What a line typed at the terminal asks for.
#[derive(Debug)]
pub enum Action {
    Deck(DeckCommand),
    Undo,
    SaveSnapshot,
    Quit,
}

/// Parses one line from the terminal controller, without its trailing newline.
pub fn parse_line(line: &str) -> Result<Action, DeckError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let action = match line {
        "" => Action::Deck(DeckCommand::ToggleRecord),
        " " => Action::Deck(DeckCommand::TogglePlay),
        "<" => Action::Deck(DeckCommand::Skip { seconds: -1.0 }),
        ">" => Action::Deck(DeckCommand::Skip { seconds: 1.0 }),
        "u" => Action::Undo,
        "s" => Action::SaveSnapshot,
        "q" => Action::Quit,
        _ => {
            let mut words = line.split_whitespace();
            let word = words.next().unwrap_or_default();
            let arg = words.next();
            if words.next().is_some() {
                return Err(DeckError::invalid(format!("too many arguments: {:?}", line)));
            }
            match (word, arg) {
                ("play", None) => Action::Deck(DeckCommand::Play),
                ("stop", None) => Action::Deck(DeckCommand::Stop),
                ("rec", None) => Action::Deck(DeckCommand::Record),
                ("in", None) => Action::Deck(DeckCommand::PunchIn),
                ("out", None) => Action::Deck(DeckCommand::PunchOut),
                ("solo", None) => Action::Deck(DeckCommand::ToggleSolo),
                ("g", Some(arg)) => Action::Deck(DeckCommand::Goto { seconds: number(arg)? }),
                ("k", Some(arg)) => Action::Deck(DeckCommand::Scrub { speed: number(arg)? }),
                _ => return Err(DeckError::invalid(format!("unknown command {:?}", line))),
            }
        }
    };
    if let Action::Deck(command) = &action {
        command.validate()?;
    }
    Ok(action)
}

fn number(arg: &str) -> Result<f64, DeckError> {
    arg.parse::<f64>()
        .map_err(|_| DeckError::invalid(format!("not a number: {:?}", arg)))
}

/// Decoded gamepad input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GamepadEvent {
    Button { index: u8, pressed: bool },
    Axis { index: u8, value: f32 },
}

const SCRUB_AXIS: u8 = 3;
const SCRUB_SCALE: f64 = -100.0;
const AXIS_DEAD_ZONE: f32 = 0.01;
const SOLO_BUTTON: u8 = 9;

pub fn map_gamepad(event: GamepadEvent) -> Option<DeckCommand> {
    match event {
        GamepadEvent::Button { index: SOLO_BUTTON, pressed } => Some(DeckCommand::SetSolo(pressed)),
        GamepadEvent::Button { pressed: false, .. } => None,
        GamepadEvent::Button { index, pressed: true } => match index {
            0 => Some(DeckCommand::Record),
            1 => Some(DeckCommand::Stop),
            2 => Some(DeckCommand::Play),
            3 => Some(DeckCommand::Goto { seconds: 0.0 }),
            _ => None,
        },
        GamepadEvent::Axis { index: SCRUB_AXIS, value } => {
            let value = if value.abs() < AXIS_DEAD_ZONE { 0.0 } else { value as f64 };
            Some(DeckCommand::Scrub { speed: SCRUB_SCALE * value })
        }
        GamepadEvent::Axis { .. } => None,
    }
}

const SUSTAIN_CC: u8 = 64;

/// Sustain pedal: fully down punches in, fully up punches out.
pub fn map_pedal(controller: u8, value: u8) -> Option<DeckCommand> {
    match (controller, value) {
        (SUSTAIN_CC, 127) => Some(DeckCommand::PunchIn),
        (SUSTAIN_CC, 0) => Some(DeckCommand::PunchOut),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(line: &str) -> DeckCommand {
        match parse_line(line) {
            Ok(Action::Deck(command)) => command,
            other => panic!("{:?} parsed as {:?}", line, other),
        }
    }

    #[test]
    fn test_single_key_lines() {
        assert!(matches!(command(""), DeckCommand::ToggleRecord));
        assert!(matches!(command("\n"), DeckCommand::ToggleRecord));
        assert!(matches!(command(" "), DeckCommand::TogglePlay));
        assert!(matches!(command("<"), DeckCommand::Skip { seconds } if seconds == -1.0));
        assert!(matches!(command(">"), DeckCommand::Skip { seconds } if seconds == 1.0));
        assert!(matches!(parse_line("u"), Ok(Action::Undo)));
        assert!(matches!(parse_line("s"), Ok(Action::SaveSnapshot)));
        assert!(matches!(parse_line("q"), Ok(Action::Quit)));
    }

    #[test]
    fn test_word_commands() {
        assert!(matches!(command("play"), DeckCommand::Play));
        assert!(matches!(command("stop"), DeckCommand::Stop));
        assert!(matches!(command("rec"), DeckCommand::Record));
        assert!(matches!(command("in"), DeckCommand::PunchIn));
        assert!(matches!(command("out"), DeckCommand::PunchOut));
        assert!(matches!(command("solo"), DeckCommand::ToggleSolo));
        assert!(matches!(command("g 2.5"), DeckCommand::Goto { seconds } if seconds == 2.5));
        assert!(matches!(command("k -3"), DeckCommand::Scrub { speed } if speed == -3.0));
    }

    #[test]
    fn test_bad_lines_are_invalid() {
        for line in ["x", "g", "g abc", "k 1 2", "play now", "g NaN", "k inf"] {
            assert!(
                matches!(parse_line(line), Err(DeckError::InvalidCommand(_))),
                "{:?} should be rejected",
                line
            );
        }
    }

    #[test]
    fn test_gamepad_buttons() {
        let press = |index| map_gamepad(GamepadEvent::Button { index, pressed: true });
        assert!(matches!(press(0), Some(DeckCommand::Record)));
        assert!(matches!(press(1), Some(DeckCommand::Stop)));
        assert!(matches!(press(2), Some(DeckCommand::Play)));
        assert!(matches!(press(3), Some(DeckCommand::Goto { seconds }) if seconds == 0.0));
        assert!(press(4).is_none());
        assert!(map_gamepad(GamepadEvent::Button { index: 0, pressed: false }).is_none());
    }

    #[test]
    fn test_gamepad_solo_follows_button() {
        assert!(matches!(
            map_gamepad(GamepadEvent::Button { index: 9, pressed: true }),
            Some(DeckCommand::SetSolo(true))
        ));
        assert!(matches!(
            map_gamepad(GamepadEvent::Button { index: 9, pressed: false }),
            Some(DeckCommand::SetSolo(false))
        ));
    }

    #[test]
    fn test_gamepad_scrub_axis() {
        let axis = |index, value| map_gamepad(GamepadEvent::Axis { index, value });
        assert!(matches!(axis(3, 0.5), Some(DeckCommand::Scrub { speed }) if speed == -50.0));
        assert!(matches!(axis(3, -1.0), Some(DeckCommand::Scrub { speed }) if speed == 100.0));
        assert!(matches!(axis(3, 0.005), Some(DeckCommand::Scrub { speed }) if speed == 0.0));
        assert!(axis(1, 0.5).is_none());
    }

    #[test]
    fn test_pedal() {
        assert!(matches!(map_pedal(64, 127), Some(DeckCommand::PunchIn)));
        assert!(matches!(map_pedal(64, 0), Some(DeckCommand::PunchOut)));
        assert!(map_pedal(64, 64).is_none());
        assert!(map_pedal(7, 127).is_none());
    }
}
