use overdub_shared::{Mode, StatusSnapshot};

const METER_WIDTH: usize = 20;

/// `m:ss:cc`, truncated to the centisecond.
pub fn format_time(seconds: f64) -> String {
    let centis = (seconds.max(0.0) * 100.0) as u64;
    let minutes = centis / 6000;
    let secs = (centis / 100) % 60;
    format!("{}:{:02}:{:02}", minutes, secs, centis % 100)
}

pub fn status_line(status: &StatusSnapshot) -> String {
    let mut flags = String::new();
    if status.undo_available {
        flags.push('*');
    }
    if status.solo {
        flags.push('s');
    }
    if !flags.is_empty() {
        flags.insert(0, ' ');
    }

    let bars = (status.meter.clamp(0.0, 1.0) * METER_WIDTH as f32).floor() as usize;
    format!(
        "{} / {} {}{} [{:<width$}]",
        format_time(status.time),
        format_time(status.end),
        status.mode,
        flags,
        "|".repeat(bars),
        width = METER_WIDTH
    )
}

/// Two characters for small terminals: a dot at the top of the loop and the mode.
pub fn minimal_line(status: &StatusSnapshot) -> String {
    let dot = if status.time < 0.1 { '.' } else { ' ' };
    let symbol = match status.mode {
        Mode::Recording => 'O',
        Mode::Playing => '>',
        Mode::Stopped => ' ',
    };
    format!(" {} {}", dot, symbol)
}
