use overdub_shared::{BlockFormat, StatusSnapshot};

use crate::transport::Transport;

/// Projects the deck's fields into a display snapshot. No side effects.
pub fn project(
    transport: &Transport,
    loop_len: usize,
    format: &BlockFormat,
    meter: f32,
    undo_available: bool,
) -> StatusSnapshot {
    StatusSnapshot {
        time: format.blocks_to_seconds(transport.pos()),
        end: format.blocks_to_seconds(loop_len),
        mode: transport.mode(),
        solo: transport.solo(),
        meter: meter.clamp(0.0, 1.0),
        undo_available,
        pos: transport.pos(),
    }
}
