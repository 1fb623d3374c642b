use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use crate::error::DeckError;
use crate::loop_buffer::LoopBuffer;

/// Closed set of requests a controller can make of the deck.
#[derive(Debug)]
pub enum DeckCommand {
    Goto { seconds: f64 },
    Skip { seconds: f64 },
    Scrub { speed: f64 },
    Play,
    Stop,
    Record,
    TogglePlay,
    ToggleRecord,
    PunchIn,
    PunchOut,
    SetSolo(bool),
    ToggleSolo,
    Undo,
    // Loop management (no I/O on the callback thread)
    Snapshot,
    Replace(LoopBuffer),
    SetPlayAhead(usize),
    // Barrier: applies nothing, completes once everything before it has
    Sync,
}

impl DeckCommand {
    /// Rejects requests that could never be applied, before they are queued.
    pub fn validate(&self) -> Result<(), DeckError> {
        match self {
            DeckCommand::Goto { seconds } | DeckCommand::Skip { seconds } if !seconds.is_finite() => {
                Err(DeckError::invalid(format!("time must be finite, got {}", seconds)))
            }
            DeckCommand::Scrub { speed } if !speed.is_finite() => {
                Err(DeckError::invalid(format!("scrub speed must be finite, got {}", speed)))
            }
            _ => Ok(()),
        }
    }
}

/// Result handed back to a synchronous caller once its command was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Applied,
    Undone(bool),
    Blocks(LoopBuffer),
}

struct Request {
    command: DeckCommand,
    reply_tx: Option<Sender<Reply>>,
}

/// Producer side of the deck mailbox. Cheap to clone, one per controller.
#[derive(Clone)]
pub struct CommandQueue {
    tx: Sender<Request>,
}

/// Consumer side, owned by the audio callback.
pub struct CommandDrain {
    rx: Receiver<Request>,
}

pub fn command_queue() -> (CommandQueue, CommandDrain) {
    let (tx, rx) = unbounded();
    (CommandQueue { tx }, CommandDrain { rx })
}

impl CommandQueue {
    /// Fire and forget.
    pub fn send(&self, command: DeckCommand) -> Result<(), DeckError> {
        command.validate()?;
        self.tx
            .send(Request { command, reply_tx: None })
            .map_err(|_| DeckError::Disconnected)
    }

    /// Blocks until the callback has applied `command` and returns its reply.
    ///
    /// Waits for the next callback invocation; there is no timeout.
    pub fn call(&self, command: DeckCommand) -> Result<Reply, DeckError> {
        command.validate()?;
        let (reply_tx, reply_rx) = bounded(1);
        self.tx
            .send(Request {
                command,
                reply_tx: Some(reply_tx),
            })
            .map_err(|_| DeckError::Disconnected)?;
        reply_rx.recv().map_err(|_| DeckError::Disconnected)
    }
}

impl CommandDrain {
    /// Applies the requests queued so far, oldest first. Never blocks.
    ///
    /// Requests arriving while draining wait for the next call, which keeps
    /// the work per callback bounded.
    pub fn drain(&self, mut apply: impl FnMut(DeckCommand) -> Reply) -> usize {
        let pending = self.rx.len();
        let mut applied = 0;

        for _ in 0..pending {
            let Ok(request) = self.rx.try_recv() else {
                break;
            };
            let reply = apply(request.command);
            if let Some(reply_tx) = request.reply_tx {
                // One-shot with capacity 1: never blocks. The caller may have gone away.
                let _ = reply_tx.try_send(reply);
            }
            applied += 1;
        }

        applied
    }
}
