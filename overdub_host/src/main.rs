use anyhow::Result;
use clap::Parser;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use overdub_engine::engine::list_devices;
use overdub_engine::{wav, AudioEngine, Deck};
use overdub_host::display::{minimal_line, status_line};
use overdub_host::{parse_line, session, Action};
use overdub_shared::BlockFormat;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

const STATUS_INTERVAL: Duration = Duration::from_millis(50);

/// Record and overdub a loop from the terminal.
#[derive(Parser, Debug)]
#[command(name = "overdub", version)]
struct Args {
    /// WAV file to continue from and save to on exit
    file: Option<PathBuf>,

    /// JSON deck configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Recording latency in blocks (estimated from the device when omitted)
    #[arg(long)]
    play_ahead: Option<usize>,

    #[arg(long)]
    input_device: Option<usize>,

    #[arg(long)]
    output_device: Option<usize>,

    /// WAV file played along with the loop, never recorded into
    #[arg(long)]
    backing: Option<PathBuf>,

    /// Print audio devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Two-character status display
    #[arg(long)]
    minimalist: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.list_devices {
        let devices = list_devices()?;
        println!("Input devices:");
        for (index, name) in &devices.inputs {
            println!("  {}: {}", index, name);
        }
        println!("Output devices:");
        for (index, name) in &devices.outputs {
            println!("  {}: {}", index, name);
        }
        return Ok(());
    }

    let mut config = session::load_config(args.config.as_deref())?;
    if args.play_ahead.is_some() {
        config.play_ahead = args.play_ahead;
    }
    if args.input_device.is_some() {
        config.input_device = args.input_device;
    }
    if args.output_device.is_some() {
        config.output_device = args.output_device;
    }

    let output = session::output_path(args.file.as_deref());
    let blocks = session::load_initial(&output, &config.format)?;

    let (deck, mut processor) = Deck::new(&config, blocks)?;
    if let Some(backing) = &args.backing {
        let backing = wav::load(backing, &config.format)?;
        log::info!("[Host] Backing track: {} blocks", backing.len());
        processor = processor.with_backing(backing)?;
    }

    let engine = AudioEngine::start(&config, &deck, processor)?;
    log::info!("[Host] Running at {} Hz, saving to {}", engine.sample_rate, output.display());

    let (quit_tx, quit_rx) = bounded::<()>(1);
    {
        let deck = deck.clone();
        let snapshot = session::snapshot_path(&output);
        thread::spawn(move || run_terminal(deck, snapshot, quit_tx));
    }

    let result = loop {
        match quit_rx.recv_timeout(STATUS_INTERVAL) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break Ok(()),
            Err(RecvTimeoutError::Timeout) => {}
        }
        if let Some(e) = engine.device_error() {
            break Err(e);
        }

        let status = deck.get_status();
        let line = if args.minimalist { minimal_line(&status) } else { status_line(&status) };
        let mut stdout = std::io::stdout().lock();
        let _ = write!(stdout, "\r{}", line);
        let _ = stdout.flush();
    };
    println!();

    // Streams go first so the loop is complete when it is written.
    let blocks = engine.shutdown();
    session::save(&output, &blocks, &config.format)?;

    result.map_err(Into::into)
}

/// Controller thread: one command per line until `q` or end of input.
fn run_terminal(deck: Deck, snapshot: PathBuf, quit_tx: Sender<()>) {
    let format = deck.format();
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::error!("[Host] Reading input failed: {}", e);
                break;
            }
        };

        let action = match parse_line(&line) {
            Ok(action) => action,
            Err(e) => {
                log::warn!("[Host] {}", e);
                continue;
            }
        };

        let outcome: Result<()> = match action {
            Action::Deck(command) => deck.send(command).map_err(Into::into),
            Action::Undo => deck.undo().map(|undone| {
                if !undone {
                    log::info!("[Host] Nothing to undo");
                }
            }).map_err(Into::into),
            Action::SaveSnapshot => save_snapshot(&deck, &snapshot, &format),
            Action::Quit => break,
        };
        if let Err(e) = outcome {
            log::error!("[Host] {:#}", e);
        }
    }
    let _ = quit_tx.send(());
}

fn save_snapshot(deck: &Deck, path: &Path, format: &BlockFormat) -> Result<()> {
    let blocks = deck.snapshot()?;
    session::save(path, &blocks, format)?;
    Ok(())
}
