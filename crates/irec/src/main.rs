//! irec - record and replay keyboard and mouse input
//!
//! Supported: macOS, Linux (X11), Windows

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use inputrec::prelude::*;

#[derive(Parser)]
#[command(name = "irec")]
#[command(about = "Record global keyboard and mouse input and play it back")]
#[command(version)]
struct Cli {
    /// Directory recordings are kept in (default: ~/.inputrec)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record until Ctrl+Esc (or Ctrl+C)
    Record {
        /// Seconds to wait before capture starts
        #[arg(long, default_value = "3")]
        delay: u64,
        /// Minimum drag distance between reported moves
        #[arg(long, default_value = "5")]
        threshold: i32,
    },
    /// Play a recording back; Esc cancels
    Play {
        file: String,
        #[arg(short, long, default_value = "1.0")]
        speed: f64,
        #[arg(long, default_value = "3")]
        delay: u64,
    },
    /// List saved recordings
    List,
    /// Show recording info
    Show {
        file: String,
        #[arg(long)]
        all: bool,
    },
    /// Delete a recording
    Delete {
        file: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("inputrec=info,irec=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let result = open_store(cli.dir).and_then(|store| match cli.command {
        Commands::Record { delay, threshold } => record(store, delay, threshold),
        Commands::Play { file, speed, delay } => play(&store, &file, speed, delay),
        Commands::List => list(&store),
        Commands::Show { file, all } => show(&store, &file, all),
        Commands::Delete { file } => delete(&store, &file),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn open_store(dir: Option<PathBuf>) -> Result<RecordingStore> {
    Ok(match dir {
        Some(d) => RecordingStore::with_dir(d)?,
        None => RecordingStore::new()?,
    })
}

fn countdown(what: &str, secs: u64) -> Result<()> {
    for left in (1..=secs).rev() {
        print!("\r{} in {}...", what, left);
        io::stdout().flush()?;
        thread::sleep(Duration::from_secs(1));
    }
    if secs > 0 {
        println!();
    }
    Ok(())
}

fn record(store: RecordingStore, delay: u64, threshold: i32) -> Result<()> {
    let config = RecorderConfig {
        drag_threshold: threshold,
        ..Default::default()
    };
    let recorder = Arc::new(Recorder::with_config(RdevHook::new(), store, config));

    let stop = recorder.stopper();
    ctrlc::set_handler(move || stop.stop())?;

    countdown("Recording starts", delay)?;
    println!("Recording (Ctrl+Esc to stop)");

    let worker = {
        let recorder = recorder.clone();
        thread::spawn(move || recorder.start())
    };

    let mut count = 0;
    while !worker.is_finished() {
        let n = recorder.event_count();
        if n != count {
            count = n;
            print!("\r{} events", count);
            io::stdout().flush()?;
        }
        thread::sleep(Duration::from_millis(50));
    }

    let saved = worker
        .join()
        .map_err(|_| anyhow::anyhow!("recorder thread panicked"))??;
    println!();
    match saved {
        Some(path) => {
            let events = recorder.store().load(&path.to_string_lossy())?;
            println!("{} events recorded", events.len());
            println!("Saved: {}", path.display());
        }
        None => println!("Nothing recorded."),
    }
    Ok(())
}

fn play(store: &RecordingStore, file: &str, speed: f64, delay: u64) -> Result<()> {
    let events = store.load(file)?;
    let mut player = Player::new(RdevInjector::new())?;

    let cancel = player.cancel_flag();
    ctrlc::set_handler(move || cancel.cancel())?;

    println!("Playing {} ({} events) at {}x speed, Esc cancels", file, events.len(), speed);
    countdown("Starting", delay)?;

    let report = player.play_with_cancel_key(&RdevHook::new(), &events, speed)?;
    match report.outcome {
        Outcome::Completed => println!(
            "Done! {} events played, {} failed",
            report.dispatched, report.failed
        ),
        Outcome::Cancelled => println!(
            "Cancelled after {} events, {} skipped",
            report.dispatched, report.skipped
        ),
    }
    Ok(())
}

fn list(store: &RecordingStore) -> Result<()> {
    let files = store.list()?;
    if files.is_empty() {
        println!("No recordings in {}", store.path().display());
    } else {
        for f in files {
            println!("{}", f);
        }
    }
    Ok(())
}

fn show(store: &RecordingStore, file: &str, all: bool) -> Result<()> {
    let recording = store.load_recording(file)?;
    let events = &recording.events;
    println!("File: {}", file);
    println!("Started: {}", inputrec::storage::capture_stamp(recording.start_time));
    println!("Events: {}", events.len());
    if let Some(last) = events.last() {
        println!("Duration: {:.2}s", last.t());
    }

    let (mut keys, mut clicks, mut drags, mut drag_ends, mut scrolls) = (0, 0, 0, 0, 0);
    for e in events {
        match e {
            InputEvent::Key { .. } => keys += 1,
            InputEvent::Click { .. } => clicks += 1,
            InputEvent::DragMove { .. } => drags += 1,
            InputEvent::DragEnd { .. } => drag_ends += 1,
            InputEvent::Scroll { .. } => scrolls += 1,
        }
    }
    println!(
        "\nSummary: {} keys, {} clicks, {} drag moves, {} drags, {} scrolls",
        keys, clicks, drags, drag_ends, scrolls
    );
    if all {
        for (i, e) in events.iter().enumerate() {
            println!("{:>5} {:>9.3}s  {}", i, e.t(), e);
        }
    }
    Ok(())
}

fn delete(store: &RecordingStore, file: &str) -> Result<()> {
    store.delete(file)?;
    println!("Deleted: {}", file);
    Ok(())
}
