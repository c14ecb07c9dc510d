//! Disk Latency Probe
//!
//! Overwrites one file with random data, timing each write+flush+sync
//! cycle, until interrupted. The file is deleted on exit.
//!
//! ## Usage
//!
//! ```bash
//! # Probe the disk backing /var/tmp until Ctrl-C
//! ./iolatency /var/tmp/iolatency.dat
//!
//! # Per-cycle timings, and a JSON summary on stdout at exit
//! ./iolatency --verbose --json /var/tmp/iolatency.dat
//! ```

use anyhow::{Context, Result};
use clap::{error::ErrorKind, Parser};
use iolatency::{logging, LatencyProbe, ProbeConfig};
use iolatency_common::EXIT_USAGE;
use std::{future::Future, path::PathBuf};

/// Disk write/fsync latency probe
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to file to write (created, overwritten, then deleted)
    path: PathBuf,

    /// Verbose logging
    #[clap(short, long)]
    verbose: bool,

    /// Print the session summary as JSON on exit
    #[clap(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(EXIT_USAGE);
        }
    };

    logging::init(args.verbose);

    // Listen before the file exists so an early signal still cleans up
    let shutdown = shutdown_signal().context("Failed to install signal handlers")?;

    let probe = LatencyProbe::open(ProbeConfig::new(&args.path))?;
    let outcome = probe.run(shutdown).await;

    // Failed sessions are summarized too, with "exit": "failed"
    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.summary)?);
    }

    outcome.into_result()?;
    Ok(())
}

/// Resolves on SIGINT or SIGTERM
#[cfg(unix)]
fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => {}
            _ = terminate.recv() => {}
        }
    })
}

/// Resolves on Ctrl-C
#[cfg(not(unix))]
fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Unable to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    })
}
