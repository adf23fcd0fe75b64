//! `geoslice` command-line entry point.

use anyhow::{Context, Result};
use clap::Parser;
use geoslice_dem::FetchOutcome;
use geoslice_runner::{commands, Cli, Command, TilerConfig};
use geoslice_tiler::RunOutcome;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Exit status after Ctrl+C, as shells report for SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("geoslice: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(cli: &Cli) {
    let filter = match cli.log_level_override() {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => TilerConfig::load(path).with_context(|| format!("Loading {}", path.display()))?,
        None => TilerConfig::default(),
    };

    match &cli.command {
        Command::Fetch(args) => args.apply(&mut config),
        Command::Slice(args) => args.apply(&mut config),
        Command::Run(args) => args.apply(&mut config),
        Command::Inspect(args) => args.apply(&mut config),
    }
    config.validate()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Received interrupt, finishing the current step...");
        shutdown_clone.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    match cli.command {
        Command::Fetch(_) => {
            if !fetch(&config, &shutdown)? {
                return Ok(ExitCode::from(EXIT_INTERRUPTED));
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Slice(_) => slice(&config, &shutdown),
        Command::Run(_) => {
            if !fetch(&config, &shutdown)? || shutdown.load(Ordering::SeqCst) {
                return Ok(ExitCode::from(EXIT_INTERRUPTED));
            }
            slice(&config, &shutdown)
        }
        Command::Inspect(_) => {
            let report = commands::inspect(&config)?;
            println!("{}", report);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Returns `false` when Ctrl+C cancelled the download.
fn fetch(config: &TilerConfig, shutdown: &Arc<AtomicBool>) -> Result<bool> {
    match commands::fetch(config, shutdown) {
        Ok(FetchOutcome::AlreadyPresent) => info!("{} already present", config.input.display()),
        Ok(FetchOutcome::Downloaded { bytes }) => {
            info!("Saved {} ({} bytes)", config.input.display(), bytes)
        }
        Err(e) if commands::is_cancelled(&e) => {
            eprintln!("Download cancelled; run again to restart it.");
            return Ok(false);
        }
        Err(e) => return Err(e),
    }
    Ok(true)
}

fn slice(config: &TilerConfig, shutdown: &Arc<AtomicBool>) -> Result<ExitCode> {
    match commands::slice(config, shutdown)? {
        Ok(summary) => match summary.outcome {
            RunOutcome::Interrupted => {
                eprintln!("Interrupted: {}", summary);
                eprintln!("Run again to resume.");
                Ok(ExitCode::from(EXIT_INTERRUPTED))
            }
            _ => {
                println!("Completed all sectors: {}", summary);
                Ok(ExitCode::SUCCESS)
            }
        },
        Err(aborted) => {
            error!("{} sectors failed", aborted.failures.len());
            eprintln!("geoslice: {}", aborted);
            for failure in aborted.failures.iter().skip(1) {
                eprintln!("  also failed: {}", failure);
            }
            eprintln!("Progress before abort: {}", aborted.summary);
            Ok(ExitCode::FAILURE)
        }
    }
}
