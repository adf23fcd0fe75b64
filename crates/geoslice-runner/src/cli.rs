//! Command-line arguments.
//!
//! Flags override the matching fields of the loaded [`TilerConfig`].

use crate::config::TilerConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Slice a global elevation raster into 16-bit PNG sector and chunk tiles.
#[derive(Debug, Parser)]
#[command(name = "geoslice", version, about)]
pub struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Log warnings and errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Log filter forced by `-v`/`-q`, if any.
    pub fn log_level_override(&self) -> Option<&'static str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("warn")
        } else {
            None
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download the source raster if it is not already present
    Fetch(FetchArgs),
    /// Slice the source raster into tiles
    Slice(SliceArgs),
    /// Fetch if missing, then slice
    Run(RunArgs),
    /// Describe the source raster and the state of the output
    Inspect(InspectArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct FetchArgs {
    /// URL to download the raster from
    #[arg(long)]
    pub url: Option<String>,

    /// Where to store the raster
    #[arg(long)]
    pub dest: Option<PathBuf>,

    /// Free space required before downloading, in GiB
    #[arg(long)]
    pub min_free_gb: Option<u64>,
}

impl FetchArgs {
    pub fn apply(&self, config: &mut TilerConfig) {
        if let Some(url) = &self.url {
            config.download_url = url.clone();
        }
        if let Some(dest) = &self.dest {
            config.input = dest.clone();
        }
        if let Some(gb) = self.min_free_gb {
            config.min_free_gb = gb;
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct SliceArgs {
    /// Source raster
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Output root directory
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Rewrite sectors that are already complete
    #[arg(long)]
    pub no_resume: bool,

    /// Worker threads
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

impl SliceArgs {
    pub fn apply(&self, config: &mut TilerConfig) {
        if let Some(input) = &self.input {
            config.input = input.clone();
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if self.no_resume {
            config.resume = false;
        }
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// URL to download the raster from
    #[arg(long)]
    pub url: Option<String>,

    /// Free space required before downloading, in GiB
    #[arg(long)]
    pub min_free_gb: Option<u64>,

    #[command(flatten)]
    pub slice: SliceArgs,
}

impl RunArgs {
    pub fn apply(&self, config: &mut TilerConfig) {
        FetchArgs {
            url: self.url.clone(),
            dest: None,
            min_free_gb: self.min_free_gb,
        }
        .apply(config);
        self.slice.apply(config);
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct InspectArgs {
    /// Source raster
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Output root to report progress for
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl InspectArgs {
    pub fn apply(&self, config: &mut TilerConfig) {
        if let Some(input) = &self.input {
            config.input = input.clone();
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
    }
}
