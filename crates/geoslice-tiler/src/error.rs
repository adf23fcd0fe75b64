//! Error types for the tiler crate.

use geoslice_dem::DemError;
use geoslice_grid::{GridError, PixelWindow, SectorId};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::RunSummary;

/// Errors that can occur while slicing one sector.
#[derive(Debug, Error)]
pub enum TilerError {
    /// Reading the sector's window from the source failed.
    #[error("Failed to read {sector} window {window}: {source}")]
    Read {
        /// Sector being read.
        sector: SectorId,
        /// Window being read.
        window: PixelWindow,
        /// Underlying raster error.
        source: DemError,
    },

    /// A worker could not open its own handle on the source raster.
    #[error("Failed to open source raster: {0}")]
    Open(String),

    /// Creating a directory or writing an image file failed.
    #[error("Failed to write {path}: {reason}")]
    WriteFailure {
        /// Path being written.
        path: PathBuf,
        /// Why the write failed.
        reason: String,
    },

    /// The PNG encoder rejected an image.
    #[error("Failed to encode {path}: {source}")]
    Image {
        /// Path the image was destined for.
        path: PathBuf,
        /// Underlying encoder error.
        source: image::ImageError,
    },

    /// Invalid grid configuration.
    #[error("Invalid grid: {0}")]
    Grid(#[from] GridError),
}

/// One sector that failed, with enough context to find it again.
#[derive(Debug)]
pub struct SectorFailure {
    /// The failing sector.
    pub sector: SectorId,
    /// The sector's pixel window.
    pub window: PixelWindow,
    /// What went wrong.
    pub error: TilerError,
}

impl fmt::Display for SectorFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sector {} ({}): {}", self.sector, self.window, self.error)
    }
}

/// A run that stopped because at least one sector failed.
#[derive(Debug)]
pub struct RunAborted {
    /// Every failure observed, in the order they were recorded.
    pub failures: Vec<SectorFailure>,
    /// Progress made before the run stopped.
    pub summary: RunSummary,
}

impl fmt::Display for RunAborted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failures.first() {
            Some(first) => {
                write!(f, "aborted at {}", first)?;
                if self.failures.len() > 1 {
                    write!(f, " (and {} more failures)", self.failures.len() - 1)?;
                }
                Ok(())
            }
            None => write!(f, "aborted"),
        }
    }
}

impl std::error::Error for RunAborted {}
