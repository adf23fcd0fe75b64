//! Error types for the DEM crate.

use geoslice_grid::PixelWindow;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when opening, reading or fetching the source raster.
#[derive(Debug, Error)]
pub enum DemError {
    /// The raster file is missing or cannot be decoded.
    #[error("Source raster {path} is unavailable: {reason}")]
    SourceUnavailable {
        /// Path that was opened.
        path: PathBuf,
        /// Why opening failed.
        reason: String,
    },

    /// Decoding part of a window failed.
    #[error("Failed to read window {window}: {reason}")]
    ReadFailure {
        /// The window being read.
        window: PixelWindow,
        /// Why the read failed.
        reason: String,
    },

    /// A window extends past the edge of the raster.
    #[error("Window {window} lies outside the {width}x{height} raster")]
    WindowOutOfBounds {
        /// The requested window.
        window: PixelWindow,
        /// Raster width in pixels.
        width: u32,
        /// Raster height in pixels.
        height: u32,
    },

    /// The raster is not a single-band image.
    #[error("Unsupported raster layout: {0}")]
    UnsupportedLayout(String),

    /// Sample data does not match the stated dimensions.
    #[error("Sample buffer of {width}x{height} needs {expected} samples, got {actual}")]
    ShapeMismatch {
        /// Buffer width.
        width: u32,
        /// Buffer height.
        height: u32,
        /// Expected sample count.
        expected: usize,
        /// Actual sample count.
        actual: usize,
    },

    /// Not enough free disk space to download the raster.
    #[error(
        "Insufficient disk space at {path}: {required} bytes required, {available} bytes available"
    )]
    InsufficientSpace {
        /// Directory that was checked.
        path: PathBuf,
        /// Bytes required.
        required: u64,
        /// Bytes available.
        available: u64,
    },

    /// Download failed; any partial file has been removed.
    #[error("Failed to download {url}: {reason}")]
    DownloadFailed {
        /// URL being downloaded.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// Download was cancelled; any partial file has been removed.
    #[error("Download of {url} was cancelled")]
    DownloadCancelled {
        /// URL being downloaded.
        url: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request error.
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}
