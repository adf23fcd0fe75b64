//! # geoslice-dem
//!
//! Access to the global elevation raster that `geoslice` slices.
//!
//! This crate provides:
//! - [`RasterSource`]: random-access windowed reads from a single, very large
//!   GeoTIFF (e.g. GEBCO 2024, 86400 x 43200 samples). Only the strips or tiles
//!   a window touches are decoded.
//! - [`WindowReader`]: the read interface the slicing pipeline depends on,
//!   also implemented by the in-memory [`MemoryRaster`].
//! - [`SourceFetcher`]: downloads the raster when it is not already present,
//!   after checking free disk space, cleaning up on failure.
//!
//! ## Example
//!
//! ```no_run
//! use geoslice_dem::{RasterSource, WindowReader};
//! use geoslice_grid::PixelWindow;
//!
//! let mut raster = RasterSource::open("GEBCO_2024.tif")?;
//! let (width, height) = raster.dimensions();
//! println!("Raster is {}x{}", width, height);
//!
//! let samples = raster.read_window(&PixelWindow::new(9600, 40800, 2400, 2400))?;
//! println!("Top-left sample: {:?}", samples.get(0, 0));
//! # Ok::<(), geoslice_dem::DemError>(())
//! ```

mod cache;
mod error;
mod fetch;
mod raster;
mod sample;
mod space;

pub use error::DemError;
pub use fetch::{
    part_path, DownloadCallback, DownloadProgress, FetchOutcome, SourceFetcher, DEFAULT_SOURCE_FILE,
    DEFAULT_SOURCE_URL,
};
pub use raster::{GeoBounds, RasterInfo, RasterSource, ReadStats, DEFAULT_CHUNK_CACHE_BYTES};
pub use sample::{MemoryRaster, SampleBuffer, WindowReader};
pub use space::{available_space, ensure_free_space, DEFAULT_REQUIRED_BYTES, GIB};

/// Result type for DEM operations.
pub type Result<T> = std::result::Result<T, DemError>;
