//! # geoslice-tiler
//!
//! Turns windows of the elevation raster into PNG tiles.
//!
//! - [`ElevationEncoder`] maps signed metres to offset 16-bit pixels
//!   (`pixel = metres + 12000`, clamped, no-data mapped to 0).
//! - [`TileWriter`] writes `sector.png` and `chunk_<r>_<c>.png` files under
//!   one directory per sector, atomically.
//! - [`WorldDriver`] walks every sector of a [`geoslice_grid::GeoGrid`],
//!   skipping completed sectors when resuming.
//!
//! ## Example
//!
//! ```
//! use geoslice_dem::MemoryRaster;
//! use geoslice_grid::GeoGrid;
//! use geoslice_tiler::{DriverOptions, ElevationEncoder, RunOutcome, TileWriter, WorldDriver};
//!
//! let out = tempfile::tempdir()?;
//! let grid = GeoGrid::new(90, 45, 1)?;
//! let (width, height) = grid.world_dimensions();
//! let mut raster = MemoryRaster::from_fn(width, height, |row, _| row as f32 * 10.0 - 900.0);
//!
//! let driver = WorldDriver::new(
//!     grid,
//!     ElevationEncoder::default(),
//!     TileWriter::new(out.path()),
//!     DriverOptions::default(),
//! );
//! let summary = driver.run(&mut raster)?;
//!
//! assert_eq!(summary.outcome, RunOutcome::Completed);
//! assert!(out.path().join("N90W180").join("chunk_1_1.png").is_file());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod driver;
mod encode;
mod error;
mod writer;

pub use driver::{DriverOptions, RunOutcome, RunSummary, SectorResult, WorldDriver};
pub use encode::{EncodedBuffer, ElevationEncoder, DEFAULT_ELEVATION_OFFSET, DEFAULT_NO_DATA_FILL};
pub use error::{RunAborted, SectorFailure, TilerError};
pub use writer::{SectorState, TileWriter, SECTOR_IMAGE};

/// Result type for tiler operations.
pub type Result<T> = std::result::Result<T, TilerError>;
