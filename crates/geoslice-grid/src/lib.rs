//! # geoslice-grid
//!
//! Geometry of the world grid used to slice a global elevation raster.
//!
//! The world is partitioned into square **sectors** (10x10 degrees by default),
//! each of which is further partitioned into **chunks** (1x1 degree by default).
//! The source raster is assumed to be equirectangular with its origin at the
//! top-left corner (90°N, 180°W) and a fixed number of pixels per degree.
//!
//! ## Naming
//!
//! Sectors are named after their top-left corner, e.g. `N50W010` for the sector
//! whose top edge is at 50°N and whose left edge is at 10°W. The latitude
//! hemisphere is `N` only for strictly positive latitudes, so the band directly
//! south of the equator *and* the band whose top edge is the equator are both
//! labelled `S` (`S00...`, `S10...`).
//!
//! ## Example
//!
//! ```
//! use geoslice_grid::{GeoGrid, Sector};
//!
//! let grid = GeoGrid::new(10, 1, 240)?;
//! let sector = Sector::new(50, -10);
//! assert_eq!(sector.id().as_str(), "N50W010");
//!
//! let (width, height) = grid.world_dimensions();
//! let window = grid.window_for(&sector, width, height);
//! assert_eq!((window.row_offset, window.col_offset), (9600, 40800));
//! assert_eq!((window.width, window.height), (2400, 2400));
//! # Ok::<(), geoslice_grid::GridError>(())
//! ```

mod error;
mod grid;
mod sector;
mod window;

pub use error::GridError;
pub use grid::{chunk_file_name, ChunkExtent, GeoGrid, DEFAULT_CHUNK_DEGREES, DEFAULT_PIXELS_PER_DEGREE, DEFAULT_SECTOR_DEGREES};
pub use sector::{Sector, SectorId};
pub use window::PixelWindow;

/// Result type for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;
