//! Error types for the grid crate.

use thiserror::Error;

/// Errors raised when a grid configuration or a sector name is invalid.
///
/// All of these are configuration errors: they are detected when the grid is
/// constructed (or a name is parsed) and never while slicing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    /// One of the grid parameters is zero.
    #[error("Grid parameter `{0}` must be greater than zero")]
    ZeroParameter(&'static str),

    /// The chunk size does not divide the sector size evenly.
    #[error("Chunk size {chunk_degrees}° does not divide sector size {sector_degrees}° evenly")]
    ChunkNotDivisor {
        /// Degrees per sector.
        sector_degrees: u32,
        /// Degrees per chunk.
        chunk_degrees: u32,
    },

    /// The sector size does not tile the world exactly.
    #[error("Sector size {0}° must divide both 180° and 360°")]
    SectorNotDivisor(u32),

    /// A coordinate is not the top-left corner of a sector on this grid.
    #[error("({top_lat}, {left_lon}) is not a sector corner on a {sector_degrees}° grid")]
    NotSectorCorner {
        /// Latitude of the requested top edge.
        top_lat: i32,
        /// Longitude of the requested left edge.
        left_lon: i32,
        /// Degrees per sector.
        sector_degrees: u32,
    },

    /// A sector name could not be parsed.
    #[error("Invalid sector id: {0:?}")]
    InvalidSectorId(String),
}
