//! Grid configuration, sector enumeration and chunk geometry.

use crate::{GridError, PixelWindow, Result, Sector};
use std::ops::Range;

/// Default sector size in degrees.
pub const DEFAULT_SECTOR_DEGREES: u32 = 10;

/// Default chunk size in degrees.
pub const DEFAULT_CHUNK_DEGREES: u32 = 1;

/// Default raster density: GEBCO's 15 arc-second grid.
pub const DEFAULT_PIXELS_PER_DEGREE: u32 = 240;

/// Immutable description of how the world is partitioned.
///
/// Construct with [`GeoGrid::new`] (or deserialize and call
/// [`GeoGrid::validate`]); every other method assumes a valid grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GeoGrid {
    /// Degrees covered by one sector along each axis.
    pub sector_degrees: u32,
    /// Degrees covered by one chunk along each axis.
    pub chunk_degrees: u32,
    /// Raster samples per degree along each axis.
    pub pixels_per_degree: u32,
}

impl Default for GeoGrid {
    fn default() -> Self {
        Self {
            sector_degrees: DEFAULT_SECTOR_DEGREES,
            chunk_degrees: DEFAULT_CHUNK_DEGREES,
            pixels_per_degree: DEFAULT_PIXELS_PER_DEGREE,
        }
    }
}

/// One chunk of a sector: its grid indices and its pixel ranges relative to
/// the top-left corner of the sector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkExtent {
    /// Chunk row index (0 at the sector's top edge).
    pub row: u32,
    /// Chunk column index (0 at the sector's left edge).
    pub col: u32,
    /// Pixel rows covered, relative to the sector.
    pub rows: Range<u32>,
    /// Pixel columns covered, relative to the sector.
    pub cols: Range<u32>,
}

impl ChunkExtent {
    /// True when the chunk starts inside a buffer of the given size.
    ///
    /// Sector buffers can be smaller than a full sector where the source
    /// raster ends; chunks that start past the end are skipped.
    pub fn starts_within(&self, width: u32, height: u32) -> bool {
        self.rows.start < height && self.cols.start < width
    }

    /// The chunk's ranges clipped to a buffer of the given size.
    pub fn clipped(&self, width: u32, height: u32) -> (Range<u32>, Range<u32>) {
        (
            self.rows.start.min(height)..self.rows.end.min(height),
            self.cols.start.min(width)..self.cols.end.min(width),
        )
    }

    /// File name of this chunk's image, e.g. `chunk_3_7.png`.
    pub fn file_name(&self) -> String {
        chunk_file_name(self.row, self.col)
    }
}

/// File name of the chunk image at `(row, col)`.
pub fn chunk_file_name(row: u32, col: u32) -> String {
    format!("chunk_{}_{}.png", row, col)
}

impl GeoGrid {
    /// Create a validated grid.
    pub fn new(sector_degrees: u32, chunk_degrees: u32, pixels_per_degree: u32) -> Result<Self> {
        let grid = Self {
            sector_degrees,
            chunk_degrees,
            pixels_per_degree,
        };
        grid.validate()?;
        Ok(grid)
    }

    /// Check the grid invariants.
    pub fn validate(&self) -> Result<()> {
        if self.sector_degrees == 0 {
            return Err(GridError::ZeroParameter("sector_degrees"));
        }
        if self.chunk_degrees == 0 {
            return Err(GridError::ZeroParameter("chunk_degrees"));
        }
        if self.pixels_per_degree == 0 {
            return Err(GridError::ZeroParameter("pixels_per_degree"));
        }
        if self.sector_degrees % self.chunk_degrees != 0 {
            return Err(GridError::ChunkNotDivisor {
                sector_degrees: self.sector_degrees,
                chunk_degrees: self.chunk_degrees,
            });
        }
        if 180 % self.sector_degrees != 0 {
            return Err(GridError::SectorNotDivisor(self.sector_degrees));
        }
        Ok(())
    }

    /// Number of chunks along each side of a sector.
    pub fn chunks_per_side(&self) -> u32 {
        self.sector_degrees / self.chunk_degrees
    }

    /// Pixels along each side of a chunk.
    pub fn chunk_pixels(&self) -> u32 {
        self.chunk_degrees * self.pixels_per_degree
    }

    /// Pixels along each side of a full sector.
    pub fn sector_pixels(&self) -> u32 {
        self.sector_degrees * self.pixels_per_degree
    }

    /// Size `(width, height)` of a raster covering the whole world at this density.
    pub fn world_dimensions(&self) -> (u32, u32) {
        (360 * self.pixels_per_degree, 180 * self.pixels_per_degree)
    }

    /// Number of sectors in the enumeration.
    pub fn sector_count(&self) -> usize {
        let step = self.sector_degrees as usize;
        (180 / step) * (360 / step)
    }

    /// Every sector of the world, north to south, then west to east.
    ///
    /// Latitude runs from +90 down to (but excluding) -90, longitude from -180
    /// up to (but excluding) +180. The first sector is `(90, -180)`. Each call
    /// returns a fresh iterator over the same sequence.
    pub fn sectors(&self) -> impl Iterator<Item = Sector> {
        let step = self.sector_degrees as usize;
        (-89..=90)
            .rev()
            .step_by(step)
            .flat_map(move |top_lat| {
                (-180..180)
                    .step_by(step)
                    .map(move |left_lon| Sector::new(top_lat, left_lon))
            })
    }

    /// A validated sector at the given top-left corner.
    pub fn sector_at(&self, top_lat: i32, left_lon: i32) -> Result<Sector> {
        let step = self.sector_degrees as i32;
        let aligned = (90 - top_lat) % step == 0 && (left_lon + 180) % step == 0;
        let in_range = top_lat > -90 && top_lat <= 90 && (-180..180).contains(&left_lon);
        if aligned && in_range {
            Ok(Sector::new(top_lat, left_lon))
        } else {
            Err(GridError::NotSectorCorner {
                top_lat,
                left_lon,
                sector_degrees: self.sector_degrees,
            })
        }
    }

    /// Pixel window of a sector, clamped to the raster bounds.
    pub fn window_for(&self, sector: &Sector, raster_width: u32, raster_height: u32) -> PixelWindow {
        let ppd = self.pixels_per_degree as i64;
        let row_offset = ((90 - sector.top_lat as i64) * ppd).max(0);
        let col_offset = ((sector.left_lon as i64 + 180) * ppd).max(0);
        let size = self.sector_pixels();

        let unclamped = PixelWindow::new(
            u32::try_from(row_offset).unwrap_or(u32::MAX),
            u32::try_from(col_offset).unwrap_or(u32::MAX),
            size,
            size,
        );
        unclamped.clamped(raster_width, raster_height)
    }

    /// Every chunk of one sector in row-major order.
    pub fn chunk_extents(&self) -> impl Iterator<Item = ChunkExtent> {
        let per_side = self.chunks_per_side();
        let px = self.chunk_pixels();
        (0..per_side).flat_map(move |row| {
            (0..per_side).map(move |col| ChunkExtent {
                row,
                col,
                rows: row * px..(row + 1) * px,
                cols: col * px..(col + 1) * px,
            })
        })
    }

    /// Chunks that a sector buffer of the given window will produce.
    pub fn chunks_within(&self, window: &PixelWindow) -> impl Iterator<Item = ChunkExtent> {
        let (width, height) = (window.width, window.height);
        self.chunk_extents()
            .filter(move |chunk| chunk.starts_within(width, height))
    }
}
