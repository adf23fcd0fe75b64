//! PNG output for sectors and their chunks.
//!
//! Layout under the output root:
//!
//! ```text
//! <root>/<sector_id>/sector.png
//! <root>/<sector_id>/chunk_<row>_<col>.png
//! ```
//!
//! Every file is encoded in memory, written to a `.tmp` sibling and renamed
//! into place, so a file with a final name is always complete.

use crate::encode::EncodedBuffer;
use crate::{Result, TilerError};
use geoslice_grid::{chunk_file_name, GeoGrid, PixelWindow, SectorId};
use image::{ImageBuffer, ImageFormat, Luma};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the full-sector image.
pub const SECTOR_IMAGE: &str = "sector.png";

/// Processing state of a sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorState {
    /// Nothing written yet.
    Pending,
    /// Some output exists but the sector is incomplete, e.g. after a crash.
    InProgress,
    /// The sector image and every expected chunk are on disk.
    Done,
}

/// Writes encoded sectors under an output root.
#[derive(Debug, Clone)]
pub struct TileWriter {
    root: PathBuf,
}

impl TileWriter {
    /// Create a writer rooted at `output_root`. Nothing is created until the
    /// first write.
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            root: output_root.into(),
        }
    }

    /// The output root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one sector's images.
    pub fn sector_dir(&self, id: &SectorId) -> PathBuf {
        self.root.join(id)
    }

    /// Path of a sector's full image.
    pub fn sector_image_path(&self, id: &SectorId) -> PathBuf {
        self.sector_dir(id).join(SECTOR_IMAGE)
    }

    /// Write the full-sector image, creating the sector directory if needed.
    pub fn write_sector(&self, id: &SectorId, buffer: &EncodedBuffer) -> Result<PathBuf> {
        let dir = self.sector_dir(id);
        create_dir(&dir)?;
        let path = dir.join(SECTOR_IMAGE);
        write_png(&path, buffer)?;
        Ok(path)
    }

    /// Write every chunk of `buffer` that starts inside it.
    ///
    /// Chunks are visited in row-major order. A chunk whose first row or
    /// column lies beyond the buffer is skipped; one that overruns the
    /// buffer is clipped. Returns the number of chunk files written.
    pub fn write_chunks(&self, id: &SectorId, buffer: &EncodedBuffer, grid: &GeoGrid) -> Result<usize> {
        let dir = self.sector_dir(id);
        create_dir(&dir)?;

        let (width, height) = buffer.dimensions();
        let mut written = 0;
        for chunk in grid.chunk_extents() {
            if !chunk.starts_within(width, height) {
                continue;
            }
            let (rows, cols) = chunk.clipped(width, height);
            let tile = buffer.sub_rect(rows, cols);
            write_png(&dir.join(chunk.file_name()), &tile)?;
            written += 1;
        }

        debug!("{}: wrote {} chunks", id, written);
        Ok(written)
    }

    /// Chunk indices a sector with `window` produces, row-major.
    pub fn expected_chunks(grid: &GeoGrid, window: &PixelWindow) -> Vec<(u32, u32)> {
        grid.chunks_within(window)
            .map(|chunk| (chunk.row, chunk.col))
            .collect()
    }

    /// Check the on-disk markers for a sector.
    ///
    /// Returns [`SectorState::Done`] only when `sector.png` and every expected
    /// chunk exist. A sector directory holding anything less is
    /// [`SectorState::InProgress`]; no directory, or an empty one, is
    /// [`SectorState::Pending`].
    pub fn sector_state(&self, id: &SectorId, grid: &GeoGrid, window: &PixelWindow) -> SectorState {
        let dir = self.sector_dir(id);
        let has_output = fs::read_dir(&dir)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);
        if !has_output {
            return SectorState::Pending;
        }

        let complete = dir.join(SECTOR_IMAGE).is_file()
            && Self::expected_chunks(grid, window)
                .into_iter()
                .all(|(row, col)| dir.join(chunk_file_name(row, col)).is_file());

        if complete {
            SectorState::Done
        } else {
            SectorState::InProgress
        }
    }
}

fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| TilerError::WriteFailure {
        path: dir.to_path_buf(),
        reason: format!("creating directory: {}", e),
    })
}

/// Encode `buffer` as a 16-bit grayscale PNG and move it into place at `path`.
fn write_png(path: &Path, buffer: &EncodedBuffer) -> Result<()> {
    let (width, height) = buffer.dimensions();
    if buffer.is_empty() {
        return Err(TilerError::WriteFailure {
            path: path.to_path_buf(),
            reason: format!("refusing to write an empty {}x{} image", width, height),
        });
    }

    let image: ImageBuffer<Luma<u16>, &[u16]> = ImageBuffer::from_raw(width, height, buffer.as_slice())
        .ok_or_else(|| TilerError::WriteFailure {
            path: path.to_path_buf(),
            reason: "pixel count does not match dimensions".to_string(),
        })?;

    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|source| TilerError::Image {
            path: path.to_path_buf(),
            source,
        })?;

    write_atomic(path, &bytes)?;
    debug!("Wrote {} ({}x{}, {} bytes)", path.display(), width, height, bytes.len());
    Ok(())
}

/// Write to a temporary sibling, then rename over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let result = fs::write(&tmp_path, bytes)
        .map_err(|e| ("writing temporary file", e))
        .and_then(|()| fs::rename(&tmp_path, path).map_err(|e| ("renaming into place", e)));

    result.map_err(|(stage, e)| {
        // A short write leaves a partial temporary file behind as well.
        let _ = fs::remove_file(&tmp_path);
        TilerError::WriteFailure {
            path: path.to_path_buf(),
            reason: format!("{}: {}", stage, e),
        }
    })
}
