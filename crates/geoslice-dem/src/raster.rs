//! Windowed reader for a large single-band GeoTIFF.

use crate::cache::{ChunkCache, DecodedChunk};
use crate::{DemError, Result, SampleBuffer, WindowReader};
use geoslice_grid::PixelWindow;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tiff::ColorType;
use tracing::{debug, trace};

/// Default budget for decoded chunks kept in memory.
pub const DEFAULT_CHUNK_CACHE_BYTES: usize = 512 * 1024 * 1024;

/// Geographic extent as declared by the file's GeoTIFF tags.
///
/// Informational only: slicing relies on the fixed pixel-density convention,
/// not on these tags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    /// Minimum latitude (south edge).
    pub min_lat: f64,
    /// Maximum latitude (north edge).
    pub max_lat: f64,
    /// Minimum longitude (west edge).
    pub min_lon: f64,
    /// Maximum longitude (east edge).
    pub max_lon: f64,
}

/// Summary of an opened raster.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterInfo {
    /// Raster width in pixels.
    pub width: u32,
    /// Raster height in pixels.
    pub height: u32,
    /// Width of one strip or tile.
    pub chunk_width: u32,
    /// Height of one strip or tile.
    pub chunk_height: u32,
    /// Number of strips or tiles.
    pub chunk_count: u32,
    /// Declared no-data value.
    pub no_data: Option<f32>,
    /// Bounds from the GeoTIFF tags, if present.
    pub bounds: Option<GeoBounds>,
}

impl RasterInfo {
    /// Pixels per degree implied by a whole-world extent, when the width is
    /// an exact multiple of 360 and the height matches it.
    pub fn implied_pixels_per_degree(&self) -> Option<u32> {
        (self.width % 360 == 0 && self.height as u64 * 2 == self.width as u64)
            .then_some(self.width / 360)
    }
}

/// Counters for chunk decoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    /// Window reads served.
    pub windows_read: usize,
    /// Chunks decoded from the file.
    pub chunks_decoded: usize,
    /// Chunk lookups answered from the cache.
    pub cache_hits: usize,
}

/// A large GeoTIFF opened for random-access windowed reads.
///
/// Only the strips or tiles a window touches are decoded; decoded chunks are
/// kept in a bounded LRU cache so neighbouring windows can share them.
pub struct RasterSource<R: Read + Seek = BufReader<File>> {
    path: PathBuf,
    decoder: Decoder<R>,
    width: u32,
    height: u32,
    chunk_width: u32,
    chunk_height: u32,
    chunks_across: u32,
    chunks_down: u32,
    no_data: Option<f32>,
    bounds: Option<GeoBounds>,
    cache: ChunkCache,
    stats: ReadStats,
}

impl<R: Read + Seek> std::fmt::Debug for RasterSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterSource")
            .field("path", &self.path)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("chunk_width", &self.chunk_width)
            .field("chunk_height", &self.chunk_height)
            .field("no_data", &self.no_data)
            .finish()
    }
}

impl RasterSource {
    /// Open a GeoTIFF file with the default chunk cache budget.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_cache(path, DEFAULT_CHUNK_CACHE_BYTES)
    }

    /// Open a GeoTIFF file, keeping at most `cache_bytes` of decoded chunks.
    pub fn open_with_cache<P: AsRef<Path>>(path: P, cache_bytes: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| DemError::SourceUnavailable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_reader(BufReader::new(file), path, cache_bytes)
    }
}

impl<R: Read + Seek> RasterSource<R> {
    /// Open a GeoTIFF from any seekable reader. `path` is used for messages.
    pub fn from_reader(reader: R, path: &Path, cache_bytes: usize) -> Result<Self> {
        let unavailable = |e: tiff::TiffError| DemError::SourceUnavailable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        // Whole-world rasters have very large tag arrays (strip offsets) and
        // chunks; the default limits reject them.
        let mut limits = Limits::default();
        limits.decoding_buffer_size = 1024 * 1024 * 1024; // 1 GB
        limits.intermediate_buffer_size = 1024 * 1024 * 1024; // 1 GB
        limits.ifd_value_size = 1024 * 1024 * 1024;

        let mut decoder = Decoder::new(reader).map_err(unavailable)?.with_limits(limits);

        match decoder.colortype().map_err(unavailable)? {
            ColorType::Gray(_) => {}
            other => {
                return Err(DemError::UnsupportedLayout(format!(
                    "expected a single-band raster, found {:?}",
                    other
                )))
            }
        }

        let (width, height) = decoder.dimensions().map_err(unavailable)?;
        let (chunk_width, chunk_height) = decoder.chunk_dimensions();
        if chunk_width == 0 || chunk_height == 0 {
            return Err(DemError::UnsupportedLayout(format!(
                "degenerate chunk size {}x{}",
                chunk_width, chunk_height
            )));
        }

        let no_data = read_nodata_value(&mut decoder);
        let bounds = read_geotransform(&mut decoder, width, height);

        debug!(
            path = %path.display(),
            width,
            height,
            chunk_width,
            chunk_height,
            ?no_data,
            "opened raster"
        );

        Ok(Self {
            path: path.to_path_buf(),
            decoder,
            width,
            height,
            chunk_width,
            chunk_height,
            chunks_across: width.div_ceil(chunk_width),
            chunks_down: height.div_ceil(chunk_height),
            no_data,
            bounds,
            cache: ChunkCache::new(cache_bytes),
            stats: ReadStats::default(),
        })
    }

    /// Path the raster was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Describe the raster's layout.
    pub fn describe(&self) -> RasterInfo {
        RasterInfo {
            width: self.width,
            height: self.height,
            chunk_width: self.chunk_width,
            chunk_height: self.chunk_height,
            chunk_count: self.chunks_across * self.chunks_down,
            no_data: self.no_data,
            bounds: self.bounds,
        }
    }

    /// Decoding counters since opening.
    pub fn stats(&self) -> ReadStats {
        self.stats
    }

    /// Number of decoded chunks currently held in memory.
    pub fn cached_chunks(&self) -> usize {
        self.cache.len()
    }

    /// Bytes of decoded chunk data currently held in memory.
    pub fn cached_bytes(&self) -> usize {
        self.cache.size_bytes()
    }

    /// Drop all decoded chunks.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Fetch a decoded chunk, from the cache or the file.
    fn chunk(&mut self, chunk_x: u32, chunk_y: u32, window: &PixelWindow) -> Result<Arc<DecodedChunk>> {
        let index = chunk_y * self.chunks_across + chunk_x;
        if let Some(chunk) = self.cache.get(index) {
            self.stats.cache_hits += 1;
            return Ok(chunk);
        }

        let read_failure = |reason: String| DemError::ReadFailure {
            window: *window,
            reason,
        };

        // Edge chunks hold only the pixels inside the raster.
        let width = self.chunk_width.min(self.width - chunk_x * self.chunk_width);
        let height = self.chunk_height.min(self.height - chunk_y * self.chunk_height);

        let decoded = self
            .decoder
            .read_chunk(index)
            .map_err(|e| read_failure(format!("chunk {}: {}", index, e)))?;
        let data = decoding_result_to_f32(decoded);

        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(read_failure(format!(
                "chunk {} decoded to {} samples, expected {}",
                index,
                data.len(),
                expected
            )));
        }

        trace!(index, width, height, "decoded chunk");
        self.stats.chunks_decoded += 1;

        let chunk = Arc::new(DecodedChunk {
            width,
            height,
            data,
        });
        self.cache.insert(index, chunk.clone());
        Ok(chunk)
    }
}

impl<R: Read + Seek> WindowReader for RasterSource<R> {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn no_data(&self) -> Option<f32> {
        self.no_data
    }

    fn read_window(&mut self, window: &PixelWindow) -> Result<SampleBuffer> {
        if !window.fits_within(self.width, self.height) {
            return Err(DemError::WindowOutOfBounds {
                window: *window,
                width: self.width,
                height: self.height,
            });
        }
        if window.is_empty() {
            return Ok(SampleBuffer::empty().with_no_data(self.no_data));
        }

        let out_width = window.width as usize;
        let mut out = vec![0.0f32; window.area()];

        let row_end = window.row_offset + window.height;
        let col_end = window.col_offset + window.width;

        let first_cy = window.row_offset / self.chunk_height;
        let last_cy = (row_end - 1) / self.chunk_height;
        let first_cx = window.col_offset / self.chunk_width;
        let last_cx = (col_end - 1) / self.chunk_width;

        for cy in first_cy..=last_cy {
            for cx in first_cx..=last_cx {
                let chunk = self.chunk(cx, cy, window)?;
                let x0 = cx * self.chunk_width;
                let y0 = cy * self.chunk_height;

                let r_start = window.row_offset.max(y0);
                let r_end = row_end.min(y0 + chunk.height);
                let c_start = window.col_offset.max(x0);
                let c_end = col_end.min(x0 + chunk.width);
                let span = (c_end - c_start) as usize;

                for row in r_start..r_end {
                    let src = (row - y0) as usize * chunk.width as usize + (c_start - x0) as usize;
                    let dst = (row - window.row_offset) as usize * out_width
                        + (c_start - window.col_offset) as usize;
                    out[dst..dst + span].copy_from_slice(&chunk.data[src..src + span]);
                }
            }
        }

        self.stats.windows_read += 1;
        Ok(SampleBuffer::from_vec(window.width, window.height, out)?.with_no_data(self.no_data))
    }
}

/// Convert any decoded sample type to `f32`.
fn decoding_result_to_f32(result: DecodingResult) -> Vec<f32> {
    match result {
        DecodingResult::F32(data) => data,
        DecodingResult::F64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I16(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U16(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U8(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I8(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I64(data) => data.into_iter().map(|v| v as f32).collect(),
    }
}

/// Read the no-data value from the GDAL_NODATA tag (42113), stored as ASCII.
fn read_nodata_value<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f32> {
    decoder
        .get_tag_ascii_string(Tag::from_u16_exhaustive(42113))
        .ok()
        .and_then(|s| s.trim().trim_end_matches('\0').parse().ok())
}

/// Read the geographic bounds from ModelTiepoint (33922) and ModelPixelScale (33550).
fn read_geotransform<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    width: u32,
    height: u32,
) -> Option<GeoBounds> {
    let tiepoint = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(33922)).ok()?;
    let scale = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(33550)).ok()?;
    if tiepoint.len() < 6 || scale.len() < 2 {
        return None;
    }

    // Tiepoint format: [i, j, k, x, y, z]; the top-left pixel maps to (x, y).
    let max_lat = tiepoint[4];
    let min_lon = tiepoint[3];
    Some(GeoBounds {
        min_lat: max_lat - height as f64 * scale[1],
        max_lat,
        min_lon,
        max_lon: min_lon + width as f64 * scale[0],
    })
}
