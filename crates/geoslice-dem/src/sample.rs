//! Raw sample buffers and the window-reading abstraction.

use crate::{DemError, Result};
use geoslice_grid::PixelWindow;

/// A rectangle of raw elevation samples in row-major order (north to south,
/// west to east).
///
/// Samples are stored as `f32`, which represents every 16-bit integer sample
/// exactly and carries NaN for missing data.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    width: u32,
    height: u32,
    data: Vec<f32>,
    /// Value the source uses to mark missing data, if any.
    no_data: Option<f32>,
}

impl SampleBuffer {
    /// Wrap sample data of the given dimensions.
    pub fn from_vec(width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(DemError::ShapeMismatch {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
            no_data: None,
        })
    }

    /// An empty (0x0) buffer.
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            data: Vec::new(),
            no_data: None,
        }
    }

    /// Attach the source's no-data marker.
    pub fn with_no_data(mut self, no_data: Option<f32>) -> Self {
        self.no_data = no_data;
        self
    }

    /// Width in samples.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in samples.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Dimensions as `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The source's no-data marker, if declared.
    pub fn no_data(&self) -> Option<f32> {
        self.no_data
    }

    /// All samples in row-major order.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Sample at `(row, col)`, or `None` when out of range.
    pub fn get(&self, row: u32, col: u32) -> Option<f32> {
        if row < self.height && col < self.width {
            Some(self.data[row as usize * self.width as usize + col as usize])
        } else {
            None
        }
    }

    /// True when the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Something that can answer rectangular read requests against a raster.
///
/// Implementations must read only what the window covers; the source may be
/// far larger than memory.
pub trait WindowReader {
    /// Raster size as `(width, height)` in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// The raster's declared no-data value, if any.
    fn no_data(&self) -> Option<f32>;

    /// Read the samples covered by `window`.
    ///
    /// Fails with [`DemError::WindowOutOfBounds`] when the window does not
    /// fit inside the raster.
    fn read_window(&mut self, window: &PixelWindow) -> Result<SampleBuffer>;
}

/// An in-memory raster.
///
/// Useful for small inputs and for exercising the pipeline without a file.
/// Counts the window reads it serves.
#[derive(Debug, Clone)]
pub struct MemoryRaster {
    samples: SampleBuffer,
    reads: usize,
}

impl MemoryRaster {
    /// Wrap a full-raster sample buffer.
    pub fn new(samples: SampleBuffer) -> Self {
        Self { samples, reads: 0 }
    }

    /// Build a raster by evaluating `f(row, col)` for every pixel.
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> f32) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for row in 0..height {
            for col in 0..width {
                data.push(f(row, col));
            }
        }
        Self::new(SampleBuffer {
            width,
            height,
            data,
            no_data: None,
        })
    }

    /// Set the declared no-data value.
    pub fn with_no_data(mut self, no_data: Option<f32>) -> Self {
        self.samples.no_data = no_data;
        self
    }

    /// Number of window reads served so far.
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl WindowReader for MemoryRaster {
    fn dimensions(&self) -> (u32, u32) {
        self.samples.dimensions()
    }

    fn no_data(&self) -> Option<f32> {
        self.samples.no_data
    }

    fn read_window(&mut self, window: &PixelWindow) -> Result<SampleBuffer> {
        let (width, height) = self.dimensions();
        if !window.fits_within(width, height) {
            return Err(DemError::WindowOutOfBounds {
                window: *window,
                width,
                height,
            });
        }
        self.reads += 1;

        let mut data = Vec::with_capacity(window.area());
        for row in window.row_offset..window.row_offset + window.height {
            let start = row as usize * width as usize + window.col_offset as usize;
            data.extend_from_slice(&self.samples.data[start..start + window.width as usize]);
        }

        Ok(SampleBuffer {
            width: window.width,
            height: window.height,
            data,
            no_data: self.samples.no_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch() {
        assert!(SampleBuffer::from_vec(2, 2, vec![0.0; 4]).is_ok());
        assert!(matches!(
            SampleBuffer::from_vec(2, 2, vec![0.0; 3]),
            Err(DemError::ShapeMismatch { expected: 4, actual: 3, .. })
        ));
    }

    #[test]
    fn test_memory_raster_window() {
        let mut raster = MemoryRaster::from_fn(10, 8, |row, col| (row * 100 + col) as f32);
        let buffer = raster.read_window(&PixelWindow::new(2, 3, 4, 2)).unwrap();

        assert_eq!(buffer.dimensions(), (4, 2));
        assert_eq!(buffer.as_slice(), &[203.0, 204.0, 205.0, 206.0, 303.0, 304.0, 305.0, 306.0]);
        assert_eq!(buffer.get(1, 3), Some(306.0));
        assert_eq!(buffer.get(2, 0), None);
        assert_eq!(raster.reads(), 1);
    }

    #[test]
    fn test_memory_raster_rejects_out_of_bounds() {
        let mut raster = MemoryRaster::from_fn(10, 8, |_, _| 0.0);
        let err = raster.read_window(&PixelWindow::new(6, 0, 4, 4)).unwrap_err();
        assert!(matches!(err, DemError::WindowOutOfBounds { width: 10, height: 8, .. }));
        assert_eq!(raster.reads(), 0);
    }

    #[test]
    fn test_no_data_propagates() {
        let mut raster = MemoryRaster::from_fn(2, 2, |_, _| 1.0).with_no_data(Some(-9999.0));
        let buffer = raster.read_window(&PixelWindow::new(0, 0, 2, 2)).unwrap();
        assert_eq!(buffer.no_data(), Some(-9999.0));
    }
}
