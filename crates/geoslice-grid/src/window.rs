//! Rectangles in raster pixel space.

use std::fmt;

/// A rectangle in source-raster pixel coordinates.
///
/// Rows grow southward from the top edge of the raster, columns grow eastward
/// from its left edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PixelWindow {
    /// First row of the window.
    pub row_offset: u32,
    /// First column of the window.
    pub col_offset: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelWindow {
    /// Create a window from its offsets and extent.
    pub fn new(row_offset: u32, col_offset: u32, width: u32, height: u32) -> Self {
        Self {
            row_offset,
            col_offset,
            width,
            height,
        }
    }

    /// One past the last row covered by the window.
    pub fn row_end(&self) -> u64 {
        self.row_offset as u64 + self.height as u64
    }

    /// One past the last column covered by the window.
    pub fn col_end(&self) -> u64 {
        self.col_offset as u64 + self.width as u64
    }

    /// Number of pixels in the window.
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// True when the window covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True when the window lies entirely inside a raster of the given size.
    pub fn fits_within(&self, raster_width: u32, raster_height: u32) -> bool {
        self.row_end() <= raster_height as u64 && self.col_end() <= raster_width as u64
    }

    /// Clamp the window so it does not extend past a raster of the given size.
    ///
    /// Offsets past the raster edge collapse the window to zero extent.
    pub fn clamped(&self, raster_width: u32, raster_height: u32) -> Self {
        let row_offset = self.row_offset.min(raster_height);
        let col_offset = self.col_offset.min(raster_width);
        Self {
            row_offset,
            col_offset,
            width: self.width.min(raster_width - col_offset),
            height: self.height.min(raster_height - row_offset),
        }
    }
}

impl fmt::Display for PixelWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rows {}..{}, cols {}..{} ({}x{})",
            self.row_offset,
            self.row_end(),
            self.col_offset,
            self.col_end(),
            self.width,
            self.height
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_inside_is_noop() {
        let window = PixelWindow::new(10, 20, 30, 40);
        assert_eq!(window.clamped(100, 100), window);
        assert!(window.fits_within(100, 100));
    }

    #[test]
    fn test_clamp_truncates_edges() {
        let window = PixelWindow::new(90, 80, 30, 40);
        let clamped = window.clamped(100, 100);
        assert_eq!(clamped, PixelWindow::new(90, 80, 20, 10));
        assert!(!window.fits_within(100, 100));
        assert!(clamped.fits_within(100, 100));
    }

    #[test]
    fn test_clamp_outside_is_empty() {
        let window = PixelWindow::new(120, 0, 30, 40);
        let clamped = window.clamped(100, 100);
        assert!(clamped.is_empty());
        assert_eq!(clamped.row_offset, 100);
    }

    #[test]
    fn test_display() {
        let window = PixelWindow::new(9600, 40800, 2400, 2400);
        assert_eq!(
            window.to_string(),
            "rows 9600..12000, cols 40800..43200 (2400x2400)"
        );
    }
}
