//! Elevation encoding: signed metres to offset unsigned 16-bit pixels.

use geoslice_dem::SampleBuffer;
use std::ops::Range;

/// Metres added to every elevation so that -12000 m maps to pixel 0.
pub const DEFAULT_ELEVATION_OFFSET: i32 = 12_000;

/// Value substituted for missing samples before the offset is applied.
pub const DEFAULT_NO_DATA_FILL: i32 = -32_768;

/// Maps raw elevations to pixel values.
///
/// A pixel `v` represents elevation `v - offset` metres. The transform is
/// total: every input, including NaN and infinities, produces a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ElevationEncoder {
    /// Metres added before clamping.
    pub offset: i32,
    /// Elevation assumed for no-data samples.
    pub no_data_fill: i32,
}

impl Default for ElevationEncoder {
    fn default() -> Self {
        Self {
            offset: DEFAULT_ELEVATION_OFFSET,
            no_data_fill: DEFAULT_NO_DATA_FILL,
        }
    }
}

impl ElevationEncoder {
    /// Create an encoder with the given offset and no-data fill.
    pub fn new(offset: i32, no_data_fill: i32) -> Self {
        Self {
            offset,
            no_data_fill,
        }
    }

    /// Encode one sample.
    ///
    /// NaN and samples equal to `no_data` become `no_data_fill`. Fractional
    /// samples truncate toward zero; the sum is clamped to `0..=65535`.
    pub fn encode_sample(&self, value: f32, no_data: Option<f32>) -> u16 {
        let missing = value.is_nan() || no_data.is_some_and(|nd| value == nd);
        let metres = if missing {
            self.no_data_fill as i64
        } else {
            // Saturating cast: infinities land on the i64 bounds.
            value as i64
        };
        metres
            .saturating_add(self.offset as i64)
            .clamp(0, u16::MAX as i64) as u16
    }

    /// Elevation in metres represented by a pixel.
    pub fn decode(&self, pixel: u16) -> i32 {
        pixel as i32 - self.offset
    }

    /// Encode a whole buffer.
    pub fn encode(&self, samples: &SampleBuffer) -> EncodedBuffer {
        let no_data = samples.no_data();
        let data = samples
            .as_slice()
            .iter()
            .map(|&v| self.encode_sample(v, no_data))
            .collect();
        EncodedBuffer {
            width: samples.width(),
            height: samples.height(),
            data,
        }
    }
}

/// A rectangle of encoded 16-bit pixels in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBuffer {
    width: u32,
    height: u32,
    data: Vec<u16>,
}

impl EncodedBuffer {
    /// Wrap pixel data; `None` if the length does not match the dimensions.
    pub fn from_vec(width: u32, height: u32, data: Vec<u16>) -> Option<Self> {
        (data.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            data,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Dimensions as `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Pixels in row-major order.
    pub fn as_slice(&self) -> &[u16] {
        &self.data
    }

    /// Pixel at `(row, col)`, or `None` when out of range.
    pub fn get(&self, row: u32, col: u32) -> Option<u16> {
        (row < self.height && col < self.width)
            .then(|| self.data[row as usize * self.width as usize + col as usize])
    }

    /// True when the buffer holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Copy out a sub-rectangle. Ranges are clipped to the buffer.
    pub fn sub_rect(&self, rows: Range<u32>, cols: Range<u32>) -> EncodedBuffer {
        let row_start = rows.start.min(self.height);
        let row_end = rows.end.clamp(row_start, self.height);
        let col_start = cols.start.min(self.width);
        let col_end = cols.end.clamp(col_start, self.width);

        let width = col_end - col_start;
        let height = row_end - row_start;
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for row in row_start..row_end {
            let start = row as usize * self.width as usize + col_start as usize;
            data.extend_from_slice(&self.data[start..start + width as usize]);
        }

        EncodedBuffer {
            width,
            height,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_values() {
        let encoder = ElevationEncoder::default();
        assert_eq!(encoder.encode_sample(-12000.0, None), 0);
        assert_eq!(encoder.encode_sample(0.0, None), 12000);
        assert_eq!(encoder.encode_sample(9000.0, None), 21000);
        assert_eq!(encoder.encode_sample(-10994.0, None), 1006);
        assert_eq!(encoder.encode_sample(53535.0, None), 65535);
    }

    #[test]
    fn test_no_data_maps_to_floor() {
        let encoder = ElevationEncoder::default();
        // -32768 + 12000 clamps to 0.
        assert_eq!(encoder.encode_sample(f32::NAN, None), 0);
        assert_eq!(encoder.encode_sample(-9999.0, Some(-9999.0)), 0);
        // A declared no-data value only matches exactly.
        assert_eq!(encoder.encode_sample(-9998.0, Some(-9999.0)), 2002);
    }

    #[test]
    fn test_clamps_extremes() {
        let encoder = ElevationEncoder::default();
        assert_eq!(encoder.encode_sample(-20000.0, None), 0);
        assert_eq!(encoder.encode_sample(60000.0, None), 65535);
        assert_eq!(encoder.encode_sample(f32::INFINITY, None), 65535);
        assert_eq!(encoder.encode_sample(f32::NEG_INFINITY, None), 0);
        assert_eq!(encoder.encode_sample(f32::MAX, None), 65535);
        assert_eq!(encoder.encode_sample(f32::MIN, None), 0);
        assert_eq!(encoder.encode_sample(1e19, None), 65535);
        assert_eq!(encoder.encode_sample(1.052_559_3e36, None), 65535);
    }

    #[test]
    fn test_extreme_offsets_saturate() {
        let high = ElevationEncoder::new(i32::MAX, 0);
        assert_eq!(high.encode_sample(f32::MAX, None), 65535);
        let low = ElevationEncoder::new(i32::MIN, 0);
        assert_eq!(low.encode_sample(f32::MIN, None), 0);
    }

    #[test]
    fn test_huge_buffer_values_encode_high() {
        let samples = SampleBuffer::from_vec(3, 1, vec![f32::MAX, f32::INFINITY, f32::NEG_INFINITY]).unwrap();
        let encoded = ElevationEncoder::default().encode(&samples);
        assert_eq!(encoded.as_slice(), &[65535, 65535, 0]);
    }

    #[test]
    fn test_fractions_truncate_toward_zero() {
        let encoder = ElevationEncoder::default();
        assert_eq!(encoder.encode_sample(10.9, None), 12010);
        assert_eq!(encoder.encode_sample(-10.9, None), 11990);
    }

    #[test]
    fn test_custom_fill_and_offset() {
        let encoder = ElevationEncoder::new(100, 0);
        assert_eq!(encoder.encode_sample(f32::NAN, None), 100);
        assert_eq!(encoder.decode(100), 0);
        assert_eq!(encoder.encode_sample(-150.0, None), 0);
    }

    #[test]
    fn test_encode_buffer_preserves_shape() {
        let samples = SampleBuffer::from_vec(3, 2, vec![0.0, 1.0, f32::NAN, -5.0, 9000.0, -32767.0])
            .unwrap()
            .with_no_data(Some(-32767.0));
        let encoded = ElevationEncoder::default().encode(&samples);

        assert_eq!(encoded.dimensions(), (3, 2));
        assert_eq!(encoded.as_slice(), &[12000, 12001, 0, 11995, 21000, 0]);
    }

    #[test]
    fn test_sub_rect() {
        let buffer = EncodedBuffer::from_vec(4, 3, (0..12).collect()).unwrap();
        let sub = buffer.sub_rect(1..3, 2..4);
        assert_eq!(sub.dimensions(), (2, 2));
        assert_eq!(sub.as_slice(), &[6, 7, 10, 11]);

        // Clipped at the edges.
        let clipped = buffer.sub_rect(2..10, 3..10);
        assert_eq!(clipped.dimensions(), (1, 1));
        assert_eq!(clipped.as_slice(), &[11]);

        assert!(buffer.sub_rect(5..6, 0..1).is_empty());
        assert!(EncodedBuffer::from_vec(2, 2, vec![0; 3]).is_none());
    }
}
