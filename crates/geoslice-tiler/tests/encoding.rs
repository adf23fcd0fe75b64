//! Property tests for the elevation encoding.

use geoslice_tiler::ElevationEncoder;
use proptest::prelude::*;

proptest! {
    #[test]
    fn integer_elevations_round_trip(metres in -12000i32..=53535) {
        let encoder = ElevationEncoder::default();
        let pixel = encoder.encode_sample(metres as f32, None);
        prop_assert_eq!(encoder.decode(pixel), metres);
    }

    #[test]
    fn every_sample_encodes(value in proptest::num::f32::ANY, no_data in proptest::option::of(-40000.0f32..40000.0)) {
        let encoder = ElevationEncoder::default();
        let pixel = encoder.encode_sample(value, no_data);
        // Missing and very deep samples land on the floor.
        if value.is_nan() || Some(value) == no_data {
            prop_assert_eq!(pixel, 0);
        } else if value <= -12000.0 {
            prop_assert_eq!(pixel, 0);
        } else if value >= 53536.0 {
            prop_assert_eq!(pixel, u16::MAX);
        }
    }

    #[test]
    fn encoding_is_monotone(a in -20000.0f32..60000.0, b in -20000.0f32..60000.0) {
        let encoder = ElevationEncoder::default();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(encoder.encode_sample(lo, None) <= encoder.encode_sample(hi, None));
    }
}
