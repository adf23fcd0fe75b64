//! Sectors and their names.

use crate::{GridError, Result};
use std::fmt;
use std::str::FromStr;

/// A rectangular region of the world grid, identified by its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sector {
    /// Latitude of the top edge in degrees (positive = north).
    pub top_lat: i32,
    /// Longitude of the left edge in degrees (negative = west).
    pub left_lon: i32,
}

impl Sector {
    /// Create a sector from its top-left corner.
    ///
    /// No grid alignment is checked here; use [`crate::GeoGrid::sector_at`]
    /// for a validated sector.
    pub fn new(top_lat: i32, left_lon: i32) -> Self {
        Self { top_lat, left_lon }
    }

    /// The sector's name, e.g. `N50W010`.
    pub fn id(&self) -> SectorId {
        SectorId::from_corner(self.top_lat, self.left_lon)
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.id(), self.top_lat, self.left_lon)
    }
}

/// Name of a sector: `{N|S}{lat:02}{E|W}{lon:03}`.
///
/// The latitude letter is `N` only when the top edge is strictly north of the
/// equator; a top edge of exactly 0° is written `S00`. The longitude letter is
/// `E` for 0° and eastward. With these rules every corner has exactly one name,
/// and every name produced here parses back to the same corner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectorId(String);

impl SectorId {
    /// Build the name for a top-left corner.
    pub fn from_corner(top_lat: i32, left_lon: i32) -> Self {
        let lat_hem = if top_lat > 0 { 'N' } else { 'S' };
        let lon_hem = if left_lon >= 0 { 'E' } else { 'W' };
        SectorId(format!(
            "{}{:02}{}{:03}",
            lat_hem,
            top_lat.unsigned_abs(),
            lon_hem,
            left_lon.unsigned_abs()
        ))
    }

    /// Parse a sector name back into its `(top_lat, left_lon)` corner.
    pub fn parse(name: &str) -> Result<(i32, i32)> {
        let invalid = || GridError::InvalidSectorId(name.to_string());

        let bytes = name.as_bytes();
        if bytes.len() != 7 || !name.is_ascii() {
            return Err(invalid());
        }

        let lat_mag = parse_digits(&name[1..3]).ok_or_else(invalid)?;
        let lon_mag = parse_digits(&name[4..7]).ok_or_else(invalid)?;

        let top_lat = match bytes[0] {
            b'N' if lat_mag > 0 && lat_mag <= 90 => lat_mag,
            b'S' if lat_mag < 90 => -lat_mag,
            _ => return Err(invalid()),
        };
        let left_lon = match bytes[3] {
            b'E' if lon_mag < 180 => lon_mag,
            b'W' if lon_mag > 0 && lon_mag <= 180 => -lon_mag,
            _ => return Err(invalid()),
        };

        Ok((top_lat, left_lon))
    }

    /// The corner this name encodes.
    pub fn corner(&self) -> (i32, i32) {
        // Only constructed through from_corner or a successful parse.
        Self::parse(&self.0).unwrap_or((0, 0))
    }

    /// The sector this name encodes.
    pub fn sector(&self) -> Sector {
        let (top_lat, left_lon) = self.corner();
        Sector::new(top_lat, left_lon)
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn parse_digits(s: &str) -> Option<i32> {
    if s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

impl FromStr for SectorId {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self> {
        let (top_lat, left_lon) = Self::parse(s)?;
        Ok(Self::from_corner(top_lat, left_lon))
    }
}

impl fmt::Display for SectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SectorId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<std::path::Path> for SectorId {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sector_id_format() {
        assert_eq!(Sector::new(50, -10).id().as_str(), "N50W010");
        assert_eq!(Sector::new(90, -180).id().as_str(), "N90W180");
        assert_eq!(Sector::new(-80, 170).id().as_str(), "S80E170");
        assert_eq!(Sector::new(10, 0).id().as_str(), "N10E000");
    }

    #[test]
    fn test_equator_band_is_south() {
        // The band whose top edge is the equator is labelled S00, not N00.
        assert_eq!(Sector::new(0, 0).id().as_str(), "S00E000");
        assert_eq!(Sector::new(0, -10).id().as_str(), "S00W010");
    }

    #[test]
    fn test_parse_roundtrip() {
        for (lat, lon) in [(50, -10), (0, 0), (-80, 170), (90, -180), (-10, -1)] {
            let id = Sector::new(lat, lon).id();
            assert_eq!(SectorId::parse(id.as_str()).unwrap(), (lat, lon));
            assert_eq!(id.sector(), Sector::new(lat, lon));
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "", "N50W10", "N50W0100", "X50W010", "N5aW010", "N50X010", "N00E000",
            "S90E000", "N91E000", "E50N010", "W000...", "N50W000", "N50E180", "N50W181",
            "N+5W010",
        ] {
            assert!(SectorId::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_from_str() {
        let id: SectorId = "S30E120".parse().unwrap();
        assert_eq!(id.corner(), (-30, 120));
        assert!("garbage".parse::<SectorId>().is_err());
    }
}
