//! YAML configuration for a slicing run.
//!
//! Every field is optional in the file; missing fields take the GEBCO 2024
//! defaults. Command-line flags are applied on top (see [`crate::cli`]).

use geoslice_dem::{
    DEFAULT_CHUNK_CACHE_BYTES, DEFAULT_REQUIRED_BYTES, DEFAULT_SOURCE_FILE, DEFAULT_SOURCE_URL, GIB,
};
use geoslice_grid::{GeoGrid, GridError};
use geoslice_tiler::{DriverOptions, ElevationEncoder, TileWriter};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use thiserror::Error;

const MIB: u64 = 1024 * 1024;

/// Errors loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid grid: {0}")]
    Grid(#[from] GridError),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Settings for fetching and slicing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TilerConfig {
    /// Source raster path (download destination for `fetch`).
    pub input: PathBuf,
    /// Output root directory.
    pub output: PathBuf,
    /// Where to download the source raster from.
    pub download_url: String,
    /// Free space required before downloading, in GiB.
    pub min_free_gb: u64,
    /// Skip sectors whose output is already complete.
    pub resume: bool,
    /// Worker threads; 1 slices sequentially.
    pub jobs: usize,
    /// Decoded-strip cache size per reader, in MiB.
    pub chunk_cache_mb: u64,
    /// World partitioning.
    pub grid: GeoGrid,
    /// Elevation to pixel mapping.
    pub encoding: ElevationEncoder,
}

impl Default for TilerConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_SOURCE_FILE),
            output: PathBuf::from("./slices"),
            download_url: DEFAULT_SOURCE_URL.to_string(),
            min_free_gb: DEFAULT_REQUIRED_BYTES / GIB,
            resume: true,
            jobs: 1,
            chunk_cache_mb: DEFAULT_CHUNK_CACHE_BYTES as u64 / MIB,
            grid: GeoGrid::default(),
            encoding: ElevationEncoder::default(),
        }
    }
}

impl TilerConfig {
    /// Load and validate a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Parse and validate YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        // An empty document means "all defaults".
        let config: TilerConfig = if text.trim().is_empty() {
            TilerConfig::default()
        } else {
            serde_yaml::from_str(text)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate()?;
        if self.jobs == 0 {
            return Err(ConfigError::Invalid("jobs must be at least 1".to_string()));
        }
        if self.chunk_cache_mb == 0 {
            return Err(ConfigError::Invalid(
                "chunk_cache_mb must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Free space required before downloading, in bytes.
    pub fn required_bytes(&self) -> u64 {
        self.min_free_gb.saturating_mul(GIB)
    }

    /// Decoded-strip cache size per reader, in bytes.
    pub fn chunk_cache_bytes(&self) -> usize {
        usize::try_from(self.chunk_cache_mb.saturating_mul(MIB)).unwrap_or(usize::MAX)
    }

    /// Writer for the configured output root.
    pub fn writer(&self) -> TileWriter {
        TileWriter::new(&self.output)
    }

    /// Driver options, wired to `shutdown` when given.
    pub fn driver_options(&self, shutdown: Option<Arc<AtomicBool>>) -> DriverOptions {
        DriverOptions {
            resume: self.resume,
            jobs: self.jobs,
            shutdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_gebco() {
        let config = TilerConfig::default();
        assert_eq!(config.input, PathBuf::from("GEBCO_2024.tif"));
        assert_eq!(config.output, PathBuf::from("./slices"));
        assert_eq!(config.grid, GeoGrid::new(10, 1, 240).unwrap());
        assert_eq!(config.encoding.offset, 12000);
        assert_eq!(config.encoding.no_data_fill, -32768);
        assert_eq!(config.required_bytes(), 15 * GIB);
        assert_eq!(config.chunk_cache_mb, 512);
        assert!(config.resume);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(TilerConfig::from_yaml_str("").unwrap(), TilerConfig::default());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = TilerConfig::from_yaml_str(
            "output: /data/tiles\njobs: 4\ngrid:\n  chunk_degrees: 2\nencoding:\n  offset: 11000\n",
        )
        .unwrap();

        assert_eq!(config.output, PathBuf::from("/data/tiles"));
        assert_eq!(config.jobs, 4);
        assert_eq!(config.grid, GeoGrid::new(10, 2, 240).unwrap());
        assert_eq!(config.encoding, ElevationEncoder::new(11000, -32768));
        assert_eq!(config.input, PathBuf::from("GEBCO_2024.tif"));
    }

    #[test]
    fn test_invalid_grid_is_rejected() {
        let err = TilerConfig::from_yaml_str("grid:\n  chunk_degrees: 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Grid(GridError::ChunkNotDivisor { .. })));

        let err = TilerConfig::from_yaml_str("grid:\n  sector_degrees: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Grid(GridError::ZeroParameter(_))));
    }

    #[test]
    fn test_unknown_and_zero_fields_are_rejected() {
        assert!(matches!(
            TilerConfig::from_yaml_str("outptu: typo\n").unwrap_err(),
            ConfigError::Yaml(_)
        ));
        assert!(matches!(
            TilerConfig::from_yaml_str("jobs: 0\n").unwrap_err(),
            ConfigError::Invalid(_)
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = TilerConfig::load(dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_file_and_derive_options() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geoslice.yaml");
        std::fs::write(&path, "resume: false\nchunk_cache_mb: 64\nmin_free_gb: 1\n").unwrap();

        let config = TilerConfig::load(&path).unwrap();
        let options = config.driver_options(None);

        assert!(!options.resume);
        assert_eq!(options.jobs, 1);
        assert_eq!(config.chunk_cache_bytes(), 64 * 1024 * 1024);
        assert_eq!(config.required_bytes(), GIB);
        assert_eq!(config.writer().root(), Path::new("./slices"));
    }
}
