//! Download of the source raster.
//!
//! The raster is a single multi-gigabyte file. The fetcher streams it to a
//! `.part` file next to the destination and renames it into place only when
//! the transfer completes, so an existing destination is always a complete
//! download. Failure or cancellation removes the partial file.

use crate::space::{ensure_free_space, DEFAULT_REQUIRED_BYTES};
use crate::{DemError, Result};
use std::fs;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// GEBCO 2024 global grid, hosted on Source Cooperative.
pub const DEFAULT_SOURCE_URL: &str =
    "https://s3.us-west-2.amazonaws.com/us-west-2.opendata.source.coop/alexgleith/gebco-2024/GEBCO_2024.tif";

/// File name the source raster is stored under.
pub const DEFAULT_SOURCE_FILE: &str = "GEBCO_2024.tif";

/// Bytes read from the network per progress update.
const BLOCK_SIZE: usize = 1024 * 1024;

/// Progress of a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadProgress {
    /// The server responded; `total` is the content length if known.
    Started {
        /// Expected size in bytes.
        total: Option<u64>,
    },
    /// A block was written.
    Advanced {
        /// Bytes written so far.
        received: u64,
    },
    /// The file is complete and in place.
    Finished {
        /// Total bytes written.
        bytes: u64,
    },
}

/// Callback for download progress.
pub type DownloadCallback = Box<dyn Fn(DownloadProgress) + Send + Sync>;

/// What [`SourceFetcher::fetch`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The destination already existed; nothing was downloaded.
    AlreadyPresent,
    /// The file was downloaded.
    Downloaded {
        /// Bytes written.
        bytes: u64,
    },
}

/// Downloads the source raster if it is not already present.
pub struct SourceFetcher {
    /// HTTP client.
    client: reqwest::blocking::Client,
    /// Free space required before a download starts.
    required_bytes: u64,
    /// Set from another thread to abandon a download.
    cancel: Option<Arc<AtomicBool>>,
    /// Bytes downloaded by this fetcher.
    bytes_downloaded: AtomicU64,
}

impl std::fmt::Debug for SourceFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFetcher")
            .field("required_bytes", &self.required_bytes)
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

impl SourceFetcher {
    /// Create a fetcher requiring the default free space.
    pub fn new() -> Result<Self> {
        Self::with_required_space(DEFAULT_REQUIRED_BYTES)
    }

    /// Create a fetcher requiring `required_bytes` of free space.
    pub fn with_required_space(required_bytes: u64) -> Result<Self> {
        // No overall timeout: the body takes far longer than any sane limit.
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(60))
            .timeout(None::<Duration>)
            .build()?;

        Ok(Self {
            client,
            required_bytes,
            cancel: None,
            bytes_downloaded: AtomicU64::new(0),
        })
    }

    /// Abandon downloads when `flag` becomes true.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Total bytes downloaded by this fetcher.
    pub fn bytes_downloaded(&self) -> u64 {
        self.bytes_downloaded.load(Ordering::Relaxed)
    }

    /// Make sure `dest` exists, downloading it from `url` if needed.
    pub fn fetch(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<&DownloadCallback>,
    ) -> Result<FetchOutcome> {
        if dest.exists() {
            info!("Found existing {}; skipping download", dest.display());
            return Ok(FetchOutcome::AlreadyPresent);
        }

        let dir = match dest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;
        ensure_free_space(&dir, self.required_bytes)?;

        let part_path = part_path(dest);
        info!("Downloading {} to {}", url, dest.display());

        match self.download(url, &part_path, progress) {
            Ok(bytes) => {
                fs::rename(&part_path, dest)?;
                self.bytes_downloaded.fetch_add(bytes, Ordering::Relaxed);
                if let Some(cb) = progress {
                    cb(DownloadProgress::Finished { bytes });
                }
                info!("Download complete: {} bytes", bytes);
                Ok(FetchOutcome::Downloaded { bytes })
            }
            Err(e) => {
                if part_path.exists() {
                    if let Err(cleanup) = fs::remove_file(&part_path) {
                        warn!("Failed to remove partial download {}: {}", part_path.display(), cleanup);
                    }
                }
                Err(e)
            }
        }
    }

    /// Stream `url` into `part_path`, returning the bytes written.
    fn download(
        &self,
        url: &str,
        part_path: &Path,
        progress: Option<&DownloadCallback>,
    ) -> Result<u64> {
        let failed = |reason: String| DemError::DownloadFailed {
            url: url.to_string(),
            reason,
        };

        let mut response = self.client.get(url).send()?;
        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        let total = response.content_length();
        if let Some(cb) = progress {
            cb(DownloadProgress::Started { total });
        }

        let mut writer = BufWriter::new(fs::File::create(part_path)?);
        let mut buf = vec![0u8; BLOCK_SIZE];
        let mut received = 0u64;

        loop {
            if self.is_cancelled() {
                return Err(DemError::DownloadCancelled {
                    url: url.to_string(),
                });
            }

            let n = response
                .read(&mut buf)
                .map_err(|e| failed(format!("reading response body: {}", e)))?;
            if n == 0 {
                break;
            }
            writer.write_all(&buf[..n])?;
            received += n as u64;

            if let Some(cb) = progress {
                cb(DownloadProgress::Advanced { received });
            }
        }

        writer.flush()?;
        writer
            .into_inner()
            .map_err(|e| failed(format!("flushing download: {}", e.error())))?
            .sync_all()?;

        if let Some(expected) = total {
            if received != expected {
                return Err(failed(format!(
                    "truncated body: received {} of {} bytes",
                    received, expected
                )));
            }
        }

        Ok(received)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

/// Temporary path a download is written to before being renamed into place.
pub fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_path() {
        assert_eq!(
            part_path(Path::new("data/GEBCO_2024.tif")),
            PathBuf::from("data/GEBCO_2024.tif.part")
        );
    }

    #[test]
    fn test_existing_file_is_not_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join(DEFAULT_SOURCE_FILE);
        fs::write(&dest, b"already here").unwrap();

        let fetcher = SourceFetcher::with_required_space(u64::MAX).unwrap();
        // Neither the space check nor the network is reached.
        let outcome = fetcher.fetch("http://127.0.0.1:9/unused.tif", &dest, None).unwrap();

        assert_eq!(outcome, FetchOutcome::AlreadyPresent);
        assert_eq!(fs::read(&dest).unwrap(), b"already here");
        assert_eq!(fetcher.bytes_downloaded(), 0);
    }

    #[test]
    fn test_failed_download_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.tif");

        let fetcher = SourceFetcher::with_required_space(0).unwrap();
        // Port 9 (discard) is not listening; the connection is refused.
        let result = fetcher.fetch("http://127.0.0.1:9/missing.tif", &dest, None);

        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }

    #[test]
    fn test_cancelled_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.tif");
        let flag = Arc::new(AtomicBool::new(true));

        let fetcher = SourceFetcher::with_required_space(0)
            .unwrap()
            .with_cancel_flag(flag);
        assert!(fetcher.is_cancelled());
        assert!(fetcher.fetch("http://127.0.0.1:9/x.tif", &dest, None).is_err());
        assert!(!part_path(&dest).exists());
    }
}
