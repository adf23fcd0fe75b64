//! Free disk space precondition.

use crate::{DemError, Result};
use std::path::{Path, PathBuf};
use sysinfo::Disks;
use tracing::{info, warn};

/// Bytes in one GiB.
pub const GIB: u64 = 1024 * 1024 * 1024;

/// Free space needed before downloading the source raster: the compressed
/// download, plus room for the slices.
pub const DEFAULT_REQUIRED_BYTES: u64 = 15 * GIB;

/// Available bytes on the disk holding `dir`, or `None` if no mounted disk
/// matches the path.
pub fn available_space(dir: &Path) -> Option<u64> {
    let dir = absolute(dir);
    let disks = Disks::new_with_refreshed_list();

    // The most specific mount point containing the directory wins.
    disks
        .list()
        .iter()
        .filter(|disk| dir.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space())
}

/// Fail unless the disk holding `dir` has at least `required` free bytes.
///
/// When the available space cannot be determined the check passes with a
/// warning.
pub fn ensure_free_space(dir: &Path, required: u64) -> Result<()> {
    match available_space(dir) {
        Some(available) if available < required => Err(DemError::InsufficientSpace {
            path: dir.to_path_buf(),
            required,
            available,
        }),
        Some(available) => {
            info!(
                "Disk check passed: {:.2} GiB available (required: {:.2} GiB)",
                available as f64 / GIB as f64,
                required as f64 / GIB as f64
            );
            Ok(())
        }
        None => {
            warn!(
                "Could not determine free space for {}; proceeding",
                dir.display()
            );
            Ok(())
        }
    }
}

fn absolute(dir: &Path) -> PathBuf {
    dir.canonicalize()
        .or_else(|_| std::env::current_dir().map(|cwd| cwd.join(dir)))
        .unwrap_or_else(|_| dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_requirement_always_passes() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ensure_free_space(dir.path(), 0).is_ok());
    }

    #[test]
    fn test_impossible_requirement_fails_when_measurable() {
        let dir = tempfile::tempdir().unwrap();
        if available_space(dir.path()).is_none() {
            eprintln!("Skipping test: no disk information available");
            return;
        }
        let err = ensure_free_space(dir.path(), u64::MAX).unwrap_err();
        assert!(matches!(err, DemError::InsufficientSpace { required: u64::MAX, .. }));
    }
}
