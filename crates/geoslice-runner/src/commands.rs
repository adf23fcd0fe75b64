//! Implementations of the `geoslice` subcommands.

use crate::config::TilerConfig;
use anyhow::{Context, Result};
use geoslice_dem::{
    DemError, DownloadCallback, DownloadProgress, FetchOutcome, RasterInfo, RasterSource, SourceFetcher, WindowReader,
};
use geoslice_grid::GeoGrid;
use geoslice_tiler::{RunAborted, RunSummary, SectorState, TileWriter, WorldDriver};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

/// Download the source raster unless it already exists.
pub fn fetch(config: &TilerConfig, shutdown: &Arc<AtomicBool>) -> Result<FetchOutcome> {
    let fetcher = SourceFetcher::with_required_space(config.required_bytes())
        .context("Failed to create HTTP client")?
        .with_cancel_flag(shutdown.clone());

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
            .progress_chars("#>-"),
    );
    bar.set_message(format!("Downloading {}", config.input.display()));

    let progress_bar = bar.clone();
    let callback: DownloadCallback = Box::new(move |progress| match progress {
        DownloadProgress::Started { total } => progress_bar.set_length(total.unwrap_or(0)),
        DownloadProgress::Advanced { received } => progress_bar.set_position(received),
        DownloadProgress::Finished { .. } => progress_bar.finish_with_message("Downloaded"),
    });

    let result = fetcher.fetch(&config.download_url, &config.input, Some(&callback));
    if !bar.is_finished() {
        bar.finish_and_clear();
    }
    result.with_context(|| format!("Failed to fetch {}", config.download_url))
}

/// True when `err` comes from a download stopped by the shutdown flag.
pub fn is_cancelled(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| matches!(cause.downcast_ref::<DemError>(), Some(DemError::DownloadCancelled { .. })))
}

/// Open the source raster and warn if it does not match the grid.
pub fn open_source(config: &TilerConfig) -> Result<RasterSource> {
    let raster = RasterSource::open_with_cache(&config.input, config.chunk_cache_bytes())
        .with_context(|| format!("Failed to open {}", config.input.display()))?;
    check_grid_fit(&raster.describe(), &config.grid);
    Ok(raster)
}

fn check_grid_fit(info: &RasterInfo, grid: &GeoGrid) {
    let (width, height) = grid.world_dimensions();
    if (info.width, info.height) != (width, height) {
        warn!(
            "Raster is {}x{} but the grid expects {}x{}; edge sectors will be truncated or empty",
            info.width, info.height, width, height
        );
    }
}

/// Slice the source raster. Sequential unless `jobs > 1`.
pub fn slice(config: &TilerConfig, shutdown: &Arc<AtomicBool>) -> Result<std::result::Result<RunSummary, RunAborted>> {
    let mut raster = open_source(config)?;
    let driver = WorldDriver::new(
        config.grid,
        config.encoding,
        config.writer(),
        config.driver_options(Some(shutdown.clone())),
    );

    let result = if config.jobs > 1 {
        // Each worker gets its own handle and its own share of the cache budget.
        let per_worker = (config.chunk_cache_bytes() / config.jobs).max(1);
        drop(raster);
        driver.run_parallel(|| RasterSource::open_with_cache(&config.input, per_worker))
    } else {
        driver.run(&mut raster)
    };
    Ok(result)
}

/// Source raster description and output progress.
#[derive(Debug, Clone)]
pub struct InspectReport {
    pub info: RasterInfo,
    pub grid: GeoGrid,
    pub sectors: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub done: usize,
}

/// Describe the source raster and count sector states under the output root.
pub fn inspect(config: &TilerConfig) -> Result<InspectReport> {
    let raster = open_source(config)?;
    let (width, height) = raster.dimensions();
    Ok(survey(raster.describe(), &config.grid, &config.writer(), width, height))
}

/// Count sector states for a raster of the given size.
pub fn survey(info: RasterInfo, grid: &GeoGrid, writer: &TileWriter, width: u32, height: u32) -> InspectReport {
    let mut report = InspectReport {
        info,
        grid: *grid,
        sectors: 0,
        pending: 0,
        in_progress: 0,
        done: 0,
    };

    for sector in grid.sectors() {
        let window = grid.window_for(&sector, width, height);
        report.sectors += 1;
        match writer.sector_state(&sector.id(), grid, &window) {
            SectorState::Pending => report.pending += 1,
            SectorState::InProgress => report.in_progress += 1,
            SectorState::Done => report.done += 1,
        }
    }

    info!(
        "{} of {} sectors done ({} partial)",
        report.done, report.sectors, report.in_progress
    );
    report
}

impl fmt::Display for InspectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = &self.info;
        writeln!(f, "Raster:        {} x {} samples", info.width, info.height)?;
        writeln!(
            f,
            "Storage:       {} chunks of {} x {}",
            info.chunk_count, info.chunk_width, info.chunk_height
        )?;
        match info.no_data {
            Some(nd) => writeln!(f, "No-data:       {}", nd)?,
            None => writeln!(f, "No-data:       (none)")?,
        }
        if let Some(b) = &info.bounds {
            writeln!(
                f,
                "Bounds:        lat {:.3}..{:.3}, lon {:.3}..{:.3}",
                b.min_lat, b.max_lat, b.min_lon, b.max_lon
            )?;
        }
        match info.implied_pixels_per_degree() {
            Some(ppd) if ppd == self.grid.pixels_per_degree => {
                writeln!(f, "Resolution:    {} pixels per degree", ppd)?
            }
            Some(ppd) => writeln!(
                f,
                "Resolution:    {} pixels per degree (grid expects {})",
                ppd, self.grid.pixels_per_degree
            )?,
            None => writeln!(f, "Resolution:    not a whole-world grid")?,
        }
        writeln!(
            f,
            "Grid:          {} degree sectors, {} degree chunks, {} sectors",
            self.grid.sector_degrees, self.grid.chunk_degrees, self.sectors
        )?;
        write!(
            f,
            "Output:        {} done, {} partial, {} pending",
            self.done, self.in_progress, self.pending
        )
    }
}
