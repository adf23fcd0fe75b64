//! World driver: enumerates every sector and slices it.
//!
//! The sequential [`WorldDriver::run`] walks the grid in enumeration order
//! with a single reader and stops at the first failing sector. With
//! `jobs > 1`, [`WorldDriver::run_parallel`] spreads sectors over a rayon pool
//! where each worker opens one reader and keeps it; the first failure stops
//! the remaining work and every failure seen is reported.

use crate::encode::ElevationEncoder;
use crate::error::{RunAborted, SectorFailure};
use crate::writer::{SectorState, TileWriter};
use crate::TilerError;
use geoslice_dem::WindowReader;
use geoslice_grid::{GeoGrid, Sector};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

// ============================================================================
// Options and results
// ============================================================================

/// Run-time options for a [`WorldDriver`].
#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Skip sectors whose output is already complete.
    pub resume: bool,
    /// Worker threads used by [`WorldDriver::run_parallel`].
    pub jobs: usize,
    /// Checked between sectors; when set, the run stops cleanly.
    pub shutdown: Option<Arc<AtomicBool>>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            resume: true,
            jobs: 1,
            shutdown: None,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every sector was processed or skipped.
    Completed,
    /// The shutdown flag stopped the run between sectors.
    Interrupted,
    /// A sector failed.
    Aborted,
}

/// Counters for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Sectors in the grid.
    pub total: usize,
    /// Sectors read, encoded and written.
    pub processed: usize,
    /// Sectors skipped because their output was already complete.
    pub skipped_done: usize,
    /// Sectors skipped because their window is empty.
    pub skipped_empty: usize,
    /// Chunk files written.
    pub chunks_written: usize,
    /// Wall-clock duration.
    pub elapsed: Duration,
}

impl RunSummary {
    fn new(total: usize) -> Self {
        Self {
            outcome: RunOutcome::Completed,
            total,
            processed: 0,
            skipped_done: 0,
            skipped_empty: 0,
            chunks_written: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Sectors accounted for, whether written or skipped.
    pub fn visited(&self) -> usize {
        self.processed + self.skipped_done + self.skipped_empty
    }

    fn record(&mut self, result: SectorResult) {
        match result {
            SectorResult::Written { chunks } => {
                self.processed += 1;
                self.chunks_written += chunks;
            }
            SectorResult::AlreadyDone => self.skipped_done += 1,
            SectorResult::Empty => self.skipped_empty += 1,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} sectors written, {} already done, {} empty, {} chunks in {:.1}s",
            self.processed,
            self.total,
            self.skipped_done,
            self.skipped_empty,
            self.chunks_written,
            self.elapsed.as_secs_f64()
        )
    }
}

/// What happened to one sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorResult {
    /// The sector image and this many chunks were written.
    Written {
        /// Chunk files written.
        chunks: usize,
    },
    /// Resume found the sector complete; nothing was read or written.
    AlreadyDone,
    /// The sector's window has no pixels.
    Empty,
}

// ============================================================================
// Driver
// ============================================================================

/// Slices the whole world grid into sector and chunk images.
#[derive(Debug, Clone)]
pub struct WorldDriver {
    grid: GeoGrid,
    encoder: ElevationEncoder,
    writer: TileWriter,
    options: DriverOptions,
}

impl WorldDriver {
    /// Create a driver.
    pub fn new(grid: GeoGrid, encoder: ElevationEncoder, writer: TileWriter, options: DriverOptions) -> Self {
        Self {
            grid,
            encoder,
            writer,
            options,
        }
    }

    /// The grid being sliced.
    pub fn grid(&self) -> &GeoGrid {
        &self.grid
    }

    /// The output writer.
    pub fn writer(&self) -> &TileWriter {
        &self.writer
    }

    /// The run options.
    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    fn shutdown_requested(&self) -> bool {
        self.options
            .shutdown
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Read, encode and write one sector.
    pub fn process_sector<R: WindowReader + ?Sized>(
        &self,
        reader: &mut R,
        sector: &Sector,
    ) -> std::result::Result<SectorResult, SectorFailure> {
        let id = sector.id();
        let (width, height) = reader.dimensions();
        let window = self.grid.window_for(sector, width, height);

        if window.is_empty() {
            debug!("{}: empty window, skipping", id);
            return Ok(SectorResult::Empty);
        }

        if self.options.resume {
            match self.writer.sector_state(&id, &self.grid, &window) {
                SectorState::Done => {
                    debug!("{}: already complete, skipping", id);
                    return Ok(SectorResult::AlreadyDone);
                }
                SectorState::InProgress => info!("{}: partial output found, rewriting", id),
                SectorState::Pending => {}
            }
        }

        let fail = |error: TilerError| SectorFailure {
            sector: id.clone(),
            window,
            error,
        };

        let samples = reader.read_window(&window).map_err(|source| {
            fail(TilerError::Read {
                sector: id.clone(),
                window,
                source,
            })
        })?;
        let encoded = self.encoder.encode(&samples);

        self.writer.write_sector(&id, &encoded).map_err(fail)?;
        let chunks = self
            .writer
            .write_chunks(&id, &encoded, &self.grid)
            .map_err(fail)?;

        Ok(SectorResult::Written { chunks })
    }

    /// Slice every sector in enumeration order with a single reader.
    ///
    /// Stops at the first failure. The shutdown flag is honoured between
    /// sectors, never inside one.
    pub fn run<R: WindowReader + ?Sized>(&self, reader: &mut R) -> std::result::Result<RunSummary, RunAborted> {
        let start = Instant::now();
        let total = self.grid.sector_count();
        let mut summary = RunSummary::new(total);

        info!(
            "Slicing {} sectors into {} (resume: {})",
            total,
            self.writer.root().display(),
            self.options.resume
        );

        for (index, sector) in self.grid.sectors().enumerate() {
            if self.shutdown_requested() {
                summary.outcome = RunOutcome::Interrupted;
                break;
            }

            let (width, height) = reader.dimensions();
            let window = self.grid.window_for(&sector, width, height);
            info!("[{}/{}] {} ({})", index + 1, total, sector.id(), window);

            match self.process_sector(reader, &sector) {
                Ok(result) => summary.record(result),
                Err(failure) => {
                    summary.outcome = RunOutcome::Aborted;
                    summary.elapsed = start.elapsed();
                    error!("Aborted at {}", failure);
                    return Err(RunAborted {
                        failures: vec![failure],
                        summary,
                    });
                }
            }
        }

        summary.elapsed = start.elapsed();
        self.log_finish(&summary);
        Ok(summary)
    }

    /// Slice every sector on a pool of `options.jobs` workers.
    ///
    /// Each worker calls `open` once, on its first sector, and keeps that
    /// reader for the rest of the run. Workers claim sectors in enumeration
    /// order from a shared counter. After the first failure no new sectors
    /// are started; sectors already underway finish and any further failures
    /// are collected too.
    pub fn run_parallel<R, F>(&self, open: F) -> std::result::Result<RunSummary, RunAborted>
    where
        R: WindowReader,
        F: Fn() -> geoslice_dem::Result<R> + Sync + Send,
    {
        let jobs = self.options.jobs.max(1);
        match rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .thread_name(|i| format!("geoslice-worker-{}", i))
            .build()
        {
            Ok(pool) => pool.install(|| self.run_pooled(jobs, &open)),
            Err(e) => {
                warn!("Could not build a {}-thread pool ({}); using the global pool", jobs, e);
                self.run_pooled(jobs, &open)
            }
        }
    }

    fn run_pooled<R, F>(&self, jobs: usize, open: &F) -> std::result::Result<RunSummary, RunAborted>
    where
        R: WindowReader,
        F: Fn() -> geoslice_dem::Result<R> + Sync + Send,
    {
        let start = Instant::now();
        let sectors: Vec<Sector> = self.grid.sectors().collect();
        let total = sectors.len();

        info!(
            "Slicing {} sectors into {} on {} workers (resume: {})",
            total,
            self.writer.root().display(),
            jobs,
            self.options.resume
        );

        let abort = AtomicBool::new(false);
        let next = AtomicUsize::new(0);
        let summary = Mutex::new(RunSummary::new(total));
        let failures = Mutex::new(Vec::new());

        let fail = |failure: SectorFailure| {
            abort.store(true, Ordering::SeqCst);
            failures.lock().push(failure);
        };

        let worker = || {
            let mut reader: Option<R> = None;
            loop {
                if abort.load(Ordering::SeqCst) || self.shutdown_requested() {
                    return;
                }
                let index = next.fetch_add(1, Ordering::SeqCst);
                let Some(sector) = sectors.get(index) else {
                    return;
                };

                if reader.is_none() {
                    match open() {
                        Ok(opened) => reader = Some(opened),
                        Err(e) => {
                            let failure = SectorFailure {
                                sector: sector.id(),
                                window: Default::default(),
                                error: TilerError::Open(e.to_string()),
                            };
                            error!("Worker failed at {}", failure);
                            fail(failure);
                            return;
                        }
                    }
                }
                let Some(reader) = reader.as_mut() else {
                    return;
                };

                info!("[{}/{}] {}", index + 1, total, sector.id());
                match self.process_sector(reader, sector) {
                    Ok(result) => summary.lock().record(result),
                    Err(failure) => {
                        error!("Failed at {}", failure);
                        fail(failure);
                    }
                }
            }
        };

        rayon::scope(|scope| {
            for _ in 0..jobs {
                scope.spawn(|_| worker());
            }
        });

        let mut summary = summary.into_inner();
        let failures = failures.into_inner();
        summary.elapsed = start.elapsed();

        if !failures.is_empty() {
            summary.outcome = RunOutcome::Aborted;
            error!("Run aborted with {} failed sectors: {}", failures.len(), summary);
            return Err(RunAborted { failures, summary });
        }

        if summary.visited() < total && self.shutdown_requested() {
            summary.outcome = RunOutcome::Interrupted;
        }
        self.log_finish(&summary);
        Ok(summary)
    }

    fn log_finish(&self, summary: &RunSummary) {
        match summary.outcome {
            RunOutcome::Completed => info!("Completed all sectors: {}", summary),
            RunOutcome::Interrupted => warn!(
                "Interrupted after {} of {} sectors: {}",
                summary.visited(),
                summary.total,
                summary
            ),
            RunOutcome::Aborted => error!("Aborted: {}", summary),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoslice_dem::{DemError, MemoryRaster, SampleBuffer};
    use geoslice_grid::PixelWindow;

    /// Fails every read of one window.
    struct FailingReader {
        inner: MemoryRaster,
        fail_at: PixelWindow,
    }

    impl WindowReader for FailingReader {
        fn dimensions(&self) -> (u32, u32) {
            self.inner.dimensions()
        }

        fn no_data(&self) -> Option<f32> {
            None
        }

        fn read_window(&mut self, window: &PixelWindow) -> geoslice_dem::Result<SampleBuffer> {
            if *window == self.fail_at {
                return Err(DemError::ReadFailure {
                    window: *window,
                    reason: "simulated corruption".to_string(),
                });
            }
            self.inner.read_window(window)
        }
    }

    fn small_grid() -> GeoGrid {
        // 12 x 6 sectors of 30x30 pixels, four chunks each.
        GeoGrid::new(30, 15, 1).unwrap()
    }

    fn driver(root: &std::path::Path, options: DriverOptions) -> WorldDriver {
        WorldDriver::new(small_grid(), ElevationEncoder::default(), TileWriter::new(root), options)
    }

    fn world() -> MemoryRaster {
        let (w, h) = small_grid().world_dimensions();
        MemoryRaster::new(SampleBuffer::from_vec(w, h, vec![0.0; (w * h) as usize]).unwrap())
    }

    #[test]
    fn test_run_writes_every_sector() {
        let dir = tempfile::tempdir().unwrap();
        let driver = driver(dir.path(), DriverOptions::default());
        let mut raster = world();

        let summary = driver.run(&mut raster).unwrap();

        assert_eq!(summary.outcome, RunOutcome::Completed);
        assert_eq!(summary.total, 72);
        assert_eq!(summary.processed, 72);
        assert_eq!(summary.chunks_written, 72 * 4);
        assert_eq!(raster.reads(), 72);
        assert!(dir.path().join("N90W180").join("sector.png").is_file());
        assert!(dir.path().join("S60E150").join("chunk_1_1.png").is_file());
    }

    #[test]
    fn test_read_failure_aborts_with_context() {
        let dir = tempfile::tempdir().unwrap();
        let driver = driver(dir.path(), DriverOptions::default());
        let grid = small_grid();
        let (w, h) = grid.world_dimensions();
        let bad = grid.sector_at(60, -150).unwrap();
        let mut reader = FailingReader {
            inner: world(),
            fail_at: grid.window_for(&bad, w, h),
        };

        let aborted = driver.run(&mut reader).unwrap_err();

        assert_eq!(aborted.failures.len(), 1);
        let failure = &aborted.failures[0];
        assert_eq!(failure.sector.as_str(), "N60W150");
        assert!(matches!(failure.error, TilerError::Read { .. }));
        assert_eq!(aborted.summary.outcome, RunOutcome::Aborted);
        // Twelve sectors in the first band plus one before the failure.
        assert_eq!(aborted.summary.processed, 13);
        assert!(aborted.to_string().contains("N60W150"));
        assert!(!dir.path().join("N60W150").exists());
        assert!(!dir.path().join("N60W120").exists());
    }

    #[test]
    fn test_shutdown_flag_stops_between_sectors() {
        let dir = tempfile::tempdir().unwrap();
        let flag = Arc::new(AtomicBool::new(true));
        let options = DriverOptions {
            shutdown: Some(flag),
            ..DriverOptions::default()
        };

        let summary = driver(dir.path(), options).run(&mut world()).unwrap();

        assert_eq!(summary.outcome, RunOutcome::Interrupted);
        assert_eq!(summary.visited(), 0);
    }

    #[test]
    fn test_empty_windows_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        // A raster covering only the northern half leaves the southern
        // sectors with empty windows.
        let (w, h) = small_grid().world_dimensions();
        let mut raster = MemoryRaster::from_fn(w, h / 2, |_, _| 100.0);

        let summary = driver(dir.path(), DriverOptions::default()).run(&mut raster).unwrap();

        assert_eq!(summary.processed, 36);
        assert_eq!(summary.skipped_empty, 36);
        assert!(!dir.path().join("S00W180").exists());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let sequential = tempfile::tempdir().unwrap();
        let parallel = tempfile::tempdir().unwrap();
        let (w, h) = small_grid().world_dimensions();
        let elevation = |row: u32, col: u32| row as f32 * 100.0 - col as f32 * 10.0;

        driver(sequential.path(), DriverOptions::default())
            .run(&mut MemoryRaster::from_fn(w, h, elevation))
            .unwrap();

        let options = DriverOptions {
            jobs: 4,
            ..DriverOptions::default()
        };
        let summary = driver(parallel.path(), options)
            .run_parallel(|| Ok(MemoryRaster::from_fn(w, h, elevation)))
            .unwrap();

        assert_eq!(summary.outcome, RunOutcome::Completed);
        assert_eq!(summary.processed, 72);
        for sector in small_grid().sectors() {
            let id = sector.id();
            let a = std::fs::read(sequential.path().join(&id).join("sector.png")).unwrap();
            let b = std::fs::read(parallel.path().join(&id).join("sector.png")).unwrap();
            assert_eq!(a, b, "sector {}", id);
        }
    }

    #[test]
    fn test_parallel_collects_open_failures() {
        let dir = tempfile::tempdir().unwrap();
        let options = DriverOptions {
            jobs: 2,
            ..DriverOptions::default()
        };

        let aborted = driver(dir.path(), options)
            .run_parallel(|| -> geoslice_dem::Result<MemoryRaster> {
                Err(DemError::UnsupportedLayout("test".to_string()))
            })
            .unwrap_err();

        assert!(!aborted.failures.is_empty());
        assert!(matches!(aborted.failures[0].error, TilerError::Open(_)));
        assert!(aborted.failures.len() <= 2);
        assert_eq!(aborted.summary.processed, 0);
    }

    #[test]
    fn test_parallel_opens_one_reader_per_worker() {
        let dir = tempfile::tempdir().unwrap();
        let (w, h) = small_grid().world_dimensions();
        let opens = AtomicUsize::new(0);
        let options = DriverOptions {
            jobs: 4,
            ..DriverOptions::default()
        };

        let summary = driver(dir.path(), options)
            .run_parallel(|| {
                opens.fetch_add(1, Ordering::SeqCst);
                Ok(MemoryRaster::from_fn(w, h, |_, _| 0.0))
            })
            .unwrap();

        assert_eq!(summary.processed, 72);
        let opens = opens.load(Ordering::SeqCst);
        assert!((1..=4).contains(&opens), "opened {} readers", opens);
    }

    #[test]
    fn test_parallel_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let (w, h) = small_grid().world_dimensions();
        let opens = AtomicUsize::new(0);
        let options = DriverOptions {
            jobs: 3,
            shutdown: Some(Arc::new(AtomicBool::new(true))),
            ..DriverOptions::default()
        };

        let summary = driver(dir.path(), options)
            .run_parallel(|| {
                opens.fetch_add(1, Ordering::SeqCst);
                Ok(MemoryRaster::from_fn(w, h, |_, _| 0.0))
            })
            .unwrap();

        assert_eq!(summary.outcome, RunOutcome::Interrupted);
        assert_eq!(opens.load(Ordering::SeqCst), 0);
    }
}
