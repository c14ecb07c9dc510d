//! The measure loop and its session lifecycle
//!
//! A session opens the probe file, runs timed cycles until shutdown is
//! requested or a cycle fails, then stops the reporter, logs the summary
//! and deletes the file. Cleanup runs on both exit paths.

use crate::{
    collector::{LatencyTracker, SharedAverage},
    error::{ProbeError, Result},
    reporter::ProgressReporter,
    types::{ExitReason, ProbeConfig, ProbeSummary},
    writer::{ChunkWriter, DurableSink},
};
use iolatency_common::secs_to_ms;
use log::{debug, error, info};
use std::{fs::File, fs::OpenOptions, future::Future, pin::Pin, time::Duration};
use tokio::time::sleep;

/// How the measure loop ended
enum LoopExit {
    Interrupted,
    Failed(ProbeError),
}

/// Result of a finished session
///
/// The summary is always produced, including when a cycle or the final
/// deletion failed.
#[derive(Debug)]
pub struct ProbeOutcome {
    pub summary: ProbeSummary,
    pub error: Option<ProbeError>,
}

impl ProbeOutcome {
    /// Drop the summary if the session ended with an error
    pub fn into_result(self) -> Result<ProbeSummary> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.summary),
        }
    }
}

/// Disk latency probe bound to one file
pub struct LatencyProbe<S: DurableSink = File> {
    config: ProbeConfig,
    writer: ChunkWriter<S>,
}

impl LatencyProbe<File> {
    /// Create or truncate the probe file
    ///
    /// Nothing is written yet; the file stays empty until `run`.
    pub fn open(config: ProbeConfig) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&config.path)
            .map_err(|source| ProbeError::FileOpen {
                path: config.path.clone(),
                source,
            })?;

        Ok(Self::with_sink(config, file))
    }
}

impl<S: DurableSink> LatencyProbe<S> {
    /// Build a probe over an already opened sink
    ///
    /// `config.path` is still the file deleted at the end of the session.
    pub fn with_sink(config: ProbeConfig, sink: S) -> Self {
        let writer = ChunkWriter::new(sink, config.chunk_size, config.chunks_per_cycle);
        Self { config, writer }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Run the session until `shutdown` resolves or a cycle fails
    ///
    /// # Returns
    ///
    /// The session summary, plus the failed cycle or failed deletion that
    /// ended the session, if any. Cleanup has finished in every case.
    pub async fn run<F>(self, shutdown: F) -> ProbeOutcome
    where
        F: Future<Output = ()>,
    {
        let Self { config, writer } = self;

        info!(
            "writing {:.2} KB random data to file '{}'",
            config.payload_kb(),
            config.path.display()
        );

        let average = SharedAverage::new();
        let reporter = ProgressReporter::new(average.clone(), config.report_interval).spawn();

        let mut tracker = LatencyTracker::new(config.window_size);
        tokio::pin!(shutdown);

        let exit = measure(writer, &mut tracker, &average, config.throttle, shutdown).await;

        let (reason, failure) = match exit {
            LoopExit::Interrupted => {
                info!("Exiting.");
                (ExitReason::Interrupted, None)
            }
            LoopExit::Failed(e) => {
                error!("Exception: {}", e);
                (ExitReason::Failed, Some(e))
            }
        };

        let reports = reporter.stop().await;

        info!(
            "highest measured latency: {:.2}ms",
            secs_to_ms(tracker.highest())
        );
        info!("deleting file '{}'", config.path.display());

        let removed = std::fs::remove_file(&config.path).map_err(|source| {
            error!(
                "Failed to delete file '{}': {}",
                config.path.display(),
                source
            );
            ProbeError::Cleanup {
                path: config.path.clone(),
                source,
            }
        });

        let summary = ProbeSummary::new(
            &config,
            tracker.cycles(),
            tracker.highest(),
            tracker.rolling_avg(),
            reports,
            reason,
        );

        // A failed cycle outranks a failed deletion, which was logged above
        ProbeOutcome {
            summary,
            error: failure.or(removed.err()),
        }
    }
}

/// Run cycles until shutdown or failure
///
/// Shutdown is only observed between cycles, so a cycle that has started
/// always completes. The writer is dropped here, closing the file before
/// it is deleted.
async fn measure<S, F>(
    mut writer: ChunkWriter<S>,
    tracker: &mut LatencyTracker,
    average: &SharedAverage,
    throttle: Duration,
    mut shutdown: Pin<&mut F>,
) -> LoopExit
where
    S: DurableSink,
    F: Future<Output = ()>,
{
    loop {
        // Write+fsync blocks, so the cycle runs on the blocking pool and
        // hands the writer back when done.
        let cycle = tokio::task::spawn_blocking(move || {
            let mut writer = writer;
            let result = writer.cycle();
            (writer, result)
        });

        let (returned, result) = match cycle.await {
            Ok(done) => done,
            Err(e) => return LoopExit::Failed(e.into()),
        };
        writer = returned;

        let delta = match result {
            Ok(elapsed) => elapsed.as_secs_f64(),
            Err(e) => return LoopExit::Failed(e.into()),
        };

        debug!("cycle {}: {:.3}ms", tracker.cycles() + 1, secs_to_ms(delta));

        if let Some(high) = tracker.record(delta) {
            info!(
                "new high: {:.2}ms, was {:.2}ms",
                high.delta_ms(),
                high.previous_ms()
            );
        }
        average.publish(tracker.rolling_avg());

        tokio::select! {
            biased;
            _ = shutdown.as_mut() => return LoopExit::Interrupted,
            _ = sleep(throttle) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CycleStep;
    use std::{
        io::{self, Cursor, Seek, SeekFrom, Write},
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex,
        },
        thread::{self, ThreadId},
    };
    use tokio::sync::oneshot;

    /// Logger keeping every message with the thread that emitted it
    ///
    /// `#[tokio::test]` runs the session and the reporter on the test's own
    /// thread, so filtering by thread separates concurrently running tests.
    struct CaptureLogger {
        records: Mutex<Vec<(ThreadId, String)>>,
    }

    static CAPTURE: CaptureLogger = CaptureLogger {
        records: Mutex::new(Vec::new()),
    };

    impl log::Log for CaptureLogger {
        fn enabled(&self, _: &log::Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &log::Record<'_>) {
            let line = record.args().to_string();
            self.records
                .lock()
                .unwrap()
                .push((thread::current().id(), line));
        }

        fn flush(&self) {}
    }

    fn install_capture() {
        // Another test may have installed it already
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(log::LevelFilter::Info);
    }

    fn captured_lines() -> Vec<String> {
        let me = thread::current().id();
        CAPTURE
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == me)
            .map(|(_, line)| line.clone())
            .collect()
    }

    fn position(lines: &[String], prefix: &str) -> usize {
        lines
            .iter()
            .position(|line| line.starts_with(prefix))
            .unwrap_or_else(|| panic!("no line starting with {prefix:?} in {lines:?}"))
    }

    /// In-memory sink whose sync fails on a chosen cycle
    struct FailingSink {
        inner: Cursor<Vec<u8>>,
        syncs: Arc<AtomicUsize>,
        fail_on: usize,
    }

    impl Write for FailingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.inner.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Seek for FailingSink {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    impl DurableSink for FailingSink {
        fn sync_durable(&mut self) -> io::Result<()> {
            let n = self.syncs.fetch_add(1, Ordering::SeqCst) + 1;
            if n == self.fail_on {
                Err(io::Error::other("simulated sync failure"))
            } else {
                Ok(())
            }
        }
    }

    fn fast_config(path: &std::path::Path) -> ProbeConfig {
        let mut config = ProbeConfig::new(path);
        config.throttle = Duration::from_millis(1);
        config
    }

    #[tokio::test]
    async fn test_interrupt_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.dat");

        let probe = LatencyProbe::open(ProbeConfig::new(&path)).unwrap();
        assert!(path.exists());

        let summary = probe
            .run(sleep(Duration::from_millis(150)))
            .await
            .into_result()
            .unwrap();

        assert!(!path.exists());
        assert_eq!(summary.exit, ExitReason::Interrupted);
        assert!(summary.cycles >= 1);
        assert!(summary.highest_ms > 0.0);
        assert!(summary.rolling_avg_ms > 0.0);
        assert!(summary.rolling_avg_ms <= summary.highest_ms);
        assert_eq!(summary.bytes_per_cycle, 204_800);
    }

    #[tokio::test]
    async fn test_sync_failure_on_fifth_cycle() {
        install_capture();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.dat");
        std::fs::write(&path, b"").unwrap();

        let syncs = Arc::new(AtomicUsize::new(0));
        let sink = FailingSink {
            inner: Cursor::new(Vec::new()),
            syncs: Arc::clone(&syncs),
            fail_on: 5,
        };

        // Reports fire several times while the first four cycles run
        let mut config = ProbeConfig::new(&path);
        config.throttle = Duration::from_millis(5);
        config.report_interval = Duration::from_millis(2);

        let (_never, shutdown) = oneshot::channel::<()>();
        let outcome = LatencyProbe::with_sink(config, sink)
            .run(async move {
                let _ = shutdown.await;
            })
            .await;

        match outcome.error {
            Some(ProbeError::Cycle(ref e)) => assert_eq!(e.step, CycleStep::Sync),
            ref other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(syncs.load(Ordering::SeqCst), 5);
        assert!(!path.exists());

        let summary = &outcome.summary;
        assert_eq!(summary.exit, ExitReason::Failed);
        assert_eq!(summary.cycles, 4);
        assert!(summary.reports >= 1);

        let lines = captured_lines();
        let exception = position(&lines, "Exception: sync failed: simulated sync failure");
        let highest = position(&lines, "highest measured latency: ");
        let deleting = position(&lines, "deleting file ");
        assert!(exception < highest && highest < deleting, "lines: {lines:?}");

        // Reporter was joined before the summary: nothing after the exception
        assert!(!lines[exception..]
            .iter()
            .any(|line| line.starts_with("rolling average")));
        let reports = lines
            .iter()
            .filter(|line| line.starts_with("rolling average"))
            .count();
        assert_eq!(reports as u64, summary.reports);
    }

    #[tokio::test]
    async fn test_failed_session_still_summarized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.dat");
        std::fs::write(&path, b"").unwrap();

        let sink = FailingSink {
            inner: Cursor::new(Vec::new()),
            syncs: Arc::new(AtomicUsize::new(0)),
            fail_on: 1,
        };

        let outcome = LatencyProbe::with_sink(fast_config(&path), sink)
            .run(std::future::pending())
            .await;

        assert!(matches!(outcome.error, Some(ProbeError::Cycle(_))));
        assert_eq!(outcome.summary.exit, ExitReason::Failed);
        assert_eq!(outcome.summary.cycles, 0);
        assert_eq!(outcome.summary.highest_ms, 0.0);

        let json = serde_json::to_value(&outcome.summary).unwrap();
        assert_eq!(json["exit"], "failed");

        assert!(outcome.into_result().is_err());
    }

    #[tokio::test]
    async fn test_shutdown_before_second_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.dat");
        let probe = LatencyProbe::open(fast_config(&path)).unwrap();

        // Already resolved: exactly one cycle runs before the first
        // shutdown check.
        let summary = probe.run(std::future::ready(())).await.into_result().unwrap();

        assert_eq!(summary.cycles, 1);
        assert_eq!(summary.reports, 0);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_open_missing_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("probe.dat");

        let err = LatencyProbe::open(ProbeConfig::new(&path)).err().unwrap();

        assert!(matches!(err, ProbeError::FileOpen { .. }));
        assert!(err.to_string().contains("probe.dat"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_deletion_failure_is_surfaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.dat");
        let probe = LatencyProbe::open(fast_config(&path)).unwrap();

        // Remove the file behind the probe's back
        std::fs::remove_file(&path).unwrap();

        let outcome = probe.run(std::future::ready(())).await;
        assert_eq!(outcome.summary.exit, ExitReason::Interrupted);
        assert_eq!(outcome.summary.cycles, 1);

        let err = outcome.into_result().unwrap_err();
        assert!(matches!(err, ProbeError::Cleanup { .. }));
    }

    #[tokio::test]
    async fn test_open_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.dat");
        std::fs::write(&path, vec![b'x'; 1_000_000]).unwrap();

        let probe = LatencyProbe::open(ProbeConfig::new(&path)).unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
        assert_eq!(probe.config().path, path);
    }
}
