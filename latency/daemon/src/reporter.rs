//! Periodic rolling-average reporting
//!
//! Runs as its own task alongside the measure loop and is stopped and
//! joined before the session summary is logged.

use crate::collector::SharedAverage;
use iolatency_common::secs_to_ms;
use log::{info, warn};
use std::time::Duration;
use tokio::{sync::oneshot, task::JoinHandle, time::sleep};

/// Progress reporter reading the shared rolling average
pub struct ProgressReporter {
    average: SharedAverage,
    interval: Duration,
}

/// Handle to a running reporter task
pub struct ReporterHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<u64>,
}

impl ProgressReporter {
    /// Create a new reporter
    ///
    /// # Arguments
    ///
    /// * `average` - Slot the measure loop publishes the rolling average to
    /// * `interval` - Time between reports
    pub fn new(average: SharedAverage, interval: Duration) -> Self {
        Self { average, interval }
    }

    /// Spawn the reporter task
    ///
    /// The next report is scheduled a full interval after the previous one
    /// was logged, like a timer that re-arms itself on each firing.
    pub fn spawn(self) -> ReporterHandle {
        let (stop, mut stopped) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut reports = 0u64;

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stopped => break,
                    _ = sleep(self.interval) => {
                        info!("rolling average: {:.2} ms", secs_to_ms(self.average.load()));
                        reports += 1;
                    }
                }
            }

            reports
        });

        ReporterHandle { stop, task }
    }
}

impl ReporterHandle {
    /// Stop the reporter and wait for its task to finish
    ///
    /// # Returns
    ///
    /// Number of reports that were logged
    pub async fn stop(self) -> u64 {
        // The task only exits through the stop channel, so a send error
        // means it already died.
        let _ = self.stop.send(());

        match self.task.await {
            Ok(reports) => reports,
            Err(e) => {
                warn!("Reporter task ended abnormally: {}", e);
                0
            }
        }
    }
}
