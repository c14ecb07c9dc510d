//! Userspace type definitions
//!
//! Session configuration and the summary produced when a session ends.

use iolatency_common::{
    secs_to_ms, CHUNKS_PER_CYCLE, CHUNK_SIZE, HEX_CHARS_PER_BYTE, REPORT_INTERVAL_SECS, THROTTLE_MS,
    WINDOW_SIZE,
};
use serde::Serialize;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Parameters of one probe session
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// File that is created, overwritten and finally deleted
    pub path: PathBuf,
    /// Random bytes per chunk
    pub chunk_size: usize,
    /// Chunks written per cycle
    pub chunks_per_cycle: usize,
    /// Number of recent deltas averaged
    pub window_size: usize,
    /// Pause between cycles
    pub throttle: Duration,
    /// Time between rolling-average reports
    pub report_interval: Duration,
}

impl ProbeConfig {
    /// Configuration with the fixed session parameters for `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            chunk_size: CHUNK_SIZE,
            chunks_per_cycle: CHUNKS_PER_CYCLE,
            window_size: WINDOW_SIZE,
            throttle: Duration::from_millis(THROTTLE_MS),
            report_interval: Duration::from_secs(REPORT_INTERVAL_SECS),
        }
    }

    /// Random payload per cycle in KB
    pub fn payload_kb(&self) -> f64 {
        (self.chunk_size * self.chunks_per_cycle) as f64 / 1024.0
    }
}

/// Why the measure loop stopped
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExitReason {
    /// Shutdown was requested
    Interrupted,
    /// A cycle failed
    Failed,
}

/// Session summary, logged at shutdown and optionally printed as JSON
#[derive(Serialize, Debug, Clone)]
pub struct ProbeSummary {
    /// Probe file path
    pub path: PathBuf,
    /// Completed cycles
    pub cycles: u64,
    /// Highest cycle latency in milliseconds
    pub highest_ms: f64,
    /// Rolling average at shutdown in milliseconds
    pub rolling_avg_ms: f64,
    /// Bytes written to the file per cycle
    pub bytes_per_cycle: usize,
    /// Rolling-average reports logged during the session
    pub reports: u64,
    pub exit: ExitReason,
    /// RFC 3339 timestamp of the end of the session
    pub finished_at: String,
}

impl ProbeSummary {
    pub(crate) fn new(
        config: &ProbeConfig,
        cycles: u64,
        highest_secs: f64,
        rolling_avg_secs: f64,
        reports: u64,
        exit: ExitReason,
    ) -> Self {
        Self {
            path: config.path.clone(),
            cycles,
            highest_ms: secs_to_ms(highest_secs),
            rolling_avg_ms: secs_to_ms(rolling_avg_secs),
            bytes_per_cycle: config.chunk_size * config.chunks_per_cycle * HEX_CHARS_PER_BYTE,
            reports,
            exit,
            finished_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
