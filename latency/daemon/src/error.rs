//! Error types for the probe
//!
//! Any `CycleError` ends the session. Cleanup still runs before it is
//! returned to the caller.

use std::{io, path::PathBuf};

/// Step of a measure cycle that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStep {
    Seek,
    Write,
    Flush,
    Sync,
}

impl std::fmt::Display for CycleStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CycleStep::Seek => "seek",
            CycleStep::Write => "write",
            CycleStep::Flush => "flush",
            CycleStep::Sync => "sync",
        };
        f.write_str(name)
    }
}

/// Failure of a single write/flush/sync round trip
#[derive(Debug, thiserror::Error)]
#[error("{step} failed: {source}")]
pub struct CycleError {
    pub step: CycleStep,
    #[source]
    pub source: io::Error,
}

impl CycleError {
    pub fn new(step: CycleStep, source: io::Error) -> Self {
        Self { step, source }
    }
}

/// Errors that end or prevent a probe session
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The target file could not be created or truncated.
    #[error("cannot open '{}' for writing: {source}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A measure cycle failed and the session was stopped.
    #[error(transparent)]
    Cycle(#[from] CycleError),

    /// The probe file could not be removed after the session ended.
    #[error("cannot delete '{}': {source}", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The blocking task running a cycle panicked or was cancelled.
    #[error("cycle task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ProbeError>;
