//! Disk Latency Probe Library
//!
//! Measures write+fsync latency by repeatedly overwriting one file and
//! timing each round trip.

pub mod collector;
pub mod error;
pub mod logging;
pub mod probe;
pub mod reporter;
pub mod types;
pub mod writer;

pub use collector::{LatencyTracker, SharedAverage};
pub use error::{CycleError, CycleStep, ProbeError};
pub use probe::{LatencyProbe, ProbeOutcome};
pub use reporter::{ProgressReporter, ReporterHandle};
pub use types::*;
pub use writer::{ChunkWriter, DurableSink};
