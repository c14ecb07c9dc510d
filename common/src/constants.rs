//! Fixed parameters of a probe session
//!
//! None of these are exposed on the command line. Library callers can
//! override the timing ones through `ProbeConfig` (tests do).

// ============================================================================
// Payload
// ============================================================================

/// Random bytes generated per chunk
pub const CHUNK_SIZE: usize = 102_400;

/// Chunks written per cycle
pub const CHUNKS_PER_CYCLE: usize = 1;

/// Each payload byte is written as two lowercase hex characters
pub const HEX_CHARS_PER_BYTE: usize = 2;

/// Bytes that reach the file per cycle
pub const BYTES_PER_CYCLE: usize = CHUNK_SIZE * CHUNKS_PER_CYCLE * HEX_CHARS_PER_BYTE;

// ============================================================================
// Rolling Window
// ============================================================================

/// Number of most recent cycle durations kept for the rolling average
pub const WINDOW_SIZE: usize = 100;

// ============================================================================
// Timing
// ============================================================================

/// Pause between cycles (milliseconds)
pub const THROTTLE_MS: u64 = 10;

/// Interval between rolling-average reports (seconds)
pub const REPORT_INTERVAL_SECS: u64 = 10;

// ============================================================================
// Process Exit Codes
// ============================================================================

/// Exit code for a wrong argument count
pub const EXIT_USAGE: i32 = 1;
