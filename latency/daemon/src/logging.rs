//! Log output setup
//!
//! Lines look like `2024-10-10 14:03:07,512 - INFO - message`.

use chrono::{DateTime, Local};
use log::{Level, LevelFilter};
use std::io::Write;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Render one log line without the trailing newline
pub fn format_line(now: &DateTime<Local>, level: Level, message: &std::fmt::Arguments<'_>) -> String {
    format!("{} - {} - {}", now.format(TIMESTAMP_FORMAT), level, message)
}

/// Install the process-wide logger
///
/// Defaults to `Info`, or `Debug` when `verbose` is set. `RUST_LOG`
/// module directives still apply on top.
pub fn init(verbose: bool) {
    env_logger::Builder::from_default_env()
        .filter_level(if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .format(|buf, record| {
            writeln!(buf, "{}", format_line(&Local::now(), record.level(), record.args()))
        })
        .init();
}
