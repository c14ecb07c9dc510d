//! Rolling-window statistics over cycle durations
//!
//! Tracks the last `window_size` deltas, their mean, and the running
//! maximum across the whole session.

use iolatency_common::NewHigh;
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

/// Latency tracker for one probe session
#[derive(Debug)]
pub struct LatencyTracker {
    /// Most recent deltas in seconds, oldest first
    window: VecDeque<f64>,
    /// Maximum number of deltas kept in `window`
    window_size: usize,
    /// Mean of `window`
    rolling_avg: f64,
    /// Highest delta seen so far
    highest: f64,
    /// Number of recorded cycles
    cycles: u64,
}

impl LatencyTracker {
    /// Create a tracker keeping at most `window_size` recent deltas
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            window: VecDeque::with_capacity(window_size + 1),
            window_size,
            rolling_avg: 0.0,
            highest: 0.0,
            cycles: 0,
        }
    }

    /// Record the duration of a cycle
    ///
    /// # Arguments
    ///
    /// * `delta` - Cycle duration in seconds
    ///
    /// # Returns
    ///
    /// `Some(NewHigh)` if `delta` is strictly above the previous maximum
    pub fn record(&mut self, delta: f64) -> Option<NewHigh> {
        self.window.push_back(delta);
        if self.window.len() > self.window_size {
            self.window.pop_front();
        }

        self.rolling_avg = self.window.iter().sum::<f64>() / self.window.len() as f64;
        self.cycles += 1;

        if delta > self.highest {
            let high = NewHigh {
                delta,
                previous: self.highest,
            };
            self.highest = delta;
            Some(high)
        } else {
            None
        }
    }

    /// Mean of the current window in seconds (0 before the first cycle)
    pub fn rolling_avg(&self) -> f64 {
        self.rolling_avg
    }

    /// Highest recorded delta in seconds
    pub fn highest(&self) -> f64 {
        self.highest
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }
}

/// Single-slot rolling average shared between the measure loop and the
/// reporter
///
/// Stores the `f64` bit pattern in an atomic so readers always get the
/// last published value without taking a lock.
#[derive(Debug, Clone, Default)]
pub struct SharedAverage(Arc<AtomicU64>);

impl SharedAverage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, secs: f64) {
        self.0.store(secs.to_bits(), Ordering::Release);
    }

    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }
}
