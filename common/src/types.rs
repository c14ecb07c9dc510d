//! Value types shared between the measure loop and its observers

/// Convert a duration in seconds to milliseconds
#[inline]
pub fn secs_to_ms(secs: f64) -> f64 {
    secs * 1000.0
}

/// A cycle that beat the previous highest latency
///
/// Both values are in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NewHigh {
    /// Duration of the cycle that set the record
    pub delta: f64,
    /// Highest duration before this cycle (0 on the first cycle)
    pub previous: f64,
}

impl NewHigh {
    pub fn delta_ms(&self) -> f64 {
        secs_to_ms(self.delta)
    }

    pub fn previous_ms(&self) -> f64 {
        secs_to_ms(self.previous)
    }
}
