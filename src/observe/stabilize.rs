//! Stabilization predicate over a history of output samples.
//!
//! The page under test never says when it is done, so an output is accepted
//! once it has (a) reached the expected shape and (b) stopped changing for a
//! continuous window. Everything here is pure; the sampling loop in
//! [`super::engine`] feeds it one sample per tick.

use std::time::Duration;

use crate::config::TimingSettings;

/// Sampling cadence and the continuous window a value must hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilityTiming {
    pub interval: Duration,
    pub window: Duration,
}

impl StabilityTiming {
    pub fn from_settings(settings: &TimingSettings) -> Self {
        Self {
            interval: settings.sample_interval,
            window: settings.stable_window,
        }
    }

    fn interval_ms(&self) -> u64 {
        self.interval.as_millis() as u64
    }

    fn window_ms(&self) -> u64 {
        self.window.as_millis() as u64
    }
}

impl Default for StabilityTiming {
    fn default() -> Self {
        Self::from_settings(&TimingSettings::defaults())
    }
}

/// What a settled output must look like
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// Empty input: the output has to clear
    Cleared,
    /// Non-empty input: the output has to move away from this baseline
    ChangedFrom(String),
}

impl Expectation {
    pub fn for_input(input: &str, baseline: &str) -> Self {
        if input.trim().is_empty() {
            Expectation::Cleared
        } else {
            Expectation::ChangedFrom(baseline.to_string())
        }
    }

    pub fn accepts(&self, text: &str) -> bool {
        match self {
            Expectation::Cleared => text.is_empty(),
            Expectation::ChangedFrom(baseline) => text != baseline,
        }
    }
}

/// Running count of how long the latest sample has been unchanged.
///
/// The first sample never counts as stable; each identical successor adds
/// one interval and any change resets the count to zero.
#[derive(Debug, Clone)]
pub struct StabilityTracker {
    last: Option<String>,
    stable_ms: u64,
    interval_ms: u64,
}

impl StabilityTracker {
    pub fn new(timing: StabilityTiming) -> Self {
        Self {
            last: None,
            stable_ms: 0,
            interval_ms: timing.interval_ms(),
        }
    }

    /// Record a sample and return the stable duration in milliseconds
    pub fn record(&mut self, sample: &str) -> u64 {
        match &self.last {
            Some(previous) if previous == sample => self.stable_ms += self.interval_ms,
            _ => {
                self.stable_ms = 0;
                self.last = Some(sample.to_string());
            }
        }
        self.stable_ms
    }

    pub fn stable_ms(&self) -> u64 {
        self.stable_ms
    }
}

/// True when `text` satisfies `expectation` and has held for the window
pub fn is_settled(
    expectation: &Expectation,
    text: &str,
    stable_ms: u64,
    timing: StabilityTiming,
) -> bool {
    expectation.accepts(text) && stable_ms >= timing.window_ms()
}

/// Index of the first sample at which the sampling loop would stop
/// successfully, or `None` if it never would.
pub fn settle_index<S: AsRef<str>>(
    samples: &[S],
    expectation: &Expectation,
    timing: StabilityTiming,
) -> Option<usize> {
    let mut tracker = StabilityTracker::new(timing);
    samples.iter().position(|sample| {
        let sample = sample.as_ref();
        let stable_ms = tracker.record(sample);
        is_settled(expectation, sample, stable_ms, timing)
    })
}
