//! Execution statistics shared by all instances of one backend

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Runs taking at least this long count as slow
pub const DEFAULT_SLOW_THRESHOLD: Duration = Duration::from_secs(2);

/// Point-in-time copy of a [`VmStat`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VmStatSnapshot {
    /// Completed runs
    pub execs: u64,
    /// Completed runs at or over the slow threshold
    pub slow_tests: u64,
    /// Sum of all run durations
    pub total_time: Duration,
    /// Longest single run
    pub longest: Duration,
}

impl VmStatSnapshot {
    /// Mean run duration, zero before the first run
    pub fn average(&self) -> Duration {
        match u32::try_from(self.execs) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.total_time / n,
            Err(_) => Duration::from_secs_f64(self.total_time.as_secs_f64() / self.execs as f64),
        }
    }

    /// Labeled values for reporting
    pub fn labeled(&self) -> Vec<(&'static str, String)> {
        vec![
            ("execSpeed", format!("{:?}", self.average())),
            ("longest", format!("{:?}", self.longest)),
            ("count", self.execs.to_string()),
            ("slowtests", self.slow_tests.to_string()),
            ("total", format!("{:?}", self.total_time)),
        ]
    }
}

/// Thread-safe run counters
///
/// Updated once per completed run, after the backend process has exited.
#[derive(Debug)]
pub struct VmStat {
    slow_threshold: Duration,
    inner: Mutex<VmStatSnapshot>,
}

impl VmStat {
    pub fn new(slow_threshold: Duration) -> Self {
        Self {
            slow_threshold,
            inner: Mutex::new(VmStatSnapshot::default()),
        }
    }

    pub fn slow_threshold(&self) -> Duration {
        self.slow_threshold
    }

    /// Record a run that started at `start` and has just finished.
    pub fn trace_done(&self, start: Instant) -> (Duration, bool) {
        self.record(start.elapsed())
    }

    /// Record a run of `duration`, returning it and whether it was slow.
    pub fn record(&self, duration: Duration) -> (Duration, bool) {
        let slow = duration >= self.slow_threshold;
        let mut stats = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        stats.execs += 1;
        stats.total_time += duration;
        stats.longest = stats.longest.max(duration);
        if slow {
            stats.slow_tests += 1;
        }
        (duration, slow)
    }

    pub fn snapshot(&self) -> VmStatSnapshot {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for VmStat {
    fn default() -> Self {
        Self::new(DEFAULT_SLOW_THRESHOLD)
    }
}
