//! Poll metrics collection for the monitor loop.
//!
//! Tracks register read durations and inter-poll periods without heap
//! allocations, so recording stays cheap inside the poll loop.

use std::time::Duration;

/// Running statistics over one duration series (nanosecond resolution).
#[derive(Debug, Clone, Copy)]
struct SeriesStats {
    count: u64,
    min_ns: u64,
    max_ns: u64,
    sum_ns: u64,
}

impl SeriesStats {
    fn new() -> Self {
        Self {
            count: 0,
            min_ns: u64::MAX,
            max_ns: 0,
            sum_ns: 0,
        }
    }

    fn record_ns(&mut self, ns: u64) {
        self.count += 1;
        self.min_ns = self.min_ns.min(ns);
        self.max_ns = self.max_ns.max(ns);
        self.sum_ns = self.sum_ns.wrapping_add(ns);
    }

    fn min(&self) -> Option<u64> {
        (self.count > 0).then_some(self.min_ns)
    }

    fn max(&self) -> Option<u64> {
        (self.count > 0).then_some(self.max_ns)
    }

    fn mean(&self) -> Option<u64> {
        (self.count > 0).then(|| self.sum_ns / self.count)
    }
}

/// Poll execution metrics.
///
/// Records how long each register read took, how far apart consecutive
/// polls started, how many reads observed a changed count, and how often
/// a read outlasted the configured poll interval.
#[derive(Debug)]
pub struct PollMetrics {
    /// Total polls recorded.
    total_polls: u64,
    /// Polls that observed a changed count.
    change_count: u64,
    /// Register read durations.
    read: SeriesStats,
    /// Inter-poll start periods.
    period: SeriesStats,
    /// Reads that took longer than the poll interval.
    overrun_count: u64,
    /// Configured poll interval in nanoseconds.
    interval_ns: u64,
}

impl PollMetrics {
    /// Create a new metrics collector for the given poll interval.
    ///
    /// Reads exceeding `poll_interval` are counted as overruns.
    #[must_use]
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            total_polls: 0,
            change_count: 0,
            read: SeriesStats::new(),
            period: SeriesStats::new(),
            overrun_count: 0,
            interval_ns: poll_interval.as_nanos() as u64,
        }
    }

    /// Record one register read.
    pub fn record_read(&mut self, duration: Duration, changed: bool) {
        let ns = duration.as_nanos() as u64;

        self.total_polls += 1;
        if changed {
            self.change_count += 1;
        }
        self.read.record_ns(ns);

        if ns > self.interval_ns {
            self.overrun_count += 1;
        }
    }

    /// Record the period between two consecutive poll starts.
    pub fn record_period(&mut self, period: Duration) {
        self.period.record_ns(period.as_nanos() as u64);
    }

    /// Get total number of polls recorded.
    #[must_use]
    pub fn total_polls(&self) -> u64 {
        self.total_polls
    }

    /// Get the number of polls that observed a changed count.
    #[must_use]
    pub fn change_count(&self) -> u64 {
        self.change_count
    }

    /// Get minimum observed read duration.
    #[must_use]
    pub fn read_min(&self) -> Option<Duration> {
        self.read.min().map(Duration::from_nanos)
    }

    /// Get maximum observed read duration.
    #[must_use]
    pub fn read_max(&self) -> Option<Duration> {
        self.read.max().map(Duration::from_nanos)
    }

    /// Get mean read duration.
    #[must_use]
    pub fn read_mean(&self) -> Option<Duration> {
        self.read.mean().map(Duration::from_nanos)
    }

    /// Get mean inter-poll period.
    #[must_use]
    pub fn period_mean(&self) -> Option<Duration> {
        self.period.mean().map(Duration::from_nanos)
    }

    /// Get the number of reads that outlasted the poll interval.
    #[must_use]
    pub fn overrun_count(&self) -> u64 {
        self.overrun_count
    }

    /// Get a snapshot of current metrics.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_polls: self.total_polls,
            change_count: self.change_count,
            read_min_ns: self.read.min(),
            read_max_ns: self.read.max(),
            read_mean_ns: self.read.mean(),
            period_mean_ns: self.period.mean(),
            overrun_count: self.overrun_count,
        }
    }

    /// Reset all metrics to initial state.
    pub fn reset(&mut self) {
        self.total_polls = 0;
        self.change_count = 0;
        self.read = SeriesStats::new();
        self.period = SeriesStats::new();
        self.overrun_count = 0;
    }
}

/// Immutable snapshot of metrics for reporting.
#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    /// Total polls recorded.
    pub total_polls: u64,
    /// Polls that observed a changed count.
    pub change_count: u64,
    /// Minimum read duration in nanoseconds.
    pub read_min_ns: Option<u64>,
    /// Maximum read duration in nanoseconds.
    pub read_max_ns: Option<u64>,
    /// Mean read duration in nanoseconds.
    pub read_mean_ns: Option<u64>,
    /// Mean inter-poll period in nanoseconds.
    pub period_mean_ns: Option<u64>,
    /// Reads that outlasted the poll interval.
    pub overrun_count: u64,
}

impl MetricsSnapshot {
    /// Get read jitter (max - min) in nanoseconds.
    #[must_use]
    pub fn read_jitter_ns(&self) -> Option<u64> {
        match (self.read_min_ns, self.read_max_ns) {
            (Some(min), Some(max)) => Some(max - min),
            _ => None,
        }
    }
}
