//! Deadline-paced poll loop for the encoder count.
//!
//! The poller implements the monitor cycle:
//! 1. Read the count register
//! 2. Compare against the last observed value
//! 3. Flag a change for reporting
//! 4. Wait for the next poll deadline
//!
//! Reading and waiting are separate steps so a change is reported before
//! the interval sleep, and so tests can drive cycles without sleeping.
//! Pacing uses absolute deadlines, keeping the poll cadence independent
//! of how long each read takes.

use crate::CountSource;
use encmon_common::config::MonitorConfig;
use encmon_common::error::MonitorResult;
use encmon_common::metrics::PollMetrics;
use std::time::{Duration, Instant};
use tracing::trace;

/// Result of a single poll cycle.
#[derive(Debug, Clone)]
pub struct PollCycle {
    /// Count observed this cycle.
    pub count: u32,
    /// Whether the count differs from the previous observation.
    pub changed: bool,
    /// Whether the read took longer than the poll interval.
    pub overrun: bool,
    /// Ordinal of this poll (1-based).
    pub poll_index: u64,
    /// How long the register read took.
    pub read_time: Duration,
}

/// Deadline-paced register poller.
///
/// Generic over the [`CountSource`] so the same loop drives the real
/// memory-mapped register and the simulated encoder.
pub struct Poller<S: CountSource> {
    /// Count source under observation.
    pub source: S,
    /// Last observed count. Starts at zero, so leading zero readings are
    /// not reported as changes.
    last_count: u32,
    /// Interval between polls.
    poll_interval: Duration,
    /// Next poll deadline (absolute time).
    next_deadline: Option<Instant>,
    /// Start of the previous poll, for period metrics.
    last_poll_start: Option<Instant>,
    /// Total polls executed.
    poll_count: u64,
    /// Metrics collection.
    metrics: PollMetrics,
}

impl<S: CountSource> Poller<S> {
    /// Create a new poller over the given source and configuration.
    pub fn new(source: S, config: &MonitorConfig) -> Self {
        Self {
            source,
            last_count: 0,
            poll_interval: config.poll_interval,
            next_deadline: None,
            last_poll_start: None,
            poll_count: 0,
            metrics: PollMetrics::new(config.poll_interval),
        }
    }

    /// Create a poller with default configuration.
    pub fn with_defaults(source: S) -> Self {
        Self::new(source, &MonitorConfig::default())
    }

    /// Get the last observed count.
    pub fn last_count(&self) -> u32 {
        self.last_count
    }

    /// Get the configured poll interval.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Get total poll count.
    pub fn poll_count(&self) -> u64 {
        self.poll_count
    }

    /// Get poll metrics.
    pub fn metrics(&self) -> &PollMetrics {
        &self.metrics
    }

    /// Execute one poll cycle: read, compare, record.
    ///
    /// Does not sleep; call [`wait_interval`](Self::wait_interval) to pace
    /// the loop.
    ///
    /// # Errors
    ///
    /// Propagates the source's read error.
    pub fn poll_cycle(&mut self) -> MonitorResult<PollCycle> {
        let poll_start = Instant::now();

        let count = self.source.read_count()?;
        let read_time = poll_start.elapsed();

        let changed = count != self.last_count;
        if changed {
            self.last_count = count;
        }

        self.poll_count += 1;
        self.metrics.record_read(read_time, changed);
        if let Some(previous) = self.last_poll_start {
            self.metrics.record_period(poll_start - previous);
        }
        self.last_poll_start = Some(poll_start);

        let overrun = read_time > self.poll_interval;

        trace!(poll = self.poll_count, count, changed, "Poll complete");

        Ok(PollCycle {
            count,
            changed,
            overrun,
            poll_index: self.poll_count,
            read_time,
        })
    }

    /// Sleep until the next poll deadline.
    ///
    /// Deadlines advance by the configured interval from the first call,
    /// so a slow read shortens the following sleep instead of shifting
    /// every later poll.
    pub fn wait_interval(&mut self) {
        let deadline = self
            .next_deadline
            .unwrap_or_else(|| Instant::now() + self.poll_interval);
        self.wait_until(deadline);
        self.next_deadline = Some(deadline + self.poll_interval);
    }

    /// Wait until the specified deadline using high-precision sleep.
    #[cfg(target_os = "linux")]
    fn wait_until(&self, deadline: Instant) {
        let now = Instant::now();
        if deadline <= now {
            return; // Already past deadline
        }

        let duration = deadline - now;

        // Relative sleep against CLOCK_MONOTONIC; Instant does not expose
        // the raw timespec needed for TIMER_ABSTIME.
        let ts = libc::timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        // SAFETY: clock_nanosleep is safe with valid parameters
        unsafe {
            libc::clock_nanosleep(libc::CLOCK_MONOTONIC, 0, &ts, std::ptr::null_mut());
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn wait_until(&self, deadline: Instant) {
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
    }
}
