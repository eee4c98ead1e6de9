#![doc = "Hardware access and poll loop for the encoder monitor."]

pub mod devmem;
pub mod mmio;
pub mod poller;
pub mod regmap;

pub use devmem::*;
pub use mmio::*;
pub use poller::*;

use encmon_common::{MonitorError, MonitorResult};

/// Encoder count source abstraction.
///
/// This trait defines the interface between the poll loop and the
/// memory that backs the count register, allowing the monitor to run
/// against real hardware or a simulated source through a common
/// interface.
pub trait CountSource: Send {
    /// Read the current 32-bit encoder count.
    fn read_count(&mut self) -> MonitorResult<u32>;

    /// Release whatever backs the source.
    ///
    /// After shutdown the source must reject further reads.
    fn shutdown(&mut self) -> MonitorResult<()>;

    /// Check if the source is ready to serve reads.
    fn is_operational(&self) -> bool {
        true
    }
}

/// Count sequence produced by a [`SimulatedEncoder`].
#[derive(Debug, Clone)]
enum Feed {
    /// Fixed sequence of counts; the last value repeats once exhausted.
    Script(Vec<u32>),
    /// Count advances by `step` after every `hold` reads.
    FreeRunning {
        /// Increment applied to the count (wrapping).
        step: u32,
        /// Number of reads the count stays put before stepping.
        hold: u64,
    },
}

/// Simulated encoder for testing and hardware-free bring-up.
///
/// Serves counts from a scripted sequence or a free-running ramp,
/// and can inject a read failure after a set number of reads.
#[derive(Debug, Clone)]
pub struct SimulatedEncoder {
    feed: Feed,
    /// Reads served so far.
    reads: u64,
    /// Fail the read with this ordinal (1-based), if set.
    fail_after: Option<u64>,
    released: bool,
}

impl SimulatedEncoder {
    /// Create a simulated encoder that replays the given count sequence.
    ///
    /// Each read consumes one entry; once the script is exhausted the
    /// last value repeats. An empty script reads as zero.
    #[must_use]
    pub fn from_script(script: Vec<u32>) -> Self {
        Self {
            feed: Feed::Script(script),
            reads: 0,
            fail_after: None,
            released: false,
        }
    }

    /// Create a free-running simulated encoder.
    ///
    /// The count starts at zero and advances by `step` after every
    /// `hold` reads, so each value is observed `hold` times.
    #[must_use]
    pub fn free_running(step: u32, hold: u64) -> Self {
        Self {
            feed: Feed::FreeRunning {
                step,
                hold: hold.max(1),
            },
            reads: 0,
            fail_after: None,
            released: false,
        }
    }

    /// Make the `n`-th read (1-based) fail with a fault.
    #[must_use]
    pub fn fail_after(mut self, n: u64) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Check whether `shutdown` has been called.
    #[must_use]
    pub fn released(&self) -> bool {
        self.released
    }
}

impl CountSource for SimulatedEncoder {
    fn read_count(&mut self) -> MonitorResult<u32> {
        if self.released {
            return Err(MonitorError::Fault("source already released".into()));
        }

        self.reads += 1;
        if self.fail_after == Some(self.reads) {
            return Err(MonitorError::Fault("injected read failure".into()));
        }

        let count = match &self.feed {
            Feed::Script(script) => {
                let index = ((self.reads - 1) as usize).min(script.len().saturating_sub(1));
                script.get(index).copied().unwrap_or(0)
            }
            Feed::FreeRunning { step, hold } => {
                let ticks = (self.reads - 1) / hold;
                step.wrapping_mul(ticks as u32)
            }
        };

        Ok(count)
    }

    fn shutdown(&mut self) -> MonitorResult<()> {
        self.released = true;
        Ok(())
    }

    fn is_operational(&self) -> bool {
        !self.released
    }
}
