use thiserror::Error;

/// Monitor error types covering device access, mapping, and register faults.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MonitorError {
    /// The physical-memory device could not be opened.
    #[error("could not open {path}: {reason}")]
    DeviceOpen {
        /// Path of the device that failed to open.
        path: String,
        /// Underlying OS error text.
        reason: String,
    },

    /// Mapping the hardware register window failed.
    #[error("mmap failed: {0}")]
    Map(String),

    /// Releasing the hardware register window failed.
    #[error("munmap failed: {0}")]
    Unmap(String),

    /// A register access fell outside the mapped window.
    #[error("register access out of bounds: offset {offset:#x} + {width} exceeds span {span:#x}")]
    OutOfBounds {
        /// Requested byte offset into the window.
        offset: usize,
        /// Access width in bytes.
        width: usize,
        /// Size of the mapped window in bytes.
        span: usize,
    },

    /// A register access was not aligned to its width.
    #[error("unaligned register offset {offset:#x}")]
    Unaligned {
        /// Offending byte offset.
        offset: usize,
    },

    /// Configuration or initialization error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Generic runtime fault.
    #[error("monitor fault: {0}")]
    Fault(String),
}

/// Convenience type alias for monitor operations.
pub type MonitorResult<T> = Result<T, MonitorError>;
