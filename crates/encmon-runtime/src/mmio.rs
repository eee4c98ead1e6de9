//! Memory-mapped encoder count source.
//!
//! [`EncoderRegister`] binds the mapped register window to the
//! [`CountSource`] interface: open the device, map the window, read the
//! count register at its fixed offset, and release everything on
//! shutdown.

use crate::CountSource;
use encmon_common::{MonitorError, MonitorResult};

#[cfg(target_os = "linux")]
use crate::devmem::{DevMem, MappedWindow};
#[cfg(target_os = "linux")]
use crate::regmap;
#[cfg(target_os = "linux")]
use std::path::Path;
#[cfg(target_os = "linux")]
use tracing::info;

/// Count source backed by the memory-mapped encoder register.
#[cfg(target_os = "linux")]
#[derive(Debug)]
pub struct EncoderRegister {
    /// Mapped window; taken by `shutdown`.
    window: Option<MappedWindow>,
    /// Window offset of the count register.
    offset: usize,
}

#[cfg(target_os = "linux")]
impl EncoderRegister {
    /// Open the encoder count register at its platform address.
    ///
    /// Maps the hardware register window from `device` (normally
    /// `/dev/mem`) and locates the register via [`regmap`].
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::DeviceOpen`] or [`MonitorError::Map`] when
    /// the device or the mapping is unavailable.
    pub fn open(device: &Path) -> MonitorResult<Self> {
        let window = DevMem::open(device)?.map(regmap::HW_REGS_BASE, regmap::HW_REGS_SPAN)?;

        info!(
            device = %device.display(),
            base = regmap::HW_REGS_BASE,
            span = regmap::HW_REGS_SPAN,
            offset = regmap::ENC0_COUNT_OFFSET,
            "Encoder register mapped"
        );

        Ok(Self {
            window: Some(window),
            offset: regmap::ENC0_COUNT_OFFSET,
        })
    }

    /// Open a count register at an arbitrary base, span, and offset.
    ///
    /// Used by tests to run the real mapping path against a file-backed
    /// window instead of the hardware address space.
    ///
    /// # Errors
    ///
    /// Fails like [`open`](Self::open), plus [`MonitorError::OutOfBounds`]
    /// when `offset` does not fit the window.
    pub fn open_at(device: &Path, base: u64, span: usize, offset: usize) -> MonitorResult<Self> {
        let window = DevMem::open(device)?.map(base, span)?;
        window.check_bounds(offset, 4)?;

        Ok(Self {
            window: Some(window),
            offset,
        })
    }

    /// Window offset of the count register.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

#[cfg(target_os = "linux")]
impl CountSource for EncoderRegister {
    fn read_count(&mut self) -> MonitorResult<u32> {
        match self.window.as_ref() {
            Some(window) => window.read_u32(self.offset),
            None => Err(MonitorError::Fault("register window already released".into())),
        }
    }

    fn shutdown(&mut self) -> MonitorResult<()> {
        match self.window.take() {
            Some(window) => window.unmap(),
            None => Ok(()),
        }
    }

    fn is_operational(&self) -> bool {
        self.window.is_some()
    }
}

/// Placeholder for non-Linux systems.
#[cfg(not(target_os = "linux"))]
#[derive(Debug)]
pub struct EncoderRegister {
    _private: (),
}

#[cfg(not(target_os = "linux"))]
impl EncoderRegister {
    /// Memory-mapped register access is not available on this platform.
    pub fn open(_device: &std::path::Path) -> MonitorResult<Self> {
        Err(MonitorError::Config(
            "memory-mapped register access is only supported on Linux".into(),
        ))
    }

    /// Memory-mapped register access is not available on this platform.
    pub fn open_at(
        _device: &std::path::Path,
        _base: u64,
        _span: usize,
        _offset: usize,
    ) -> MonitorResult<Self> {
        Err(MonitorError::Config(
            "memory-mapped register access is only supported on Linux".into(),
        ))
    }
}

#[cfg(not(target_os = "linux"))]
impl CountSource for EncoderRegister {
    fn read_count(&mut self) -> MonitorResult<u32> {
        Err(MonitorError::Config(
            "memory-mapped register access is only supported on Linux".into(),
        ))
    }

    fn shutdown(&mut self) -> MonitorResult<()> {
        Ok(())
    }

    fn is_operational(&self) -> bool {
        false
    }
}
