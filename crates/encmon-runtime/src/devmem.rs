//! Physical memory access via `/dev/mem`.
//!
//! Provides the two resources the monitor owns for its whole run:
//!
//! - [`DevMem`]: the opened physical-memory device
//! - [`MappedWindow`]: one shared mapping of the hardware register window
//!
//! The window is mapped read/write with synchronous I/O so register reads
//! are never satisfied from a stale cache line. Reads go through a
//! bounds- and alignment-checked volatile accessor; the raw pointer never
//! leaves this module.

use encmon_common::{MonitorError, MonitorResult};

#[cfg(target_os = "linux")]
use std::fs::{File, OpenOptions};
#[cfg(target_os = "linux")]
use std::num::NonZeroUsize;
#[cfg(target_os = "linux")]
use std::os::unix::fs::OpenOptionsExt;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;
#[cfg(target_os = "linux")]
use std::path::Path;
#[cfg(target_os = "linux")]
use std::ptr::NonNull;
#[cfg(target_os = "linux")]
use tracing::{debug, warn};

/// Handle to the physical-memory pseudo-device.
#[cfg(target_os = "linux")]
#[derive(Debug)]
pub struct DevMem {
    file: File,
    path: String,
}

#[cfg(target_os = "linux")]
impl DevMem {
    /// Open a physical-memory device read/write with synchronous I/O.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::DeviceOpen`] if the device cannot be
    /// opened (missing node, insufficient privileges).
    pub fn open(path: &Path) -> MonitorResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(path)
            .map_err(|e| MonitorError::DeviceOpen {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        debug!(path = %path.display(), fd = file.as_raw_fd(), "Physical memory device opened");

        Ok(Self {
            file,
            path: path.display().to_string(),
        })
    }

    /// Map a window of physical memory starting at `base`.
    ///
    /// Consumes the handle; the returned [`MappedWindow`] keeps the
    /// device open for the lifetime of the mapping. On failure the
    /// handle is closed before returning.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Map`] if the mapping fails (for `/dev/mem`
    /// typically a rejected range or a non-page-aligned base).
    pub fn map(self, base: u64, span: usize) -> MonitorResult<MappedWindow> {
        use nix::sys::mman::{mmap, MapFlags, ProtFlags};

        let length = NonZeroUsize::new(span)
            .ok_or_else(|| MonitorError::Map("zero-length window".into()))?;

        // SAFETY: mapping a shared window of the opened device; the kernel
        // validates the requested range and alignment.
        let ptr = unsafe {
            mmap(
                None,
                length,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                &self.file,
                base as libc::off_t,
            )
        }
        .map_err(|e| MonitorError::Map(e.to_string()))?;

        debug!(
            path = %self.path,
            base,
            span,
            "Register window mapped"
        );

        Ok(MappedWindow {
            ptr,
            span,
            device: self.file,
            unmapped: false,
        })
    }
}

/// One shared mapping of the hardware register window.
///
/// Owns both the mapping and the device handle behind it. The mapping is
/// released by [`unmap`](MappedWindow::unmap) on the graceful path, which
/// reports failures; dropping the window releases it best-effort. Either
/// way the mapping goes before the device handle closes.
#[cfg(target_os = "linux")]
#[derive(Debug)]
pub struct MappedWindow {
    ptr: NonNull<std::ffi::c_void>,
    span: usize,
    device: File,
    unmapped: bool,
}

// SAFETY: the mapping is exclusively owned, released exactly once, and all
// pointer access goes through the bounds-checked volatile accessor.
#[cfg(target_os = "linux")]
unsafe impl Send for MappedWindow {}

#[cfg(target_os = "linux")]
impl MappedWindow {
    /// Size of the mapped window in bytes.
    #[must_use]
    pub fn span(&self) -> usize {
        self.span
    }

    /// Validate that `width` bytes at `offset` lie inside the window.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::OutOfBounds`] when the access overruns
    /// the span.
    pub fn check_bounds(&self, offset: usize, width: usize) -> MonitorResult<()> {
        let in_bounds = offset
            .checked_add(width)
            .map_or(false, |end| end <= self.span);
        if in_bounds {
            Ok(())
        } else {
            Err(MonitorError::OutOfBounds {
                offset,
                width,
                span: self.span,
            })
        }
    }

    /// Read a 32-bit register at the given window offset.
    ///
    /// The read is volatile: hardware may change the register between
    /// polls, so each call reaches the mapped page.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::OutOfBounds`] or [`MonitorError::Unaligned`]
    /// when the offset fails validation.
    pub fn read_u32(&self, offset: usize) -> MonitorResult<u32> {
        self.check_bounds(offset, 4)?;
        if offset % std::mem::align_of::<u32>() != 0 {
            return Err(MonitorError::Unaligned { offset });
        }

        // SAFETY: offset is validated against the span and alignment, and
        // the mapping is live until unmap or drop.
        let value = unsafe {
            self.ptr
                .as_ptr()
                .cast::<u8>()
                .add(offset)
                .cast::<u32>()
                .read_volatile()
        };
        Ok(value)
    }

    /// Release the mapping, then close the device handle.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Unmap`] if the munmap call fails; the
    /// device handle is closed regardless.
    pub fn unmap(mut self) -> MonitorResult<()> {
        use nix::sys::mman::munmap;

        self.unmapped = true;
        debug!(fd = self.device.as_raw_fd(), "Unmapping register window");

        // SAFETY: ptr and span come from a successful mmap, released once.
        // The device File drops (and closes) after this returns.
        unsafe { munmap(self.ptr, self.span) }.map_err(|e| MonitorError::Unmap(e.to_string()))
    }
}

#[cfg(target_os = "linux")]
impl Drop for MappedWindow {
    fn drop(&mut self) {
        if self.unmapped {
            return;
        }
        self.unmapped = true;

        use nix::sys::mman::munmap;

        // SAFETY: same mapping as above; this is the abnormal-exit path,
        // so the failure is only logged.
        if let Err(e) = unsafe { munmap(self.ptr, self.span) } {
            warn!(fd = self.device.as_raw_fd(), error = %e, "munmap failed during drop");
        }
    }
}

/// Placeholder for non-Linux systems.
#[cfg(not(target_os = "linux"))]
#[derive(Debug)]
pub struct DevMem {
    _private: (),
}

#[cfg(not(target_os = "linux"))]
impl DevMem {
    /// Physical memory mapping is not available on this platform.
    pub fn open(_path: &std::path::Path) -> MonitorResult<Self> {
        Err(MonitorError::Config(
            "physical memory mapping is only supported on Linux".into(),
        ))
    }
}
