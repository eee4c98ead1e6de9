//! Common utilities for integration tests.
//!
//! Provides helpers for:
//! - Checking hardware access prerequisites (/dev/mem, privileges)
//! - Building file-backed register windows for mapping tests

#![allow(dead_code)] // Not every helper is used by every test module

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Span of the file-backed register windows used by mapping tests.
pub const TEST_SPAN: usize = 16 * 1024;

/// Check if running as root (required to open /dev/mem).
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Check if the physical memory device exists.
pub fn has_dev_mem() -> bool {
    Path::new("/dev/mem").exists()
}

/// Create a zero-filled backing file that stands in for a register
/// window, with `value` stored at `offset`.
pub fn backing_device(offset: usize, value: u32) -> NamedTempFile {
    let file = NamedTempFile::new().expect("create backing file");
    file.as_file()
        .set_len(TEST_SPAN as u64)
        .expect("size backing file");
    store_count(file.path(), offset, value);
    file
}

/// Store a count value into a backing file at the given offset.
///
/// Reopens the file by path, the way an external writer would. Mapped
/// readers observe the store through the shared page cache.
pub fn store_count(path: &Path, offset: usize, value: u32) {
    let mut file = OpenOptions::new()
        .write(true)
        .open(path)
        .expect("open backing file for write");
    file.seek(SeekFrom::Start(offset as u64))
        .expect("seek to register offset");
    file.write_all(&value.to_ne_bytes())
        .expect("write count value");
    file.flush().expect("flush count value");
}
