//! Integration tests for encoder monitor acceptance testing.
//!
//! These tests exercise the monitor end to end:
//! - Poll loop change reporting against simulated encoders
//! - The real mapping path against file-backed register windows
//!
//! Tests that touch /dev/mem itself require root privileges and a
//! Cyclone V target, and are ignored by default.

mod common;
#[cfg(target_os = "linux")]
mod mapping_test;
mod poll_test;
