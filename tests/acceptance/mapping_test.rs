//! Register mapping acceptance tests.
//!
//! Run the full hardware access path (open, map, volatile read, unmap)
//! against file-backed register windows, plus an ignored smoke test for
//! the real /dev/mem on a Cyclone V target.

use std::path::Path;
use std::time::Duration;

use encmon_common::{MonitorConfig, MonitorError};
use encmon_runtime::poller::Poller;
use encmon_runtime::{CountSource, DevMem, EncoderRegister};

use super::common;

/// Window offset standing in for the count register in backing files.
const REGISTER_OFFSET: usize = 0x100;

fn fast_config() -> MonitorConfig {
    MonitorConfig {
        poll_interval: Duration::from_millis(1),
        ..MonitorConfig::default()
    }
}

#[test]
fn test_monitor_reports_external_count_changes() {
    println!("Testing change reporting through a mapped window...");

    let file = common::backing_device(REGISTER_OFFSET, 0);
    let source = EncoderRegister::open_at(file.path(), 0, common::TEST_SPAN, REGISTER_OFFSET)
        .expect("open file-backed register");

    let mut poller = Poller::new(source, &fast_config());

    // The count starts at zero, matching the monitor's starting state
    let cycle = poller.poll_cycle().expect("first poll");
    assert!(!cycle.changed, "zero start must not be reported");

    let mut reported = Vec::new();
    for value in [10_u32, 10, 250, 250, 0] {
        common::store_count(file.path(), REGISTER_OFFSET, value);
        let cycle = poller.poll_cycle().expect("poll");
        if cycle.changed {
            reported.push(cycle.count);
        }
    }
    assert_eq!(reported, vec![10, 250, 0]);

    poller.source.shutdown().expect("release window");
    println!("  PASSED: external count changes reported");
}

#[test]
fn test_open_missing_device_fails() {
    println!("Testing open failure diagnostics...");

    let missing = Path::new("/nonexistent/encmon-missing-device");
    let err = EncoderRegister::open_at(missing, 0, common::TEST_SPAN, REGISTER_OFFSET)
        .expect_err("open must fail");

    assert!(matches!(err, MonitorError::DeviceOpen { .. }));
    let message = err.to_string();
    assert!(
        message.contains("could not open"),
        "unexpected diagnostic: {}",
        message
    );

    println!("  Diagnostic: {}", message);
    println!("  PASSED: open failure diagnostics");
}

#[test]
fn test_misaligned_window_base_fails() {
    println!("Testing misaligned window base...");

    let file = common::backing_device(REGISTER_OFFSET, 7);
    let err = DevMem::open(file.path())
        .expect("open backing file")
        .map(1, common::TEST_SPAN)
        .expect_err("misaligned base must fail");

    assert!(matches!(err, MonitorError::Map(_)));
    println!("  PASSED: misaligned window base rejected");
}

#[test]
fn test_released_window_rejects_reads() {
    println!("Testing released window...");

    let file = common::backing_device(REGISTER_OFFSET, 42);
    let mut source = EncoderRegister::open_at(file.path(), 0, common::TEST_SPAN, REGISTER_OFFSET)
        .expect("open file-backed register");

    assert_eq!(source.read_count().expect("read"), 42);

    source.shutdown().expect("release");
    assert!(source.read_count().is_err());
    // Release is idempotent
    source.shutdown().expect("second release");

    println!("  PASSED: released window rejects reads");
}

/// Smoke test against the real physical memory device.
///
/// Maps the HPS register span and reads the encoder count once. Only
/// meaningful on a Cyclone V target with the FPGA bridge configured.
#[test]
#[ignore = "Requires root privileges and a Cyclone V target"]
fn test_dev_mem_smoke() {
    println!("Testing /dev/mem mapping...");

    if !common::is_root() || !common::has_dev_mem() {
        println!("  SKIPPED: needs root and /dev/mem");
        return;
    }

    let mut source =
        EncoderRegister::open(Path::new("/dev/mem")).expect("open /dev/mem register window");

    let count = source.read_count().expect("read encoder count");
    println!("  Encoder count: {}", count);

    source.shutdown().expect("release /dev/mem window");
    println!("  PASSED: /dev/mem mapping");
}
