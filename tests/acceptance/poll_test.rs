//! Poll loop acceptance tests.
//!
//! Drive the poller against simulated encoders and verify the monitor's
//! observable behavior: which counts get reported, how the loop paces
//! itself, and what happens when the source fails.

use std::time::{Duration, Instant};

use encmon_common::{MonitorConfig, MonitorError};
use encmon_runtime::poller::Poller;
use encmon_runtime::{CountSource, SimulatedEncoder};

/// Poll configuration used by these tests: fast enough to keep the
/// suite quick, slow enough that pacing is observable.
fn test_config() -> MonitorConfig {
    MonitorConfig {
        poll_interval: Duration::from_millis(2),
        ..MonitorConfig::default()
    }
}

/// Run `polls` cycles back to back and collect the counts that were
/// reported as changes.
fn reported_counts<S: CountSource>(poller: &mut Poller<S>, polls: usize) -> Vec<u32> {
    let mut reported = Vec::new();
    for _ in 0..polls {
        let cycle = poller.poll_cycle().expect("poll cycle");
        if cycle.changed {
            reported.push(cycle.count);
        }
    }
    reported
}

#[test]
fn test_change_sequence_reporting() {
    println!("Testing change sequence reporting...");

    let source = SimulatedEncoder::from_script(vec![0, 0, 3, 3, 3, 7, 7, 0]);
    let mut poller = Poller::new(source, &test_config());

    let reported = reported_counts(&mut poller, 8);

    // Only transitions are reported: the leading zeros match the
    // monitor's starting state, and repeats are suppressed
    assert_eq!(reported, vec![3, 7, 0]);

    println!("  Reported: {:?}", reported);
    println!("  PASSED: change sequence reporting");
}

#[test]
fn test_wrapping_count_is_plain_change() {
    println!("Testing wrap-around counts...");

    // Alternates 0 and 0x8000_0000 through wrapping arithmetic
    let source = SimulatedEncoder::free_running(0x8000_0000, 1);
    let mut poller = Poller::new(source, &test_config());

    let reported = reported_counts(&mut poller, 4);
    assert_eq!(reported, vec![0x8000_0000, 0, 0x8000_0000]);

    println!("  PASSED: wrap-around counts reported as plain changes");
}

#[test]
fn test_poll_cadence() {
    println!("Testing poll cadence...");

    let config = test_config();
    let source = SimulatedEncoder::free_running(1, 2);
    let mut poller = Poller::new(source, &config);

    let polls = 20_u32;
    let start = Instant::now();
    for _ in 0..polls {
        poller.poll_cycle().expect("poll cycle");
        poller.wait_interval();
    }
    let elapsed = start.elapsed();

    // Twenty waits at the configured interval: the loop cannot finish
    // early
    let floor = config.poll_interval * polls;
    assert!(
        elapsed >= floor,
        "poll loop finished early: {:?} < {:?}",
        elapsed,
        floor
    );
    // Generous ceiling for loaded CI machines
    assert!(
        elapsed < Duration::from_secs(2),
        "poll loop too slow: {:?}",
        elapsed
    );

    let snapshot = poller.metrics().snapshot();
    assert_eq!(snapshot.total_polls, u64::from(polls));
    // Counts 0..=9 held two polls each: nine observed transitions
    assert_eq!(snapshot.change_count, 9);

    println!("  Elapsed for {} polls: {:?}", polls, elapsed);
    println!(
        "  Mean poll period: {}ns",
        snapshot.period_mean_ns.unwrap_or(0)
    );
    println!("  PASSED: poll cadence");
}

#[test]
fn test_source_failure_surfaces_and_release_still_works() {
    println!("Testing source failure handling...");

    let source = SimulatedEncoder::from_script(vec![1, 2, 3]).fail_after(2);
    let mut poller = Poller::new(source, &test_config());

    assert!(poller.poll_cycle().is_ok());
    let err = poller
        .poll_cycle()
        .expect_err("injected failure must surface");
    assert!(matches!(err, MonitorError::Fault(_)));
    println!("  Poll failed as injected: {}", err);

    // The source must still be releasable after a failed poll
    poller.source.shutdown().expect("release after failure");
    assert!(!poller.source.is_operational());

    println!("  PASSED: source failure handling");
}

#[test]
fn test_released_source_rejects_polling() {
    println!("Testing released source...");

    let source = SimulatedEncoder::from_script(vec![9]);
    let mut poller = Poller::new(source, &test_config());

    poller.source.shutdown().expect("release");
    assert!(poller.poll_cycle().is_err());
    // Release is idempotent
    poller.source.shutdown().expect("second release");

    println!("  PASSED: released source rejects polling");
}
