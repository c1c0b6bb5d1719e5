//! Contract Test: Retry Semantics
//!
//! Constraints verified:
//! - The first success ends the sequence
//! - A target is dead only after exactly retry_limit non-successes
//! - Timeouts count as attempts like any other failure
//! - Every attempt gets its own deadline
//!
//! If this test fails, someone has:
//! - Added backoff or extra attempts
//! - Shared one deadline across all attempts
//! - Given partial credit to a failed attempt

mod common;

use adf_core::checker::{RetryingChecker, RoundVerdict};
use adf_core::executor::BoundedCheckExecutor;
use adf_core::timer::TimerPolicy;
use common::*;
use std::time::Duration;
use tokio::time::Instant;

fn timer(retry_limit: usize) -> TimerPolicy {
    TimerPolicy::new(
        Duration::from_secs(10),
        Duration::from_millis(100),
        retry_limit,
    )
}

fn checker() -> RetryingChecker {
    RetryingChecker::new(BoundedCheckExecutor::new(Duration::from_millis(100)))
}

#[tokio::test]
async fn healthy_target_needs_one_attempt() {
    let target = ip("192.0.2.20");
    let check = ScriptedCheck::new(Behavior::Pass);

    let verdict = checker()
        .verdict(target, &check.as_arc(), &timer(3))
        .await
        .unwrap();

    assert_eq!(verdict, RoundVerdict::Alive { attempts: 1 });
    assert_eq!(check.calls(target), 1);
}

#[tokio::test]
async fn unhealthy_target_uses_every_attempt() {
    let target = ip("192.0.2.21");
    let check = ScriptedCheck::new(Behavior::Fail);

    let verdict = checker()
        .verdict(target, &check.as_arc(), &timer(4))
        .await
        .unwrap();

    assert_eq!(verdict, RoundVerdict::Dead { attempts: 4 });
    assert_eq!(check.calls(target), 4);
}

#[tokio::test]
async fn success_on_second_attempt_is_flaky_but_alive() {
    let target = ip("192.0.2.22");
    let check = ScriptedCheck::new(Behavior::FailTimes(1));

    let verdict = checker()
        .verdict(target, &check.as_arc(), &timer(3))
        .await
        .unwrap();

    assert_eq!(verdict, RoundVerdict::Alive { attempts: 2 });
    assert!(verdict.is_flaky());
    assert_eq!(check.calls(target), 2);
}

#[tokio::test]
async fn success_on_last_attempt_counts() {
    let target = ip("192.0.2.23");
    let check = ScriptedCheck::new(Behavior::FailTimes(2));

    let verdict = checker()
        .verdict(target, &check.as_arc(), &timer(3))
        .await
        .unwrap();

    assert_eq!(verdict, RoundVerdict::Alive { attempts: 3 });
}

#[tokio::test(start_paused = true)]
async fn each_timed_out_attempt_gets_a_full_deadline() {
    let target = ip("192.0.2.24");
    let check = ScriptedCheck::new(Behavior::Hang);
    let checker = checker();

    let started = Instant::now();
    let verdict = checker
        .verdict(target, &check.as_arc(), &timer(3))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(verdict, RoundVerdict::Dead { attempts: 3 });
    assert_eq!(check.calls(target), 3);
    assert!(
        elapsed >= Duration::from_millis(300),
        "three attempts of 100ms each, took {:?}",
        elapsed
    );
    assert!(elapsed < Duration::from_millis(600));
    assert_eq!(checker.executor().outstanding(), 0);
}

#[tokio::test]
async fn zero_retry_limit_still_checks_once() {
    let target = ip("192.0.2.25");
    let check = ScriptedCheck::new(Behavior::Fail);

    let verdict = checker()
        .verdict(target, &check.as_arc(), &timer(0))
        .await
        .unwrap();

    assert_eq!(verdict, RoundVerdict::Dead { attempts: 1 });
}
