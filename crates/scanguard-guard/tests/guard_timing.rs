//! Timing tests for the action guard
//!
//! The Tokio clock is paused, so every sleep below advances virtual time
//! exactly and the timer task wakes as soon as its deadline is reached.

use scanguard_core::{LogicalContext, ScanEvent};
use scanguard_guard::{
    ActionGuard, ActivationVerdict, ControlSnapshot, GuardConfig, GuardEvent, GuardStats,
    Strictness,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};

const CRITICAL: [&str; 3] = ["btn_close_sale", "btn_pay", "btn_void"];

fn guard() -> (ActionGuard, mpsc::Receiver<GuardEvent>) {
    ActionGuard::new(GuardConfig::default().with_critical_controls(CRITICAL)).unwrap()
}

fn unlocked(control: &str) -> GuardEvent {
    GuardEvent::ControlUnlocked {
        control: control.to_string(),
    }
}

/// Skip the start and lock events of a scan.
async fn drain_scan_events(events: &mut mpsc::Receiver<GuardEvent>) {
    for _ in 0..=CRITICAL.len() {
        events.recv().await.unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn test_should_block_follows_both_windows() {
    let (guard, _events) = guard();
    guard.on_scan("0491355", "PointOfSale");

    sleep(Duration::from_millis(1_500)).await;
    assert!(guard.should_block("finalize sale"));

    // Active suppression is over, the recent-scan span is not.
    sleep(Duration::from_millis(2_500)).await;
    assert!(guard.should_block("finalize sale"));

    sleep(Duration::from_millis(2_000)).await;
    assert!(!guard.should_block("finalize sale"));

    assert_eq!(guard.stats().blocked_actions, 2);
}

#[tokio::test(start_paused = true)]
async fn test_suppression_clears_on_its_deadline() {
    let (guard, mut events) = guard();
    let started = Instant::now();
    guard.on_scan("0491355", "PointOfSale");
    drain_scan_events(&mut events).await;

    for control in CRITICAL {
        assert_eq!(events.recv().await, Some(unlocked(control)));
    }
    assert_eq!(events.recv().await, Some(GuardEvent::SuppressionCleared));

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(3));
    assert!(elapsed < Duration::from_millis(3_050));
}

#[tokio::test(start_paused = true)]
async fn test_critical_controls_unlock_after_cooldown() {
    let (guard, mut events) = guard();
    let started = Instant::now();
    guard.on_scan("7891234567895", "PointOfSale");
    drain_scan_events(&mut events).await;

    for control in CRITICAL {
        assert!(guard.is_control_locked(control));
    }
    assert!(!guard.is_control_locked("btn_help"));
    assert_eq!(guard.locked_controls(), CRITICAL.to_vec());

    sleep(Duration::from_millis(1_999)).await;
    assert!(guard.is_control_locked("btn_pay"));

    assert_eq!(events.recv().await, Some(unlocked("btn_close_sale")));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed < Duration::from_millis(2_050));

    assert!(!guard.is_control_locked("btn_pay"));
    assert!(guard.locked_controls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_repeated_scans_rearm_instead_of_stacking() {
    let (guard, mut events) = guard();
    guard.on_scan("11112222", "PointOfSale");
    drain_scan_events(&mut events).await;

    sleep(Duration::from_millis(1_500)).await;
    guard.on_scan("33334444", "PointOfSale");
    assert!(events.try_recv().is_err());

    // The first scan's deadlines would have fired by now.
    sleep(Duration::from_millis(1_800)).await;
    assert!(guard.is_control_locked("btn_pay"));
    assert!(events.try_recv().is_err());

    sleep(Duration::from_millis(300)).await;
    assert!(!guard.is_control_locked("btn_pay"));
    assert_eq!(events.recv().await, Some(unlocked("btn_close_sale")));
    assert_eq!(guard.stats().total_scans, 2);
}

#[tokio::test(start_paused = true)]
async fn test_reset_releases_locks_immediately() {
    let (guard, mut events) = guard();
    guard.on_scan("0491355", "RawMaterial");
    drain_scan_events(&mut events).await;

    guard.reset("supervisor override");

    assert!(guard.locked_controls().is_empty());
    for control in CRITICAL {
        assert_eq!(events.recv().await, Some(unlocked(control)));
    }
    assert_eq!(events.recv().await, Some(GuardEvent::SuppressionCleared));

    // The recent-scan span is derived from the last scan and still applies.
    assert!(guard.should_block("finalize sale"));
    sleep(Duration::from_secs(5)).await;
    assert!(!guard.should_block("finalize sale"));
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_observe_uses_scan_context() {
    let (guard, mut events) = guard();
    let scan = ScanEvent::new("7891234567895", LogicalContext::RawMaterial, "COM3");

    guard.observe(&scan);

    assert_eq!(
        events.recv().await,
        Some(GuardEvent::SuppressionStarted {
            label: "RawMaterial".to_string()
        })
    );
    assert!(guard.stats().last_scan_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_strict_and_lenient_activation() {
    let (guard, _events) = guard();
    let hovered = ControlSnapshot::new("btn_help").pointer_over(true);

    assert_eq!(
        guard.check_activation(&hovered, Strictness::Lenient),
        ActivationVerdict::Allowed
    );
    assert_eq!(
        guard.check_activation(&hovered, Strictness::Strict),
        ActivationVerdict::Automated
    );
    assert_eq!(
        guard.check_activation(&hovered.clone().focused(true), Strictness::Strict),
        ActivationVerdict::Allowed
    );
}

#[tokio::test(start_paused = true)]
async fn test_dispose_is_fail_safe_and_idempotent() {
    let (guard, mut events) = guard();
    guard.on_scan("0491355", "PointOfSale");
    drain_scan_events(&mut events).await;

    assert_eq!(guard.stats().total_scans, 1);

    let other = guard.clone();
    guard.dispose();
    other.dispose();

    assert!(guard.is_disposed());
    assert!(!guard.should_block("finalize sale"));
    assert!(!guard.is_control_locked("btn_pay"));
    assert!(!guard.looks_automated(&ControlSnapshot::new("btn_pay").enabled(false), Strictness::Strict));
    assert_eq!(
        guard.check_activation(&ControlSnapshot::new("btn_pay"), Strictness::Strict),
        ActivationVerdict::Allowed
    );

    guard.on_scan("11112222", "PointOfSale");
    guard.reset("ignored");
    assert_eq!(guard.stats(), GuardStats::default());

    // The timer task is gone: no unlock notifications arrive later.
    sleep(Duration::from_secs(10)).await;
    assert!(events.try_recv().is_err());
}
