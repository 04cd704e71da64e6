//! Integration tests for the port watcher
//!
//! These tests drive the watcher end to end through the mock backend, with the
//! Tokio clock paused so idle timeouts and poll intervals elapse instantly.

use scanguard_core::{LogicalContext, ScanEvent};
use scanguard_hardware::mock::{MockPortBackend, MockPortsHandle};
use scanguard_hardware::traits::PortBackend;
use scanguard_hardware::{
    HardwareError, LineSettings, PortWatcher, WatcherConfig, WatcherEvent, WatcherHandle,
};
use std::time::Duration;
use tokio::time::{Instant, sleep};

fn start(ports: &[&str]) -> (WatcherHandle, MockPortsHandle, MockPortBackend) {
    let (backend, handle) = MockPortBackend::new();
    for port in ports {
        handle.add_port(*port);
    }
    let watcher = PortWatcher::new(WatcherConfig::default(), backend.clone()).unwrap();
    (watcher.start(), handle, backend)
}

fn connected(port: &str) -> WatcherEvent {
    WatcherEvent::Connected {
        port: port.to_string(),
    }
}

fn disconnected(port: &str) -> WatcherEvent {
    WatcherEvent::Disconnected {
        port: port.to_string(),
    }
}

async fn next_scan(handle: &mut WatcherHandle) -> ScanEvent {
    match handle.recv().await {
        Some(WatcherEvent::Scan(scan)) => scan,
        other => panic!("expected scan, got {:?}", other),
    }
}

/// Let the coordinator and sessions run without advancing past any deadline.
async fn settle() {
    sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_split_chunks_form_one_scan() {
    let (mut handle, ports, _) = start(&["COM3"]);
    handle.set_context(LogicalContext::PointOfSale);
    assert_eq!(handle.recv().await, Some(connected("COM3")));

    ports.send_bytes("COM3", b"04913").unwrap();
    sleep(Duration::from_millis(50)).await;
    ports.send_bytes("COM3", b"55").unwrap();

    let started = Instant::now();
    let scan = next_scan(&mut handle).await;
    assert_eq!(scan.code(), "0491355");
    assert_eq!(scan.context(), LogicalContext::PointOfSale);
    assert_eq!(scan.port(), "COM3");
    assert!(started.elapsed() >= Duration::from_millis(150));

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_terminated_codes_arrive_in_order() {
    let (mut handle, ports, _) = start(&["COM3"]);
    assert_eq!(handle.recv().await, Some(connected("COM3")));

    ports
        .send_bytes("COM3", b"7891234567895\r\n11112222\r")
        .unwrap();

    assert_eq!(next_scan(&mut handle).await.code(), "7891234567895");
    assert_eq!(next_scan(&mut handle).await.code(), "11112222");

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_idle_gap_separates_consecutive_scans() {
    let (mut handle, ports, _) = start(&["COM3"]);
    assert_eq!(handle.recv().await, Some(connected("COM3")));

    ports.send_bytes("COM3", b"11112222").unwrap();
    sleep(Duration::from_millis(300)).await;
    ports.send_bytes("COM3", b"33334444").unwrap();
    sleep(Duration::from_millis(300)).await;

    assert_eq!(next_scan(&mut handle).await.code(), "11112222");
    assert_eq!(next_scan(&mut handle).await.code(), "33334444");
    assert_eq!(handle.try_recv(), None);

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_short_fragments_are_dropped() {
    let (mut handle, ports, _) = start(&["COM3"]);
    assert_eq!(handle.recv().await, Some(connected("COM3")));

    ports.send_bytes("COM3", b"12\r").unwrap();
    ports.send_bytes("COM3", b"  \r\n").unwrap();
    ports.send_bytes("COM3", b"55556666\r").unwrap();

    assert_eq!(next_scan(&mut handle).await.code(), "55556666");

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_context_is_sampled_at_emission() {
    let (mut handle, ports, _) = start(&["COM3"]);
    assert_eq!(handle.recv().await, Some(connected("COM3")));

    handle.set_context(LogicalContext::RawMaterial);
    ports.send_bytes("COM3", b"20000001\r").unwrap();
    assert_eq!(
        next_scan(&mut handle).await.context(),
        LogicalContext::RawMaterial
    );

    handle.set_context(LogicalContext::None);
    ports.send_bytes("COM3", b"20000002\r").unwrap();
    assert_eq!(next_scan(&mut handle).await.context(), LogicalContext::None);

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_periodic_poll_discovers_new_port() {
    let (mut handle, ports, _) = start(&[]);
    settle().await;

    ports.add_port("COM7");
    let started = Instant::now();
    assert_eq!(handle.recv().await, Some(connected("COM7")));
    assert!(started.elapsed() >= Duration::from_secs(4));

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_removed_port_is_disconnected() {
    let (mut handle, ports, _) = start(&["COM3", "COM4"]);
    assert_eq!(handle.recv().await, Some(connected("COM3")));
    assert_eq!(handle.recv().await, Some(connected("COM4")));

    ports.remove_port("COM3");
    handle.control().poll_now();

    assert_eq!(handle.recv().await, Some(disconnected("COM3")));
    assert!(!ports.is_open("COM3"));
    assert!(ports.is_open("COM4"));
    assert_eq!(handle.control().connected_ports(), vec!["COM4"]);

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_read_failure_reports_and_reconnects() {
    let (mut handle, ports, _) = start(&["COM3"]);
    assert_eq!(handle.recv().await, Some(connected("COM3")));

    ports.fail_read("COM3", "device reset").unwrap();

    assert_eq!(
        handle.recv().await,
        Some(WatcherEvent::Error {
            port: Some("COM3".to_string()),
            message: "device reset".to_string(),
        })
    );
    assert_eq!(handle.recv().await, Some(disconnected("COM3")));

    handle.control().poll_now();
    assert_eq!(handle.recv().await, Some(connected("COM3")));
    assert_eq!(ports.open_count("COM3"), 2);

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_end_of_stream_disconnects_without_error() {
    let (mut handle, ports, _) = start(&["COM3"]);
    assert_eq!(handle.recv().await, Some(connected("COM3")));

    ports.close_port("COM3").unwrap();
    assert_eq!(handle.recv().await, Some(disconnected("COM3")));

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_silently_closed_link_is_swept() {
    let (mut handle, ports, _) = start(&["COM3"]);
    assert_eq!(handle.recv().await, Some(connected("COM3")));

    ports.sever_link("COM3");
    handle.control().poll_now();

    // Torn down and reopened within the same sweep
    assert_eq!(handle.recv().await, Some(disconnected("COM3")));
    assert_eq!(handle.recv().await, Some(connected("COM3")));
    assert_eq!(ports.open_count("COM3"), 2);
    assert!(ports.is_open("COM3"));

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_open_failure_is_reported_once_and_retried() {
    let (backend, ports) = MockPortBackend::new();
    ports.add_port("COM3");
    ports.fail_open("COM3", "Access is denied");
    let mut handle = PortWatcher::new(WatcherConfig::default(), backend)
        .unwrap()
        .start();

    match handle.recv().await {
        Some(WatcherEvent::Error { port, message }) => {
            assert_eq!(port.as_deref(), Some("COM3"));
            assert!(message.contains("Access is denied"));
        }
        other => panic!("expected error, got {:?}", other),
    }

    handle.control().poll_now();
    settle().await;
    assert_eq!(handle.try_recv(), None);

    ports.clear_open_failure("COM3");
    handle.control().poll_now();
    assert_eq!(handle.recv().await, Some(connected("COM3")));

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_enumeration_failure_is_not_fatal() {
    let (backend, ports) = MockPortBackend::new();
    ports.set_enumeration_failure(Some("permission denied".to_string()));
    ports.add_port("COM3");
    let mut handle = PortWatcher::new(WatcherConfig::default(), backend)
        .unwrap()
        .start();

    match handle.recv().await {
        Some(WatcherEvent::Error { port: None, message }) => {
            assert!(message.contains("permission denied"));
        }
        other => panic!("expected error, got {:?}", other),
    }

    ports.set_enumeration_failure(None);
    handle.control().poll_now();
    assert_eq!(handle.recv().await, Some(connected("COM3")));

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_port_is_owned_exclusively() {
    let (mut handle, _ports, backend) = start(&["COM3"]);
    assert_eq!(handle.recv().await, Some(connected("COM3")));

    let result = backend.open("COM3", &LineSettings::default());
    assert!(matches!(result, Err(HardwareError::PortBusy { .. })));

    handle.control().poll_now();
    settle().await;
    assert_eq!(handle.try_recv(), None);

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_disabled_watcher_drops_frames() {
    let (mut handle, ports, _) = start(&["COM3"]);
    assert_eq!(handle.recv().await, Some(connected("COM3")));

    handle.disable();
    assert!(!handle.control().is_enabled());
    ports.send_bytes("COM3", b"99998888\r").unwrap();
    ports.send_bytes("COM3", b"7777").unwrap();
    sleep(Duration::from_secs(1)).await;
    assert_eq!(handle.try_recv(), None);
    assert!(ports.is_open("COM3"));

    handle.enable();
    ports.send_bytes("COM3", b"12341234\r").unwrap();
    assert_eq!(next_scan(&mut handle).await.code(), "12341234");

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_every_port() {
    let (mut handle, ports, _) = start(&["COM3", "COM4"]);
    assert_eq!(handle.recv().await, Some(connected("COM3")));
    assert_eq!(handle.recv().await, Some(connected("COM4")));

    let control = handle.control();
    handle.shutdown().await.unwrap();

    assert!(!ports.is_open("COM3"));
    assert!(!ports.is_open("COM4"));
    assert!(ports.send_bytes("COM3", b"12345678\r").is_err());
    assert!(control.is_stopped());
    assert!(control.connected_ports().is_empty());

    // Ports are left alone after shutdown
    ports.add_port("COM5");
    control.poll_now();
    sleep(Duration::from_secs(10)).await;
    assert_eq!(ports.open_count("COM5"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_releases_ports() {
    let (mut handle, ports, _) = start(&["COM3"]);
    assert_eq!(handle.recv().await, Some(connected("COM3")));

    let control = handle.control();
    drop(handle);
    settle().await;

    assert!(!ports.is_open("COM3"));
    assert!(control.is_stopped());
    assert!(control.connected_ports().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_status_reflects_sessions() {
    let (mut handle, _ports, _) = start(&["COM3"]);
    assert_eq!(handle.recv().await, Some(connected("COM3")));

    handle.set_context(LogicalContext::RawMaterial);
    assert_eq!(
        handle.status(),
        "1 scanner(s) connected [COM3] | context: RawMaterial | enabled"
    );

    handle.shutdown().await.unwrap();
}
