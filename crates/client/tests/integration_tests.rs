//! Client integration tests
//!
//! End-to-end scenarios against the scripted mock terminal on loopback
//! addresses (127.0.0.0/8 stands in for the original 192.168.1.0/24):
//! scan-then-fetch, the guaranteed re-enable contract under an injected
//! read failure, delete semantics, and credential handling.
//!
//! Run with: `cargo test -p client --test integration_tests`

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use client::device::{delete_user, fetch_attendance};
use client::network::Scanner;
use common::test_utils::{
    DeviceCall, MockDevice, MockDeviceConfig, sample_records, sample_users,
};
use common::{AddressRange, Error, ScanSettings, SessionSettings};

fn scan_settings(port: u16) -> ScanSettings {
    ScanSettings {
        port,
        probe_timeout: Duration::from_millis(250),
        max_in_flight: 50,
    }
}

fn session_settings(port: u16, password: u32) -> SessionSettings {
    SessionSettings {
        port,
        password,
        timeout: Duration::from_secs(2),
    }
}

// ============================================================================
// Scan + fetch
// ============================================================================

#[tokio::test]
async fn scan_finds_device_and_fetch_returns_canned_records() {
    let records = sample_records(&["1001", "1002", "1003"]);
    let device = MockDevice::bind(
        Ipv4Addr::new(127, 0, 0, 37),
        MockDeviceConfig {
            records: records.clone(),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let range = AddressRange::parse("127.0.0.33", "127.0.0.40").unwrap();
    let found = Scanner::new(scan_settings(device.port()))
        .scan(&range)
        .await
        .expect("device should be found");
    assert_eq!(found, Ipv4Addr::new(127, 0, 0, 37));

    let fetched = fetch_attendance(found, &session_settings(device.port(), 0))
        .await
        .unwrap();
    assert_eq!(fetched, records);
    assert!(device.is_enabled());
}

#[tokio::test]
async fn scan_reports_lowest_suffix_of_several_devices() {
    let low = MockDevice::bind(Ipv4Addr::new(127, 0, 0, 35), MockDeviceConfig::default())
        .await
        .unwrap();
    let _high = MockDevice::bind_at(
        SocketAddr::from((Ipv4Addr::new(127, 0, 0, 39), low.port())),
        MockDeviceConfig::default(),
    )
    .await
    .unwrap();

    let range = AddressRange::parse("127.0.0.33", "127.0.0.40").unwrap();
    for _ in 0..3 {
        let found = Scanner::new(scan_settings(low.port())).scan(&range).await;
        assert_eq!(found, Some(Ipv4Addr::new(127, 0, 0, 35)));
    }
}

#[tokio::test]
async fn empty_range_scan_is_a_normal_negative() {
    let device = MockDevice::bind(Ipv4Addr::new(127, 0, 0, 50), MockDeviceConfig::default())
        .await
        .unwrap();

    // The device sits outside the scanned range.
    let range = AddressRange::parse("127.0.0.33", "127.0.0.40").unwrap();
    let found = Scanner::new(scan_settings(device.port())).scan(&range).await;
    assert_eq!(found, None);
}

#[tokio::test]
async fn fetch_handles_chunked_transfers() {
    let records = sample_records(&["1001", "1002", "1003", "1004", "1005"]);
    let device = MockDevice::spawn(MockDeviceConfig {
        records: records.clone(),
        inline_limit: 1, // force the staged-buffer path
        ..Default::default()
    })
    .await
    .unwrap();

    let fetched = fetch_attendance(device.ip(), &session_settings(device.port(), 0))
        .await
        .unwrap();
    assert_eq!(fetched, records);

    // The staged path must free the device buffer when it is done.
    assert!(device.calls().contains(&DeviceCall::FreeData));
}

#[tokio::test]
async fn fetch_of_empty_log_returns_no_records() {
    let device = MockDevice::spawn(MockDeviceConfig::default()).await.unwrap();
    let fetched = fetch_attendance(device.ip(), &session_settings(device.port(), 0))
        .await
        .unwrap();
    assert!(fetched.is_empty());
}

// ============================================================================
// Failure safety: the device is never left polling-disabled
// ============================================================================

#[tokio::test]
async fn failed_read_still_reenables_exactly_once() {
    let device = MockDevice::spawn(MockDeviceConfig {
        records: sample_records(&["1001"]),
        fail_attendance_read: true,
        ..Default::default()
    })
    .await
    .unwrap();

    let result = fetch_attendance(device.ip(), &session_settings(device.port(), 0)).await;
    assert!(matches!(result, Err(Error::Protocol(_))));

    // Observed order: disable, failed read, then the guaranteed enable.
    let calls = device.calls();
    assert_eq!(
        calls,
        vec![
            DeviceCall::Connect,
            DeviceCall::Disable,
            DeviceCall::ReadAttendance,
            DeviceCall::Enable,
            DeviceCall::Exit,
        ]
    );
    assert!(device.is_enabled());
}

// ============================================================================
// User removal
// ============================================================================

#[tokio::test]
async fn deleting_present_user_removes_exactly_that_user() {
    let device = MockDevice::spawn(MockDeviceConfig {
        users: sample_users(&["1001", "1002", "1003"]),
        ..Default::default()
    })
    .await
    .unwrap();

    delete_user(device.ip(), "1002", &session_settings(device.port(), 0))
        .await
        .unwrap();

    assert_eq!(
        device.user_ids(),
        vec!["1001".to_string(), "1003".to_string()]
    );
    assert!(device.is_enabled());
}

#[tokio::test]
async fn deleting_absent_user_is_user_not_found_and_changes_nothing() {
    let device = MockDevice::spawn(MockDeviceConfig {
        users: sample_users(&["1001", "1002"]),
        ..Default::default()
    })
    .await
    .unwrap();

    let result = delete_user(device.ip(), "9999", &session_settings(device.port(), 0)).await;
    assert!(matches!(result, Err(Error::UserNotFound(id)) if id == "9999"));

    assert_eq!(
        device.user_ids(),
        vec!["1001".to_string(), "1002".to_string()]
    );
    // The failed delete went through the same disable/enable envelope.
    assert!(device.is_enabled());
    let calls = device.calls();
    assert!(calls.contains(&DeviceCall::Disable));
    assert!(calls.contains(&DeviceCall::Enable));
    assert!(!calls.iter().any(|c| matches!(c, DeviceCall::DeleteUser(_))));
}

// ============================================================================
// Credentials
// ============================================================================

#[tokio::test]
async fn correct_credential_authenticates() {
    let records = sample_records(&["1001"]);
    let device = MockDevice::spawn(MockDeviceConfig {
        password: 123,
        records: records.clone(),
        ..Default::default()
    })
    .await
    .unwrap();

    let fetched = fetch_attendance(device.ip(), &session_settings(device.port(), 123))
        .await
        .unwrap();
    assert_eq!(fetched, records);
    assert!(device.calls().contains(&DeviceCall::Auth));
}

#[tokio::test]
async fn wrong_credential_is_a_connect_error() {
    let device = MockDevice::spawn(MockDeviceConfig {
        password: 123,
        ..Default::default()
    })
    .await
    .unwrap();

    let result = fetch_attendance(device.ip(), &session_settings(device.port(), 999)).await;
    assert!(matches!(result, Err(Error::Connect { .. })));

    // The session never got far enough to disable polling.
    assert!(device.is_enabled());
    assert!(!device.calls().contains(&DeviceCall::Disable));
}

#[tokio::test]
async fn unreachable_device_is_a_connect_error() {
    // Bind then drop to get a loopback port that is closed.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let result = fetch_attendance(
        Ipv4Addr::new(127, 0, 0, 1),
        &session_settings(port, 0),
    )
    .await;
    assert!(matches!(result, Err(Error::Connect { .. })));
}
