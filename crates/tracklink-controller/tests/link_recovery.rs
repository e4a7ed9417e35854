//! Link outage and reconnect scenarios.

mod common;

use common::*;
use tracklink_controller::{ConnectionEvent, LinkState, SkipReason, TelemetryDecision};
use tracklink_core::{DeviceConfig, TrackId};
use tracklink_hardware::LinkStatus;

#[tokio::test]
async fn test_outage_resumes_on_next_boundary_without_backlog() {
    let mut h = Harness::new(DeviceConfig::default());
    h.fleet_backend();
    h.good_fix();
    h.start_connected().await;

    let ticks = h.run_for(ms(12_000)).await;
    assert_eq!(telemetry_sends(&h, &ticks), vec![ms(5_000), ms(10_000)]);

    h.radio.set_status(LinkStatus::Disconnected);
    let outage = h.run_for(ms(18_900)).await;
    assert_eq!(h.since_start(h.now), ms(31_000));

    assert!(telemetry_sends(&h, &outage).is_empty());
    assert!(
        outage
            .iter()
            .any(|(_, report)| report.connection.contains(&ConnectionEvent::LinkLost))
    );
    let skipped = outage
        .iter()
        .filter(|(_, report)| {
            report.telemetry == Some(TelemetryDecision::Skipped(SkipReason::LinkDown))
        })
        .count();
    assert_eq!(skipped, 4, "15 s, 20 s, 25 s and 30 s");

    h.radio.set_status(LinkStatus::Connected);
    let recovered = h.run_for(ms(10_000)).await;

    assert_eq!(telemetry_sends(&h, &recovered), vec![ms(35_000), ms(40_000)]);
    assert_eq!(h.backend.plain_reports().len(), 4);
    assert_eq!(h.device.link().state().attempt_count, 0);
    // The outage ended before a reconnect cycle was exhausted.
    assert!(h.speaker.played().is_empty());
}

#[tokio::test]
async fn test_reconnect_backoff_and_exhaustion() {
    let mut config = DeviceConfig::default();
    config.link.connect_timeout_ms = 1_000;
    config.link.max_reconnect_attempts = 3;
    config.link.backoff_base_ms = 2_000;
    let mut h = Harness::new(config);
    h.start_offline().await;

    let ticks = h.run_for(ms(27_500)).await;
    let events: Vec<_> = ticks
        .iter()
        .flat_map(|(at, report)| report.connection.iter().map(move |e| (*at, *e)))
        .collect();

    let delays: Vec<_> = events
        .iter()
        .filter_map(|(_, event)| match event {
            ConnectionEvent::AttemptFailed {
                retry_in: Some(delay),
                ..
            } => Some(*delay),
            _ => None,
        })
        .collect();
    assert_eq!(delays, vec![ms(2_000), ms(4_000), ms(8_000)]);

    let failures: Vec<_> = events
        .iter()
        .filter_map(|(at, event)| match event {
            ConnectionEvent::ConnectFailed { attempts } => Some((h.since_start(*at), *attempts)),
            _ => None,
        })
        .collect();
    // Initial connect fails at 1 s; the reconnect starts once the 10 s
    // cooldown has been exceeded (10.1 s) and gives up after three attempts
    // and their pauses.
    assert_eq!(failures, vec![(ms(1_000), 1), (ms(27_100), 3)]);

    assert_eq!(h.radio.begin_count(), 4);
    assert_eq!(h.device.link().state().status, LinkState::Disconnected);
    assert_eq!(h.device.link().state().attempt_count, 4);
    assert_eq!(h.speaker.play_count(TrackId::new(3)), 2);
}

#[tokio::test]
async fn test_reconnect_stops_at_first_success() {
    let mut config = DeviceConfig::default();
    config.link.connect_timeout_ms = 1_000;
    config.link.backoff_base_ms = 2_000;
    let mut h = Harness::new(config);
    h.start_offline().await;

    // Reconnect begins at 10.1 s; its first attempt times out at 11.1 s and
    // the second starts at 13.1 s.
    h.run_for(ms(13_500)).await;
    assert_eq!(h.radio.begin_count(), 3);

    h.radio.set_status(LinkStatus::Connected);
    let report = h.tick().await;

    assert_eq!(report.connection, vec![ConnectionEvent::Connected]);
    h.run_for(ms(20_000)).await;
    assert_eq!(h.radio.begin_count(), 3);
    assert!(h.device.link().is_connected());
    assert_eq!(h.device.link().state().attempt_count, 0);
}

#[tokio::test]
async fn test_weak_signal_reported_once() {
    let mut h = Harness::new(DeviceConfig::default());
    h.start_connected().await;

    h.radio.set_rssi(-82);
    let ticks = h.run_for(ms(1_000)).await;
    let alerts = ticks
        .iter()
        .flat_map(|(_, report)| report.connection.iter())
        .filter(|event| matches!(event, ConnectionEvent::SignalLow { rssi: -82 }))
        .count();

    assert_eq!(alerts, 1);
    assert_eq!(h.device.link().state().rssi, Some(-82));
}

#[tokio::test]
async fn test_shutdown_drops_link() {
    let mut h = Harness::new(DeviceConfig::default());
    h.start_connected().await;

    h.device.shutdown().await;

    assert_eq!(h.radio.disconnect_count(), 1);
    assert!(!h.device.link().is_connected());
}
