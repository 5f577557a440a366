//! End-to-end tests over the mock transport
//!
//! Run with: cargo test --test link_e2e_test
//!
//! Every test drives a full service instance: bytes in through the mock,
//! operations and events out.

use std::time::Duration;

use gcs_core::{GcsError, GcsEvent, Severity};
use gcs_link::codec::messages::{MSG_ID_COMMAND_LONG, MSG_ID_PARAM_SET};
use gcs_link::CommandAction;
use gcs_tests::{heartbeat_frame, param_value_frame, statustext_frame, vfr_hud_frame, LinkHarness};
use pretty_assertions::assert_eq;
use tokio_test::assert_ok;

// =============================================================================
// Telemetry ingest
// =============================================================================

#[tokio::test]
async fn heartbeat_creates_vehicle_with_mode_name() {
    let h = LinkHarness::connect().await;

    // Garbage before the sync byte must be discarded silently.
    let mut chunk = vec![0x00, 0x13, 0x37];
    chunk.extend_from_slice(&heartbeat_frame(0, 1, 2, 0));
    h.link.inject(&chunk).await;

    h.wait_until(|s| !s.all_vehicles().is_empty()).await;
    let vehicle = h.service.vehicle(1).unwrap();
    assert_eq!(vehicle.flight_mode, "Stabilize");
    assert!(vehicle.connected);
    assert!(vehicle.signal_strength >= 85);
}

#[tokio::test]
async fn frame_split_across_chunks_is_reassembled() {
    let h = LinkHarness::connect().await;
    let frame = heartbeat_frame(0, 1, 2, 5);
    h.link.inject(&frame[..4]).await;
    h.link.inject(&frame[4..]).await;

    h.wait_until(|s| !s.all_vehicles().is_empty()).await;
    assert_eq!(h.service.vehicle(1).unwrap().flight_mode, "Loiter");
}

#[tokio::test]
async fn ground_station_heartbeats_are_not_vehicles() {
    let h = LinkHarness::connect().await;
    h.link.inject(&heartbeat_frame(0, 255, 6, 0)).await; // another GCS
    h.link.inject(&heartbeat_frame(1, 1, 2, 0)).await;

    h.wait_until(|s| !s.all_vehicles().is_empty()).await;
    let vehicles = h.service.all_vehicles();
    assert_eq!(vehicles.len(), 1);
    assert_eq!(vehicles[0].system_id, 1);
    assert!(matches!(
        h.service.vehicle(255),
        Err(GcsError::UnknownVehicle(255))
    ));
}

#[tokio::test]
async fn telemetry_merges_into_existing_record() {
    let h = LinkHarness::connect().await;
    h.link.inject(&heartbeat_frame(0, 1, 2, 0)).await;
    h.link.inject(&vfr_hud_frame(1, 1, 12.5, 11.0, 90)).await;

    h.wait_until(|s| s.vehicle(1).map(|v| v.heading == 90.0).unwrap_or(false))
        .await;
    let vehicle = h.service.vehicle(1).unwrap();
    assert!((vehicle.airspeed - 12.5).abs() < 1e-6);
    assert!((vehicle.groundspeed - 11.0).abs() < 1e-6);
}

#[tokio::test]
async fn status_text_lands_in_the_message_log() {
    let h = LinkHarness::connect().await;
    h.link.inject(&heartbeat_frame(0, 1, 2, 0)).await;
    h.link
        .inject(&statustext_frame(1, 1, 3, "Compass error"))
        .await;

    h.wait_until(|s| {
        s.messages(Some(1), Some(50))
            .iter()
            .any(|m| m.text == "Compass error")
    })
    .await;
    let msg = h
        .service
        .messages(Some(1), Some(50))
        .into_iter()
        .find(|m| m.text == "Compass error")
        .unwrap();
    assert_eq!(msg.kind, Severity::Error);
}

// =============================================================================
// Parameter download
// =============================================================================

#[tokio::test]
async fn parameter_download_completes_when_all_received() {
    let h = LinkHarness::connect().await;
    h.link.inject(&heartbeat_frame(0, 1, 2, 0)).await;
    h.wait_until(|s| !s.all_vehicles().is_empty()).await;

    h.service.request_parameters().await.unwrap();
    let sent = h.link.take_sent();
    assert!(
        sent.iter().any(|f| f[5] == 21),
        "no PARAM_REQUEST_LIST sent: {sent:?}"
    );

    h.link.inject(&param_value_frame(1, 1, "RTL_ALT", 30.0, 3, 0)).await;
    h.link.inject(&param_value_frame(2, 1, "WPNAV_SPEED", 5.0, 3, 1)).await;
    assert!(!h.service.parameters().complete);

    h.link.inject(&param_value_frame(3, 1, "FS_THR_ENABLE", 1.0, 3, 2)).await;
    h.wait_until(|s| s.parameters().complete).await;

    let list = h.service.parameters();
    assert_eq!(list.total, 3);
    assert_eq!(list.received, 3);
    let rtl = list.parameters.iter().find(|p| p.name == "RTL_ALT").unwrap();
    assert_eq!(rtl.value, 30.0);
}

#[tokio::test]
async fn download_restart_clears_previous_values() {
    let h = LinkHarness::connect().await;
    h.service.request_parameters().await.unwrap();
    h.link.inject(&param_value_frame(0, 1, "OLD_PARAM", 1.0, 5, 0)).await;
    h.wait_until(|s| s.parameters().received == 1).await;

    h.service.request_parameters().await.unwrap();
    assert_eq!(h.service.parameters().received, 0);
    assert_eq!(h.service.parameters().total, 0);
}

#[tokio::test]
async fn cancel_marks_download_complete_and_keeps_values() {
    let h = LinkHarness::connect().await;
    h.service.request_parameters().await.unwrap();
    h.link.inject(&param_value_frame(0, 1, "RTL_ALT", 30.0, 100, 0)).await;
    h.wait_until(|s| s.parameters().received == 1).await;

    let progress = h.service.cancel_parameter_download();
    assert!(progress.complete);
    let list = h.service.parameters();
    assert!(list.complete);
    assert_eq!(list.parameters.len(), 1);
    assert!(h.service.status().parameters_complete);
}

// Real time on purpose: liveness ages by wall-clock `Instant`, which
// tokio's paused clock does not touch.
#[tokio::test]
async fn parameter_stream_keeps_vehicle_live() {
    let h = LinkHarness::connect().await;
    h.link.inject(&heartbeat_frame(0, 1, 2, 0)).await;
    h.wait_until(|s| !s.all_vehicles().is_empty()).await;
    h.service.request_parameters().await.unwrap();

    // Stream parameters with no further heartbeats until the only
    // heartbeat is older than the 5 s liveness window.
    for i in 0..6u16 {
        tokio::time::sleep(Duration::from_millis(900)).await;
        h.link
            .inject(&param_value_frame(i as u8, 1, &format!("P{i}"), 1.0, 100, i))
            .await;
    }
    h.wait_until(|s| s.parameters().received == 6).await;

    let vehicle = h.service.vehicle(1).unwrap();
    assert!(vehicle.connected, "vehicle dropped during parameter stream");
    // Liveness-gated commands must keep working too.
    h.service.send_command(1, CommandAction::Arm).await.unwrap();
}

// =============================================================================
// Parameter set
// =============================================================================

#[tokio::test]
async fn set_parameter_confirmed_by_matching_echo() {
    let h = LinkHarness::connect().await;
    let link = h.link.clone();
    let responder = tokio::spawn(async move {
        // Echo back once the PARAM_SET frame shows up.
        for _ in 0..100 {
            if link.sent().iter().any(|f| f[5] as u32 == MSG_ID_PARAM_SET) {
                link.inject(&param_value_frame(0, 1, "RTL_ALT", 5.0, 0, 0)).await;
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("PARAM_SET never sent");
    });

    let confirmed = h.service.set_parameter("RTL_ALT", 5.0).await.unwrap();
    assert_eq!(confirmed, 5.0);
    responder.await.unwrap();
}

#[tokio::test]
async fn set_parameter_mismatch_reports_vehicle_value() {
    let h = LinkHarness::connect().await;
    let link = h.link.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        link.inject(&param_value_frame(0, 1, "RTL_ALT", 7.0, 0, 0)).await;
    });

    let err = h.service.set_parameter("RTL_ALT", 5.0).await.unwrap_err();
    match err {
        GcsError::ParameterMismatch {
            name,
            expected,
            actual,
        } => {
            assert_eq!(name, "RTL_ALT");
            assert_eq!(expected, 5.0);
            assert_eq!(actual, 7.0);
        }
        other => panic!("expected mismatch, got {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn set_parameter_times_out_without_echo() {
    let h = LinkHarness::connect().await;
    let err = h.service.set_parameter("RTL_ALT", 5.0).await.unwrap_err();
    assert!(matches!(err, GcsError::ParameterTimeout { .. }));
    // Timeout means no observed value at all.
    assert_eq!(err.parameter_outcome(), Some((5.0, None)));
}

// =============================================================================
// Commands
// =============================================================================

#[tokio::test]
async fn arm_command_reaches_the_wire() {
    let h = LinkHarness::connect().await;
    h.link.inject(&heartbeat_frame(0, 1, 2, 0)).await;
    h.wait_until(|s| !s.all_vehicles().is_empty()).await;
    h.link.take_sent();

    h.service.send_command(1, CommandAction::Arm).await.unwrap();
    let sent = h.link.take_sent();
    let frame = sent
        .iter()
        .find(|f| f[5] as u32 == MSG_ID_COMMAND_LONG)
        .expect("COMMAND_LONG sent");
    // Command id after the 7 float params, param1 = 1.0 for arm.
    assert_eq!(u16::from_le_bytes([frame[6 + 28], frame[6 + 29]]), 400);
    assert_eq!(
        f32::from_le_bytes([frame[6], frame[7], frame[8], frame[9]]),
        1.0
    );

    // The command is also reflected in the message log.
    assert!(h
        .service
        .messages(Some(1), Some(10))
        .iter()
        .any(|m| m.text.contains("Arm command")));
}

#[tokio::test]
async fn mode_change_targets_the_custom_mode() {
    let h = LinkHarness::connect().await;
    h.link.inject(&heartbeat_frame(0, 1, 2, 0)).await;
    h.wait_until(|s| !s.all_vehicles().is_empty()).await;
    h.link.take_sent();

    let message = h.service.set_flight_mode(1, 5).await.unwrap();
    assert!(message.contains("Loiter"));

    let sent = h.link.take_sent();
    let frame = sent
        .iter()
        .find(|f| f[5] as u32 == MSG_ID_COMMAND_LONG)
        .expect("COMMAND_LONG sent");
    assert_eq!(u16::from_le_bytes([frame[6 + 28], frame[6 + 29]]), 176);
    // param2 carries the mode number.
    assert_eq!(
        f32::from_le_bytes([frame[10], frame[11], frame[12], frame[13]]),
        5.0
    );
}

// =============================================================================
// Session lifecycle
// =============================================================================

#[tokio::test]
async fn disconnect_clears_all_derived_state() {
    let h = LinkHarness::connect().await;
    h.link.inject(&heartbeat_frame(0, 1, 2, 0)).await;
    h.link.inject(&param_value_frame(1, 1, "RTL_ALT", 30.0, 5, 0)).await;
    h.wait_until(|s| !s.all_vehicles().is_empty() && s.parameters().received == 1)
        .await;

    assert_ok!(h.service.disconnect().await);
    assert!(!h.service.status().connected);
    assert!(h.service.all_vehicles().is_empty());
    assert_eq!(h.service.parameters().received, 0);
    assert!(h.service.messages(None, Some(50)).is_empty());
}

#[tokio::test]
async fn remote_close_tears_the_session_down() {
    let h = LinkHarness::connect().await;
    h.link.inject(&heartbeat_frame(0, 1, 2, 0)).await;
    h.wait_until(|s| !s.all_vehicles().is_empty()).await;

    h.link.close().await;
    h.wait_until(|s| !s.status().connected).await;
    assert!(h.service.all_vehicles().is_empty());
}

#[tokio::test]
async fn reconnect_replaces_the_previous_session() {
    let h = LinkHarness::connect().await;
    h.link.inject(&heartbeat_frame(0, 1, 2, 0)).await;
    h.wait_until(|s| !s.all_vehicles().is_empty()).await;

    // Second connect drops the old session and its state.
    let second = LinkHarness::connect_existing(&h.service).await;
    assert!(h.service.all_vehicles().is_empty());
    assert!(h.service.status().connected);
    second.inject(&heartbeat_frame(0, 2, 2, 0)).await;
    h.wait_until(|s| !s.all_vehicles().is_empty()).await;
    assert_eq!(h.service.all_vehicles()[0].system_id, 2);
}

// =============================================================================
// Events
// =============================================================================

#[tokio::test]
async fn subscribers_observe_vehicle_and_message_events() {
    let h = LinkHarness::connect().await;
    let mut rx = h.sink.subscribe();

    h.link.inject(&heartbeat_frame(0, 1, 2, 0)).await;
    h.wait_until(|s| !s.all_vehicles().is_empty()).await;

    let mut saw_vehicles = false;
    let mut saw_message = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            GcsEvent::VehiclesUpdate(v) => {
                saw_vehicles = true;
                assert_eq!(v.len(), 1);
            }
            GcsEvent::SystemMessage(m) => {
                if m.text.contains("connected") {
                    saw_message = true;
                }
            }
            _ => {}
        }
    }
    assert!(saw_vehicles, "no vehicle update published");
    assert!(saw_message, "no connect notice published");
}

#[tokio::test]
async fn connection_events_bracket_the_session() {
    let h = LinkHarness::connect().await;
    let mut rx = h.sink.subscribe();
    h.service.disconnect().await.unwrap();

    let mut statuses = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let GcsEvent::ConnectionStatus(s) = event {
            statuses.push(s.connected);
        }
    }
    assert_eq!(statuses, vec![false]);
}
