//! Shared fixtures for the integration tests
//!
//! Builds vehicle-side frames (the direction the encoder does not cover)
//! and wraps a [`LinkService`] connected to the mock transport.

use std::sync::Arc;
use std::time::Duration;

use gcs_link::codec::messages::{
    MSG_ID_HEARTBEAT, MSG_ID_PARAM_VALUE, MSG_ID_STATUSTEXT, MSG_ID_VFR_HUD,
};
use gcs_link::codec::{crc_extra, frame_checksum, SYNC_V1};
use gcs_link::{BroadcastSink, LinkService, MockConfig, MockHandle, TransportConfig};

/// Build a complete version-1 frame around `payload`.
pub fn v1_frame(
    sequence: u8,
    system_id: u8,
    component_id: u8,
    message_id: u32,
    payload: &[u8],
) -> Vec<u8> {
    let header = [
        payload.len() as u8,
        sequence,
        system_id,
        component_id,
        message_id as u8,
    ];
    let checksum = frame_checksum(&header, payload, crc_extra(message_id));
    let mut out = Vec::with_capacity(6 + payload.len() + 2);
    out.push(SYNC_V1);
    out.extend_from_slice(&header);
    out.extend_from_slice(payload);
    out.extend_from_slice(&checksum.to_le_bytes());
    out
}

/// HEARTBEAT from an autopilot (component 1).
pub fn heartbeat_frame(sequence: u8, system_id: u8, vehicle_type: u8, custom_mode: u32) -> Vec<u8> {
    let mut payload = [0u8; 9];
    payload[..4].copy_from_slice(&custom_mode.to_le_bytes());
    payload[4] = vehicle_type;
    payload[5] = 3; // ArduPilot
    payload[7] = 4; // active
    payload[8] = 3;
    v1_frame(sequence, system_id, 1, MSG_ID_HEARTBEAT, &payload)
}

/// PARAM_VALUE as streamed during a download or echoed after a set.
pub fn param_value_frame(
    sequence: u8,
    system_id: u8,
    name: &str,
    value: f32,
    count: u16,
    index: u16,
) -> Vec<u8> {
    let mut payload = [0u8; 25];
    payload[..4].copy_from_slice(&value.to_le_bytes());
    payload[4..6].copy_from_slice(&count.to_le_bytes());
    payload[6..8].copy_from_slice(&index.to_le_bytes());
    let bytes = name.as_bytes();
    let n = bytes.len().min(16);
    payload[8..8 + n].copy_from_slice(&bytes[..n]);
    payload[24] = 9; // REAL32
    v1_frame(sequence, system_id, 1, MSG_ID_PARAM_VALUE, &payload)
}

/// STATUSTEXT with a NUL-padded 50-byte text field.
pub fn statustext_frame(sequence: u8, system_id: u8, severity: u8, text: &str) -> Vec<u8> {
    let mut payload = [0u8; 51];
    payload[0] = severity;
    let bytes = text.as_bytes();
    let n = bytes.len().min(50);
    payload[1..1 + n].copy_from_slice(&bytes[..n]);
    v1_frame(sequence, system_id, 1, MSG_ID_STATUSTEXT, &payload)
}

/// VFR_HUD carrying speeds and a heading.
pub fn vfr_hud_frame(
    sequence: u8,
    system_id: u8,
    airspeed: f32,
    groundspeed: f32,
    heading: i16,
) -> Vec<u8> {
    let mut payload = [0u8; 20];
    payload[..4].copy_from_slice(&airspeed.to_le_bytes());
    payload[4..8].copy_from_slice(&groundspeed.to_le_bytes());
    payload[16..18].copy_from_slice(&heading.to_le_bytes());
    v1_frame(sequence, system_id, 1, MSG_ID_VFR_HUD, &payload)
}

/// A service connected through the mock transport, plus the handles the
/// tests drive it with.
pub struct LinkHarness {
    pub service: LinkService,
    pub sink: Arc<BroadcastSink>,
    pub link: MockHandle,
}

impl LinkHarness {
    pub async fn connect() -> Self {
        let (service, sink) = LinkService::with_broadcast(64);
        service
            .connect(&TransportConfig::Mock(MockConfig::default()))
            .await
            .expect("mock connect");
        let link = service.mock_handle().expect("mock handle");
        Self {
            service,
            sink,
            link,
        }
    }

    /// Open a fresh mock session on an existing service, returning the
    /// new transport handle.
    pub async fn connect_existing(service: &LinkService) -> MockHandle {
        service
            .connect(&TransportConfig::Mock(MockConfig::default()))
            .await
            .expect("mock reconnect");
        service.mock_handle().expect("mock handle")
    }

    /// Poll until `predicate` holds; panics after one second of real or
    /// virtual time.
    pub async fn wait_until(&self, mut predicate: impl FnMut(&LinkService) -> bool) {
        for _ in 0..100 {
            if predicate(&self.service) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached within 1s");
    }
}
