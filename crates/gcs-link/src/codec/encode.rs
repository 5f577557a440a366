//! Outbound frame construction
//!
//! All outbound traffic uses version-1 frames. The sequence counter is
//! per-encoder and wraps at 256.

use super::crc::{crc_extra, frame_checksum};
use super::messages::{MSG_ID_COMMAND_LONG, MSG_ID_PARAM_REQUEST_LIST, MSG_ID_PARAM_SET};
use super::SYNC_V1;

/// Builds the outbound message subset: parameter-list request, parameter
/// set, and the generic long command.
#[derive(Debug)]
pub struct FrameEncoder {
    system_id: u8,
    component_id: u8,
    sequence: u8,
}

impl FrameEncoder {
    /// `system_id`/`component_id` identify this ground station on the
    /// link (conventionally 255/190).
    pub fn new(system_id: u8, component_id: u8) -> Self {
        Self {
            system_id,
            component_id,
            sequence: 0,
        }
    }

    /// PARAM_REQUEST_LIST: ask the target to stream every parameter.
    pub fn param_request_list(&mut self, target_system: u8, target_component: u8) -> Vec<u8> {
        self.frame(
            MSG_ID_PARAM_REQUEST_LIST,
            &[target_system, target_component],
        )
    }

    /// PARAM_SET: write one named value. The name is NUL-padded or
    /// truncated to exactly 16 bytes.
    pub fn param_set(
        &mut self,
        target_system: u8,
        target_component: u8,
        name: &str,
        value: f32,
        type_tag: u8,
    ) -> Vec<u8> {
        let mut payload = Vec::with_capacity(23);
        payload.extend_from_slice(&value.to_le_bytes());
        payload.push(target_system);
        payload.push(target_component);
        let mut id = [0u8; 16];
        let bytes = name.as_bytes();
        let n = bytes.len().min(16);
        id[..n].copy_from_slice(&bytes[..n]);
        payload.extend_from_slice(&id);
        payload.push(type_tag);
        self.frame(MSG_ID_PARAM_SET, &payload)
    }

    /// COMMAND_LONG: 7 float params, a command id, and a confirmation
    /// byte (33-byte payload).
    pub fn command_long(
        &mut self,
        target_system: u8,
        target_component: u8,
        command: u16,
        confirmation: u8,
        params: [f32; 7],
    ) -> Vec<u8> {
        let mut payload = Vec::with_capacity(33);
        for p in params {
            payload.extend_from_slice(&p.to_le_bytes());
        }
        payload.extend_from_slice(&command.to_le_bytes());
        payload.push(target_system);
        payload.push(target_component);
        payload.push(confirmation);
        self.frame(MSG_ID_COMMAND_LONG, &payload)
    }

    fn frame(&mut self, message_id: u32, payload: &[u8]) -> Vec<u8> {
        let seq = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);

        let header = [
            payload.len() as u8,
            seq,
            self.system_id,
            self.component_id,
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
}
