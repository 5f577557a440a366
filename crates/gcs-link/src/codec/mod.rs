//! Frame codec: stateful byte-stream demultiplexer and encoder
//!
//! Decoding accumulates raw chunks in a buffer; partial frames persist
//! across calls and malformed input is dropped silently while scanning
//! resumes at the next sync byte. Decode is pure and synchronous; it
//! never blocks and never errors out on garbage.

mod crc;
mod encode;
pub mod messages;

pub use crc::{crc_extra, frame_checksum};
pub use encode::FrameEncoder;
pub use messages::{decode_payload, Message};

use bytes::{Buf, BytesMut};
use tracing::{debug, trace};

/// Sync byte opening a version-1 frame
pub const SYNC_V1: u8 = 0xFE;
/// Sync byte opening a version-2 frame
pub const SYNC_V2: u8 = 0xFD;

const HEADER_LEN_V1: usize = 6;
const HEADER_LEN_V2: usize = 10;

/// One complete protocol unit extracted from the stream
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Protocol version, 1 or 2
    pub version: u8,
    pub sequence: u8,
    pub system_id: u8,
    pub component_id: u8,
    pub message_id: u32,
    pub payload: Vec<u8>,
    pub checksum: u16,
    /// Typed view of the payload; raw/unknown for unregistered ids
    pub message: Message,
}

/// Decoder statistics for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    pub frames_decoded: u64,
    pub checksum_failures: u64,
    pub bytes_discarded: u64,
}

/// Stateful stream decoder. One instance per transport session; the
/// buffer must never be fed concurrently with itself.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
    stats: DecoderStats,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Bytes currently buffered awaiting frame completion.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drop all buffered bytes (session teardown).
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Append a chunk and drain every frame that is now complete.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        loop {
            let Some(sync_at) = self
                .buffer
                .iter()
                .position(|&b| b == SYNC_V1 || b == SYNC_V2)
            else {
                // No sync byte anywhere: resync on the next chunk.
                self.stats.bytes_discarded += self.buffer.len() as u64;
                self.buffer.clear();
                break;
            };
            if sync_at > 0 {
                self.stats.bytes_discarded += sync_at as u64;
                self.buffer.advance(sync_at);
            }

            let header_len = if self.buffer[0] == SYNC_V1 {
                HEADER_LEN_V1
            } else {
                HEADER_LEN_V2
            };
            if self.buffer.len() < header_len {
                break;
            }
            let payload_len = self.buffer[1] as usize;
            let total = header_len + payload_len + 2;
            if self.buffer.len() < total {
                // Incomplete frame: consume nothing, wait for more data.
                break;
            }

            match self.try_frame(header_len, payload_len) {
                Some(frame) => {
                    self.buffer.advance(total);
                    self.stats.frames_decoded += 1;
                    frames.push(frame);
                }
                None => {
                    // Bad checksum: skip the sync byte and rescan.
                    self.stats.checksum_failures += 1;
                    self.stats.bytes_discarded += 1;
                    self.buffer.advance(1);
                }
            }
        }

        frames
    }

    fn try_frame(&self, header_len: usize, payload_len: usize) -> Option<Frame> {
        let buf = &self.buffer[..header_len + payload_len + 2];
        let (version, sequence, system_id, component_id, message_id) = if header_len == HEADER_LEN_V1
        {
            (1u8, buf[2], buf[3], buf[4], buf[5] as u32)
        } else {
            let msg_id = buf[7] as u32 | (buf[8] as u32) << 8 | (buf[9] as u32) << 16;
            (2u8, buf[4], buf[5], buf[6], msg_id)
        };

        let payload = &buf[header_len..header_len + payload_len];
        let received = u16::from_le_bytes([
            buf[header_len + payload_len],
            buf[header_len + payload_len + 1],
        ]);
        let computed = frame_checksum(&buf[1..header_len], payload, crc_extra(message_id));
        if computed != received {
            debug!(
                message_id,
                computed = format_args!("{computed:#06x}"),
                received = format_args!("{received:#06x}"),
                "Dropping frame with checksum mismatch"
            );
            return None;
        }

        trace!(
            message_id,
            system_id,
            payload = %hex::encode(payload),
            "Decoded frame"
        );
        Some(Frame {
            version,
            sequence,
            system_id,
            component_id,
            message_id,
            payload: payload.to_vec(),
            checksum: received,
            message: decode_payload(message_id, payload),
        })
    }
}
