//! Typed message decoding
//!
//! Each in-scope message id maps to a fixed-offset little-endian payload
//! layout. Ids without a registered decoder yield [`Message::Unknown`]
//! with the raw payload instead of failing, so an incomplete catalog
//! never stalls the stream.

pub const MSG_ID_HEARTBEAT: u32 = 0;
pub const MSG_ID_SYS_STATUS: u32 = 1;
pub const MSG_ID_PARAM_REQUEST_LIST: u32 = 21;
pub const MSG_ID_PARAM_VALUE: u32 = 22;
pub const MSG_ID_PARAM_SET: u32 = 23;
pub const MSG_ID_GPS_RAW_INT: u32 = 24;
pub const MSG_ID_ATTITUDE: u32 = 30;
pub const MSG_ID_GLOBAL_POSITION_INT: u32 = 33;
pub const MSG_ID_VFR_HUD: u32 = 74;
pub const MSG_ID_COMMAND_LONG: u32 = 76;
pub const MSG_ID_STATUSTEXT: u32 = 253;

/// HEARTBEAT (#0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Heartbeat {
    pub custom_mode: u32,
    pub vehicle_type: u8,
    pub autopilot_type: u8,
    pub base_mode: u8,
    pub system_status: u8,
    pub mavlink_version: u8,
}

/// SYS_STATUS (#1), battery fields only
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SysStatus {
    /// Battery voltage in millivolts
    pub voltage_mv: u16,
    /// Battery current in centiamperes, -1 if unreported
    pub current_ca: i16,
    /// Remaining capacity percent, -1 if unreported
    pub battery_remaining: i8,
}

/// PARAM_VALUE (#22)
#[derive(Debug, Clone, PartialEq)]
pub struct ParamValue {
    pub value: f32,
    pub count: u16,
    pub index: u16,
    pub name: String,
    pub param_type: u8,
}

/// GPS_RAW_INT (#24)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsRaw {
    /// Latitude in degrees * 1e7
    pub lat: i32,
    /// Longitude in degrees * 1e7
    pub lon: i32,
    /// Altitude MSL in millimeters
    pub alt_mm: i32,
    /// HDOP * 100 (u16::MAX if unknown)
    pub eph: u16,
    /// VDOP * 100 (u16::MAX if unknown)
    pub epv: u16,
    pub fix_type: u8,
    pub satellites: u8,
}

/// ATTITUDE (#30), angles in radians
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeMsg {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

/// GLOBAL_POSITION_INT (#33), the fused position estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalPosition {
    pub lat: i32,
    pub lon: i32,
    pub alt_mm: i32,
    pub relative_alt_mm: i32,
    /// Velocity in cm/s
    pub vx: i16,
    pub vy: i16,
    pub vz: i16,
    /// Heading in centidegrees, u16::MAX if unknown
    pub heading_cdeg: u16,
}

/// VFR_HUD (#74)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VfrHud {
    pub airspeed: f32,
    pub groundspeed: f32,
    pub alt: f32,
    pub climb: f32,
    /// Heading in degrees, nominally 0-360
    pub heading: i16,
    pub throttle: u16,
}

/// STATUSTEXT (#253)
#[derive(Debug, Clone, PartialEq)]
pub struct StatusText {
    pub severity: u8,
    pub text: String,
}

/// Decoded payload variants
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Heartbeat(Heartbeat),
    SysStatus(SysStatus),
    ParamValue(ParamValue),
    GpsRaw(GpsRaw),
    Attitude(AttitudeMsg),
    GlobalPosition(GlobalPosition),
    VfrHud(VfrHud),
    StatusText(StatusText),
    /// Message id without a registered decoder; raw payload preserved
    Unknown { id: u32, payload: Vec<u8> },
}

/// Dispatch a payload to the decoder registered for `message_id`.
///
/// MAVLink v2 senders truncate trailing zero bytes, so the payload is
/// zero-extended to the layout's full length before field extraction.
pub fn decode_payload(message_id: u32, payload: &[u8]) -> Message {
    match message_id {
        MSG_ID_HEARTBEAT => Message::Heartbeat(decode_heartbeat(&padded::<9>(payload))),
        MSG_ID_SYS_STATUS => Message::SysStatus(decode_sys_status(&padded::<31>(payload))),
        MSG_ID_PARAM_VALUE => Message::ParamValue(decode_param_value(&padded::<25>(payload))),
        MSG_ID_GPS_RAW_INT => Message::GpsRaw(decode_gps_raw(&padded::<30>(payload))),
        MSG_ID_ATTITUDE => Message::Attitude(decode_attitude(&padded::<28>(payload))),
        MSG_ID_GLOBAL_POSITION_INT => {
            Message::GlobalPosition(decode_global_position(&padded::<28>(payload)))
        }
        MSG_ID_VFR_HUD => Message::VfrHud(decode_vfr_hud(&padded::<20>(payload))),
        MSG_ID_STATUSTEXT => Message::StatusText(decode_status_text(&padded::<51>(payload))),
        id => Message::Unknown {
            id,
            payload: payload.to_vec(),
        },
    }
}

fn padded<const N: usize>(payload: &[u8]) -> [u8; N] {
    let mut buf = [0u8; N];
    let n = payload.len().min(N);
    buf[..n].copy_from_slice(&payload[..n]);
    buf
}

fn u16_at(buf: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([buf[off], buf[off + 1]])
}

fn i16_at(buf: &[u8], off: usize) -> i16 {
    i16::from_le_bytes([buf[off], buf[off + 1]])
}

fn u32_at(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

fn i32_at(buf: &[u8], off: usize) -> i32 {
    i32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

fn f32_at(buf: &[u8], off: usize) -> f32 {
    f32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

/// Extract a fixed-width NUL-padded string field.
fn str_at(buf: &[u8], off: usize, len: usize) -> String {
    let raw = &buf[off..off + len];
    let end = raw.iter().position(|&b| b == 0).unwrap_or(len);
    String::from_utf8_lossy(&raw[..end]).trim().to_string()
}

fn decode_heartbeat(p: &[u8; 9]) -> Heartbeat {
    Heartbeat {
        custom_mode: u32_at(p, 0),
        vehicle_type: p[4],
        autopilot_type: p[5],
        base_mode: p[6],
        system_status: p[7],
        mavlink_version: p[8],
    }
}

fn decode_sys_status(p: &[u8; 31]) -> SysStatus {
    SysStatus {
        voltage_mv: u16_at(p, 14),
        current_ca: i16_at(p, 16),
        battery_remaining: p[30] as i8,
    }
}

fn decode_param_value(p: &[u8; 25]) -> ParamValue {
    ParamValue {
        value: f32_at(p, 0),
        count: u16_at(p, 4),
        index: u16_at(p, 6),
        name: str_at(p, 8, 16),
        param_type: p[24],
    }
}

fn decode_gps_raw(p: &[u8; 30]) -> GpsRaw {
    GpsRaw {
        lat: i32_at(p, 8),
        lon: i32_at(p, 12),
        alt_mm: i32_at(p, 16),
        eph: u16_at(p, 20),
        epv: u16_at(p, 22),
        fix_type: p[28],
        satellites: p[29],
    }
}

fn decode_attitude(p: &[u8; 28]) -> AttitudeMsg {
    AttitudeMsg {
        roll: f32_at(p, 4),
        pitch: f32_at(p, 8),
        yaw: f32_at(p, 12),
    }
}

fn decode_global_position(p: &[u8; 28]) -> GlobalPosition {
    GlobalPosition {
        lat: i32_at(p, 4),
        lon: i32_at(p, 8),
        alt_mm: i32_at(p, 12),
        relative_alt_mm: i32_at(p, 16),
        vx: i16_at(p, 20),
        vy: i16_at(p, 22),
        vz: i16_at(p, 24),
        heading_cdeg: u16_at(p, 26),
    }
}

fn decode_vfr_hud(p: &[u8; 20]) -> VfrHud {
    VfrHud {
        airspeed: f32_at(p, 0),
        groundspeed: f32_at(p, 4),
        alt: f32_at(p, 8),
        climb: f32_at(p, 12),
        heading: i16_at(p, 16),
        throttle: u16_at(p, 18),
    }
}

fn decode_status_text(p: &[u8; 51]) -> StatusText {
    StatusText {
        severity: p[0],
        text: str_at(p, 1, 50),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_decodes_exact_field_values() {
        // type=2 (quadrotor), autopilot=3, base=0, custom=0, status=4, version=3
        let payload = [0, 0, 0, 0, 2, 3, 0, 4, 3];
        match decode_payload(MSG_ID_HEARTBEAT, &payload) {
            Message::Heartbeat(hb) => {
                assert_eq!(hb.custom_mode, 0);
                assert_eq!(hb.vehicle_type, 2);
                assert_eq!(hb.autopilot_type, 3);
                assert_eq!(hb.base_mode, 0);
                assert_eq!(hb.system_status, 4);
                assert_eq!(hb.mavlink_version, 3);
            }
            other => panic!("expected heartbeat, got {other:?}"),
        }
    }

    #[test]
    fn truncated_v2_heartbeat_zero_extends() {
        // custom_mode=0 truncated away entirely by a v2 sender
        let payload = [0, 0, 0, 0, 2];
        match decode_payload(MSG_ID_HEARTBEAT, &payload) {
            Message::Heartbeat(hb) => {
                assert_eq!(hb.vehicle_type, 2);
                assert_eq!(hb.base_mode, 0);
                assert_eq!(hb.mavlink_version, 0);
            }
            other => panic!("expected heartbeat, got {other:?}"),
        }
    }

    #[test]
    fn param_value_strips_nul_padding() {
        let mut payload = [0u8; 25];
        payload[..4].copy_from_slice(&5.0f32.to_le_bytes());
        payload[4..6].copy_from_slice(&10u16.to_le_bytes());
        payload[6..8].copy_from_slice(&3u16.to_le_bytes());
        payload[8..11].copy_from_slice(b"FOO");
        payload[24] = 9;
        match decode_payload(MSG_ID_PARAM_VALUE, &payload) {
            Message::ParamValue(pv) => {
                assert_eq!(pv.name, "FOO");
                assert_eq!(pv.value, 5.0);
                assert_eq!(pv.count, 10);
                assert_eq!(pv.index, 3);
                assert_eq!(pv.param_type, 9);
            }
            other => panic!("expected param value, got {other:?}"),
        }
    }

    #[test]
    fn unregistered_id_yields_raw_payload() {
        let payload = [1, 2, 3];
        match decode_payload(4242, &payload) {
            Message::Unknown { id, payload } => {
                assert_eq!(id, 4242);
                assert_eq!(payload, vec![1, 2, 3]);
            }
            other => panic!("expected unknown, got {other:?}"),
        }
    }

    #[test]
    fn global_position_scales_are_raw_wire_units() {
        let mut payload = [0u8; 28];
        payload[4..8].copy_from_slice(&(473_566_988i32).to_le_bytes());
        payload[8..12].copy_from_slice(&(85_451_234i32).to_le_bytes());
        payload[12..16].copy_from_slice(&(504_000i32).to_le_bytes());
        payload[26..28].copy_from_slice(&(18_050u16).to_le_bytes());
        match decode_payload(MSG_ID_GLOBAL_POSITION_INT, &payload) {
            Message::GlobalPosition(gp) => {
                assert_eq!(gp.lat, 473_566_988);
                assert_eq!(gp.lon, 85_451_234);
                assert_eq!(gp.alt_mm, 504_000);
                assert_eq!(gp.heading_cdeg, 18_050);
            }
            other => panic!("expected global position, got {other:?}"),
        }
    }
}
