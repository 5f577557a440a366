//! Vehicle telemetry models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// MAV_TYPE value for a ground control station
pub const MAV_TYPE_GCS: u8 = 6;
/// MAV_TYPE value for an antenna tracker
pub const MAV_TYPE_ANTENNA_TRACKER: u8 = 5;
/// MAV_TYPE value for an onboard companion controller
pub const MAV_TYPE_ONBOARD_CONTROLLER: u8 = 18;

/// Whether a heartbeat's reported type describes an actual vehicle.
///
/// Ground stations, companion computers, and antenna trackers also emit
/// heartbeats on the link; they must never appear in the vehicle registry.
pub fn is_vehicle_type(vehicle_type: u8) -> bool {
    !matches!(
        vehicle_type,
        MAV_TYPE_GCS | MAV_TYPE_ANTENNA_TRACKER | MAV_TYPE_ONBOARD_CONTROLLER
    )
}

/// Global position (degrees / meters)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
    /// Altitude above mean sea level in meters
    pub alt: f64,
    /// Altitude above home in meters
    pub relative_alt: f64,
}

/// NED velocity in m/s
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
}

/// Attitude in radians
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Attitude {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

/// Battery state as reported by SYS_STATUS
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Battery {
    /// Battery voltage in volts
    pub voltage: f32,
    /// Battery current in amperes (-1 if unreported)
    pub current: f32,
    /// Remaining capacity in percent (-1 if unreported)
    pub remaining_pct: i8,
}

/// GPS fix quality
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsInfo {
    /// Fix type (0-1 none, 2 = 2D, 3 = 3D, 4+ = differential/RTK)
    pub fix_type: u8,
    /// Number of satellites visible
    pub satellites: u8,
    /// Horizontal dilution of precision
    pub hdop: f32,
    /// Vertical dilution of precision
    pub vdop: f32,
}

/// GPS fix type threshold for adopting a position
pub const GPS_FIX_3D: u8 = 3;

/// Read-time view of one vehicle, with derived liveness fields.
///
/// `connected` and `signal_strength` are computed when the snapshot is
/// taken; they are never part of the stored record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    /// System id (unique key on the link)
    pub system_id: u8,
    /// MAV_TYPE of the airframe
    pub vehicle_type: u8,
    /// MAV_AUTOPILOT flavor
    pub autopilot_type: u8,
    /// Base mode bitmask from the last heartbeat
    pub base_mode: u8,
    /// Autopilot-specific mode number
    pub custom_mode: u32,
    /// Human-readable flight mode, derived from custom_mode + vehicle_type
    pub flight_mode: String,
    pub position: Position,
    pub velocity: Velocity,
    /// Heading in degrees, 0-360
    pub heading: f32,
    /// Ground speed in m/s
    pub groundspeed: f32,
    /// Airspeed in m/s
    pub airspeed: f32,
    pub attitude: Attitude,
    pub battery: Battery,
    pub gps: GpsInfo,
    /// True when telemetry arrived within the last 5 seconds
    pub connected: bool,
    /// Derived link quality estimate, 0-100
    pub signal_strength: u8,
    /// Wall-clock time of the last applied frame
    pub last_update: DateTime<Utc>,
}
