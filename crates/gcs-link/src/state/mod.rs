//! Per-vehicle state registry
//!
//! Owns the vehicle records and the bounded system log. Decoded frames
//! are merged field-by-field; liveness is derived at read time from the
//! last-update instant and never stored.

pub mod modes;

use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use gcs_core::{
    is_vehicle_type, Attitude, Battery, GpsInfo, LogMessage, Position, Velocity, VehicleSnapshot,
    GPS_FIX_3D, LOG_BUFFER_CAPACITY,
};
use tracing::{debug, info};

use crate::codec::messages::{
    AttitudeMsg, GlobalPosition, GpsRaw, Heartbeat, StatusText, SysStatus, VfrHud,
};
use crate::codec::Message;
use modes::{flight_mode_name, Airframe};

/// A vehicle stops counting as connected after this much silence.
pub const LIVENESS_WINDOW: Duration = Duration::from_millis(5000);

/// Satellite count treated as full signal
const SIGNAL_TARGET_SATELLITES: u32 = 15;

/// Mutable per-system-id record
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub system_id: u8,
    pub vehicle_type: u8,
    pub autopilot_type: u8,
    pub base_mode: u8,
    pub custom_mode: u32,
    pub flight_mode: String,
    pub position: Position,
    pub velocity: Velocity,
    pub heading: f32,
    pub groundspeed: f32,
    pub airspeed: f32,
    pub attitude: Attitude,
    pub battery: Battery,
    pub gps: GpsInfo,
    pub last_update: Instant,
    pub last_update_wall: DateTime<Utc>,
}

impl Vehicle {
    fn new(system_id: u8, hb: &Heartbeat, now: Instant) -> Self {
        Self {
            system_id,
            vehicle_type: hb.vehicle_type,
            autopilot_type: hb.autopilot_type,
            base_mode: hb.base_mode,
            custom_mode: hb.custom_mode,
            flight_mode: flight_mode_name(hb.vehicle_type, hb.custom_mode),
            position: Position::default(),
            velocity: Velocity::default(),
            heading: 0.0,
            groundspeed: 0.0,
            airspeed: 0.0,
            attitude: Attitude::default(),
            battery: Battery {
                voltage: 0.0,
                current: -1.0,
                remaining_pct: -1,
            },
            gps: GpsInfo::default(),
            last_update: now,
            last_update_wall: Utc::now(),
        }
    }

    fn connected(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_update) < LIVENESS_WINDOW
    }

    /// Link quality estimate: satellite count against a 15-sat target,
    /// floored while telemetry is fresh.
    fn signal_strength(&self, now: Instant) -> u8 {
        let base =
            ((self.gps.satellites as u32 * 100) / SIGNAL_TARGET_SATELLITES).min(100) as u8;
        let age = now.saturating_duration_since(self.last_update);
        if age < Duration::from_secs(1) {
            base.max(85)
        } else if age < Duration::from_secs(3) {
            base.max(60)
        } else {
            base
        }
    }

    fn snapshot(&self, now: Instant) -> VehicleSnapshot {
        VehicleSnapshot {
            system_id: self.system_id,
            vehicle_type: self.vehicle_type,
            autopilot_type: self.autopilot_type,
            base_mode: self.base_mode,
            custom_mode: self.custom_mode,
            flight_mode: self.flight_mode.clone(),
            position: self.position,
            velocity: self.velocity,
            heading: self.heading,
            groundspeed: self.groundspeed,
            airspeed: self.airspeed,
            attitude: self.attitude,
            battery: self.battery,
            gps: self.gps,
            connected: self.connected(now),
            signal_strength: self.signal_strength(now),
            last_update: self.last_update_wall,
        }
    }
}

/// Result of applying one decoded message
#[derive(Debug, Default)]
pub struct ApplyResult {
    /// Vehicle state changed; a (throttled) update should be published
    pub updated: bool,
    /// Log entries produced while applying, to fan out unthrottled
    pub logs: Vec<LogMessage>,
}

/// Registry of vehicle records plus the bounded system log
#[derive(Debug, Default)]
pub struct VehicleStateStore {
    vehicles: HashMap<u8, Vehicle>,
    log: VecDeque<LogMessage>,
}

impl VehicleStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one decoded message into the registry.
    pub fn apply(&mut self, system_id: u8, message: &Message, now: Instant) -> ApplyResult {
        let mut result = ApplyResult::default();
        match message {
            Message::Heartbeat(hb) => self.apply_heartbeat(system_id, hb, now, &mut result),
            Message::SysStatus(s) => {
                self.merge(system_id, now, &mut result, |v| {
                    v.battery = Battery {
                        voltage: s.voltage_mv as f32 / 1000.0,
                        current: s.current_ca as f32 / 100.0,
                        remaining_pct: s.battery_remaining,
                    };
                });
            }
            Message::GpsRaw(g) => self.apply_gps_raw(system_id, g, now, &mut result),
            Message::GlobalPosition(g) => self.apply_global_position(system_id, g, now, &mut result),
            Message::VfrHud(h) => self.apply_vfr_hud(system_id, h, now, &mut result),
            Message::Attitude(a) => {
                self.merge(system_id, now, &mut result, |v| {
                    v.attitude = Attitude {
                        roll: a.roll,
                        pitch: a.pitch,
                        yaw: a.yaw,
                    };
                });
            }
            Message::StatusText(st) => self.apply_status_text(system_id, st, now, &mut result),
            // Parameter values are consumed by the session layer and
            // unknown ids carry no fields, but any checksum-valid frame
            // from a known vehicle still counts as activity.
            Message::ParamValue(_) | Message::Unknown { .. } => {
                self.merge(system_id, now, &mut result, |_| {});
            }
        }
        result
    }

    fn apply_heartbeat(
        &mut self,
        system_id: u8,
        hb: &Heartbeat,
        now: Instant,
        result: &mut ApplyResult,
    ) {
        if !is_vehicle_type(hb.vehicle_type) {
            // GCS/companion/tracker heartbeats never create records.
            debug!(system_id, vehicle_type = hb.vehicle_type, "Ignoring non-vehicle heartbeat");
            return;
        }

        match self.vehicles.get_mut(&system_id) {
            Some(v) => {
                v.base_mode = hb.base_mode;
                v.custom_mode = hb.custom_mode;
                v.flight_mode = flight_mode_name(v.vehicle_type, hb.custom_mode);
                v.last_update = now;
                v.last_update_wall = Utc::now();
            }
            None => {
                let vehicle = Vehicle::new(system_id, hb, now);
                info!(
                    system_id,
                    vehicle_type = hb.vehicle_type,
                    flight_mode = %vehicle.flight_mode,
                    "Vehicle connected"
                );
                let label = Airframe::from_mav_type(hb.vehicle_type).label();
                let log = LogMessage::notice(
                    system_id,
                    format!("{label} {system_id} connected ({})", vehicle.flight_mode),
                );
                self.push_log(log.clone());
                result.logs.push(log);
                self.vehicles.insert(system_id, vehicle);
            }
        }
        result.updated = true;
    }

    fn apply_gps_raw(&mut self, system_id: u8, g: &GpsRaw, now: Instant, result: &mut ApplyResult) {
        self.merge(system_id, now, result, |v| {
            v.gps.fix_type = g.fix_type;
            v.gps.satellites = g.satellites;
            if g.eph != u16::MAX {
                v.gps.hdop = g.eph as f32 / 100.0;
            }
            if g.epv != u16::MAX {
                v.gps.vdop = g.epv as f32 / 100.0;
            }
            // Only adopt a raw-fix position once the receiver has a 3D fix.
            if g.fix_type >= GPS_FIX_3D {
                v.position.lat = g.lat as f64 / 1e7;
                v.position.lon = g.lon as f64 / 1e7;
                v.position.alt = g.alt_mm as f64 / 1000.0;
            }
        });
    }

    fn apply_global_position(
        &mut self,
        system_id: u8,
        g: &GlobalPosition,
        now: Instant,
        result: &mut ApplyResult,
    ) {
        self.merge(system_id, now, result, |v| {
            v.position = Position {
                lat: g.lat as f64 / 1e7,
                lon: g.lon as f64 / 1e7,
                alt: g.alt_mm as f64 / 1000.0,
                relative_alt: g.relative_alt_mm as f64 / 1000.0,
            };
            v.velocity = Velocity {
                vx: g.vx as f32 / 100.0,
                vy: g.vy as f32 / 100.0,
                vz: g.vz as f32 / 100.0,
            };
            // Heading from the fused estimate is trusted unconditionally.
            if g.heading_cdeg != u16::MAX {
                v.heading = g.heading_cdeg as f32 / 100.0;
            }
        });
    }

    fn apply_vfr_hud(&mut self, system_id: u8, h: &VfrHud, now: Instant, result: &mut ApplyResult) {
        self.merge(system_id, now, result, |v| {
            v.airspeed = h.airspeed;
            v.groundspeed = h.groundspeed;
            // HUD heading can go stale/invalid; only adopt sane values so
            // a good fused heading is never overwritten by junk.
            if (0..=360).contains(&h.heading) {
                v.heading = h.heading as f32;
            }
        });
    }

    fn apply_status_text(
        &mut self,
        system_id: u8,
        st: &StatusText,
        now: Instant,
        result: &mut ApplyResult,
    ) {
        let log = LogMessage::from_wire(system_id, st.severity, st.text.clone());
        self.push_log(log.clone());
        result.logs.push(log);
        if let Some(v) = self.vehicles.get_mut(&system_id) {
            v.last_update = now;
            v.last_update_wall = Utc::now();
            result.updated = true;
        }
    }

    fn merge(
        &mut self,
        system_id: u8,
        now: Instant,
        result: &mut ApplyResult,
        f: impl FnOnce(&mut Vehicle),
    ) {
        if let Some(v) = self.vehicles.get_mut(&system_id) {
            f(v);
            v.last_update = now;
            v.last_update_wall = Utc::now();
            result.updated = true;
        }
    }

    /// Append a core-generated log entry (command notices etc.).
    pub fn push_log(&mut self, entry: LogMessage) {
        self.log.push_front(entry);
        self.log.truncate(LOG_BUFFER_CAPACITY);
    }

    /// Snapshots of every vehicle with liveness derived at `now`.
    pub fn snapshots(&self, now: Instant) -> Vec<VehicleSnapshot> {
        let mut list: Vec<_> = self.vehicles.values().map(|v| v.snapshot(now)).collect();
        list.sort_by_key(|v| v.system_id);
        list
    }

    pub fn snapshot(&self, system_id: u8, now: Instant) -> Option<VehicleSnapshot> {
        self.vehicles.get(&system_id).map(|v| v.snapshot(now))
    }

    pub fn contains(&self, system_id: u8) -> bool {
        self.vehicles.contains_key(&system_id)
    }

    /// Known system ids, ascending.
    pub fn system_ids(&self) -> Vec<u8> {
        let mut ids: Vec<_> = self.vehicles.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Whether the vehicle reported within the liveness window.
    pub fn is_live(&self, system_id: u8, now: Instant) -> bool {
        self.vehicles
            .get(&system_id)
            .map(|v| v.connected(now))
            .unwrap_or(false)
    }

    /// Log entries, newest first, optionally filtered by system id.
    pub fn messages(&self, system_id: Option<u8>, limit: usize) -> Vec<LogMessage> {
        self.log
            .iter()
            .filter(|m| system_id.map(|id| m.system_id == id).unwrap_or(true))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Remove every record and log entry (transport teardown).
    pub fn clear(&mut self) {
        self.vehicles.clear();
        self.log.clear();
    }

    #[cfg(test)]
    fn backdate(&mut self, system_id: u8, by: Duration) {
        if let Some(v) = self.vehicles.get_mut(&system_id) {
            v.last_update -= by;
        }
    }
}
