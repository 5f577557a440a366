//! Flight mode names
//!
//! Custom-mode numbers follow ArduPilot's per-airframe tables. The name
//! is derived from vehicle type + custom mode; unknown combinations fall
//! back to the raw number.

/// Airframe class inferred from MAV_TYPE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Airframe {
    Copter,
    Plane,
    Rover,
    Sub,
    Other,
}

impl Airframe {
    pub fn from_mav_type(vehicle_type: u8) -> Self {
        match vehicle_type {
            2 | 3 | 4 | 13 | 14 | 15 => Airframe::Copter,
            1 => Airframe::Plane,
            10 | 11 => Airframe::Rover,
            12 => Airframe::Sub,
            _ => Airframe::Other,
        }
    }

    /// Short human-readable airframe label for log messages.
    pub fn label(self) -> &'static str {
        match self {
            Airframe::Copter => "Copter",
            Airframe::Plane => "Plane",
            Airframe::Rover => "Rover",
            Airframe::Sub => "Sub",
            Airframe::Other => "Vehicle",
        }
    }
}

/// Derive the flight mode name from vehicle type and custom mode.
pub fn flight_mode_name(vehicle_type: u8, custom_mode: u32) -> String {
    let name = match Airframe::from_mav_type(vehicle_type) {
        Airframe::Copter => copter_mode(custom_mode),
        Airframe::Plane => plane_mode(custom_mode),
        Airframe::Rover | Airframe::Sub => rover_mode(custom_mode),
        Airframe::Other => None,
    };
    match name {
        Some(n) => n.to_string(),
        None => format!("Mode {custom_mode}"),
    }
}

fn copter_mode(mode: u32) -> Option<&'static str> {
    Some(match mode {
        0 => "Stabilize",
        1 => "Acro",
        2 => "AltHold",
        3 => "Auto",
        4 => "Guided",
        5 => "Loiter",
        6 => "RTL",
        7 => "Circle",
        9 => "Land",
        11 => "Drift",
        13 => "Sport",
        14 => "Flip",
        15 => "AutoTune",
        16 => "PosHold",
        17 => "Brake",
        18 => "Throw",
        20 => "Guided_NoGPS",
        21 => "Smart_RTL",
        _ => return None,
    })
}

fn plane_mode(mode: u32) -> Option<&'static str> {
    Some(match mode {
        0 => "Manual",
        1 => "Circle",
        2 => "Stabilize",
        3 => "Training",
        4 => "Acro",
        5 => "FBWA",
        6 => "FBWB",
        7 => "Cruise",
        8 => "AutoTune",
        10 => "Auto",
        11 => "RTL",
        12 => "Loiter",
        15 => "Guided",
        _ => return None,
    })
}

fn rover_mode(mode: u32) -> Option<&'static str> {
    Some(match mode {
        0 => "Manual",
        1 => "Acro",
        3 => "Steering",
        4 => "Hold",
        5 => "Loiter",
        6 => "Follow",
        7 => "Simple",
        10 => "Auto",
        11 => "RTL",
        12 => "SmartRTL",
        15 => "Guided",
        _ => return None,
    })
}
