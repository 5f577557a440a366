//! Autopilot parameter models

use serde::{Deserialize, Serialize};

/// Inferred storage class of a parameter value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    /// Value round-trips through an integer type on the autopilot
    Integer,
    /// IEEE-754 float32
    #[default]
    Float,
}

impl ParamKind {
    /// Infer the storage class from the MAV_PARAM_TYPE tag byte.
    ///
    /// Types 1-8 are the integer widths; 9/10 are real32/real64.
    pub fn from_type_tag(tag: u8) -> Self {
        match tag {
            1..=8 => ParamKind::Integer,
            _ => ParamKind::Float,
        }
    }
}

/// One named configuration value on the vehicle's autopilot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name, at most 16 characters, unique key
    pub name: String,
    pub value: f32,
    pub kind: ParamKind,
    /// Index of this parameter within the full list
    pub index: u16,
    /// Total parameter count declared by the vehicle
    pub total_count: u16,
}

/// Snapshot of the parameter registry and download progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterList {
    pub parameters: Vec<Parameter>,
    /// Declared total, 0 until the first counted value arrives
    pub total: u16,
    /// Distinct parameters received so far
    pub received: usize,
    /// True exactly when `received == total && total > 0`
    pub complete: bool,
}
