//! System log message models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse message category derived from the wire severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Error,
    Warning,
    Notice,
    Info,
}

impl Severity {
    /// Map a MAVLink STATUSTEXT severity (0 = highest .. 7 = lowest).
    ///
    /// Emergency/alert/critical collapse into one category; debug is
    /// reported as plain info.
    pub fn from_wire(severity: u8) -> Self {
        match severity {
            0..=2 => Severity::Critical,
            3 => Severity::Error,
            4 => Severity::Warning,
            5 => Severity::Notice,
            _ => Severity::Info,
        }
    }
}

/// One entry in the bounded system log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogMessage {
    /// System id the message concerns (0 for link-level messages)
    pub system_id: u8,
    /// Raw wire severity, 0 = highest priority
    pub severity: u8,
    /// Derived category
    pub kind: Severity,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl LogMessage {
    /// Build an entry from a decoded status-text payload.
    pub fn from_wire(system_id: u8, severity: u8, text: impl Into<String>) -> Self {
        Self {
            system_id,
            severity,
            kind: Severity::from_wire(severity),
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Build a notice-level entry generated by the core itself.
    pub fn notice(system_id: u8, text: impl Into<String>) -> Self {
        Self {
            system_id,
            severity: 5,
            kind: Severity::Notice,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Capacity of the system log ring buffer
pub const LOG_BUFFER_CAPACITY: usize = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_mapping_covers_wire_range() {
        assert_eq!(Severity::from_wire(0), Severity::Critical);
        assert_eq!(Severity::from_wire(2), Severity::Critical);
        assert_eq!(Severity::from_wire(3), Severity::Error);
        assert_eq!(Severity::from_wire(4), Severity::Warning);
        assert_eq!(Severity::from_wire(5), Severity::Notice);
        assert_eq!(Severity::from_wire(6), Severity::Info);
        assert_eq!(Severity::from_wire(7), Severity::Info);
    }
}
