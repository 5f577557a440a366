//! Common error taxonomy for the telemetry core

use thiserror::Error;

/// Result type for core operations
pub type GcsResult<T> = Result<T, GcsError>;

/// Errors surfaced across the operation boundary
///
/// Request-level failures are returned as structured values; nothing in
/// the core panics across this boundary. The routing layer owns the
/// mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum GcsError {
    /// No transport session is currently open
    #[error("No active connection")]
    NotConnected,

    /// No vehicle record exists for the requested system id
    #[error("Unknown vehicle: system id {0}")]
    UnknownVehicle(u8),

    /// Vehicle exists but has not reported recently enough to command
    #[error("Vehicle {0} is not responding (no telemetry within 5s)")]
    VehicleNotResponding(u8),

    /// Transport/communication error
    #[error("Transport error: {0}")]
    Transport(String),

    /// Connect attempt failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Parameter set echoed a different value than requested
    #[error("Parameter {name} rejected: expected {expected}, vehicle reports {actual}")]
    ParameterMismatch {
        name: String,
        expected: f32,
        actual: f32,
    },

    /// Parameter set received no echo within the confirmation window
    #[error("Parameter {name} set timed out: expected {expected}, no response")]
    ParameterTimeout { name: String, expected: f32 },

    /// Invalid request from the caller
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GcsError {
    /// Expected/actual pair for parameter-set failures, when applicable.
    ///
    /// Lets the caller distinguish "rejected" (actual present) from
    /// "no response" (actual absent) without matching variants.
    pub fn parameter_outcome(&self) -> Option<(f32, Option<f32>)> {
        match self {
            GcsError::ParameterMismatch {
                expected, actual, ..
            } => Some((*expected, Some(*actual))),
            GcsError::ParameterTimeout { expected, .. } => Some((*expected, None)),
            _ => None,
        }
    }
}
