//! Transport layer errors

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("No serial device matches the descriptor: {0}")]
    DeviceNotFound(String),

    #[error("No remote peer known yet")]
    NoPeer,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<TransportError> for gcs_core::GcsError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::ConnectionFailed(msg) => gcs_core::GcsError::ConnectionFailed(msg),
            TransportError::InvalidConfig(msg) => gcs_core::GcsError::InvalidRequest(msg),
            TransportError::DeviceNotFound(msg) => gcs_core::GcsError::ConnectionFailed(msg),
            other => gcs_core::GcsError::Transport(other.to_string()),
        }
    }
}
