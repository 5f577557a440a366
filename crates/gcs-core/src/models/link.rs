//! Connection session models

use serde::{Deserialize, Serialize};

/// Kind of transport carrying the protocol stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    Serial,
    TcpClient,
    TcpServer,
    Udp,
    Mock,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransportKind::Serial => "serial",
            TransportKind::TcpClient => "tcp-client",
            TransportKind::TcpServer => "tcp-server",
            TransportKind::Udp => "udp",
            TransportKind::Mock => "mock",
        };
        f.write_str(s)
    }
}

/// Description of the one active transport session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub kind: TransportKind,
    /// Human-readable endpoint (device path, host:port, bind address)
    pub endpoint: String,
}

/// Aggregate link status returned by the status operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkStatus {
    /// Whether a transport session is open
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Declared parameter total (0 until known)
    pub parameters_total: u16,
    /// Parameters received so far
    pub parameters_received: usize,
    /// Whether the parameter download has finished
    pub parameters_complete: bool,
}
