//! Link configuration
//!
//! Transport selection and per-kind settings. The persisted profile
//! store lives outside this core; callers hand a fully formed
//! [`TransportConfig`] to `connect`.

use serde::{Deserialize, Serialize};

/// Transport selection, tagged for profile serialization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TransportConfig {
    /// Serial device at a baud rate
    Serial(SerialConfig),
    /// Outbound TCP connection to an autopilot or bridge
    TcpClient(TcpClientConfig),
    /// Listening TCP endpoint accepting one peer
    TcpServer(TcpServerConfig),
    /// Bound UDP socket with an explicit or learned remote peer
    Udp(UdpConfig),
    /// In-memory transport for testing
    Mock(MockConfig),
}

/// Serial port configuration.
///
/// Either `path` names the device directly, or `usb` describes it by
/// VID/PID and the device list is consulted at connect time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Device path (e.g. "/dev/ttyACM0"); resolved from `usb` if absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// USB vendor/product descriptor used when `path` is not given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usb: Option<UsbDescriptor>,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// USB vendor/product id pair identifying a serial device
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UsbDescriptor {
    pub vid: u16,
    pub pid: u16,
}

fn default_baud_rate() -> u32 {
    57600
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpClientConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpServerConfig {
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UdpConfig {
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
    #[serde(default = "default_udp_port")]
    pub bind_port: u16,
    /// Remote "host:port"; learned from the first inbound datagram when
    /// not configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_udp_port() -> u16 {
    14550
}

/// Mock transport configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MockConfig {}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn transport_config_round_trips_through_json() {
        let json = r#"{"type":"udp","bind_port":14551,"remote":"10.0.0.2:14550"}"#;
        let cfg: TransportConfig = serde_json::from_str(json).unwrap();
        match cfg {
            TransportConfig::Udp(udp) => {
                assert_eq!(udp.bind_host, "0.0.0.0");
                assert_eq!(udp.bind_port, 14551);
                assert_eq!(udp.remote.as_deref(), Some("10.0.0.2:14550"));
            }
            other => panic!("expected udp config, got {other:?}"),
        }
    }

    #[test]
    fn serial_config_defaults_baud_rate() {
        let json = r#"{"type":"serial","usb":{"vid":4617,"pid":4104}}"#;
        let cfg: TransportConfig = serde_json::from_str(json).unwrap();
        match cfg {
            TransportConfig::Serial(s) => {
                assert_eq!(s.baud_rate, 57600);
                assert!(s.path.is_none());
                assert_eq!(s.usb.unwrap().vid, 4617);
            }
            other => panic!("expected serial config, got {other:?}"),
        }
    }
}
