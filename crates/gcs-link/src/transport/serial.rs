//! Serial port transport
//!
//! Opens a named device at a baud rate. When the configuration carries a
//! VID/PID descriptor instead of a device path, the live port list is
//! consulted to resolve one. Reads happen on a dedicated blocking thread
//! that forwards chunks into the async event channel.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gcs_core::{SessionInfo, TransportKind};
use parking_lot::Mutex;
use serialport::{available_ports, SerialPort, SerialPortType};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{Transport, TransportError, TransportEvent};
use crate::config::SerialConfig;

const READ_TIMEOUT: Duration = Duration::from_millis(100);
const READ_CHUNK: usize = 1024;

pub struct SerialTransport {
    writer: Mutex<Box<dyn SerialPort>>,
    stop: Arc<AtomicBool>,
    endpoint: String,
}

impl SerialTransport {
    pub fn open(
        config: &SerialConfig,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Self, TransportError> {
        let path = resolve_path(config)?;
        let port = serialport::new(&path, config.baud_rate)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| TransportError::ConnectionFailed(format!("{path}: {e}")))?;
        let reader = port
            .try_clone()
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        info!(%path, baud = config.baud_rate, "Serial port opened");

        let stop = Arc::new(AtomicBool::new(false));
        spawn_reader(reader, events, stop.clone());

        Ok(Self {
            writer: Mutex::new(port),
            stop,
            endpoint: format!("{path}@{}", config.baud_rate),
        })
    }
}

fn resolve_path(config: &SerialConfig) -> Result<String, TransportError> {
    if let Some(path) = &config.path {
        return Ok(path.clone());
    }
    let Some(usb) = config.usb else {
        return Err(TransportError::InvalidConfig(
            "serial config needs a device path or a vid/pid descriptor".to_string(),
        ));
    };

    let ports = available_ports()
        .map_err(|e| TransportError::ConnectionFailed(format!("port enumeration: {e}")))?;
    ports
        .iter()
        .find(|p| {
            matches!(&p.port_type, SerialPortType::UsbPort(info)
                if info.vid == usb.vid && info.pid == usb.pid)
        })
        .map(|p| p.port_name.clone())
        .ok_or_else(|| {
            TransportError::DeviceNotFound(format!(
                "vid={:04x} pid={:04x}",
                usb.vid, usb.pid
            ))
        })
}

fn spawn_reader(
    mut port: Box<dyn SerialPort>,
    events: mpsc::Sender<TransportEvent>,
    stop: Arc<AtomicBool>,
) {
    std::thread::spawn(move || {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            if stop.load(Ordering::SeqCst) {
                break;
            }
            match port.read(&mut buf) {
                Ok(0) => {
                    let _ = events.blocking_send(TransportEvent::Closed);
                    break;
                }
                Ok(n) => {
                    if events
                        .blocking_send(TransportEvent::Data(buf[..n].to_vec()))
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => {
                    warn!(error = %e, "Serial read failed");
                    let _ = events.blocking_send(TransportEvent::Error(e.to_string()));
                    let _ = events.blocking_send(TransportEvent::Closed);
                    break;
                }
            }
        }
        debug!("Serial reader thread exited");
    });
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        self.writer
            .lock()
            .write_all(bytes)
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn shutdown(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    fn info(&self) -> SessionInfo {
        SessionInfo {
            kind: TransportKind::Serial,
            endpoint: self.endpoint.clone(),
        }
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}
