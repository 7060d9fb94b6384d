//! Serial port transport for instrument communication.
//!
//! This module provides [`SerialTransport`], which implements the
//! line-oriented [`Transport`] trait for USB virtual COM ports and physical
//! RS-232 connections, and [`SerialConnector`], which discovers ports and
//! opens them.
//!
//! # Example
//!
//! ```no_run
//! use rfctl_core::transport::Transport;
//! use rfctl_transport::SerialTransport;
//! use std::time::Duration;
//!
//! # async fn example() -> rfctl_core::Result<()> {
//! let mut transport =
//!     SerialTransport::open("/dev/ttyUSB0", 115_200, Duration::from_secs(1)).await?;
//!
//! transport.send(b"STATUS?\r\n").await?;
//! if let Some(line) = transport.try_read_line().await? {
//!     println!("{line}");
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialPortType, SerialStream};

use rfctl_core::error::{Error, Result};
use rfctl_core::transport::{Connector, Transport};
use rfctl_core::types::{Endpoint, LinkSettings};
use rfctl_line_io::LineDecoder;

pub use tokio_serial::{DataBits, FlowControl, Parity, StopBits};

/// Serial framing configuration.
///
/// Line rate and timeout come from [`LinkSettings`]; these are the
/// remaining port parameters, in `tokio-serial`'s own types. Defaults
/// (8N1, no flow control) suit most instruments with a USB-serial bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialConfig {
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub flow_control: FlowControl,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::None,
        }
    }
}

/// Map an I/O error on an open port to the transport error taxonomy.
fn classify_io(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::BrokenPipe || e.kind() == std::io::ErrorKind::NotConnected
    {
        Error::ConnectionLost
    } else {
        Error::Io(e)
    }
}

/// Serial port transport speaking newline-terminated text.
pub struct SerialTransport {
    /// The underlying serial port stream
    port: Option<SerialStream>,
    /// Port name for logging/debugging
    port_name: String,
    /// Bound on each write and each read of waiting bytes
    timeout: Duration,
    /// Bytes received but not yet returned as lines
    decoder: LineDecoder,
}

impl SerialTransport {
    /// Open a serial port at `baud_rate` with 8N1 framing.
    ///
    /// # Arguments
    ///
    /// * `port` - Serial port path (e.g., "/dev/ttyUSB0" on Linux, "COM3" on Windows)
    /// * `baud_rate` - Line rate (e.g., 9600, 115200)
    /// * `timeout` - Upper bound on each write and read
    pub async fn open(port: &str, baud_rate: u32, timeout: Duration) -> Result<Self> {
        let settings = LinkSettings { baud_rate, timeout };
        Self::open_with_config(port, &settings, &SerialConfig::default()).await
    }

    /// Open a serial port with full configuration control.
    pub async fn open_with_config(
        port: &str,
        settings: &LinkSettings,
        config: &SerialConfig,
    ) -> Result<Self> {
        tracing::debug!(
            port,
            baud_rate = settings.baud_rate,
            timeout_ms = settings.timeout.as_millis(),
            framing = ?config,
            "opening serial port"
        );

        let serial_stream = tokio_serial::new(port, settings.baud_rate)
            .data_bits(config.data_bits)
            .stop_bits(config.stop_bits)
            .parity(config.parity)
            .flow_control(config.flow_control)
            .timeout(settings.timeout)
            .open_native_async()
            .map_err(|e| {
                tracing::error!(port = %port, error = %e, "Failed to open serial port");
                Error::Transport(e.to_string())
            })?;

        tracing::info!(port = %port, baud_rate = settings.baud_rate, "serial port open");

        Ok(Self {
            port: Some(serial_stream),
            port_name: port.to_string(),
            timeout: settings.timeout,
            decoder: LineDecoder::new(),
        })
    }

    /// Get the name of the serial port.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        tracing::trace!(
            port = %self.port_name,
            bytes = data.len(),
            data = ?String::from_utf8_lossy(data),
            "Sending data"
        );

        let write = async {
            port.write_all(data).await?;
            port.flush().await
        };

        match tokio::time::timeout(self.timeout, write).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                tracing::error!(port = %self.port_name, error = %e, "Failed to send data");
                Err(classify_io(e))
            }
            Err(_) => {
                tracing::warn!(
                    port = %self.port_name,
                    timeout_ms = self.timeout.as_millis(),
                    "Write timed out"
                );
                Err(Error::Timeout)
            }
        }
    }

    async fn try_read_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.decoder.next_line() {
            return Ok(Some(line));
        }

        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        // Only touch the stream when the OS already holds bytes, so this
        // call never parks waiting for the instrument.
        let waiting = port
            .bytes_to_read()
            .map_err(|e| Error::Transport(e.to_string()))? as usize;
        if waiting == 0 {
            return Ok(None);
        }

        let mut buf = vec![0u8; waiting.min(4096)];
        let n = match tokio::time::timeout(self.timeout, port.read(&mut buf)).await {
            Ok(Ok(0)) => return Err(Error::ConnectionLost),
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                tracing::error!(port = %self.port_name, error = %e, "Failed to receive data");
                return Err(classify_io(e));
            }
            Err(_) => return Ok(None),
        };

        tracing::trace!(
            port = %self.port_name,
            bytes = n,
            data = ?String::from_utf8_lossy(&buf[..n]),
            "Received data"
        );

        if !self.decoder.push(&buf[..n]) {
            tracing::warn!(port = %self.port_name, "line buffer overflow, resetting");
        }
        Ok(self.decoder.next_line())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut port) = self.port.take() {
            tracing::debug!(port = %self.port_name, "Closing serial port");
            self.decoder.clear();

            if let Err(e) = port.flush().await {
                tracing::warn!(
                    port = %self.port_name,
                    error = %e,
                    "Failed to flush before closing (continuing anyway)"
                );
            }

            // The port is closed when dropped here.
            tracing::info!(port = %self.port_name, "Serial port closed");
        }

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if self.port.is_some() {
            tracing::debug!(port = %self.port_name, "SerialTransport dropped, closing port");
        }
    }
}

/// Discovers serial ports and opens [`SerialTransport`]s on them.
#[derive(Debug, Clone, Default)]
pub struct SerialConnector {
    config: SerialConfig,
}

impl SerialConnector {
    /// A connector using 8N1 framing.
    pub fn new() -> Self {
        Self::default()
    }

    /// A connector using custom framing.
    pub fn with_config(config: SerialConfig) -> Self {
        SerialConnector { config }
    }
}

/// Human-readable description of a discovered port, for logging.
fn describe_port(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => format!(
            "USB {:04x}:{:04x} {}",
            usb.vid,
            usb.pid,
            usb.product.as_deref().unwrap_or("")
        ),
        SerialPortType::PciPort => "PCI".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        SerialPortType::Unknown => "unknown".to_string(),
    }
}

#[async_trait]
impl Connector for SerialConnector {
    async fn discover(&self) -> Vec<Endpoint> {
        // Port enumeration reads sysfs / the registry; keep it off the
        // async worker threads.
        let ports = tokio::task::spawn_blocking(tokio_serial::available_ports).await;

        match ports {
            Ok(Ok(ports)) => ports
                .into_iter()
                .map(|p| {
                    tracing::debug!(
                        port = %p.port_name,
                        kind = %describe_port(&p.port_type),
                        "Discovered serial port"
                    );
                    Endpoint::new(p.port_name)
                })
                .collect(),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Serial port enumeration failed");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Serial port enumeration task failed");
                Vec::new()
            }
        }
    }

    async fn open(
        &self,
        endpoint: &Endpoint,
        settings: &LinkSettings,
    ) -> Result<Box<dyn Transport>> {
        let transport =
            SerialTransport::open_with_config(endpoint.as_str(), settings, &self.config).await?;
        Ok(Box::new(transport))
    }
}
