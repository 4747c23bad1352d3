//! # Serial Communication Module
//!
//! Carries host link frames between the host computer and the bridge.
//!
//! This module handles:
//! - Opening the serial port (8N1, no flow control)
//! - Async reads of incoming request bytes
//! - Writing response frames
//! - Trying several device paths in order

use crate::error::{BridgeError, Result};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

/// Default host link baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Baud rates the bridge accepts
pub const SUPPORTED_BAUD_RATES: &[u32] = &[9_600, 19_200, 38_400, 57_600, 115_200];

/// Default device paths to try (in order of preference)
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-serial adapters
    "/dev/ttyACM0", // USB CDC devices
];

/// Configured device first, then the remaining default paths
pub fn device_candidates(configured: &str) -> Vec<&str> {
    let mut paths = vec![configured];
    paths.extend(DEFAULT_DEVICE_PATHS.iter().copied().filter(|p| *p != configured));
    paths
}

/// Host link serial port
///
/// Generic over the byte stream so tests can substitute an in-memory one.
pub struct HostSerial<S = tokio_serial::SerialStream> {
    /// Underlying stream
    port: S,
    /// Device path (e.g., /dev/ttyUSB0)
    device_path: String,
}

impl<S> std::fmt::Debug for HostSerial<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl HostSerial<tokio_serial::SerialStream> {
    /// Open the host link on `path`
    ///
    /// # Errors
    ///
    /// Returns error if the port cannot be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rc_rf_bridge::serial::{HostSerial, DEFAULT_BAUD_RATE};
    ///
    /// fn main() -> anyhow::Result<()> {
    ///     let serial = HostSerial::open("/dev/ttyUSB0", DEFAULT_BAUD_RATE)?;
    ///     println!("Listening on {}", serial.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        Self::open_with_paths(&[path], baud_rate)
    }

    /// Open the first device in `paths` that can be opened
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyUSB0"])
    /// * `baud_rate` - Line speed
    ///
    /// # Returns
    ///
    /// * `Result<HostSerial>` - Connected serial port or error
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened host link at {} ({} baud)", path, baud_rate);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(BridgeError::SerialPortNotFound(paths.join(", ")))
    }

    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| BridgeError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> HostSerial<S> {
    /// Wrap an already open stream
    pub fn from_stream(port: S, device_path: impl Into<String>) -> Self {
        Self {
            port,
            device_path: device_path.into(),
        }
    }

    /// Read whatever bytes are available into `buf`
    ///
    /// # Returns
    ///
    /// * `Result<usize>` - Number of bytes read; 0 means the port closed
    pub async fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self
            .port
            .read(buf)
            .await
            .map_err(|e| BridgeError::Serial(format!("Failed to read from {}: {}", self.device_path, e)))?;

        if n > 0 {
            debug!("Received {} bytes", n);
        }
        Ok(n)
    }

    /// Write a response frame and flush it
    pub async fn send_response(&mut self, frame: &[u8]) -> Result<()> {
        self.port
            .write_all(frame)
            .await
            .map_err(|e| BridgeError::Serial(format!("Failed to write response: {}", e)))?;

        self.port
            .flush()
            .await
            .map_err(|e| BridgeError::Serial(format!("Failed to flush serial port: {}", e)))?;

        debug!("Sent response ({} bytes)", frame.len());
        Ok(())
    }

    /// Write a response frame, giving up after `limit`
    ///
    /// # Errors
    ///
    /// Returns a serial error if the write fails or does not finish in time
    pub async fn send_response_within(&mut self, frame: &[u8], limit: Duration) -> Result<()> {
        match tokio::time::timeout(limit, self.send_response(frame)).await {
            Ok(result) => result,
            Err(_) => Err(BridgeError::Serial(format!(
                "Response write to {} timed out after {}ms",
                self.device_path,
                limit.as_millis()
            ))),
        }
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}
