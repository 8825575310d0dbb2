//! Serial transport (RS-232, USB-serial) using the `serialport` crate.
//!
//! Feature-gated behind the `serial` Cargo feature.

use std::io::Write;

use tracing::info;

use crate::channel::read_available;
use crate::{Channel, FiscalError, PrinterConfig};

/// Default baud rate of Bulgarian fiscal printers (115200 8N1).
pub const DEFAULT_BAUD: u32 = 115_200;

/// A fiscal printer connected over a serial port.
pub struct SerialChannel {
    port: Box<dyn serialport::SerialPort>,
    descriptor: String,
}

impl SerialChannel {
    /// Open a serial port at the given path and baud rate.
    ///
    /// * `path`: e.g. `/dev/ttyUSB0`, `COM3`.
    /// * `baud`: most devices ship at 115200; older Datecs and Daisy models use 9600.
    ///
    /// # Errors
    ///
    /// Returns `FiscalError::SerialError` if the port cannot be opened.
    pub fn open(path: &str, baud: u32, config: &PrinterConfig) -> Result<Self, FiscalError> {
        let port = serialport::new(path, baud)
            .timeout(config.timeouts.read)
            .open()
            .map_err(|e| FiscalError::SerialError(e.to_string()))?;
        info!(path, baud, "serial port opened");
        Ok(Self {
            port,
            descriptor: format!("serial://{path}@{baud}"),
        })
    }

    /// Open a serial port at [`DEFAULT_BAUD`].
    pub fn open_default(path: &str, config: &PrinterConfig) -> Result<Self, FiscalError> {
        Self::open(path, DEFAULT_BAUD, config)
    }

    /// List available serial port names on the system.
    ///
    /// Built without `libudev`; on Linux enumeration falls back to sysfs.
    pub fn list_ports() -> Vec<String> {
        serialport::available_ports()
            .unwrap_or_default()
            .into_iter()
            .map(|p| p.port_name)
            .collect()
    }
}

impl Channel for SerialChannel {
    fn descriptor(&self) -> &str {
        &self.descriptor
    }

    fn read(&mut self) -> Result<Vec<u8>, FiscalError> {
        read_available(&mut self.port)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), FiscalError> {
        self.port.write_all(data).map_err(FiscalError::WriteFailed)?;
        self.port.flush().map_err(FiscalError::WriteFailed)
    }
}
