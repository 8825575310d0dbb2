//! Bulgarian fiscal printer driver.
//!
//! Speaks the ISL, ISL-X, ICP and ZFP serial/TCP protocols of Datecs, Daisy,
//! Eltrade, Incotex, ISL and Tremol devices. The core API is synchronous,
//! with no async runtime required.
//!
//! ```no_run
//! use bgfp_driver::{Driver, DriverConfig, FiscalPrinter, TcpChannel};
//!
//! # fn main() -> Result<(), bgfp_driver::FiscalError> {
//! let config = DriverConfig::default();
//! let channel = TcpChannel::connect("192.168.1.50:4999", &config.printer)?;
//! let printer = Driver::new(config).detect(Box::new(channel))?;
//! println!("{}", printer.check_status().status);
//! # Ok(())
//! # }
//! ```

pub mod bytes;
pub mod commands;
pub mod cp1251;
pub mod frame;
pub mod model;
pub mod status;
pub mod validate;

#[cfg(feature = "tcp")]
mod addr;
mod channel;
mod config;
mod driver;
mod error;
mod link;
mod printer;
#[cfg(feature = "serial")]
mod serial;
#[cfg(feature = "tcp")]
mod tcp;

#[cfg(feature = "tcp")]
pub use addr::{DEFAULT_PORT, resolve_device_addr};
pub use bgfp_status::{DeviceStatus, Severity, StatusMessage, codes};
pub use channel::Channel;
pub use config::{DriverConfig, FrameRetries, PrinterConfig, PrinterTimeouts};
pub use driver::{Driver, InfoCache, VENDORS, Vendor, vendor};
pub use error::{ErrorKind, FiscalError};
pub use link::{Link, Response};
pub use printer::{BgFiscalPrinter, FiscalPrinter};
#[cfg(feature = "serial")]
pub use serial::{DEFAULT_BAUD, SerialChannel};
pub use status::StatusDecoder;
#[cfg(feature = "tcp")]
pub use tcp::TcpChannel;
