//! Typed error types for the fiscal printer driver.

use std::borrow::Cow;
use std::io;
use std::time::Duration;

use bgfp_status::{DeviceStatus, codes};

/// Driver error conditions, categorized by concern.
///
/// Errors stay inside the driver: the [`FiscalPrinter`](crate::FiscalPrinter)
/// methods turn them into a [`DeviceStatus`] with [`FiscalError::to_status()`].
/// Only connecting and detecting return them to the caller directly.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FiscalError {
    // -- Connection --
    /// The device actively refused the connection.
    #[error("connection refused: {addr}")]
    ConnectionRefused {
        /// The address that was attempted.
        addr: String,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// TCP connect timed out before the device responded.
    #[error("connection timed out: {addr} ({timeout:?})")]
    ConnectionTimeout {
        /// The address that was attempted.
        addr: String,
        /// The configured timeout that elapsed.
        timeout: Duration,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Connection failed for a reason other than refusal or timeout.
    #[error("connection failed: {addr}")]
    ConnectionFailed {
        /// The address that was attempted.
        addr: String,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The device closed the connection unexpectedly.
    #[error("connection closed by device")]
    ConnectionClosed,

    // -- Address --
    /// The provided address string could not be parsed.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// DNS resolution found no addresses for the given hostname.
    #[error("no address found for hostname: {0}")]
    NoAddressFound(String),

    // -- I/O --
    /// Writing to the channel failed.
    #[error("write failed: {0}")]
    WriteFailed(#[source] io::Error),

    /// Reading from the channel failed.
    #[error("read failed: {0}")]
    ReadFailed(#[source] io::Error),

    /// The channel timed out waiting for bytes.
    #[error("read timed out waiting for response")]
    ReadTimeout,

    /// A serial port transport error occurred.
    #[error("serial port error: {0}")]
    SerialError(String),

    // -- Framing --
    /// A response frame violated the family's marker layout.
    #[error("malformed response frame: {details}")]
    MalformedFrame {
        /// Human-readable description of the parsing failure.
        details: String,
    },

    /// The checksum carried by a response frame does not match its content.
    #[error("checksum does not match (expected {expected:#06X}, got {actual:#06X})")]
    ChecksumMismatch {
        /// Checksum computed over the received bytes.
        expected: u16,
        /// Checksum carried by the frame.
        actual: u16,
    },

    /// A frame (request or response) is larger than the protocol allows.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge {
        /// Actual size in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max: usize,
    },

    /// A sub-slice was requested with `from > to` or past the buffer end.
    #[error("invalid range {from}..{to} for buffer of {len} bytes")]
    Range {
        /// Start index.
        from: usize,
        /// End index (exclusive).
        to: usize,
        /// Buffer length.
        len: usize,
    },

    /// The first response byte was 0x00.
    #[error("not a fiscal device or line speed mismatch")]
    NotFiscalDevice,

    /// No answer frame arrived after all write retries.
    #[error("no response after {attempts} attempts")]
    NoResponse {
        /// Number of times the request was written.
        attempts: u32,
    },

    /// A response parsed as a frame but its payload is not what the command returns.
    #[error("unexpected response: {details}")]
    UnexpectedResponse {
        /// Human-readable description of the mismatch.
        details: String,
    },

    // -- Device --
    /// The device reported a blocking condition outside a status field
    /// (e.g. the ZFP ping handshake).
    #[error("{text}")]
    DeviceReported {
        /// Standardized status code.
        code: Cow<'static, str>,
        /// Device condition text.
        text: String,
    },

    // -- Command --
    /// A domain value has no representation on this device.
    #[error("{text}")]
    UnsupportedValue {
        /// Standardized status code (`E406`, `E411`, ...).
        code: &'static str,
        /// Human-readable description.
        text: String,
    },

    // -- Deadline --
    /// The caller-supplied deadline expired before the request was sent.
    #[error("user timeout")]
    UserTimeout,

    // -- Validation --
    /// Input failed business validation.
    #[error("{text}")]
    Validation {
        /// Standardized status code.
        code: &'static str,
        /// Human-readable description.
        text: String,
    },

    // -- Configuration --
    /// An invalid configuration was provided.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The device is not handled by the requested driver.
    #[error("unsupported device: {0}")]
    UnsupportedDevice(String),
}

/// Closed error taxonomy used by callers that branch on the error class.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection, address or byte I/O failure.
    Transport,
    /// Malformed, corrupted or missing response frame.
    Framing,
    /// A domain value the device cannot represent.
    UnsupportedValue,
    /// The device reported a blocking condition.
    DeviceReported,
    /// The caller deadline expired.
    Timeout,
    /// Business validation failed.
    Validation,
    /// Invalid configuration or unsupported device.
    Configuration,
}

impl FiscalError {
    /// The taxonomy class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FiscalError::ConnectionRefused { .. }
            | FiscalError::ConnectionTimeout { .. }
            | FiscalError::ConnectionFailed { .. }
            | FiscalError::ConnectionClosed
            | FiscalError::InvalidAddress(_)
            | FiscalError::NoAddressFound(_)
            | FiscalError::WriteFailed(_)
            | FiscalError::ReadFailed(_)
            | FiscalError::ReadTimeout
            | FiscalError::SerialError(_) => ErrorKind::Transport,
            FiscalError::MalformedFrame { .. }
            | FiscalError::ChecksumMismatch { .. }
            | FiscalError::FrameTooLarge { .. }
            | FiscalError::Range { .. }
            | FiscalError::NotFiscalDevice
            | FiscalError::NoResponse { .. }
            | FiscalError::UnexpectedResponse { .. } => ErrorKind::Framing,
            FiscalError::DeviceReported { .. } => ErrorKind::DeviceReported,
            FiscalError::UnsupportedValue { .. } => ErrorKind::UnsupportedValue,
            FiscalError::UserTimeout => ErrorKind::Timeout,
            FiscalError::Validation { .. } => ErrorKind::Validation,
            FiscalError::InvalidConfig(_) | FiscalError::UnsupportedDevice(_) => {
                ErrorKind::Configuration
            }
        }
    }

    /// The standardized status code for this error.
    pub fn code(&self) -> &str {
        match self {
            FiscalError::ReadTimeout | FiscalError::ConnectionTimeout { .. } => {
                codes::TRANSPORT_TIMEOUT
            }
            FiscalError::NotFiscalDevice => codes::NOT_FISCAL_DEVICE,
            FiscalError::NoResponse { .. } => codes::NO_RESPONSE,
            FiscalError::MalformedFrame { .. }
            | FiscalError::ChecksumMismatch { .. }
            | FiscalError::FrameTooLarge { .. }
            | FiscalError::Range { .. }
            | FiscalError::UnexpectedResponse { .. } => codes::INVALID_RESPONSE,
            FiscalError::DeviceReported { code, .. } => code.as_ref(),
            FiscalError::UnsupportedValue { code, .. } | FiscalError::Validation { code, .. } => {
                *code
            }
            FiscalError::UserTimeout => codes::USER_TIMEOUT,
            FiscalError::InvalidConfig(_) => codes::INVALID_CONFIG,
            FiscalError::UnsupportedDevice(_) => codes::UNSUPPORTED_DEVICE,
            _ => codes::COMMUNICATION_ERROR,
        }
    }

    /// Convert into a single-error [`DeviceStatus`].
    pub fn to_status(&self) -> DeviceStatus {
        DeviceStatus::from_error(self.code().to_owned(), self.to_string())
    }

    /// Returns `true` for connection and byte I/O failures.
    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }
}
