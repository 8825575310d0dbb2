//! The byte channel contract between the driver and a transport.

#[cfg(any(feature = "tcp", feature = "serial"))]
use std::io::{self, Read};

use crate::FiscalError;

/// A half-duplex byte channel to one device.
///
/// `read` blocks until at least one byte arrives or the transport timeout
/// elapses; a timeout surfaces as [`FiscalError::ReadTimeout`].
pub trait Channel: Send {
    /// Stable human-readable identity (`tcp://10.0.0.7:9100`,
    /// `serial:///dev/ttyUSB0@115200`). Used for logging and as the
    /// device-info cache key.
    fn descriptor(&self) -> &str;

    /// Read whatever bytes are available.
    fn read(&mut self) -> Result<Vec<u8>, FiscalError>;

    /// Write all of `data`.
    fn write(&mut self, data: &[u8]) -> Result<(), FiscalError>;
}

impl<C: Channel + ?Sized> Channel for Box<C> {
    fn descriptor(&self) -> &str {
        (**self).descriptor()
    }

    fn read(&mut self) -> Result<Vec<u8>, FiscalError> {
        (**self).read()
    }

    fn write(&mut self, data: &[u8]) -> Result<(), FiscalError> {
        (**self).write(data)
    }
}

/// Size of the stack buffer used by [`read_available`].
#[cfg(any(feature = "tcp", feature = "serial"))]
const READ_CHUNK: usize = 512;

/// One blocking read from an `io::Read` transport, mapping timeouts and EOF.
#[cfg(any(feature = "tcp", feature = "serial"))]
pub(crate) fn read_available(stream: &mut impl Read) -> Result<Vec<u8>, FiscalError> {
    let mut buf = [0u8; READ_CHUNK];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => return Err(FiscalError::ConnectionClosed),
            Ok(n) => return Ok(buf[..n].to_vec()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e)
                if e.kind() == io::ErrorKind::TimedOut || e.kind() == io::ErrorKind::WouldBlock =>
            {
                return Err(FiscalError::ReadTimeout);
            }
            Err(e) => return Err(FiscalError::ReadFailed(e)),
        }
    }
}
