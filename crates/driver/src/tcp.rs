//! TCP transport for LAN-attached fiscal printers and serial-to-LAN bridges.

use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tracing::info;

use crate::addr::resolve_device_addr;
use crate::channel::read_available;
use crate::{Channel, FiscalError, PrinterConfig};

/// A synchronous TCP connection to a fiscal printer.
pub struct TcpChannel {
    stream: TcpStream,
    addr: SocketAddr,
    descriptor: String,
}

impl TcpChannel {
    /// Connect to a device at the given address.
    ///
    /// The address can be any format accepted by [`resolve_device_addr`].
    /// Configures TCP_NODELAY, TCP keepalive (60s) and the read/write
    /// timeouts from [`PrinterConfig`].
    pub fn connect(addr: &str, config: &PrinterConfig) -> Result<Self, FiscalError> {
        let socket_addr = resolve_device_addr(addr)?;
        let stream = open_stream(&socket_addr, config)?;
        info!(addr = %socket_addr, "connected");
        Ok(Self {
            stream,
            addr: socket_addr,
            descriptor: format!("tcp://{socket_addr}"),
        })
    }

    /// Return the resolved socket address.
    pub fn remote_addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Channel for TcpChannel {
    fn descriptor(&self) -> &str {
        &self.descriptor
    }

    fn read(&mut self) -> Result<Vec<u8>, FiscalError> {
        read_available(&mut self.stream)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), FiscalError> {
        self.stream
            .write_all(data)
            .map_err(FiscalError::WriteFailed)?;
        self.stream.flush().map_err(FiscalError::WriteFailed)
    }
}

impl Drop for TcpChannel {
    fn drop(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

// ── Helpers ────────────────────────────────────────────────────────────

fn open_stream(addr: &SocketAddr, config: &PrinterConfig) -> Result<TcpStream, FiscalError> {
    let stream = TcpStream::connect_timeout(addr, config.timeouts.connect).map_err(|e| {
        match e.kind() {
            io::ErrorKind::ConnectionRefused => FiscalError::ConnectionRefused {
                addr: addr.to_string(),
                source: e,
            },
            io::ErrorKind::TimedOut => FiscalError::ConnectionTimeout {
                addr: addr.to_string(),
                timeout: config.timeouts.connect,
                source: e,
            },
            _ => FiscalError::ConnectionFailed {
                addr: addr.to_string(),
                source: e,
            },
        }
    })?;

    configure_stream(&stream, config).map_err(|e| FiscalError::ConnectionFailed {
        addr: addr.to_string(),
        source: e,
    })?;
    Ok(stream)
}

fn configure_stream(stream: &TcpStream, config: &PrinterConfig) -> io::Result<()> {
    stream.set_nodelay(true)?;

    let keepalive = TcpKeepalive::new().with_time(Duration::from_secs(60));
    #[cfg(any(target_os = "linux", target_os = "macos"))]
    let keepalive = keepalive.with_interval(Duration::from_secs(60));
    SockRef::from(stream).set_tcp_keepalive(&keepalive)?;

    stream.set_write_timeout(Some(config.timeouts.write))?;
    stream.set_read_timeout(Some(config.timeouts.read))?;
    Ok(())
}
