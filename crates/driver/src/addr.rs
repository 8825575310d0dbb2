//! Device address resolution for TCP-attached fiscal printers.
//!
//! Accepts `IP`, `IP:PORT`, `hostname` and `hostname:PORT`; the port
//! defaults to [`DEFAULT_PORT`].

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

use crate::FiscalError;

/// Default raw TCP port of LAN fiscal printers and serial-to-LAN bridges.
pub const DEFAULT_PORT: u16 = 9100;

/// Resolve a user-provided address string to a `SocketAddr`.
///
/// Returns the first resolved address; empty input is rejected as
/// [`FiscalError::InvalidAddress`].
pub fn resolve_device_addr(input: &str) -> Result<SocketAddr, FiscalError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(FiscalError::InvalidAddress(input.to_string()));
    }

    let literal = input.parse::<SocketAddr>().ok().or_else(|| {
        input
            .parse::<IpAddr>()
            .ok()
            .map(|ip| SocketAddr::new(ip, DEFAULT_PORT))
    });
    if let Some(addr) = literal {
        return Ok(addr);
    }

    // `host:port` first, then a bare host on the default port
    first_addr(input)
        .or_else(|| first_addr((input, DEFAULT_PORT)))
        .ok_or_else(|| FiscalError::NoAddressFound(input.to_string()))
}

fn first_addr(target: impl ToSocketAddrs) -> Option<SocketAddr> {
    target.to_socket_addrs().ok()?.next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ip_with_port() {
        let addr = resolve_device_addr("192.168.0.40:4999").unwrap();
        assert_eq!(addr.ip().to_string(), "192.168.0.40");
        assert_eq!(addr.port(), 4999);
    }

    #[test]
    fn ip_without_port_uses_default() {
        let addr = resolve_device_addr("10.0.0.7").unwrap();
        assert_eq!(addr.port(), DEFAULT_PORT);
    }

    #[test]
    fn ipv6_forms() {
        assert_eq!(resolve_device_addr("[::1]:4999").unwrap().port(), 4999);
        let addr = resolve_device_addr("::1").unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), DEFAULT_PORT);
    }

    #[test]
    fn localhost_forms() {
        assert!(resolve_device_addr("localhost").unwrap().ip().is_loopback());
        assert_eq!(resolve_device_addr("localhost:4999").unwrap().port(), 4999);
    }

    #[test]
    fn empty_input_is_invalid() {
        match resolve_device_addr("  ").unwrap_err() {
            FiscalError::InvalidAddress(_) => {}
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unresolvable_hostname() {
        match resolve_device_addr("no-such-fiscal-printer.invalid").unwrap_err() {
            FiscalError::NoAddressFound(s) => assert_eq!(s, "no-such-fiscal-printer.invalid"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
