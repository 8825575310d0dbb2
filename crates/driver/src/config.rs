//! Configuration types for the driver.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::FiscalError;
use crate::model::{Credentials, PaymentType};

/// Transport and framing settings for one device connection.
#[non_exhaustive]
#[derive(Debug, Clone, Default)]
pub struct PrinterConfig {
    /// Transport timeout settings.
    pub timeouts: PrinterTimeouts,
    /// Bounded protocol-level retries.
    pub retries: FrameRetries,
    /// Log every request and response frame as hex at `debug` level.
    pub trace_io: bool,
}

/// Timeout settings for device connections.
///
/// Defaults suit serial and LAN-attached fiscal printers:
/// - `connect`: 5s
/// - `write`: 2s
/// - `read`: 2s per read call; the device sends SYN keep-alives while busy
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct PrinterTimeouts {
    /// Maximum time to wait for a TCP connection to establish.
    pub connect: Duration,
    /// Maximum time to wait for a write to complete.
    pub write: Duration,
    /// Maximum time a single read may block.
    pub read: Duration,
}

impl Default for PrinterTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            write: Duration::from_secs(2),
            read: Duration::from_secs(2),
        }
    }
}

/// Bounded retries of the frame exchange.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct FrameRetries {
    /// How many times a request is written before giving up (NAK or silence).
    pub max_write_retries: u32,
    /// How many reads are made per write while waiting for the answer frame.
    pub max_read_retries: u32,
    /// How many ZFP ping attempts are made before declaring a timeout.
    pub max_ping_retries: u32,
}

impl Default for FrameRetries {
    fn default() -> Self {
        Self {
            max_write_retries: 6,
            max_read_retries: 200,
            max_ping_retries: 6,
        }
    }
}

/// Driver-wide settings: connection config, payment code remapping,
/// detection cache lifetime and default operator.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Settings applied to every device connection.
    pub printer: PrinterConfig,
    /// Overrides of vendor payment codes (`RemapPaymentTypes`).
    pub payment_types: BTreeMap<PaymentType, String>,
    /// Lifetime of cached device-info probes.
    pub info_cache_ttl: Duration,
    /// Operator used when a request carries empty credentials.
    pub default_operator: Option<Credentials>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            printer: PrinterConfig::default(),
            payment_types: BTreeMap::new(),
            info_cache_ttl: Duration::from_secs(30),
            default_operator: None,
        }
    }
}

impl DriverConfig {
    /// Check value ranges. Called by [`DriverConfig::from_json_str`].
    pub fn validate(&self) -> Result<(), FiscalError> {
        let retries = &self.printer.retries;
        if retries.max_write_retries == 0 {
            return Err(invalid("retries.max_write_retries", "must be at least 1"));
        }
        if retries.max_read_retries == 0 {
            return Err(invalid("retries.max_read_retries", "must be at least 1"));
        }
        if retries.max_ping_retries == 0 {
            return Err(invalid("retries.max_ping_retries", "must be at least 1"));
        }
        let timeouts = &self.printer.timeouts;
        if timeouts.read.is_zero() || timeouts.write.is_zero() || timeouts.connect.is_zero() {
            return Err(invalid("timeouts", "must be greater than zero"));
        }
        for (payment_type, code) in &self.payment_types {
            if matches!(payment_type, PaymentType::Unspecified | PaymentType::Change) {
                return Err(invalid(
                    "payment_types",
                    &format!("{payment_type:?} cannot be remapped"),
                ));
            }
            if code.is_empty() || code.chars().count() > 2 {
                return Err(invalid(
                    "payment_types",
                    &format!("code for {payment_type:?} must be 1-2 characters, got {code:?}"),
                ));
            }
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> FiscalError {
    FiscalError::InvalidConfig(format!("{field}: {reason}"))
}

// ── JSON loading ────────────────────────────────────────────────────────

#[cfg(feature = "serde")]
mod file {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use serde::Deserialize;

    use super::{DriverConfig, FrameRetries, PrinterTimeouts};
    use crate::FiscalError;
    use crate::model::{Credentials, PaymentType};

    #[derive(Debug, Default, Deserialize)]
    #[serde(default, deny_unknown_fields)]
    struct ConfigFile {
        timeouts: TimeoutsFile,
        retries: RetriesFile,
        trace_io: bool,
        payment_types: BTreeMap<PaymentType, String>,
        info_cache_ttl_secs: Option<u64>,
        default_operator: Option<Credentials>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default, deny_unknown_fields)]
    struct TimeoutsFile {
        connect_ms: Option<u64>,
        write_ms: Option<u64>,
        read_ms: Option<u64>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default, deny_unknown_fields)]
    struct RetriesFile {
        max_write_retries: Option<u32>,
        max_read_retries: Option<u32>,
        max_ping_retries: Option<u32>,
    }

    impl DriverConfig {
        /// Parse and validate a JSON configuration document.
        ///
        /// Missing fields keep their defaults:
        ///
        /// ```json
        /// {
        ///   "timeouts": { "read_ms": 1500 },
        ///   "retries": { "max_write_retries": 3 },
        ///   "payment_types": { "card": "D" },
        ///   "info_cache_ttl_secs": 30,
        ///   "default_operator": { "operator": "1", "operatorPassword": "0000" }
        /// }
        /// ```
        pub fn from_json_str(text: &str) -> Result<Self, FiscalError> {
            let file: ConfigFile = serde_json::from_str(text)
                .map_err(|e| FiscalError::InvalidConfig(format!("invalid JSON: {e}")))?;

            let mut config = DriverConfig::default();
            let defaults = PrinterTimeouts::default();
            config.printer.timeouts = PrinterTimeouts {
                connect: file
                    .timeouts
                    .connect_ms
                    .map_or(defaults.connect, Duration::from_millis),
                write: file
                    .timeouts
                    .write_ms
                    .map_or(defaults.write, Duration::from_millis),
                read: file
                    .timeouts
                    .read_ms
                    .map_or(defaults.read, Duration::from_millis),
            };
            let defaults = FrameRetries::default();
            config.printer.retries = FrameRetries {
                max_write_retries: file
                    .retries
                    .max_write_retries
                    .unwrap_or(defaults.max_write_retries),
                max_read_retries: file
                    .retries
                    .max_read_retries
                    .unwrap_or(defaults.max_read_retries),
                max_ping_retries: file
                    .retries
                    .max_ping_retries
                    .unwrap_or(defaults.max_ping_retries),
            };
            config.printer.trace_io = file.trace_io;
            config.payment_types = file.payment_types;
            if let Some(secs) = file.info_cache_ttl_secs {
                config.info_cache_ttl = Duration::from_secs(secs);
            }
            config.default_operator = file.default_operator;

            config.validate()?;
            Ok(config)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn empty_document_gives_defaults() {
            let config = DriverConfig::from_json_str("{}").unwrap();
            assert_eq!(config.printer.retries.max_write_retries, 6);
            assert_eq!(config.printer.retries.max_read_retries, 200);
            assert_eq!(config.info_cache_ttl, Duration::from_secs(30));
            assert!(config.payment_types.is_empty());
        }

        #[test]
        fn overrides_are_applied() {
            let config = DriverConfig::from_json_str(
                r#"{
                    "timeouts": { "read_ms": 1500 },
                    "retries": { "max_write_retries": 3 },
                    "trace_io": true,
                    "payment_types": { "card": "D" },
                    "info_cache_ttl_secs": 5,
                    "default_operator": { "operator": "2", "operatorPassword": "1234" }
                }"#,
            )
            .unwrap();
            assert_eq!(config.printer.timeouts.read, Duration::from_millis(1500));
            assert_eq!(config.printer.retries.max_write_retries, 3);
            assert!(config.printer.trace_io);
            assert_eq!(config.payment_types[&PaymentType::Card], "D");
            assert_eq!(config.info_cache_ttl, Duration::from_secs(5));
            assert_eq!(config.default_operator.unwrap().operator, "2");
        }

        #[test]
        fn zero_retries_rejected() {
            let err =
                DriverConfig::from_json_str(r#"{"retries":{"max_read_retries":0}}"#).unwrap_err();
            match err {
                FiscalError::InvalidConfig(msg) => assert!(msg.contains("max_read_retries")),
                other => panic!("expected InvalidConfig, got {:?}", other),
            }
        }

        #[test]
        fn change_cannot_be_remapped() {
            let err =
                DriverConfig::from_json_str(r#"{"payment_types":{"change":"X"}}"#).unwrap_err();
            assert!(matches!(err, FiscalError::InvalidConfig(_)));
        }

        #[test]
        fn unknown_fields_rejected() {
            assert!(DriverConfig::from_json_str(r#"{"baud": 9600}"#).is_err());
            assert!(DriverConfig::from_json_str("not json").is_err());
        }
    }
}
