//! Vendor registry, device-info cache, connect and detect.

use std::borrow::Cow;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info};

use bgfp_status::codes;

use crate::commands::{
    CommandOptions, CommandSet, DAISY_ISL, DATECS_C_ISL, DatecsXCommands, ELTRADE_ISL,
    INCOTEX_ISL, IcpCommands, IslCommands, ZfpCommands,
};
use crate::frame::{Family, FrameCodec, IcpCodec, IslCodec, IslxCodec, ZfpCodec};
use crate::link::Link;
use crate::model::{Credentials, DeviceInfo};
use crate::printer::BgFiscalPrinter;
use crate::status::{
    DAISY, DATECS_C, DATECS_X, ELTRADE, INCOTEX, IcpStatusDecoder, TremolStatusDecoder,
};
use crate::{Channel, DriverConfig, FiscalError, StatusDecoder};

// ── Vendors ─────────────────────────────────────────────────────────────

/// One supported device line: protocol, status table, command set and limits.
pub struct Vendor {
    /// Driver id, e.g. `bg.dt.c.isl`.
    pub id: &'static str,
    /// Manufacturer name.
    pub manufacturer: &'static str,
    /// Two-letter prefix every serial number of this vendor starts with.
    pub serial_prefix: &'static str,
    /// Wire protocol.
    pub family: Family,
    /// Maximum characters of an item name.
    pub item_text_max_length: usize,
    /// Maximum characters of a comment line.
    pub comment_text_max_length: usize,
    /// Maximum characters of an operator password.
    pub operator_password_max_length: usize,
    /// Operator used when neither the request nor the config names one.
    pub default_operator: (&'static str, &'static str),
    /// The device prints reversal receipts.
    pub supports_reversal: bool,
    codec: &'static dyn FrameCodec,
    decoder: &'static dyn StatusDecoder,
    commands: fn(CommandOptions) -> Box<dyn CommandSet>,
}

impl std::fmt::Debug for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vendor")
            .field("id", &self.id)
            .field("family", &self.family)
            .field("serial_prefix", &self.serial_prefix)
            .finish_non_exhaustive()
    }
}

impl Vendor {
    fn options(&self, config: &DriverConfig) -> CommandOptions {
        CommandOptions {
            item_text_max_length: self.item_text_max_length,
            comment_text_max_length: self.comment_text_max_length,
            operator_password_max_length: self.operator_password_max_length,
            payment_types: config.payment_types.clone(),
        }
    }

    fn default_credentials(&self) -> Credentials {
        Credentials::new(self.default_operator.0, self.default_operator.1)
    }
}

fn datecs_c(options: CommandOptions) -> Box<dyn CommandSet> {
    Box::new(IslCommands::new(DATECS_C_ISL, options))
}

fn datecs_x(options: CommandOptions) -> Box<dyn CommandSet> {
    Box::new(DatecsXCommands::new(options))
}

fn daisy(options: CommandOptions) -> Box<dyn CommandSet> {
    Box::new(IslCommands::new(DAISY_ISL, options))
}

fn eltrade(options: CommandOptions) -> Box<dyn CommandSet> {
    Box::new(IslCommands::new(ELTRADE_ISL, options))
}

fn incotex(options: CommandOptions) -> Box<dyn CommandSet> {
    Box::new(IslCommands::new(INCOTEX_ISL, options))
}

fn icp(options: CommandOptions) -> Box<dyn CommandSet> {
    Box::new(IcpCommands::new(options))
}

fn tremol(options: CommandOptions) -> Box<dyn CommandSet> {
    Box::new(ZfpCommands::new(options))
}

/// Every supported vendor, in detection order.
pub static VENDORS: &[Vendor] = &[
    Vendor {
        id: "bg.dt.c.isl",
        manufacturer: "Datecs",
        serial_prefix: "DT",
        family: Family::Isl,
        item_text_max_length: 36,
        comment_text_max_length: 42,
        operator_password_max_length: 8,
        default_operator: ("1", "0000"),
        supports_reversal: true,
        codec: &IslCodec,
        decoder: &DATECS_C,
        commands: datecs_c,
    },
    Vendor {
        id: "bg.dt.x.isl",
        manufacturer: "Datecs",
        serial_prefix: "DT",
        family: Family::IslX,
        item_text_max_length: 34,
        comment_text_max_length: 46,
        operator_password_max_length: 8,
        default_operator: ("1", "0000"),
        supports_reversal: true,
        codec: &IslxCodec,
        decoder: &DATECS_X,
        commands: datecs_x,
    },
    Vendor {
        id: "bg.dy.isl",
        manufacturer: "Daisy",
        serial_prefix: "DY",
        family: Family::Isl,
        item_text_max_length: 20,
        comment_text_max_length: 28,
        operator_password_max_length: 6,
        default_operator: ("1", "1"),
        supports_reversal: true,
        codec: &IslCodec,
        decoder: &DAISY,
        commands: daisy,
    },
    Vendor {
        id: "bg.ed.isl",
        manufacturer: "Eltrade",
        serial_prefix: "ED",
        family: Family::Isl,
        item_text_max_length: 30,
        comment_text_max_length: 46,
        operator_password_max_length: 8,
        default_operator: ("1", "1"),
        supports_reversal: true,
        codec: &IslCodec,
        decoder: &ELTRADE,
        commands: eltrade,
    },
    Vendor {
        id: "bg.in.isl",
        manufacturer: "Incotex",
        serial_prefix: "IN",
        family: Family::Isl,
        item_text_max_length: 30,
        comment_text_max_length: 40,
        operator_password_max_length: 8,
        default_operator: ("1", "0000"),
        supports_reversal: true,
        codec: &IslCodec,
        decoder: &INCOTEX,
        commands: incotex,
    },
    Vendor {
        id: "bg.is.icp",
        manufacturer: "ISL",
        serial_prefix: "IS",
        family: Family::Icp,
        item_text_max_length: 40,
        comment_text_max_length: 40,
        operator_password_max_length: 8,
        default_operator: ("1", "1"),
        supports_reversal: true,
        codec: &IcpCodec,
        decoder: &IcpStatusDecoder,
        commands: icp,
    },
    Vendor {
        id: "bg.zk.zfp",
        manufacturer: "Tremol",
        serial_prefix: "ZK",
        family: Family::Zfp,
        item_text_max_length: 32,
        comment_text_max_length: 30,
        operator_password_max_length: 6,
        default_operator: ("1", "0"),
        supports_reversal: true,
        codec: &ZfpCodec,
        decoder: &TremolStatusDecoder,
        commands: tremol,
    },
];

/// Look up a vendor by id.
pub fn vendor(id: &str) -> Option<&'static Vendor> {
    VENDORS.iter().find(|v| v.id == id)
}

// ── Device-info cache ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct CacheEntry {
    vendor: &'static str,
    responses: Vec<String>,
    stored: Instant,
}

/// Short-lived cache of raw device-info responses, keyed by channel
/// descriptor, so reconnecting to the same device skips the probe.
#[derive(Debug)]
pub struct InfoCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl InfoCache {
    /// An empty cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cached responses of `vendor` for `descriptor`, if fresh.
    pub fn get(&self, descriptor: &str, vendor: &str) -> Option<Vec<String>> {
        self.get_at(descriptor, vendor, Instant::now())
    }

    fn get_at(&self, descriptor: &str, vendor: &str, now: Instant) -> Option<Vec<String>> {
        let mut entries = self.entries.lock();
        let fresh = entries
            .get(descriptor)
            .is_some_and(|e| now.duration_since(e.stored) < self.ttl);
        if !fresh {
            entries.remove(descriptor);
            return None;
        }
        entries
            .get(descriptor)
            .filter(|e| e.vendor == vendor)
            .map(|e| e.responses.clone())
    }

    /// Vendor id last seen on `descriptor`, if fresh.
    pub fn vendor_for(&self, descriptor: &str) -> Option<&'static str> {
        let entries = self.entries.lock();
        entries
            .get(descriptor)
            .filter(|e| e.stored.elapsed() < self.ttl)
            .map(|e| e.vendor)
    }

    /// Remember the responses of a successful probe. Expired entries of
    /// every descriptor are dropped on the way.
    pub fn insert(&self, descriptor: &str, vendor: &'static str, responses: Vec<String>) {
        self.insert_at(descriptor, vendor, responses, Instant::now());
    }

    fn insert_at(
        &self,
        descriptor: &str,
        vendor: &'static str,
        responses: Vec<String>,
        now: Instant,
    ) {
        let mut entries = self.entries.lock();
        entries.retain(|_, e| now.saturating_duration_since(e.stored) < self.ttl);
        entries.insert(
            descriptor.to_string(),
            CacheEntry {
                vendor,
                responses,
                stored: now,
            },
        );
    }

    /// Number of entries held, fresh or not yet purged.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

// ── Driver ──────────────────────────────────────────────────────────────

/// Failed connect attempt that hands the channel back.
type Rejected = (FiscalError, Box<dyn Channel>);

/// Connects channels to vendor implementations.
#[derive(Debug)]
pub struct Driver {
    config: DriverConfig,
    cache: InfoCache,
}

impl Default for Driver {
    fn default() -> Self {
        Self::new(DriverConfig::default())
    }
}

impl Driver {
    /// A driver with its own device-info cache.
    pub fn new(config: DriverConfig) -> Self {
        let cache = InfoCache::new(config.info_cache_ttl);
        Self { config, cache }
    }

    /// The device-info cache.
    pub fn cache(&self) -> &InfoCache {
        &self.cache
    }

    /// Probe `channel` as `vendor_id` and return the connected printer.
    ///
    /// Fails with [`FiscalError::UnsupportedDevice`] (`E501`) for an unknown
    /// vendor id or a serial number with the wrong prefix.
    pub fn connect(
        &self,
        vendor_id: &str,
        channel: Box<dyn Channel>,
    ) -> Result<BgFiscalPrinter, FiscalError> {
        let vendor = vendor(vendor_id)
            .ok_or_else(|| FiscalError::UnsupportedDevice(format!("unknown vendor {vendor_id}")))?;
        self.try_connect(vendor, channel).map_err(|(e, _)| e)
    }

    /// Try every vendor until one recognizes the device. A vendor cached for
    /// this channel is tried first.
    pub fn detect(&self, channel: Box<dyn Channel>) -> Result<BgFiscalPrinter, FiscalError> {
        let cached = self.cache.vendor_for(channel.descriptor()).and_then(vendor);
        let order = cached
            .into_iter()
            .chain(VENDORS.iter().filter(|v| Some(v.id) != cached.map(|c| c.id)));

        let mut channel = channel;
        let mut last = None;
        for vendor in order {
            match self.try_connect(vendor, channel) {
                Ok(printer) => return Ok(printer),
                Err((e, returned)) => {
                    debug!(
                        channel = returned.descriptor(),
                        vendor = vendor.id,
                        error = %e,
                        "probe failed"
                    );
                    last = Some(e);
                    channel = returned;
                }
            }
        }
        Err(FiscalError::UnsupportedDevice(match last {
            Some(e) => format!("no vendor recognized {}: {e}", channel.descriptor()),
            None => format!("no vendor recognized {}", channel.descriptor()),
        }))
    }

    fn try_connect(
        &self,
        vendor: &'static Vendor,
        channel: Box<dyn Channel>,
    ) -> Result<BgFiscalPrinter, Rejected> {
        let options = vendor.options(&self.config);
        let commands = (vendor.commands)(options);
        let link = Link::new(channel, vendor.codec, vendor.decoder, self.config.printer.clone());

        let responses = match self.cache.get(link.descriptor(), vendor.id) {
            Some(responses) => responses,
            None => match probe(&link, commands.as_ref()) {
                Ok(responses) => responses,
                Err(e) => return Err((e, link.into_channel())),
            },
        };
        let probed = match commands.parse_device_info(&responses) {
            Ok(probed) => probed,
            Err(e) => return Err((e, link.into_channel())),
        };
        if !probed.serial_number.starts_with(vendor.serial_prefix) {
            let e = FiscalError::UnsupportedDevice(format!(
                "serial number {} does not belong to {} ({})",
                probed.serial_number, vendor.manufacturer, vendor.id
            ));
            return Err((e, link.into_channel()));
        }
        self.cache.insert(link.descriptor(), vendor.id, responses);

        let info = DeviceInfo {
            vendor: vendor.id.to_string(),
            serial_number: probed.serial_number,
            fiscal_memory_serial_number: probed.fiscal_memory_serial_number,
            manufacturer: vendor.manufacturer.to_string(),
            model: probed.model,
            firmware_version: probed.firmware_version,
            item_text_max_length: vendor.item_text_max_length,
            comment_text_max_length: vendor.comment_text_max_length,
            operator_password_max_length: vendor.operator_password_max_length,
            supported_payment_types: commands.supported_payment_types(),
            supports_reversal: vendor.supports_reversal,
            supports_price_modifiers: commands.supports_price_modifiers(),
        };
        info!(
            channel = link.descriptor(),
            vendor = vendor.id,
            serial = %info.serial_number,
            model = %info.model,
            "connected"
        );
        let default_operator = self
            .config
            .default_operator
            .clone()
            .unwrap_or_else(|| vendor.default_credentials());
        Ok(BgFiscalPrinter::new(link, commands, info, default_operator))
    }
}

/// Send the device-info commands and collect their response texts.
fn probe(link: &Link, commands: &dyn CommandSet) -> Result<Vec<String>, FiscalError> {
    commands
        .device_info_commands()
        .iter()
        .map(|command| {
            let response = link.request(command)?;
            let extra = commands.response_status(&response.text);
            match response.status.merge(extra).first_error() {
                Some(error) => Err(FiscalError::DeviceReported {
                    code: error
                        .code
                        .clone()
                        .unwrap_or(Cow::Borrowed(codes::GENERAL_DEVICE_ERROR)),
                    text: error.text.clone(),
                }),
                None => Ok(response.text),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_ids_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for vendor in VENDORS {
            assert!(seen.insert(vendor.id), "duplicate {}", vendor.id);
            assert_eq!(vendor.serial_prefix.len(), 2);
        }
        assert_eq!(VENDORS.len(), 7);
    }

    #[test]
    fn lookup() {
        assert_eq!(vendor("bg.zk.zfp").unwrap().family, Family::Zfp);
        assert_eq!(vendor("bg.dt.x.isl").unwrap().family, Family::IslX);
        assert!(vendor("bg.xx.isl").is_none());
    }

    #[test]
    fn cache_expires() {
        let cache = InfoCache::new(Duration::from_secs(30));
        cache.insert("tcp://a", "bg.dt.c.isl", vec!["x".into()]);
        assert_eq!(cache.get("tcp://a", "bg.dt.c.isl"), Some(vec!["x".to_string()]));
        assert_eq!(cache.get("tcp://a", "bg.dy.isl"), None);
        assert_eq!(cache.vendor_for("tcp://a"), Some("bg.dt.c.isl"));

        let later = Instant::now() + Duration::from_secs(31);
        assert_eq!(cache.get_at("tcp://a", "bg.dt.c.isl", later), None);
        assert_eq!(cache.vendor_for("tcp://a"), None);
    }

    #[test]
    fn insert_purges_expired_descriptors() {
        let cache = InfoCache::new(Duration::from_secs(30));
        let start = Instant::now();
        cache.insert_at("tcp://a", "bg.dt.c.isl", vec!["x".into()], start);
        cache.insert_at("tcp://b", "bg.dy.isl", vec!["y".into()], start + Duration::from_secs(20));
        assert_eq!(cache.len(), 2);

        // tcp://a is never looked up again
        cache.insert_at("tcp://c", "bg.ed.isl", vec![], start + Duration::from_secs(40));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.vendor_for("tcp://a"), None);
        assert_eq!(cache.vendor_for("tcp://b"), Some("bg.dy.isl"));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn unknown_vendor_is_unsupported() {
        struct Never;
        impl Channel for Never {
            fn descriptor(&self) -> &str {
                "never"
            }
            fn read(&mut self) -> Result<Vec<u8>, FiscalError> {
                Err(FiscalError::ReadTimeout)
            }
            fn write(&mut self, _: &[u8]) -> Result<(), FiscalError> {
                Ok(())
            }
        }
        let err = Driver::default().connect("bg.xx", Box::new(Never)).unwrap_err();
        assert_eq!(err.code(), "E501");
    }
}
