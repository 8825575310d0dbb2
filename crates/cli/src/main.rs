mod render;

use std::fs;
use std::io::{self, Read};
use std::process;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use bgfp_driver::model::{
    Credentials, CurrentDateTime, DeviceInfo, DeviceStatusWithReceiptInfo, Receipt, RequestFrame,
    ReversalReceipt, TransferAmount,
};
use bgfp_driver::{
    BgFiscalPrinter, Channel, DeviceStatus, Driver, DriverConfig, FiscalError, FiscalPrinter,
    VENDORS, validate,
};

use crate::render::{Format, render_result, render_status_pretty};

// ── CLI definition ──────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "bgfp",
    version,
    about = "Talk to Bulgarian fiscal printers: status, receipts, reports and offline validation"
)]
struct Cli {
    /// Output mode: "pretty" for coloured terminal output, "json" for
    /// machine-readable JSON. Defaults to "pretty" when stdout is a TTY,
    /// "json" otherwise.
    #[arg(long, global = true, value_parser = ["pretty", "json"])]
    output: Option<String>,

    /// Driver configuration file (JSON): timeouts, retries, payment codes.
    #[arg(long, global = true)]
    config: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv frame dumps).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    // ── Offline ─────────────────────────────────────────────────────
    /// List the supported vendor drivers.
    Vendors,

    /// Explain a status code (e.g. E403).
    Explain { code: String },

    /// Validate a receipt, reversal or transfer document without a device.
    Validate {
        #[arg(value_enum)]
        kind: DocumentKind,
        /// JSON document, or `-` for stdin.
        file: String,
    },

    /// List serial ports present on this machine.
    #[cfg(feature = "serial")]
    Ports,

    // ── Device queries ──────────────────────────────────────────────
    /// Probe every vendor driver and report the device found.
    Detect {
        #[command(flatten)]
        transport: TransportArgs,
    },

    /// Show device identification and tax number.
    Info {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Read the device status and clock.
    Status {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Read the cash amount in the drawer.
    Cash {
        #[command(flatten)]
        device: DeviceArgs,
    },

    // ── Device operations ───────────────────────────────────────────
    /// Set the device clock.
    SetDateTime {
        #[command(flatten)]
        device: DeviceArgs,
        /// Local date and time, e.g. 2024-03-01T10:15:30.
        #[arg(required_unless_present = "now", conflicts_with = "now")]
        value: Option<NaiveDateTime>,
        /// Use the local clock of this machine.
        #[arg(long)]
        now: bool,
    },

    /// Print an X (daily, non-zeroing) report.
    XReport {
        #[command(flatten)]
        device: DeviceArgs,
        #[command(flatten)]
        operator: OperatorArgs,
    },

    /// Print a Z (daily closing) report.
    ZReport {
        #[command(flatten)]
        device: DeviceArgs,
        #[command(flatten)]
        operator: OperatorArgs,
    },

    /// Register a cash deposit.
    Deposit {
        #[command(flatten)]
        device: DeviceArgs,
        #[command(flatten)]
        operator: OperatorArgs,
        amount: Decimal,
    },

    /// Register a cash withdrawal.
    Withdraw {
        #[command(flatten)]
        device: DeviceArgs,
        #[command(flatten)]
        operator: OperatorArgs,
        amount: Decimal,
    },

    /// Print a fiscal receipt from a JSON document.
    Print {
        #[command(flatten)]
        device: DeviceArgs,
        /// Receipt JSON, or `-` for stdin.
        file: String,
    },

    /// Print a reversal (storno) receipt from a JSON document.
    Reversal {
        #[command(flatten)]
        device: DeviceArgs,
        /// Reversal JSON, or `-` for stdin.
        file: String,
    },

    /// Send a raw request: command character followed by its payload.
    Raw {
        #[command(flatten)]
        device: DeviceArgs,
        request: String,
    },
}

/// Document type for the `validate` command.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum DocumentKind {
    /// Fiscal receipt.
    Receipt,
    /// Reversal receipt.
    Reversal,
    /// Cash deposit or withdrawal.
    Transfer,
}

#[derive(Args, Debug)]
struct TransportArgs {
    /// Device address, `host` or `host:port` (port defaults to 9100).
    #[arg(long, conflicts_with = "serial")]
    tcp: Option<String>,
    /// Serial port, e.g. /dev/ttyUSB0 or COM3.
    #[arg(long)]
    serial: Option<String>,
    /// Serial baud rate (defaults to 115200).
    #[arg(long, requires = "serial")]
    baud: Option<u32>,
    /// Give up on the device operation after this many seconds.
    #[arg(long)]
    deadline_secs: Option<u64>,
}

#[derive(Args, Debug)]
struct DeviceArgs {
    #[command(flatten)]
    transport: TransportArgs,
    /// Vendor driver id (see `bgfp vendors`); detected when omitted.
    #[arg(long)]
    vendor: Option<String>,
}

#[derive(Args, Debug)]
struct OperatorArgs {
    /// Operator number; the configured or vendor default when omitted.
    #[arg(long)]
    operator: Option<String>,
    /// Operator password.
    #[arg(long, requires = "operator")]
    password: Option<String>,
}

impl OperatorArgs {
    fn credentials(&self) -> Credentials {
        match &self.operator {
            Some(op) => Credentials::new(op.as_str(), self.password.as_deref().unwrap_or("")),
            None => Credentials::default(),
        }
    }
}

// ── Main ────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let format = Format::resolve_or_detect(cli.output.as_deref());
    let config = load_config(cli.config.as_deref(), cli.verbose)?;

    match cli.cmd {
        Cmd::Vendors => cmd_vendors(format)?,
        Cmd::Explain { code } => cmd_explain(&code, format)?,
        Cmd::Validate { kind, file } => cmd_validate(kind, &file, format)?,
        #[cfg(feature = "serial")]
        Cmd::Ports => cmd_ports(format)?,

        Cmd::Detect { transport } => {
            let channel = open_channel(&transport, &config);
            let driver = Driver::new(config);
            let printer = connected(channel.and_then(|ch| driver.detect(ch)), format)?;
            let info = printer.device_info();
            let status = DeviceStatus::new();
            render_result(
                format,
                &InfoReport::new(&status, info, None),
                &status,
                &info_fields(info, None),
            )?;
        }
        Cmd::Info { device } => {
            let printer = connect(&device, config, format)?;
            let (tin, status) = printer.tax_identification_number();
            let info = printer.device_info();
            render_result(
                format,
                &InfoReport::new(&status, info, tin.as_deref()),
                &status,
                &info_fields(info, tin.as_deref()),
            )?;
            exit_on_errors(&status);
        }
        Cmd::Status { device } => {
            let printer = connect(&device, config, format)?;
            let result = printer.check_status();
            let fields = optional_field("device date time", result.device_date_time);
            render_result(format, &result, &result.status, &fields)?;
            exit_on_errors(&result.status);
        }
        Cmd::Cash { device } => {
            let printer = connect(&device, config, format)?;
            let result = printer.cash();
            let fields = optional_field("cash amount", result.amount);
            render_result(format, &result, &result.status, &fields)?;
            exit_on_errors(&result.status);
        }

        Cmd::SetDateTime { device, value, now } => {
            let device_date_time = match value {
                Some(value) if !now => value,
                _ => chrono::Local::now().naive_local(),
            };
            let printer = connect(&device, config, format)?;
            let status = printer.set_date_time(&CurrentDateTime { device_date_time });
            finish(format, &status)?;
        }
        Cmd::XReport { device, operator } => {
            let printer = connect(&device, config, format)?;
            finish(format, &printer.print_x_report(&operator.credentials()))?;
        }
        Cmd::ZReport { device, operator } => {
            let printer = connect(&device, config, format)?;
            finish(format, &printer.print_z_report(&operator.credentials()))?;
        }
        Cmd::Deposit {
            device,
            operator,
            amount,
        } => {
            let transfer = TransferAmount {
                amount,
                operator: operator.credentials(),
            };
            let printer = connect(&device, config, format)?;
            finish(format, &printer.print_money_deposit(&transfer))?;
        }
        Cmd::Withdraw {
            device,
            operator,
            amount,
        } => {
            let transfer = TransferAmount {
                amount,
                operator: operator.credentials(),
            };
            let printer = connect(&device, config, format)?;
            finish(format, &printer.print_money_withdraw(&transfer))?;
        }
        Cmd::Print { device, file } => {
            let receipt: Receipt = read_document(&file)?;
            let printer = connect(&device, config, format)?;
            let (info, status) = printer.print_receipt(&receipt);
            let result = DeviceStatusWithReceiptInfo { status, info };
            let mut fields = vec![
                ("receipt number", result.info.receipt_number.clone()),
                ("receipt amount", result.info.receipt_amount.to_string()),
                (
                    "fiscal memory",
                    result.info.fiscal_memory_serial_number.clone(),
                ),
            ];
            fields.extend(optional_field("receipt date time", result.info.receipt_date_time));
            render_result(format, &result, &result.status, &fields)?;
            exit_on_errors(&result.status);
        }
        Cmd::Reversal { device, file } => {
            let reversal: ReversalReceipt = read_document(&file)?;
            let printer = connect(&device, config, format)?;
            finish(format, &printer.print_reversal_receipt(&reversal))?;
        }
        Cmd::Raw { device, request } => {
            let printer = connect(&device, config, format)?;
            let result = printer.raw_request(&RequestFrame {
                raw_request: request,
            });
            let fields = [("response", result.raw_response.clone())];
            render_result(format, &result, &result.status, &fields)?;
            exit_on_errors(&result.status);
        }
    }

    Ok(())
}

// ── Offline commands ────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VendorRow {
    id: &'static str,
    manufacturer: &'static str,
    protocol: String,
    serial_prefix: &'static str,
    supports_reversal: bool,
}

fn cmd_vendors(format: Format) -> Result<()> {
    let rows: Vec<VendorRow> = VENDORS
        .iter()
        .map(|v| VendorRow {
            id: v.id,
            manufacturer: v.manufacturer,
            protocol: v.family.to_string(),
            serial_prefix: v.serial_prefix,
            supports_reversal: v.supports_reversal,
        })
        .collect();

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        Format::Pretty => {
            use ariadne::{Color, Fmt};
            for row in &rows {
                println!(
                    "{:<14} {:<6} {:<10} serial {}*",
                    row.id.fg(Color::Cyan),
                    row.protocol,
                    row.manufacturer,
                    row.serial_prefix
                );
            }
        }
    }
    Ok(())
}

fn cmd_explain(code: &str, format: Format) -> Result<()> {
    let text = bgfp_status::explain(code);
    match format {
        Format::Json => {
            let out = serde_json::json!({
                "code": code,
                "explanation": text,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Format::Pretty => {
            // The explanation is the expected output, so it goes to stdout.
            if let Some(text) = text {
                use ariadne::Fmt;
                println!("{}: {}", code.fg(ariadne::Color::Cyan), text);
            } else {
                println!("{code}: (no explanation available)");
            }
        }
    }
    Ok(())
}

fn cmd_validate(kind: DocumentKind, file: &str, format: Format) -> Result<()> {
    let status = match kind {
        DocumentKind::Receipt => validate::validate_receipt(&read_document::<Receipt>(file)?),
        DocumentKind::Reversal => {
            validate::validate_reversal_receipt(&read_document::<ReversalReceipt>(file)?)
        }
        DocumentKind::Transfer => {
            validate::validate_transfer_amount(&read_document::<TransferAmount>(file)?)
        }
    };
    finish(format, &status)
}

#[cfg(feature = "serial")]
fn cmd_ports(format: Format) -> Result<()> {
    let ports = bgfp_driver::SerialChannel::list_ports();
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&ports)?),
        Format::Pretty => {
            if ports.is_empty() {
                eprintln!("no serial ports found");
            }
            for port in ports {
                println!("{port}");
            }
        }
    }
    Ok(())
}

// ── Device plumbing ─────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InfoReport<'a> {
    #[serde(flatten)]
    status: &'a DeviceStatus,
    device_info: &'a DeviceInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    tax_identification_number: Option<&'a str>,
}

impl<'a> InfoReport<'a> {
    fn new(status: &'a DeviceStatus, device_info: &'a DeviceInfo, tin: Option<&'a str>) -> Self {
        Self {
            status,
            device_info,
            tax_identification_number: tin,
        }
    }
}

fn info_fields(info: &DeviceInfo, tin: Option<&str>) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("vendor", info.vendor.clone()),
        ("manufacturer", info.manufacturer.clone()),
        ("model", info.model.clone()),
        ("firmware", info.firmware_version.clone()),
        ("serial number", info.serial_number.clone()),
        ("fiscal memory", info.fiscal_memory_serial_number.clone()),
    ];
    if let Some(tin) = tin {
        fields.push(("tax number", tin.to_string()));
    }
    fields
}

fn optional_field<T: ToString>(name: &'static str, value: Option<T>) -> Vec<(&'static str, String)> {
    value.map(|v| vec![(name, v.to_string())]).unwrap_or_default()
}

fn open_channel(
    transport: &TransportArgs,
    config: &DriverConfig,
) -> Result<Box<dyn Channel>, FiscalError> {
    match (&transport.tcp, &transport.serial) {
        (Some(addr), _) => open_tcp(addr, config),
        (None, Some(port)) => open_serial(port, transport.baud, config),
        (None, None) => Err(FiscalError::InvalidConfig(
            "no device given: pass --tcp ADDR or --serial PORT".into(),
        )),
    }
}

#[cfg(feature = "tcp")]
fn open_tcp(addr: &str, config: &DriverConfig) -> Result<Box<dyn Channel>, FiscalError> {
    let channel = bgfp_driver::TcpChannel::connect(addr, &config.printer)?;
    Ok(Box::new(channel))
}

#[cfg(not(feature = "tcp"))]
fn open_tcp(_addr: &str, _config: &DriverConfig) -> Result<Box<dyn Channel>, FiscalError> {
    Err(FiscalError::InvalidConfig("built without TCP support".into()))
}

#[cfg(feature = "serial")]
fn open_serial(
    port: &str,
    baud: Option<u32>,
    config: &DriverConfig,
) -> Result<Box<dyn Channel>, FiscalError> {
    let baud = baud.unwrap_or(bgfp_driver::DEFAULT_BAUD);
    let channel = bgfp_driver::SerialChannel::open(port, baud, &config.printer)?;
    Ok(Box::new(channel))
}

#[cfg(not(feature = "serial"))]
fn open_serial(
    _port: &str,
    _baud: Option<u32>,
    _config: &DriverConfig,
) -> Result<Box<dyn Channel>, FiscalError> {
    Err(FiscalError::InvalidConfig("built without serial support".into()))
}

/// Open the transport and attach the requested (or detected) vendor driver.
///
/// Connection failures are reported like any other device status and end
/// the process with exit code 1.
fn connect(device: &DeviceArgs, config: DriverConfig, format: Format) -> Result<BgFiscalPrinter> {
    let channel = open_channel(&device.transport, &config);
    let driver = Driver::new(config);
    let printer = connected(
        channel.and_then(|ch| match &device.vendor {
            Some(id) => driver.connect(id, ch),
            None => driver.detect(ch),
        }),
        format,
    )?;
    apply_deadline(&printer, &device.transport);
    debug!(vendor = %printer.device_info().vendor, "connected");
    Ok(printer)
}

fn connected(
    result: Result<BgFiscalPrinter, FiscalError>,
    format: Format,
) -> Result<BgFiscalPrinter> {
    match result {
        Ok(printer) => Ok(printer),
        Err(err) => {
            finish(format, &err.to_status())?;
            Err(err.into())
        }
    }
}

fn apply_deadline(printer: &BgFiscalPrinter, transport: &TransportArgs) {
    if let Some(secs) = transport.deadline_secs {
        printer.set_deadline(Some(Instant::now() + Duration::from_secs(secs)));
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bgfp_driver={level},bgfp_cli={level}")));
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&str>, verbose: u8) -> Result<DriverConfig> {
    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{path}'"))?;
            DriverConfig::from_json_str(&text)
                .with_context(|| format!("invalid config file '{path}'"))?
        }
        None => DriverConfig::default(),
    };
    if verbose >= 3 {
        config.printer.trace_io = true;
    }
    Ok(config)
}

/// Read a JSON document from a file, or from stdin when `file` is `-`.
fn read_document<T: DeserializeOwned>(file: &str) -> Result<T> {
    let text = if file == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        text
    } else {
        fs::read_to_string(file).with_context(|| format!("failed to read '{file}'"))?
    };
    serde_json::from_str(&text).with_context(|| format!("invalid document '{file}'"))
}

/// Render a bare status and exit 1 when it holds errors.
fn finish(format: Format, status: &DeviceStatus) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(status)?),
        Format::Pretty => render_status_pretty(status),
    }
    exit_on_errors(status);
    Ok(())
}

/// Exit with code 1 if the status holds errors.
/// Warnings and infos do not cause a non-zero exit.
fn exit_on_errors(status: &DeviceStatus) {
    if !status.is_ok() {
        process::exit(1);
    }
}
