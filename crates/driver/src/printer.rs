//! The device facade: receipts, reports, cash operations and queries.

use std::time::Instant;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use bgfp_status::{DeviceStatus, codes};

use crate::commands::{Command, CommandSet};
use crate::link::{Link, Response};
use crate::model::{
    Credentials, CurrentDateTime, DeviceInfo, DeviceStatusWithCashAmount,
    DeviceStatusWithDateTime, DeviceStatusWithRawResponse, ItemType, PaymentType, Receipt,
    ReceiptInfo, RequestFrame, ReversalReceipt, TransferAmount,
};
use crate::{Channel, FiscalError, cp1251, validate};

// ── Trait ───────────────────────────────────────────────────────────────

/// Operations every connected fiscal printer offers.
///
/// Failures are reported in the returned [`DeviceStatus`], never as a
/// panic or an error value.
pub trait FiscalPrinter: Send + Sync {
    /// Snapshot taken when connecting.
    fn device_info(&self) -> &DeviceInfo;

    /// Device status and clock.
    fn check_status(&self) -> DeviceStatusWithDateTime;

    /// Cash in the drawer.
    fn cash(&self) -> DeviceStatusWithCashAmount;

    /// Set the device clock.
    fn set_date_time(&self, date_time: &CurrentDateTime) -> DeviceStatus;

    /// Print a fiscal receipt.
    fn print_receipt(&self, receipt: &Receipt) -> (ReceiptInfo, DeviceStatus);

    /// Check a receipt without printing it.
    fn validate_receipt(&self, receipt: &Receipt) -> DeviceStatus;

    /// Print a reversal receipt.
    fn print_reversal_receipt(&self, reversal: &ReversalReceipt) -> DeviceStatus;

    /// Check a reversal receipt without printing it.
    fn validate_reversal_receipt(&self, reversal: &ReversalReceipt) -> DeviceStatus;

    /// Put cash into the drawer.
    fn print_money_deposit(&self, transfer: &TransferAmount) -> DeviceStatus;

    /// Take cash out of the drawer.
    fn print_money_withdraw(&self, transfer: &TransferAmount) -> DeviceStatus;

    /// Check a transfer amount.
    fn validate_transfer_amount(&self, transfer: &TransferAmount) -> DeviceStatus;

    /// Daily report that zeroes the counters.
    fn print_z_report(&self, operator: &Credentials) -> DeviceStatus;

    /// Daily report without zeroing.
    fn print_x_report(&self, operator: &Credentials) -> DeviceStatus;

    /// Send a raw command: first character is the command, the rest its data.
    fn raw_request(&self, request: &RequestFrame) -> DeviceStatusWithRawResponse;
}

// ── BgFiscalPrinter ─────────────────────────────────────────────────────

/// A connected device: one [`Link`], one [`CommandSet`] and the device info.
pub struct BgFiscalPrinter {
    link: Link,
    commands: Box<dyn CommandSet>,
    info: DeviceInfo,
    default_operator: Credentials,
}

impl std::fmt::Debug for BgFiscalPrinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BgFiscalPrinter")
            .field("link", &self.link)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Outcome of one step of a multi-command document.
type Step = Result<DeviceStatus, DeviceStatus>;

impl BgFiscalPrinter {
    pub(crate) fn new(
        link: Link,
        commands: Box<dyn CommandSet>,
        info: DeviceInfo,
        default_operator: Credentials,
    ) -> Self {
        Self {
            link,
            commands,
            info,
            default_operator,
        }
    }

    /// Fail every following request with `E109` once `deadline` has passed.
    pub fn set_deadline(&self, deadline: Option<Instant>) {
        self.link.set_deadline(deadline);
    }

    /// Read the tax identification number (EIK/BULSTAT) of the owner.
    pub fn tax_identification_number(&self) -> (Option<String>, DeviceStatus) {
        self.query(&self.commands.tax_identification_number(), |text| {
            self.commands.parse_tax_identification_number(text)
        })
    }

    /// Close the session and return the channel.
    pub fn into_channel(self) -> Box<dyn Channel> {
        self.link.into_channel()
    }

    // ── Plumbing ────────────────────────────────────────────────────────

    /// Send one command; transport and framing failures land in the status.
    fn send(&self, command: &Command) -> Response {
        match self.link.request(command) {
            Ok(mut response) => {
                let extra = self.commands.response_status(&response.text);
                response.status = response.status.merge(extra);
                response
            }
            Err(e) => {
                debug!(channel = self.link.descriptor(), error = %e, "request failed");
                Response {
                    status: e.to_status(),
                    ..Response::default()
                }
            }
        }
    }

    fn query<T>(
        &self,
        command: &Command,
        parse: impl FnOnce(&str) -> Result<T, FiscalError>,
    ) -> (Option<T>, DeviceStatus) {
        let response = self.send(command);
        if !response.status.is_ok() {
            return (None, response.status);
        }
        match parse(&response.text) {
            Ok(value) => (Some(value), response.status),
            Err(e) => (None, response.status.merge(e.to_status())),
        }
    }

    fn operator(&self, given: &Credentials) -> Credentials {
        if given.is_empty() {
            self.default_operator.clone()
        } else {
            given.clone()
        }
    }

    fn abort(&self) {
        let status = self.send(&self.commands.abort_receipt()).status;
        if !status.is_ok() {
            warn!(channel = self.link.descriptor(), %status, "abort receipt failed");
        }
    }

    /// Run one step of an open document; on failure abort the receipt and
    /// annotate the status with `note`.
    fn step(
        &self,
        status: DeviceStatus,
        command: Result<Command, FiscalError>,
        note: impl FnOnce() -> String,
    ) -> Step {
        let result = match command {
            Ok(command) => self.send(&command).status,
            Err(e) => e.to_status(),
        };
        let status = status.merge(result);
        if status.is_ok() {
            Ok(status)
        } else {
            self.abort();
            Err(status.with_info(note()))
        }
    }

    /// Open → lines → payments → close → read back the receipt identity.
    fn print_document(
        &self,
        open: Result<Command, FiscalError>,
        receipt: &Receipt,
        info: &mut ReceiptInfo,
    ) -> Step {
        // A receipt left open by an earlier failure would reject the new one.
        let pending = self.send(&self.commands.abort_receipt()).status;
        if !pending.is_ok() {
            debug!(channel = self.link.descriptor(), "no receipt to abort");
        }

        let mut status = self.step(DeviceStatus::new(), open, || {
            "Error occurred while opening new fiscal receipt".into()
        })?;

        for (i, item) in receipt.items.iter().enumerate() {
            let command = match item.item_type {
                ItemType::Comment => Ok(self.commands.add_comment(&item.text)),
                ItemType::Sale => self.commands.add_item(item),
            };
            status = self.step(status, command, || format!("Error occurred in Item {}", i + 1))?;
        }

        let payments: Vec<_> = receipt
            .payments
            .iter()
            .filter(|p| p.payment_type != PaymentType::Change)
            .collect();
        if payments.is_empty() {
            status = self.step(status, Ok(self.commands.full_payment()), || {
                "Error occurred while paying the full amount".into()
            })?;
        } else {
            for (i, payment) in payments.into_iter().enumerate() {
                status = self.step(status, self.commands.add_payment(payment), || {
                    format!("Error occurred in Payment {}", i + 1)
                })?;
            }
        }

        status = self.step(status, Ok(self.commands.close_receipt()), || {
            "Error occurred while closing the fiscal receipt".into()
        })?;

        // The receipt is printed; what follows only reads it back.
        let (number, s) = self.query(&self.commands.last_document_number(), |text| {
            self.commands.parse_last_document_number(text)
        });
        status = status.merge(s);
        if let Some(number) = number {
            info.receipt_number = number;
        } else {
            return Err(status.with_info("Error occurred while reading the last document number"));
        }

        let (amount, s) = self.query(&self.commands.receipt_amount(), |text| {
            self.commands.parse_receipt_amount(text)
        });
        status = status.merge(s);
        match amount {
            Some(amount) => info.receipt_amount = amount,
            None => {
                return Err(status.with_info("Error occurred while reading the receipt amount"));
            }
        }

        let (date_time, s) = self.query(&self.commands.date_time(), |text| {
            self.commands.parse_date_time(text)
        });
        status = status.merge(s);
        if date_time.is_none() {
            return Err(status.with_info("Error occurred while reading the receipt date and time"));
        }
        info.receipt_date_time = date_time;
        Ok(status)
    }

    fn transfer(&self, transfer: &TransferAmount, amount: Decimal) -> DeviceStatus {
        let status = self.validate_transfer_amount(transfer);
        if !status.is_ok() {
            return status;
        }
        let operator = self.operator(&transfer.operator);
        let command = match self.commands.money_transfer(amount, &operator) {
            Ok(command) => command,
            Err(e) => return e.to_status(),
        };
        let response = self.send(&command);
        let extra = self.commands.transfer_status(&response.text);
        response.status.merge(extra)
    }
}

impl FiscalPrinter for BgFiscalPrinter {
    fn device_info(&self) -> &DeviceInfo {
        &self.info
    }

    fn check_status(&self) -> DeviceStatusWithDateTime {
        let response = self.send(&self.commands.read_status());
        let mut status = response.status;
        if self.commands.status_in_data() && status.is_ok() {
            status = status.merge(self.link.decode_status(&response.data));
        }
        let (device_date_time, s) = self.query(&self.commands.date_time(), |text| {
            self.commands.parse_date_time(text)
        });
        DeviceStatusWithDateTime {
            status: status.merge(s),
            device_date_time,
        }
    }

    fn cash(&self) -> DeviceStatusWithCashAmount {
        let (amount, status) = self.query(&self.commands.cash_amount(), |text| {
            self.commands.parse_cash_amount(text)
        });
        DeviceStatusWithCashAmount { status, amount }
    }

    fn set_date_time(&self, date_time: &CurrentDateTime) -> DeviceStatus {
        self.send(&self.commands.set_date_time(date_time.device_date_time))
            .status
    }

    fn print_receipt(&self, receipt: &Receipt) -> (ReceiptInfo, DeviceStatus) {
        let mut info = ReceiptInfo {
            fiscal_memory_serial_number: self.info.fiscal_memory_serial_number.clone(),
            ..ReceiptInfo::default()
        };
        let status = self.validate_receipt(receipt);
        if !status.is_ok() {
            return (info, status);
        }
        let operator = self.operator(&receipt.operator);
        let open = Ok(self
            .commands
            .open_receipt(&receipt.unique_sale_number, &operator));
        let status = match self.print_document(open, receipt, &mut info) {
            Ok(status) => {
                info!(
                    channel = self.link.descriptor(),
                    receipt = %info.receipt_number,
                    amount = %info.receipt_amount,
                    "receipt printed"
                );
                status
            }
            Err(status) => status,
        };
        (info, status)
    }

    fn validate_receipt(&self, receipt: &Receipt) -> DeviceStatus {
        validate::validate_receipt(receipt).merge(validate::validate_against_device(
            receipt,
            &self.info.supported_payment_types,
            self.info.supports_price_modifiers,
        ))
    }

    fn print_reversal_receipt(&self, reversal: &ReversalReceipt) -> DeviceStatus {
        let status = self.validate_reversal_receipt(reversal);
        if !status.is_ok() {
            return status;
        }
        let operator = self.operator(&reversal.receipt.operator);
        let open = self.commands.open_reversal_receipt(reversal, &operator);
        let mut info = ReceiptInfo::default();
        match self.print_document(open, &reversal.receipt, &mut info) {
            Ok(status) => {
                info!(
                    channel = self.link.descriptor(),
                    receipt = %info.receipt_number,
                    "reversal receipt printed"
                );
                status
            }
            Err(status) => status,
        }
    }

    fn validate_reversal_receipt(&self, reversal: &ReversalReceipt) -> DeviceStatus {
        let status = validate::validate_reversal_receipt(reversal);
        let status = status.merge(validate::validate_against_device(
            &reversal.receipt,
            &self.info.supported_payment_types,
            self.info.supports_price_modifiers,
        ));
        if self.info.supports_reversal {
            status
        } else {
            status.with_error(
                codes::COMMAND_NOT_ALLOWED,
                "Reversal receipts are not supported by this device",
            )
        }
    }

    fn print_money_deposit(&self, transfer: &TransferAmount) -> DeviceStatus {
        self.transfer(transfer, transfer.amount)
    }

    fn print_money_withdraw(&self, transfer: &TransferAmount) -> DeviceStatus {
        self.transfer(transfer, -transfer.amount)
    }

    fn validate_transfer_amount(&self, transfer: &TransferAmount) -> DeviceStatus {
        validate::validate_transfer_amount(transfer)
    }

    fn print_z_report(&self, operator: &Credentials) -> DeviceStatus {
        let operator = self.operator(operator);
        self.send(&self.commands.daily_report(true, &operator)).status
    }

    fn print_x_report(&self, operator: &Credentials) -> DeviceStatus {
        let operator = self.operator(operator);
        self.send(&self.commands.daily_report(false, &operator))
            .status
    }

    fn raw_request(&self, request: &RequestFrame) -> DeviceStatusWithRawResponse {
        let mut chars = request.raw_request.chars();
        let Some(first) = chars.next() else {
            return DeviceStatusWithRawResponse {
                status: DeviceStatus::from_error(codes::INVALID_COMMAND, "rawRequest is empty"),
                raw_response: String::new(),
            };
        };
        let Some(code) = cp1251::encode_char(first) else {
            return DeviceStatusWithRawResponse {
                status: DeviceStatus::from_error(
                    codes::INVALID_COMMAND,
                    format!("Command {first:?} has no single-byte encoding"),
                ),
                raw_response: String::new(),
            };
        };
        let response = self.send(&Command::new(code, chars.as_str()));
        DeviceStatusWithRawResponse {
            status: response.status,
            raw_response: response.text,
        }
    }
}
