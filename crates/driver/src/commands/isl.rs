//! Command set shared by the ISL vendors (Datecs C, Daisy, Eltrade, Incotex).
//!
//! The vendors agree on command codes and comma-separated responses; they
//! differ in the fields of the open-receipt header, the abort command and
//! the payment codes. Those differences live in an [`IslProfile`].

use bgfp_status::{DeviceStatus, codes};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::{
    CYRILLIC_TAX_GROUPS, Command, CommandOptions, CommandSet, PaymentCodes, field, format_amount,
    format_quantity, format_signed, non_empty, parse_date_time_with, parse_scaled_amount,
    tax_group_code, with_max_length,
};
use crate::FiscalError;
use crate::model::{
    Credentials, Item, Payment, PaymentType, PriceModifierType, ProbedInfo, ReversalReason,
    ReversalReceipt,
};

const OPEN_RECEIPT: u8 = 0x30;
const ADD_ITEM: u8 = 0x31;
const ADD_PAYMENT: u8 = 0x35;
const ADD_COMMENT: u8 = 0x36;
const CLOSE_RECEIPT: u8 = 0x38;
const SET_DATE_TIME: u8 = 0x3D;
const GET_DATE_TIME: u8 = 0x3E;
const DAILY_REPORT: u8 = 0x45;
const MONEY_TRANSFER: u8 = 0x46;
const READ_STATUS: u8 = 0x4A;
const RECEIPT_STATUS: u8 = 0x4C;
const DEVICE_INFO: u8 = 0x5A;
const TAX_NUMBER: u8 = 0x63;
const LAST_DOCUMENT: u8 = 0x71;
const OPEN_REVERSAL: u8 = 0x2B;

const DATE_TIME_FORMAT: &str = "%d-%m-%y %H:%M:%S";
const SEPARATOR: char = ',';
const TILL_NUMBER: &str = "1";

/// A field of the open-receipt header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenField {
    /// Operator number.
    Operator,
    /// Operator password, cut to the device limit.
    Password,
    /// Till number, always `1`.
    TillNumber,
    /// Unique sale number.
    UniqueSaleNumber,
}

/// What differs between the ISL vendors.
#[derive(Debug, Clone, Copy)]
pub struct IslProfile {
    /// Open-receipt header fields, in order.
    pub open_fields: &'static [OpenField],
    /// Command cancelling the open receipt.
    pub abort_command: u8,
    /// Default payment codes.
    pub payment_codes: &'static [(PaymentType, &'static str)],
}

/// Datecs C series.
pub const DATECS_C_ISL: IslProfile = IslProfile {
    open_fields: &[OpenField::Operator, OpenField::Password, OpenField::UniqueSaleNumber],
    abort_command: 0x3C,
    payment_codes: &[
        (PaymentType::Cash, "P"),
        (PaymentType::Check, "N"),
        (PaymentType::Card, "C"),
        (PaymentType::Packaging, "D"),
        (PaymentType::Reserved1, "I"),
        (PaymentType::Reserved2, "J"),
    ],
};

/// Daisy.
pub const DAISY_ISL: IslProfile = IslProfile {
    open_fields: &[
        OpenField::Operator,
        OpenField::Password,
        OpenField::TillNumber,
        OpenField::UniqueSaleNumber,
    ],
    abort_command: 0x82,
    payment_codes: &[
        (PaymentType::Cash, "P"),
        (PaymentType::Check, "N"),
        (PaymentType::Card, "C"),
        (PaymentType::Packaging, "D"),
    ],
};

/// Eltrade.
pub const ELTRADE_ISL: IslProfile = IslProfile {
    open_fields: &[OpenField::Operator, OpenField::Password, OpenField::UniqueSaleNumber],
    abort_command: 0x3C,
    payment_codes: &[
        (PaymentType::Cash, "P"),
        (PaymentType::Check, "N"),
        (PaymentType::Card, "C"),
        (PaymentType::Packaging, "D"),
        (PaymentType::Reserved1, "I"),
        (PaymentType::Reserved2, "J"),
    ],
};

/// Incotex.
pub const INCOTEX_ISL: IslProfile = IslProfile {
    open_fields: &[
        OpenField::Operator,
        OpenField::Password,
        OpenField::TillNumber,
        OpenField::UniqueSaleNumber,
    ],
    abort_command: 0x3C,
    payment_codes: &[
        (PaymentType::Cash, "P"),
        (PaymentType::Check, "N"),
        (PaymentType::Card, "C"),
        (PaymentType::Packaging, "D"),
        (PaymentType::Reserved1, "I"),
    ],
};

/// ISL command set parameterized by an [`IslProfile`].
#[derive(Debug, Clone)]
pub struct IslCommands {
    profile: IslProfile,
    options: CommandOptions,
    payments: PaymentCodes,
}

impl IslCommands {
    /// Build the command set for a vendor profile.
    pub fn new(profile: IslProfile, options: CommandOptions) -> Self {
        let payments = PaymentCodes::new(profile.payment_codes, &options.payment_types);
        Self {
            profile,
            options,
            payments,
        }
    }

    fn header(&self, unique_sale_number: &str, operator: &Credentials) -> String {
        let password = with_max_length(
            &operator.operator_password,
            self.options.operator_password_max_length,
        );
        self.profile
            .open_fields
            .iter()
            .map(|f| match f {
                OpenField::Operator => operator.operator.as_str(),
                OpenField::Password => password.as_str(),
                OpenField::TillNumber => TILL_NUMBER,
                OpenField::UniqueSaleNumber => unique_sale_number,
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn reversal_reason_code(reason: ReversalReason) -> char {
    match reason {
        ReversalReason::OperatorError => 'E',
        ReversalReason::Refund => 'R',
        ReversalReason::TaxBaseReduction => 'T',
    }
}

/// `,±pct` for percentages, `;±amount` for amounts.
fn isl_modifier(kind: PriceModifierType, value: Decimal) -> String {
    let signed = if kind.is_discount() { -value.abs() } else { value.abs() };
    match kind {
        PriceModifierType::None => String::new(),
        k if k.is_percent() => format!(",{}", format_signed(signed)),
        _ => format!(";{}", format_signed(signed)),
    }
}

impl CommandSet for IslCommands {
    fn open_receipt(&self, unique_sale_number: &str, operator: &Credentials) -> Command {
        Command::new(OPEN_RECEIPT, self.header(unique_sale_number, operator))
    }

    fn open_reversal_receipt(
        &self,
        reversal: &ReversalReceipt,
        operator: &Credentials,
    ) -> Result<Command, FiscalError> {
        let date_time = reversal.receipt_date_time.ok_or_else(|| FiscalError::Validation {
            code: codes::INVALID_REVERSAL,
            text: "receiptDateTime of the original receipt is required".into(),
        })?;
        let data = format!(
            "{},{}{},{},{}",
            self.header(&reversal.receipt.unique_sale_number, operator),
            reversal_reason_code(reversal.reason),
            reversal.receipt_number,
            date_time.format(DATE_TIME_FORMAT),
            reversal.fiscal_memory_serial_number,
        );
        Ok(Command::new(OPEN_REVERSAL, data))
    }

    fn add_item(&self, item: &Item) -> Result<Command, FiscalError> {
        let tax = tax_group_code(&CYRILLIC_TAX_GROUPS, item.tax_group)?;
        let mut data = format!(
            "{}\t{}{}",
            with_max_length(&item.text, self.options.item_text_max_length),
            tax,
            format_amount(item.unit_price),
        );
        if item.quantity != Decimal::ONE {
            data.push('*');
            data.push_str(&format_quantity(item.quantity));
        }
        data.push_str(&isl_modifier(item.price_modifier_type, item.price_modifier_value));
        Ok(Command::new(ADD_ITEM, data))
    }

    fn add_comment(&self, text: &str) -> Command {
        Command::new(
            ADD_COMMENT,
            with_max_length(text, self.options.comment_text_max_length),
        )
    }

    fn add_payment(&self, payment: &Payment) -> Result<Command, FiscalError> {
        let code = self.payments.code(payment.payment_type)?;
        Ok(Command::new(
            ADD_PAYMENT,
            format!("\t{code}{}", format_amount(payment.amount)),
        ))
    }

    fn full_payment(&self) -> Command {
        Command::new(ADD_PAYMENT, "\t")
    }

    fn close_receipt(&self) -> Command {
        Command::bare(CLOSE_RECEIPT)
    }

    fn abort_receipt(&self) -> Command {
        Command::bare(self.profile.abort_command)
    }

    fn money_transfer(
        &self,
        amount: Decimal,
        _operator: &Credentials,
    ) -> Result<Command, FiscalError> {
        Ok(Command::new(MONEY_TRANSFER, format_signed(amount)))
    }

    fn transfer_status(&self, response: &str) -> DeviceStatus {
        if response.starts_with('F') {
            DeviceStatus::from_error(codes::INSUFFICIENT_CASH, "Insufficient cash in the drawer")
        } else {
            DeviceStatus::new()
        }
    }

    fn daily_report(&self, zeroing: bool, _operator: &Credentials) -> Command {
        Command::new(DAILY_REPORT, if zeroing { "0" } else { "2" })
    }

    fn set_date_time(&self, date_time: NaiveDateTime) -> Command {
        Command::new(SET_DATE_TIME, date_time.format(DATE_TIME_FORMAT).to_string())
    }

    fn read_status(&self) -> Command {
        Command::bare(READ_STATUS)
    }

    fn receipt_amount(&self) -> Command {
        Command::new(RECEIPT_STATUS, "T")
    }

    fn parse_receipt_amount(&self, response: &str) -> Result<Decimal, FiscalError> {
        parse_scaled_amount(field(response, SEPARATOR, 2)?)
    }

    fn date_time(&self) -> Command {
        Command::bare(GET_DATE_TIME)
    }

    fn parse_date_time(&self, response: &str) -> Result<NaiveDateTime, FiscalError> {
        parse_date_time_with(response, DATE_TIME_FORMAT)
    }

    fn last_document_number(&self) -> Command {
        Command::bare(LAST_DOCUMENT)
    }

    fn parse_last_document_number(&self, response: &str) -> Result<String, FiscalError> {
        non_empty(field(response, SEPARATOR, 0)?, "document number")
    }

    fn tax_identification_number(&self) -> Command {
        Command::bare(TAX_NUMBER)
    }

    fn parse_tax_identification_number(&self, response: &str) -> Result<String, FiscalError> {
        non_empty(field(response, SEPARATOR, 0)?, "tax identification number")
    }

    fn device_info_commands(&self) -> Vec<Command> {
        vec![Command::new(DEVICE_INFO, "1")]
    }

    fn parse_device_info(&self, responses: &[String]) -> Result<ProbedInfo, FiscalError> {
        // Model,FwRev FwDate FwTime,Checksum,Switches,Serial,FMNumber
        let info = responses.first().map(String::as_str).unwrap_or_default();
        Ok(ProbedInfo {
            model: non_empty(field(info, SEPARATOR, 0)?, "model")?,
            firmware_version: field(info, SEPARATOR, 1)?.to_string(),
            serial_number: non_empty(field(info, SEPARATOR, 4)?, "serial number")?,
            fiscal_memory_serial_number: field(info, SEPARATOR, 5)?.to_string(),
        })
    }

    fn cash_amount(&self) -> Command {
        Command::bare(MONEY_TRANSFER)
    }

    fn parse_cash_amount(&self, response: &str) -> Result<Decimal, FiscalError> {
        parse_scaled_amount(field(response, SEPARATOR, 1)?)
    }

    fn supported_payment_types(&self) -> Vec<PaymentType> {
        self.payments.supported()
    }
}
