//! Tremol ZFP command set.
//!
//! Fields are `;`-separated and amounts are plain decimals. Errors arrive in
//! the ACK frame status, so responses carry no error field of their own.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::{
    CYRILLIC_TAX_GROUPS, Command, CommandOptions, CommandSet, PaymentCodes, field, format_amount,
    format_quantity, format_signed, non_empty, parse_date_time_with, parse_decimal,
    tax_group_code, with_max_length,
};
use crate::FiscalError;
use crate::model::{
    Credentials, Item, Payment, PaymentType, PriceModifierType, ProbedInfo, ReversalReason,
    ReversalReceipt,
};
use bgfp_status::codes;

const READ_STATUS: u8 = 0x20;
const OPEN_RECEIPT: u8 = 0x30;
const SELL: u8 = 0x31;
const OPEN_STORNO: u8 = 0x32;
const PAYMENT: u8 = 0x35;
const PAY_EXACT_SUM: u8 = 0x36;
const PRINT_TEXT: u8 = 0x37;
const CLOSE_RECEIPT: u8 = 0x38;
const CANCEL_RECEIPT: u8 = 0x39;
const CASH_IN_OUT: u8 = 0x3B;
const SET_DATE_TIME: u8 = 0x48;
const READ_SERIAL_NUMBERS: u8 = 0x60;
const READ_TAX_NUMBER: u8 = 0x61;
const READ_DATE_TIME: u8 = 0x68;
const READ_CASH: u8 = 0x6E;
const READ_LAST_DOCUMENT: u8 = 0x71;
const READ_RECEIPT_INFO: u8 = 0x72;
const DAILY_REPORT: u8 = 0x7C;
const READ_VERSION: u8 = 0x90;

const DATE_TIME_FORMAT: &str = "%d-%m-%Y %H:%M:%S";
const STORNO_DATE_TIME_FORMAT: &str = "%d-%m-%y %H:%M:%S";
const SEPARATOR: char = ';';

// ReceiptFormat;PrintVAT;FiscalRcpPrintType: brief, no VAT lines, step by step
const RECEIPT_FLAGS: &str = "0;0;0";

const PAYMENT_CODES: &[(PaymentType, &str)] = &[
    (PaymentType::Cash, "0"),
    (PaymentType::Check, "1"),
    (PaymentType::Packaging, "4"),
    (PaymentType::Card, "7"),
    (PaymentType::Reserved1, "9"),
    (PaymentType::Reserved2, "10"),
];

fn storno_reason_code(reason: ReversalReason) -> &'static str {
    match reason {
        ReversalReason::OperatorError => "0",
        ReversalReason::Refund => "1",
        ReversalReason::TaxBaseReduction => "2",
    }
}

/// Tremol ZFP command set.
#[derive(Debug, Clone)]
pub struct ZfpCommands {
    options: CommandOptions,
    payments: PaymentCodes,
}

impl ZfpCommands {
    /// Build the command set.
    pub fn new(options: CommandOptions) -> Self {
        let payments = PaymentCodes::new(PAYMENT_CODES, &options.payment_types);
        Self { options, payments }
    }

    fn password(&self, operator: &Credentials) -> String {
        with_max_length(
            &operator.operator_password,
            self.options.operator_password_max_length,
        )
    }
}

impl CommandSet for ZfpCommands {
    fn open_receipt(&self, unique_sale_number: &str, operator: &Credentials) -> Command {
        Command::new(
            OPEN_RECEIPT,
            format!(
                "{};{};{RECEIPT_FLAGS}${unique_sale_number}",
                operator.operator,
                self.password(operator)
            ),
        )
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
            "{};{};{RECEIPT_FLAGS};{};{};{};{};{}",
            operator.operator,
            self.password(operator),
            storno_reason_code(reversal.reason),
            reversal.receipt_number,
            date_time.format(STORNO_DATE_TIME_FORMAT),
            reversal.fiscal_memory_serial_number,
            reversal.receipt.unique_sale_number,
        );
        Ok(Command::new(OPEN_STORNO, data))
    }

    fn add_item(&self, item: &Item) -> Result<Command, FiscalError> {
        let tax = tax_group_code(&CYRILLIC_TAX_GROUPS, item.tax_group)?;
        let mut data = format!(
            "{};{tax};{}",
            with_max_length(&item.text, self.options.item_text_max_length),
            format_amount(item.unit_price),
        );
        if item.quantity != Decimal::ONE {
            data.push('*');
            data.push_str(&format_quantity(item.quantity));
        }
        let kind = item.price_modifier_type;
        if kind != PriceModifierType::None {
            let value = item.price_modifier_value.abs();
            let signed = format_signed(if kind.is_discount() { -value } else { value });
            data.push(if kind.is_percent() { ',' } else { ':' });
            data.push_str(&signed);
        }
        Ok(Command::new(SELL, data))
    }

    fn add_comment(&self, text: &str) -> Command {
        Command::new(
            PRINT_TEXT,
            with_max_length(text, self.options.comment_text_max_length),
        )
    }

    fn add_payment(&self, payment: &Payment) -> Result<Command, FiscalError> {
        let code = self.payments.code(payment.payment_type)?;
        Ok(Command::new(
            PAYMENT,
            format!("{code};0;{}", format_amount(payment.amount)),
        ))
    }

    fn full_payment(&self) -> Command {
        let cash = self.payments.code(PaymentType::Cash).unwrap_or("0");
        Command::new(PAY_EXACT_SUM, cash)
    }

    fn close_receipt(&self) -> Command {
        Command::bare(CLOSE_RECEIPT)
    }

    fn abort_receipt(&self) -> Command {
        Command::bare(CANCEL_RECEIPT)
    }

    fn money_transfer(
        &self,
        amount: Decimal,
        operator: &Credentials,
    ) -> Result<Command, FiscalError> {
        Ok(Command::new(
            CASH_IN_OUT,
            format!(
                "{};{};0;{}",
                operator.operator,
                self.password(operator),
                format_signed(amount)
            ),
        ))
    }

    fn daily_report(&self, zeroing: bool, _operator: &Credentials) -> Command {
        Command::new(DAILY_REPORT, if zeroing { "Z" } else { "X" })
    }

    fn set_date_time(&self, date_time: NaiveDateTime) -> Command {
        Command::new(SET_DATE_TIME, date_time.format(DATE_TIME_FORMAT).to_string())
    }

    fn read_status(&self) -> Command {
        Command::bare(READ_STATUS)
    }

    fn status_in_data(&self) -> bool {
        true
    }

    fn receipt_amount(&self) -> Command {
        Command::bare(READ_RECEIPT_INFO)
    }

    fn parse_receipt_amount(&self, response: &str) -> Result<Decimal, FiscalError> {
        // IsOpen;Amount;...
        parse_decimal(field(response, SEPARATOR, 1)?)
    }

    fn date_time(&self) -> Command {
        Command::bare(READ_DATE_TIME)
    }

    fn parse_date_time(&self, response: &str) -> Result<NaiveDateTime, FiscalError> {
        parse_date_time_with(field(response, SEPARATOR, 0)?, DATE_TIME_FORMAT)
    }

    fn last_document_number(&self) -> Command {
        Command::bare(READ_LAST_DOCUMENT)
    }

    fn parse_last_document_number(&self, response: &str) -> Result<String, FiscalError> {
        non_empty(field(response, SEPARATOR, 0)?, "document number")
    }

    fn tax_identification_number(&self) -> Command {
        Command::bare(READ_TAX_NUMBER)
    }

    fn parse_tax_identification_number(&self, response: &str) -> Result<String, FiscalError> {
        non_empty(field(response, SEPARATOR, 0)?, "tax identification number")
    }

    fn device_info_commands(&self) -> Vec<Command> {
        vec![Command::bare(READ_VERSION), Command::bare(READ_SERIAL_NUMBERS)]
    }

    fn parse_device_info(&self, responses: &[String]) -> Result<ProbedInfo, FiscalError> {
        let [version, serials] = responses else {
            return Err(FiscalError::UnexpectedResponse {
                details: format!("expected 2 device info responses, got {}", responses.len()),
            });
        };
        Ok(ProbedInfo {
            model: non_empty(field(version, SEPARATOR, 0)?, "model")?,
            firmware_version: field(version, SEPARATOR, 1)?.to_string(),
            serial_number: non_empty(field(serials, SEPARATOR, 0)?, "serial number")?,
            fiscal_memory_serial_number: field(serials, SEPARATOR, 1)?.to_string(),
        })
    }

    fn cash_amount(&self) -> Command {
        Command::bare(READ_CASH)
    }

    fn parse_cash_amount(&self, response: &str) -> Result<Decimal, FiscalError> {
        parse_decimal(field(response, SEPARATOR, 0)?)
    }

    fn supported_payment_types(&self) -> Vec<PaymentType> {
        self.payments.supported()
    }
}
