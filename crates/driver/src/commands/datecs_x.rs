//! Datecs X series command set (ISL-X framing).
//!
//! Every request and response is a list of tab-terminated fields. Every
//! response starts with an error code field; anything but `0` is a failure.

use bgfp_status::{DeviceStatus, codes};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::{
    Command, CommandOptions, CommandSet, DIGIT_TAX_GROUPS, PaymentCodes, field, format_amount,
    format_quantity, non_empty, parse_date_time_with, parse_signed_amount, tax_group_code,
    with_max_length,
};
use crate::FiscalError;
use crate::model::{
    Credentials, Item, Payment, PaymentType, PriceModifierType, ProbedInfo, ReversalReason,
    ReversalReceipt,
};

const OPEN_REVERSAL: u16 = 0x2B;
const OPEN_RECEIPT: u16 = 0x30;
const ADD_ITEM: u16 = 0x31;
const ADD_PAYMENT: u16 = 0x35;
const ADD_COMMENT: u16 = 0x36;
const CLOSE_RECEIPT: u16 = 0x38;
const ABORT_RECEIPT: u16 = 0x3C;
const SET_DATE_TIME: u16 = 0x3D;
const GET_DATE_TIME: u16 = 0x3E;
const DAILY_REPORT: u16 = 0x45;
const MONEY_TRANSFER: u16 = 0x46;
const READ_STATUS: u16 = 0x4A;
const RECEIPT_STATUS: u16 = 0x4C;
const DEVICE_INFO: u16 = 0x5A;
const TAX_NUMBER: u16 = 0x63;
const LAST_DOCUMENT: u16 = 0x71;

const DATE_TIME_FORMAT: &str = "%d-%m-%y %H:%M:%S";
const TAB: char = '\t';
const TILL_NUMBER: &str = "1";

const PAYMENT_CODES: &[(PaymentType, &str)] = &[
    (PaymentType::Cash, "0"),
    (PaymentType::Card, "1"),
    (PaymentType::Check, "3"),
    (PaymentType::Packaging, "4"),
    (PaymentType::Reserved1, "5"),
    (PaymentType::Reserved2, "6"),
];

/// Join fields, terminating each with a tab.
fn fields(values: &[&str]) -> String {
    values.iter().map(|v| format!("{v}\t")).collect()
}

fn modifier_type_code(kind: PriceModifierType) -> &'static str {
    match kind {
        PriceModifierType::None => "0",
        PriceModifierType::SurchargePercent => "1",
        PriceModifierType::DiscountPercent => "2",
        PriceModifierType::SurchargeAmount => "3",
        PriceModifierType::DiscountAmount => "4",
    }
}

fn reversal_reason_code(reason: ReversalReason) -> &'static str {
    match reason {
        ReversalReason::OperatorError => "0",
        ReversalReason::Refund => "1",
        ReversalReason::TaxBaseReduction => "2",
    }
}

/// Datecs X command set.
#[derive(Debug, Clone)]
pub struct DatecsXCommands {
    options: CommandOptions,
    payments: PaymentCodes,
}

impl DatecsXCommands {
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

impl CommandSet for DatecsXCommands {
    fn open_receipt(&self, unique_sale_number: &str, operator: &Credentials) -> Command {
        let password = self.password(operator);
        Command::new(
            OPEN_RECEIPT,
            fields(&[&operator.operator, &password, unique_sale_number, TILL_NUMBER, ""]),
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
        let password = self.password(operator);
        let date_time = date_time.format(DATE_TIME_FORMAT).to_string();
        Ok(Command::new(
            OPEN_REVERSAL,
            fields(&[
                &operator.operator,
                &password,
                &reversal.receipt.unique_sale_number,
                TILL_NUMBER,
                reversal_reason_code(reversal.reason),
                &reversal.receipt_number,
                &date_time,
                &reversal.fiscal_memory_serial_number,
            ]),
        ))
    }

    fn add_item(&self, item: &Item) -> Result<Command, FiscalError> {
        let tax = tax_group_code(&DIGIT_TAX_GROUPS, item.tax_group)?.to_string();
        let text = with_max_length(&item.text, self.options.item_text_max_length);
        let price = format_amount(item.unit_price);
        let quantity = format_quantity(item.quantity);
        let value = match item.price_modifier_type {
            PriceModifierType::None => String::new(),
            _ => format_amount(item.price_modifier_value.abs()),
        };
        Ok(Command::new(
            ADD_ITEM,
            fields(&[
                &text,
                &tax,
                &price,
                &quantity,
                modifier_type_code(item.price_modifier_type),
                &value,
                "",
            ]),
        ))
    }

    fn add_comment(&self, text: &str) -> Command {
        let text = with_max_length(text, self.options.comment_text_max_length);
        Command::new(ADD_COMMENT, fields(&[&text]))
    }

    fn add_payment(&self, payment: &Payment) -> Result<Command, FiscalError> {
        let code = self.payments.code(payment.payment_type)?;
        Ok(Command::new(
            ADD_PAYMENT,
            fields(&[code, &format_amount(payment.amount)]),
        ))
    }

    fn full_payment(&self) -> Command {
        let cash = self.payments.code(PaymentType::Cash).unwrap_or("0");
        Command::new(ADD_PAYMENT, fields(&[cash, ""]))
    }

    fn close_receipt(&self) -> Command {
        Command::bare(CLOSE_RECEIPT)
    }

    fn abort_receipt(&self) -> Command {
        Command::bare(ABORT_RECEIPT)
    }

    fn money_transfer(
        &self,
        amount: Decimal,
        _operator: &Credentials,
    ) -> Result<Command, FiscalError> {
        let kind = if amount.is_sign_negative() { "1" } else { "0" };
        Ok(Command::new(MONEY_TRANSFER, fields(&[kind, &format_amount(amount.abs())])))
    }

    fn daily_report(&self, zeroing: bool, _operator: &Credentials) -> Command {
        Command::new(DAILY_REPORT, fields(&[if zeroing { "Z" } else { "X" }]))
    }

    fn set_date_time(&self, date_time: NaiveDateTime) -> Command {
        Command::new(
            SET_DATE_TIME,
            fields(&[&date_time.format(DATE_TIME_FORMAT).to_string()]),
        )
    }

    fn read_status(&self) -> Command {
        Command::bare(READ_STATUS)
    }

    fn receipt_amount(&self) -> Command {
        Command::bare(RECEIPT_STATUS)
    }

    fn parse_receipt_amount(&self, response: &str) -> Result<Decimal, FiscalError> {
        // ErrorCode IsOpen Number Items Amount Paid
        parse_signed_amount(field(response, TAB, 4)?)
    }

    fn date_time(&self) -> Command {
        Command::bare(GET_DATE_TIME)
    }

    fn parse_date_time(&self, response: &str) -> Result<NaiveDateTime, FiscalError> {
        parse_date_time_with(field(response, TAB, 1)?, DATE_TIME_FORMAT)
    }

    fn last_document_number(&self) -> Command {
        Command::bare(LAST_DOCUMENT)
    }

    fn parse_last_document_number(&self, response: &str) -> Result<String, FiscalError> {
        non_empty(field(response, TAB, 1)?, "document number")
    }

    fn tax_identification_number(&self) -> Command {
        Command::bare(TAX_NUMBER)
    }

    fn parse_tax_identification_number(&self, response: &str) -> Result<String, FiscalError> {
        non_empty(field(response, TAB, 1)?, "tax identification number")
    }

    fn device_info_commands(&self) -> Vec<Command> {
        vec![Command::new(DEVICE_INFO, fields(&["1"]))]
    }

    fn parse_device_info(&self, responses: &[String]) -> Result<ProbedInfo, FiscalError> {
        // ErrorCode Model FwRev FwDate FwTime Checksum Switches Serial FMNumber
        let info = responses.first().map(String::as_str).unwrap_or_default();
        Ok(ProbedInfo {
            model: non_empty(field(info, TAB, 1)?, "model")?,
            firmware_version: field(info, TAB, 2)?.to_string(),
            serial_number: non_empty(field(info, TAB, 7)?, "serial number")?,
            fiscal_memory_serial_number: field(info, TAB, 8)?.to_string(),
        })
    }

    fn cash_amount(&self) -> Command {
        Command::new(MONEY_TRANSFER, fields(&["0", ""]))
    }

    fn parse_cash_amount(&self, response: &str) -> Result<Decimal, FiscalError> {
        // ErrorCode CashSum CashIn CashOut
        parse_signed_amount(field(response, TAB, 1)?)
    }

    fn response_status(&self, response: &str) -> DeviceStatus {
        let Some(first) = response.split(TAB).next().map(str::trim) else {
            return DeviceStatus::new();
        };
        match first.parse::<i64>() {
            Ok(0) => DeviceStatus::new(),
            Ok(n) => DeviceStatus::from_error(
                codes::DEVICE_ERROR_CODE,
                format!("Error code {n}, see the device manual"),
            ),
            Err(_) if first.is_empty() => DeviceStatus::new(),
            Err(_) => DeviceStatus::from_error(
                codes::INVALID_RESPONSE,
                format!("Response does not start with an error code: {response:?}"),
            ),
        }
    }

    fn supported_payment_types(&self) -> Vec<PaymentType> {
        self.payments.supported()
    }
}
