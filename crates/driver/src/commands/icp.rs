//! ICP command set (Isl-compatible "IS" devices on ICP framing).
//!
//! Commands are single letters, fields are `;`-separated and every amount
//! travels as integer hundredths.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::{
    Command, CommandOptions, CommandSet, DIGIT_TAX_GROUPS, PaymentCodes, field, format_minor_units,
    format_quantity, format_signed, non_empty, parse_date_time_with, parse_minor_units, tax_group_code,
    with_max_length,
};
use crate::FiscalError;
use crate::model::{
    Credentials, Item, Payment, PaymentType, PriceModifierType, ProbedInfo, ReversalReason,
    ReversalReceipt,
};
use bgfp_status::codes;

const OPEN_RECEIPT: u8 = b'O';
const SALE: u8 = b'S';
const COMMENT: u8 = b'C';
const PAYMENT: u8 = b'P';
const FULL_PAYMENT: u8 = b'T';
const CLOSE_RECEIPT: u8 = b'E';
const ABORT_RECEIPT: u8 = b'A';
const MONEY_TRANSFER: u8 = b'M';
const DAILY_REPORT: u8 = b'Z';
const RECEIPT_AMOUNT: u8 = b'R';
const GET_DATE_TIME: u8 = b'D';
const SET_DATE_TIME: u8 = b'd';
const LAST_DOCUMENT: u8 = b'N';
const DEVICE_INFO: u8 = b'I';
const READ_STATUS: u8 = b'Q';
const CASH_AMOUNT: u8 = b'K';
const OPEN_REVERSAL: u8 = b'V';
const TAX_NUMBER: u8 = b'F';

const DATE_TIME_FORMAT: &str = "%d-%m-%Y %H:%M:%S";
const SEPARATOR: char = ';';

const PAYMENT_CODES: &[(PaymentType, &str)] = &[
    (PaymentType::Cash, "0"),
    (PaymentType::Check, "1"),
    (PaymentType::Card, "2"),
    (PaymentType::Packaging, "3"),
    (PaymentType::Reserved1, "4"),
    (PaymentType::Reserved2, "5"),
];

/// Signed integer hundredths: `+150`, `-75`.
fn signed_minor_units(value: Decimal) -> Result<String, FiscalError> {
    if value.is_sign_negative() && !value.is_zero() {
        Ok(format!("-{}", format_minor_units(value.abs())?))
    } else {
        Ok(format!("+{}", format_minor_units(value)?))
    }
}

fn reversal_reason_code(reason: ReversalReason) -> &'static str {
    match reason {
        ReversalReason::OperatorError => "0",
        ReversalReason::Refund => "1",
        ReversalReason::TaxBaseReduction => "2",
    }
}

/// ICP command set.
#[derive(Debug, Clone)]
pub struct IcpCommands {
    options: CommandOptions,
    payments: PaymentCodes,
}

impl IcpCommands {
    /// Build the command set.
    pub fn new(options: CommandOptions) -> Self {
        let payments = PaymentCodes::new(PAYMENT_CODES, &options.payment_types);
        Self { options, payments }
    }

    fn header(&self, unique_sale_number: &str, operator: &Credentials) -> String {
        let password = with_max_length(
            &operator.operator_password,
            self.options.operator_password_max_length,
        );
        format!("{};{password};{unique_sale_number}", operator.operator)
    }
}

impl CommandSet for IcpCommands {
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
            "{};{};{};{};{}",
            self.header(&reversal.receipt.unique_sale_number, operator),
            reversal_reason_code(reversal.reason),
            reversal.receipt_number,
            date_time.format(DATE_TIME_FORMAT),
            reversal.fiscal_memory_serial_number,
        );
        Ok(Command::new(OPEN_REVERSAL, data))
    }

    fn add_item(&self, item: &Item) -> Result<Command, FiscalError> {
        let tax = tax_group_code(&DIGIT_TAX_GROUPS, item.tax_group)?;
        let mut data = format!(
            "{};{tax};{};{}",
            with_max_length(&item.text, self.options.item_text_max_length),
            format_minor_units(item.unit_price)?,
            format_quantity(item.quantity),
        );
        let kind = item.price_modifier_type;
        if kind != PriceModifierType::None {
            let value = item.price_modifier_value.abs();
            let signed = if kind.is_discount() { -value } else { value };
            if kind.is_percent() {
                data.push_str(&format!(";{}%", format_signed(signed)));
            } else {
                data.push_str(&format!(";{}", signed_minor_units(signed)?));
            }
        }
        Ok(Command::new(SALE, data))
    }

    fn add_comment(&self, text: &str) -> Command {
        Command::new(
            COMMENT,
            with_max_length(text, self.options.comment_text_max_length),
        )
    }

    fn add_payment(&self, payment: &Payment) -> Result<Command, FiscalError> {
        let code = self.payments.code(payment.payment_type)?;
        Ok(Command::new(
            PAYMENT,
            format!("{code};{}", format_minor_units(payment.amount)?),
        ))
    }

    fn full_payment(&self) -> Command {
        Command::bare(FULL_PAYMENT)
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
        Ok(Command::new(MONEY_TRANSFER, signed_minor_units(amount)?))
    }

    fn daily_report(&self, zeroing: bool, _operator: &Credentials) -> Command {
        Command::new(DAILY_REPORT, if zeroing { "1" } else { "0" })
    }

    fn set_date_time(&self, date_time: NaiveDateTime) -> Command {
        Command::new(SET_DATE_TIME, date_time.format(DATE_TIME_FORMAT).to_string())
    }

    fn read_status(&self) -> Command {
        Command::bare(READ_STATUS)
    }

    fn receipt_amount(&self) -> Command {
        Command::bare(RECEIPT_AMOUNT)
    }

    fn parse_receipt_amount(&self, response: &str) -> Result<Decimal, FiscalError> {
        parse_minor_units(field(response, SEPARATOR, 0)?)
    }

    fn date_time(&self) -> Command {
        Command::bare(GET_DATE_TIME)
    }

    fn parse_date_time(&self, response: &str) -> Result<NaiveDateTime, FiscalError> {
        parse_date_time_with(field(response, SEPARATOR, 0)?, DATE_TIME_FORMAT)
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
        vec![Command::bare(DEVICE_INFO)]
    }

    fn parse_device_info(&self, responses: &[String]) -> Result<ProbedInfo, FiscalError> {
        let info = responses.first().map(String::as_str).unwrap_or_default();
        Ok(ProbedInfo {
            model: non_empty(field(info, SEPARATOR, 0)?, "model")?,
            firmware_version: field(info, SEPARATOR, 1)?.to_string(),
            serial_number: non_empty(field(info, SEPARATOR, 2)?, "serial number")?,
            fiscal_memory_serial_number: field(info, SEPARATOR, 3)?.to_string(),
        })
    }

    fn cash_amount(&self) -> Command {
        Command::bare(CASH_AMOUNT)
    }

    fn parse_cash_amount(&self, response: &str) -> Result<Decimal, FiscalError> {
        parse_minor_units(field(response, SEPARATOR, 0)?)
    }

    fn supported_payment_types(&self) -> Vec<PaymentType> {
        self.payments.supported()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaxGroup;
    use rust_decimal_macros::dec;

    fn commands() -> IcpCommands {
        IcpCommands::new(CommandOptions::default())
    }

    #[test]
    fn commands_are_letters() {
        let c = commands();
        assert_eq!(c.close_receipt().code, u16::from(b'E'));
        assert_eq!(c.abort_receipt().code, u16::from(b'A'));
        assert_eq!(c.read_status().code, u16::from(b'Q'));
    }

    #[test]
    fn sale_in_minor_units() {
        let mut item = Item::sale("Кафе", TaxGroup::TaxGroup2, dec!(1.5));
        item.quantity = dec!(2);
        let cmd = commands().add_item(&item).unwrap();
        assert_eq!(cmd.data, "Кафе;2;150;2.000");

        item.price_modifier_type = PriceModifierType::DiscountPercent;
        item.price_modifier_value = dec!(10);
        assert_eq!(commands().add_item(&item).unwrap().data, "Кафе;2;150;2.000;-10.00%");

        item.price_modifier_type = PriceModifierType::SurchargeAmount;
        item.price_modifier_value = dec!(0.25);
        assert_eq!(commands().add_item(&item).unwrap().data, "Кафе;2;150;2.000;+25");
    }

    #[test]
    fn payment_and_transfer() {
        let cmd = commands()
            .add_payment(&Payment::new(PaymentType::Card, dec!(3)))
            .unwrap();
        assert_eq!(cmd.data, "2;300");
        let creds = Credentials::default();
        assert_eq!(commands().money_transfer(dec!(-7.5), &creds).unwrap().data, "-750");
        assert_eq!(commands().money_transfer(dec!(20), &creds).unwrap().data, "+2000");
        assert_eq!(
            commands().money_transfer(Decimal::MIN, &creds).unwrap_err().code(),
            "E405"
        );
    }

    #[test]
    fn out_of_range_prices_are_errors() {
        let mut item = Item::sale("Кафе", TaxGroup::TaxGroup2, Decimal::MAX);
        assert_eq!(commands().add_item(&item).unwrap_err().code(), "E405");
        item.unit_price = dec!(1);
        item.price_modifier_type = PriceModifierType::SurchargeAmount;
        item.price_modifier_value = Decimal::MAX;
        assert_eq!(commands().add_item(&item).unwrap_err().code(), "E405");
        let payment = Payment::new(PaymentType::Cash, Decimal::MAX);
        assert_eq!(commands().add_payment(&payment).unwrap_err().code(), "E405");
    }

    #[test]
    fn amounts_are_hundredths() {
        assert_eq!(commands().parse_receipt_amount("1999").unwrap(), dec!(19.99));
        assert_eq!(commands().parse_cash_amount("0;0").unwrap(), dec!(0));
        assert!(commands().parse_cash_amount("19.99").is_err());
    }

    #[test]
    fn device_info() {
        let info = commands()
            .parse_device_info(&["ISL5011;1.02;IS123456;54123456".to_string()])
            .unwrap();
        assert_eq!(info.serial_number, "IS123456");
        assert_eq!(info.fiscal_memory_serial_number, "54123456");
    }

    #[test]
    fn open_and_reversal() {
        let creds = Credentials::new("1", "0000");
        assert_eq!(
            commands().open_receipt("IS123456-0001-0000001", &creds).data,
            "1;0000;IS123456-0001-0000001"
        );
        let mut reversal = ReversalReceipt::default();
        reversal.receipt.unique_sale_number = "IS123456-0001-0000002".into();
        reversal.receipt_number = "42".into();
        reversal.fiscal_memory_serial_number = "54123456".into();
        assert_eq!(
            commands().open_reversal_receipt(&reversal, &creds).unwrap_err().code(),
            "E412"
        );
        reversal.reason = ReversalReason::Refund;
        reversal.receipt_date_time = chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(9, 0, 0));
        assert_eq!(
            commands().open_reversal_receipt(&reversal, &creds).unwrap().data,
            "1;0000;IS123456-0001-0000002;1;42;01-03-2024 09:00:00;54123456"
        );
    }
}
