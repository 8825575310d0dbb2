//! Vendor command sets.
//!
//! A [`CommandSet`] renders domain requests into `(command, payload)` pairs
//! and parses response text back into typed values. It never touches the
//! channel; the [`Link`](crate::Link) sends what it renders.

mod datecs_x;
mod icp;
mod isl;
mod zfp;

pub use datecs_x::DatecsXCommands;
pub use icp::IcpCommands;
pub use isl::{DAISY_ISL, DATECS_C_ISL, ELTRADE_ISL, INCOTEX_ISL, IslCommands, IslProfile, OpenField};
pub use zfp::ZfpCommands;

use std::collections::BTreeMap;
use std::str::FromStr;

use bgfp_status::{DeviceStatus, codes};
use chrono::NaiveDateTime;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::FiscalError;
use crate::model::{Credentials, Item, Payment, PaymentType, ProbedInfo, ReversalReceipt, TaxGroup};

// ── Command ─────────────────────────────────────────────────────────────

/// A rendered request: command code plus payload text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command code; one byte on every family except ISL-X.
    pub code: u16,
    /// Payload, encoded to the device code page when sent.
    pub data: String,
}

impl Command {
    /// A command with payload.
    pub fn new(code: impl Into<u16>, data: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            data: data.into(),
        }
    }

    /// A command without payload.
    pub fn bare(code: impl Into<u16>) -> Self {
        Self::new(code, String::new())
    }
}

// ── Options ─────────────────────────────────────────────────────────────

/// Per-device limits and payment-code overrides a command set renders with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOptions {
    /// Item names are cut to this many characters.
    pub item_text_max_length: usize,
    /// Comment lines are cut to this many characters.
    pub comment_text_max_length: usize,
    /// Operator passwords are cut to this many characters.
    pub operator_password_max_length: usize,
    /// Payment codes replacing the vendor defaults.
    pub payment_types: BTreeMap<PaymentType, String>,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            item_text_max_length: 36,
            comment_text_max_length: 42,
            operator_password_max_length: 8,
            payment_types: BTreeMap::new(),
        }
    }
}

// ── CommandSet ──────────────────────────────────────────────────────────

/// Renders requests and parses responses for one vendor.
pub trait CommandSet: Send + Sync {
    /// Open a fiscal receipt.
    fn open_receipt(&self, unique_sale_number: &str, operator: &Credentials) -> Command;

    /// Open a reversal receipt referencing the original document.
    fn open_reversal_receipt(
        &self,
        reversal: &ReversalReceipt,
        operator: &Credentials,
    ) -> Result<Command, FiscalError>;

    /// Register a sale line. Fails with `E411` for an unmapped tax group.
    fn add_item(&self, item: &Item) -> Result<Command, FiscalError>;

    /// Print a comment line.
    fn add_comment(&self, text: &str) -> Command;

    /// Register a payment. Fails with `E406` for an unmapped payment type.
    fn add_payment(&self, payment: &Payment) -> Result<Command, FiscalError>;

    /// Pay the remaining total in cash.
    fn full_payment(&self) -> Command;

    /// Close the open receipt.
    fn close_receipt(&self) -> Command;

    /// Cancel the open receipt.
    fn abort_receipt(&self) -> Command;

    /// Deposit (positive) or withdraw (negative) cash.
    fn money_transfer(&self, amount: Decimal, operator: &Credentials)
    -> Result<Command, FiscalError>;

    /// Extra failure reported in the transfer response body.
    fn transfer_status(&self, _response: &str) -> DeviceStatus {
        DeviceStatus::new()
    }

    /// Print a Z (zeroing) or X daily report.
    fn daily_report(&self, zeroing: bool, operator: &Credentials) -> Command;

    /// Set the device clock.
    fn set_date_time(&self, date_time: NaiveDateTime) -> Command;

    /// Read the device status.
    fn read_status(&self) -> Command;

    /// `true` when [`read_status`](Self::read_status) returns the status
    /// block in the response data instead of the frame status field.
    fn status_in_data(&self) -> bool {
        false
    }

    /// Query the current receipt amount.
    fn receipt_amount(&self) -> Command;
    /// Parse the receipt amount response.
    fn parse_receipt_amount(&self, response: &str) -> Result<Decimal, FiscalError>;

    /// Query the device clock.
    fn date_time(&self) -> Command;
    /// Parse the device clock response.
    fn parse_date_time(&self, response: &str) -> Result<NaiveDateTime, FiscalError>;

    /// Query the number of the last printed document.
    fn last_document_number(&self) -> Command;
    /// Parse the last document number response.
    fn parse_last_document_number(&self, response: &str) -> Result<String, FiscalError>;

    /// Query the tax identification number.
    fn tax_identification_number(&self) -> Command;
    /// Parse the tax identification number response.
    fn parse_tax_identification_number(&self, response: &str) -> Result<String, FiscalError>;

    /// Commands whose responses identify the device, in send order.
    fn device_info_commands(&self) -> Vec<Command>;
    /// Parse the responses of [`device_info_commands`](Self::device_info_commands).
    fn parse_device_info(&self, responses: &[String]) -> Result<ProbedInfo, FiscalError>;

    /// Query the cash in the drawer.
    fn cash_amount(&self) -> Command;
    /// Parse the cash amount response.
    fn parse_cash_amount(&self, response: &str) -> Result<Decimal, FiscalError>;

    /// Errors carried in the response body rather than the status field.
    fn response_status(&self, _response: &str) -> DeviceStatus {
        DeviceStatus::new()
    }

    /// Payment types this device has a code for.
    fn supported_payment_types(&self) -> Vec<PaymentType>;

    /// `true` if items accept discounts and surcharges.
    fn supports_price_modifiers(&self) -> bool {
        true
    }
}

// ── Payment codes ───────────────────────────────────────────────────────

/// Vendor payment codes with configured overrides applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PaymentCodes(BTreeMap<PaymentType, String>);

impl PaymentCodes {
    pub(crate) fn new(
        defaults: &[(PaymentType, &str)],
        overrides: &BTreeMap<PaymentType, String>,
    ) -> Self {
        let mut map: BTreeMap<_, _> = defaults
            .iter()
            .map(|(t, c)| (*t, (*c).to_string()))
            .collect();
        for (t, c) in overrides {
            if !matches!(t, PaymentType::Unspecified | PaymentType::Change) {
                map.insert(*t, c.clone());
            }
        }
        Self(map)
    }

    pub(crate) fn code(&self, payment_type: PaymentType) -> Result<&str, FiscalError> {
        self.0
            .get(&payment_type)
            .map(String::as_str)
            .ok_or_else(|| FiscalError::UnsupportedValue {
                code: codes::UNSUPPORTED_PAYMENT_TYPE,
                text: format!("Unsupported payment type: {payment_type:?}"),
            })
    }

    pub(crate) fn supported(&self) -> Vec<PaymentType> {
        self.0.keys().copied().collect()
    }
}

/// Map a tax group onto a vendor code, failing with `E411`.
pub(crate) fn tax_group_code(
    table: &[char; 8],
    tax_group: TaxGroup,
) -> Result<char, FiscalError> {
    tax_group
        .index()
        .map(|i| table[i])
        .ok_or_else(|| FiscalError::UnsupportedValue {
            code: codes::UNSUPPORTED_TAX_GROUP,
            text: format!("Unsupported tax group: {tax_group:?}"),
        })
}

/// Cyrillic tax group letters А..З.
pub(crate) const CYRILLIC_TAX_GROUPS: [char; 8] = ['А', 'Б', 'В', 'Г', 'Д', 'Е', 'Ж', 'З'];

/// Digit tax group codes 1..8.
pub(crate) const DIGIT_TAX_GROUPS: [char; 8] = ['1', '2', '3', '4', '5', '6', '7', '8'];

// ── Text and number formatting ──────────────────────────────────────────

/// Cut `text` to at most `max` characters.
pub fn with_max_length(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

/// `12.5` → `"12.50"`, half away from zero.
pub fn format_amount(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.2}")
}

/// `2` → `"2.000"`.
pub fn format_quantity(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.3}")
}

/// `12.5` → `"1250"`; amounts without a hundredths representation are E405.
pub(crate) fn format_minor_units(value: Decimal) -> Result<String, FiscalError> {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|minor| minor.trunc().to_string())
        .ok_or_else(|| FiscalError::Validation {
            code: codes::OVERFLOW,
            text: format!("Amount {value} is out of range"),
        })
}

/// Explicit sign followed by the formatted amount: `"+10.00"`, `"-5.00"`.
pub(crate) fn format_signed(value: Decimal) -> String {
    if value.is_sign_negative() && !value.is_zero() {
        format!("-{}", format_amount(value.abs()))
    } else {
        format!("+{}", format_amount(value))
    }
}

fn unexpected(details: String) -> FiscalError {
    FiscalError::UnexpectedResponse { details }
}

/// The trimmed `index`-th field of `response`.
pub(crate) fn field(response: &str, separator: char, index: usize) -> Result<&str, FiscalError> {
    response
        .split(separator)
        .nth(index)
        .map(str::trim)
        .ok_or_else(|| unexpected(format!("no field {index} in response {response:?}")))
}

fn parse_plain(text: &str) -> Result<Decimal, FiscalError> {
    Decimal::from_str(text).map_err(|e| unexpected(format!("invalid amount {text:?}: {e}")))
}

fn parse_hundredths(text: &str) -> Result<Decimal, FiscalError> {
    text.parse::<i64>()
        .map(|v| Decimal::new(v, 2))
        .map_err(|e| unexpected(format!("invalid amount {text:?}: {e}")))
}

/// ISL amounts: as-is when the text has a decimal point, hundredths otherwise.
pub fn parse_scaled_amount(text: &str) -> Result<Decimal, FiscalError> {
    let text = text.trim();
    if text.contains('.') {
        parse_plain(text)
    } else {
        parse_hundredths(text)
    }
}

/// Datecs X amounts: an optional leading sign, then the rule of
/// [`parse_scaled_amount`] applied to the unsigned digits.
pub fn parse_signed_amount(text: &str) -> Result<Decimal, FiscalError> {
    let text = text.trim();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    if digits.starts_with(['+', '-']) {
        return Err(unexpected(format!("invalid amount {text:?}")));
    }
    let value = parse_scaled_amount(digits)?;
    Ok(if negative { -value } else { value })
}

/// ICP amounts: always integer hundredths.
pub fn parse_minor_units(text: &str) -> Result<Decimal, FiscalError> {
    parse_hundredths(text.trim())
}

/// ZFP amounts: plain decimal text.
pub fn parse_decimal(text: &str) -> Result<Decimal, FiscalError> {
    parse_plain(text.trim())
}

pub(crate) fn parse_date_time_with(text: &str, format: &str) -> Result<NaiveDateTime, FiscalError> {
    NaiveDateTime::parse_from_str(text.trim(), format)
        .map_err(|e| unexpected(format!("invalid date/time {text:?}: {e}")))
}

/// Reject an empty required response field.
pub(crate) fn non_empty(value: &str, what: &str) -> Result<String, FiscalError> {
    if value.is_empty() {
        Err(unexpected(format!("empty {what}")))
    } else {
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(with_max_length("Хляб бял", 4), "Хляб");
        assert_eq!(with_max_length("abc", 10), "abc");
        assert_eq!(with_max_length("abc", 0), "");
    }

    #[test]
    fn truncation_is_idempotent() {
        for text in ["", "a", "Кисело мляко 3.6%", "0123456789"] {
            for n in 0..12 {
                let once = with_max_length(text, n);
                assert_eq!(with_max_length(&once, n), once);
                if text.chars().count() <= n {
                    assert_eq!(once, text);
                }
            }
        }
    }

    #[test]
    fn amount_formatting() {
        assert_eq!(format_amount(dec!(12.5)), "12.50");
        assert_eq!(format_amount(dec!(0.005)), "0.01");
        assert_eq!(format_amount(dec!(-0.005)), "-0.01");
        assert_eq!(format_amount(dec!(3)), "3.00");
        assert_eq!(format_quantity(dec!(2)), "2.000");
        assert_eq!(format_quantity(dec!(0.1235)), "0.124");
        assert_eq!(format_minor_units(dec!(12.5)).unwrap(), "1250");
        assert_eq!(format_minor_units(Decimal::MAX).unwrap_err().code(), "E405");
        assert_eq!(format_signed(dec!(10)), "+10.00");
        assert_eq!(format_signed(dec!(-5)), "-5.00");
    }

    #[test]
    fn datecs_x_amount_rules() {
        assert_eq!(parse_signed_amount("+1050").unwrap(), dec!(10.50));
        assert_eq!(parse_signed_amount("-500").unwrap(), dec!(-5.00));
        assert_eq!(parse_signed_amount("12.34").unwrap(), dec!(12.34));
        assert_eq!(parse_signed_amount("-12.34").unwrap(), dec!(-12.34));
        assert!(parse_signed_amount("+-5").is_err());
        assert!(parse_signed_amount("").is_err());
    }

    #[test]
    fn isl_amount_rules() {
        assert_eq!(parse_scaled_amount("1250").unwrap(), dec!(12.50));
        assert_eq!(parse_scaled_amount(" 12.50 ").unwrap(), dec!(12.50));
        assert!(parse_scaled_amount("abc").is_err());
    }

    #[test]
    fn other_amount_rules() {
        assert_eq!(parse_minor_units("1999").unwrap(), dec!(19.99));
        assert!(parse_minor_units("19.99").is_err());
        assert_eq!(parse_decimal("19.99").unwrap(), dec!(19.99));
    }

    #[test]
    fn payment_codes_with_overrides() {
        let mut overrides = BTreeMap::new();
        overrides.insert(PaymentType::Card, "X".to_string());
        overrides.insert(PaymentType::Change, "Z".to_string());
        let codes = PaymentCodes::new(&[(PaymentType::Cash, "P"), (PaymentType::Card, "C")], &overrides);
        assert_eq!(codes.code(PaymentType::Card).unwrap(), "X");
        assert_eq!(codes.code(PaymentType::Cash).unwrap(), "P");
        assert_eq!(codes.supported(), vec![PaymentType::Cash, PaymentType::Card]);
        for missing in [PaymentType::Change, PaymentType::Unspecified, PaymentType::Check] {
            assert_eq!(codes.code(missing).unwrap_err().code(), "E406");
        }
    }

    #[test]
    fn tax_groups_map_or_fail() {
        assert_eq!(tax_group_code(&CYRILLIC_TAX_GROUPS, TaxGroup::TaxGroup2).unwrap(), 'Б');
        let err = tax_group_code(&DIGIT_TAX_GROUPS, TaxGroup::Unspecified).unwrap_err();
        assert_eq!(err.code(), "E411");
    }

    #[test]
    fn fields() {
        assert_eq!(field("P,1250,0,0", ',', 1).unwrap(), "1250");
        assert!(field("P", ',', 3).is_err());
    }
}
