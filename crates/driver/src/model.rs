//! Domain types consumed and produced by the driver.
//!
//! With the `serde` feature these (de)serialize with camelCase field names,
//! the shape used by the JSON job files and results.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use bgfp_status::DeviceStatus;

// ── Enums ───────────────────────────────────────────────────────────────

/// Kind of receipt line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum ItemType {
    /// A sold article.
    #[default]
    Sale,
    /// A free-text comment line.
    Comment,
}

/// VAT group of a sale item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum TaxGroup {
    /// Not set; invalid for sale items.
    #[default]
    Unspecified,
    /// Group 1 (А).
    TaxGroup1,
    /// Group 2 (Б).
    TaxGroup2,
    /// Group 3 (В).
    TaxGroup3,
    /// Group 4 (Г).
    TaxGroup4,
    /// Group 5 (Д).
    TaxGroup5,
    /// Group 6 (Е).
    TaxGroup6,
    /// Group 7 (Ж).
    TaxGroup7,
    /// Group 8 (З).
    TaxGroup8,
}

impl TaxGroup {
    /// Zero-based index of groups 1..8; `None` for `Unspecified`.
    pub fn index(self) -> Option<usize> {
        match self {
            TaxGroup::Unspecified => None,
            TaxGroup::TaxGroup1 => Some(0),
            TaxGroup::TaxGroup2 => Some(1),
            TaxGroup::TaxGroup3 => Some(2),
            TaxGroup::TaxGroup4 => Some(3),
            TaxGroup::TaxGroup5 => Some(4),
            TaxGroup::TaxGroup6 => Some(5),
            TaxGroup::TaxGroup7 => Some(6),
            TaxGroup::TaxGroup8 => Some(7),
        }
    }

    /// Every variant, `Unspecified` first.
    pub const ALL: [TaxGroup; 9] = [
        TaxGroup::Unspecified,
        TaxGroup::TaxGroup1,
        TaxGroup::TaxGroup2,
        TaxGroup::TaxGroup3,
        TaxGroup::TaxGroup4,
        TaxGroup::TaxGroup5,
        TaxGroup::TaxGroup6,
        TaxGroup::TaxGroup7,
        TaxGroup::TaxGroup8,
    ];
}

/// Discount or surcharge applied to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum PriceModifierType {
    /// No modifier; the value must be zero.
    #[default]
    None,
    /// Percentage off.
    DiscountPercent,
    /// Fixed amount off.
    DiscountAmount,
    /// Percentage added.
    SurchargePercent,
    /// Fixed amount added.
    SurchargeAmount,
}

impl PriceModifierType {
    /// `true` for the percentage variants.
    pub fn is_percent(self) -> bool {
        matches!(
            self,
            PriceModifierType::DiscountPercent | PriceModifierType::SurchargePercent
        )
    }

    /// `true` for the discount variants.
    pub fn is_discount(self) -> bool {
        matches!(
            self,
            PriceModifierType::DiscountPercent | PriceModifierType::DiscountAmount
        )
    }
}

/// Means of payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum PaymentType {
    /// Not set; never has a device code.
    #[default]
    Unspecified,
    /// Cash.
    Cash,
    /// Card.
    Card,
    /// Check.
    Check,
    /// Packaging return.
    Packaging,
    /// Vendor-defined payment 1.
    Reserved1,
    /// Vendor-defined payment 2.
    Reserved2,
    /// Change handed back; excluded from totals and never sent to the device.
    Change,
}

impl PaymentType {
    /// Every variant, `Unspecified` first.
    pub const ALL: [PaymentType; 8] = [
        PaymentType::Unspecified,
        PaymentType::Cash,
        PaymentType::Card,
        PaymentType::Check,
        PaymentType::Packaging,
        PaymentType::Reserved1,
        PaymentType::Reserved2,
        PaymentType::Change,
    ];
}

/// Why a receipt is being reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum ReversalReason {
    /// The operator made a mistake.
    #[default]
    OperatorError,
    /// Goods returned.
    Refund,
    /// Tax base reduction.
    TaxBaseReduction,
}

// ── Requests ────────────────────────────────────────────────────────────

/// One receipt line.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct Item {
    /// Sale or comment.
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub item_type: ItemType,
    /// Article name or comment text.
    pub text: String,
    /// VAT group (sale items only).
    pub tax_group: TaxGroup,
    /// Quantity (sale items only).
    pub quantity: Decimal,
    /// Price of one unit.
    pub unit_price: Decimal,
    /// Percentage or amount of the modifier; zero when there is none.
    pub price_modifier_value: Decimal,
    /// Kind of modifier.
    pub price_modifier_type: PriceModifierType,
}

impl Item {
    /// A sale line with quantity 1 and no modifier.
    pub fn sale(text: impl Into<String>, tax_group: TaxGroup, unit_price: Decimal) -> Self {
        Self {
            item_type: ItemType::Sale,
            text: text.into(),
            tax_group,
            quantity: Decimal::ONE,
            unit_price,
            ..Self::default()
        }
    }

    /// A comment line.
    pub fn comment(text: impl Into<String>) -> Self {
        Self {
            item_type: ItemType::Comment,
            text: text.into(),
            ..Self::default()
        }
    }
}

/// One payment.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct Payment {
    /// Means of payment.
    pub payment_type: PaymentType,
    /// Amount paid.
    pub amount: Decimal,
}

impl Payment {
    /// Construct a payment.
    pub fn new(payment_type: PaymentType, amount: Decimal) -> Self {
        Self {
            payment_type,
            amount,
        }
    }
}

/// Operator identity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct Credentials {
    /// Operator number.
    pub operator: String,
    /// Operator password.
    pub operator_password: String,
}

impl Credentials {
    /// Construct credentials.
    pub fn new(operator: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            operator: operator.into(),
            operator_password: password.into(),
        }
    }

    /// `true` when no operator was given.
    pub fn is_empty(&self) -> bool {
        self.operator.is_empty()
    }
}

/// A fiscal receipt to print.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct Receipt {
    /// Fiscal sale identifier, `XXXXXXXX-XXXX-NNNNNNN`.
    pub unique_sale_number: String,
    /// Lines, in print order.
    pub items: Vec<Item>,
    /// Payments, in print order. Empty means "pay the total in cash".
    pub payments: Vec<Payment>,
    /// Operator; empty falls back to the configured default.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub operator: Credentials,
}

/// A reversal (storno) receipt referencing an original receipt.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct ReversalReceipt {
    /// The reversal's own sale data.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub receipt: Receipt,
    /// Number of the original receipt.
    pub receipt_number: String,
    /// Date and time of the original receipt.
    pub receipt_date_time: Option<NaiveDateTime>,
    /// Fiscal memory serial number of the device that printed the original.
    pub fiscal_memory_serial_number: String,
    /// Why the receipt is reversed.
    pub reason: ReversalReason,
}

/// Cash deposit or withdrawal request.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct TransferAmount {
    /// Amount to move; must be positive.
    pub amount: Decimal,
    /// Operator.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub operator: Credentials,
}

/// New device clock value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CurrentDateTime {
    /// Local date and time to set.
    pub device_date_time: NaiveDateTime,
}

/// Escape hatch: the first character is the command, the rest its payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct RequestFrame {
    /// Command character followed by payload text.
    pub raw_request: String,
}

// ── Results ─────────────────────────────────────────────────────────────

/// Identification of a printed receipt.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct ReceiptInfo {
    /// Document number assigned by the device.
    pub receipt_number: String,
    /// Device clock when the receipt was closed.
    pub receipt_date_time: Option<NaiveDateTime>,
    /// Fiscal memory serial number of the device.
    pub fiscal_memory_serial_number: String,
    /// Total of the receipt as reported by the device.
    pub receipt_amount: Decimal,
}

/// Status plus device clock.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DeviceStatusWithDateTime {
    /// Decoded device status.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub status: DeviceStatus,
    /// Device clock, when it could be read.
    pub device_date_time: Option<NaiveDateTime>,
}

/// Status plus cash in the drawer.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DeviceStatusWithCashAmount {
    /// Decoded device status.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub status: DeviceStatus,
    /// Cash amount, when it could be read.
    pub amount: Option<Decimal>,
}

/// Status plus the decoded raw response text.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DeviceStatusWithRawResponse {
    /// Decoded device status.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub status: DeviceStatus,
    /// Response text, decoded from the device code page.
    pub raw_response: String,
}

/// Receipt result plus status.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DeviceStatusWithReceiptInfo {
    /// Combined status of every step.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub status: DeviceStatus,
    /// Filled progressively; only complete when the status is Ok.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub info: ReceiptInfo,
}

// ── Device ──────────────────────────────────────────────────────────────

/// Snapshot of a connected device, populated once when connecting.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DeviceInfo {
    /// Vendor driver id (e.g. `"bg.dt.c.isl"`).
    pub vendor: String,
    /// Device serial number (two-letter manufacturer prefix + digits).
    pub serial_number: String,
    /// Fiscal memory serial number.
    pub fiscal_memory_serial_number: String,
    /// Manufacturer name.
    pub manufacturer: String,
    /// Model name.
    pub model: String,
    /// Firmware version string.
    pub firmware_version: String,
    /// Maximum characters of an item name.
    pub item_text_max_length: usize,
    /// Maximum characters of a comment line.
    pub comment_text_max_length: usize,
    /// Maximum characters of an operator password.
    pub operator_password_max_length: usize,
    /// Payment types with a device code.
    pub supported_payment_types: Vec<PaymentType>,
    /// The device prints reversal receipts.
    pub supports_reversal: bool,
    /// The device accepts discounts and surcharges on items.
    pub supports_price_modifiers: bool,
}

/// Raw identification fields parsed from the device-info probe.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProbedInfo {
    /// Model name.
    pub model: String,
    /// Firmware version string.
    pub firmware_version: String,
    /// Device serial number.
    pub serial_number: String,
    /// Fiscal memory serial number.
    pub fiscal_memory_serial_number: String,
}
