//! Business validation of print requests.
//!
//! Runs before anything is sent to the device. Every check appends to the
//! returned [`DeviceStatus`]; nothing here fails early or touches I/O.

use rust_decimal::{Decimal, RoundingStrategy};

use bgfp_status::{DeviceStatus, codes};

use crate::model::{
    Item, ItemType, Payment, PaymentType, PriceModifierType, Receipt, ReversalReceipt,
    TransferAmount,
};

/// Absolute tolerance of the payments/items reconciliation.
pub const TOTAL_ABS_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);
/// Relative tolerance of the payments/items reconciliation.
pub const TOTAL_REL_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 5);

// ── Unique sale number ──────────────────────────────────────────────────

/// `true` for `XXXXXXXX-XXXX-NNNNNNN`: uppercase letters or digits in the
/// first two groups, digits in the last.
pub fn is_valid_unique_sale_number(usn: &str) -> bool {
    let mut groups = usn.split('-');
    let (Some(device), Some(operator), Some(number), None) =
        (groups.next(), groups.next(), groups.next(), groups.next())
    else {
        return false;
    };
    let upper_alnum = |s: &str, len: usize| {
        s.len() == len
            && s
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    };
    upper_alnum(device, 8)
        && upper_alnum(operator, 4)
        && number.len() == 7
        && number.bytes().all(|b| b.is_ascii_digit())
}

// ── Totals ──────────────────────────────────────────────────────────────

fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Line total after the price modifier, rounded to cents. Comments are 0.
///
/// `None` when the arithmetic overflows [`Decimal`].
pub fn item_total(item: &Item) -> Option<Decimal> {
    if item.item_type == ItemType::Comment {
        return Some(Decimal::ZERO);
    }
    let base = round2(item.unit_price.checked_mul(item.quantity)?);
    let value = item.price_modifier_value.abs();
    let percent = || base.checked_mul(value)?.checked_div(Decimal::ONE_HUNDRED);
    let modified = match item.price_modifier_type {
        PriceModifierType::None => base,
        PriceModifierType::DiscountPercent => base.checked_sub(percent()?)?,
        PriceModifierType::SurchargePercent => base.checked_add(percent()?)?,
        PriceModifierType::DiscountAmount => base.checked_sub(value)?,
        PriceModifierType::SurchargeAmount => base.checked_add(value)?,
    };
    Some(round2(modified))
}

/// Sum of [`item_total`] over every line, `None` on overflow.
pub fn items_total(items: &[Item]) -> Option<Decimal> {
    items
        .iter()
        .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item_total(item)?))
}

/// Sum of the payments, `Change` excluded. `None` on overflow.
pub fn payments_total(payments: &[Payment]) -> Option<Decimal> {
    payments
        .iter()
        .filter(|p| p.payment_type != PaymentType::Change)
        .try_fold(Decimal::ZERO, |sum, p| sum.checked_add(p.amount))
}

/// `true` when the two totals agree within the absolute or relative tolerance.
pub fn totals_match(items: Decimal, payments: Decimal) -> bool {
    let Some(diff) = payments.checked_sub(items).map(|d| d.abs()) else {
        return false;
    };
    if diff < TOTAL_ABS_TOLERANCE {
        return true;
    }
    !items.is_zero()
        && diff
            .checked_div(items.abs())
            .is_some_and(|ratio| ratio < TOTAL_REL_TOLERANCE)
}

// ── Checks ──────────────────────────────────────────────────────────────

fn check_item(status: DeviceStatus, index: usize, item: &Item) -> DeviceStatus {
    let line = index + 1;
    let mut status = status;
    if item.text.trim().is_empty() {
        status = status.with_error(codes::INVALID_ITEM, format!("Item {line}: text is empty"));
    }
    if item.item_type == ItemType::Comment {
        return status;
    }
    if item.quantity <= Decimal::ZERO {
        status = status.with_error(
            codes::INVALID_ITEM,
            format!("Item {line}: quantity must be positive"),
        );
    }
    if item.unit_price < Decimal::ZERO {
        status = status.with_error(
            codes::INVALID_ITEM,
            format!("Item {line}: unit price must not be negative"),
        );
    }
    if item.tax_group.index().is_none() {
        status = status.with_error(
            codes::INVALID_ITEM,
            format!("Item {line}: tax group is required"),
        );
    }
    let has_value = !item.price_modifier_value.is_zero();
    match (item.price_modifier_type, has_value) {
        (PriceModifierType::None, true) => {
            status = status.with_error(
                codes::INVALID_ITEM,
                format!("Item {line}: price modifier value given without a modifier type"),
            );
        }
        (kind, false) if kind != PriceModifierType::None => {
            status = status.with_error(
                codes::INVALID_ITEM,
                format!("Item {line}: price modifier type given without a value"),
            );
        }
        _ => {}
    }
    let value = item.price_modifier_value.abs();
    match item.price_modifier_type {
        PriceModifierType::DiscountPercent if value > Decimal::ONE_HUNDRED => {
            status = status.with_error(
                codes::INVALID_ITEM,
                format!("Item {line}: discount of {value}% exceeds 100%"),
            );
        }
        PriceModifierType::DiscountAmount
            if item
                .unit_price
                .checked_mul(item.quantity)
                .is_some_and(|base| value > round2(base)) =>
        {
            status = status.with_error(
                codes::INVALID_ITEM,
                format!("Item {line}: discount of {value} exceeds the line total"),
            );
        }
        _ => {}
    }
    status
}

fn check_payments(mut status: DeviceStatus, payments: &[Payment]) -> DeviceStatus {
    for (i, payment) in payments.iter().enumerate() {
        if payment.payment_type == PaymentType::Unspecified {
            status = status.with_error(
                codes::UNSUPPORTED_PAYMENT_TYPE,
                format!("Payment {}: payment type is required", i + 1),
            );
        }
        if payment.amount <= Decimal::ZERO {
            status = status.with_error(
                codes::INVALID_AMOUNT,
                format!("Payment {}: amount must be positive", i + 1),
            );
        }
    }
    status
}

/// Validate a receipt: sale number, items, payments and totals.
pub fn validate_receipt(receipt: &Receipt) -> DeviceStatus {
    let mut status = DeviceStatus::new();
    if !is_valid_unique_sale_number(&receipt.unique_sale_number) {
        status = status.with_error(
            codes::INVALID_UNIQUE_SALE_NUMBER,
            format!(
                "Invalid unique sale number {:?}, expected XXXXXXXX-XXXX-NNNNNNN",
                receipt.unique_sale_number
            ),
        );
    }
    if receipt.items.is_empty() {
        status = status.with_error(codes::INVALID_ITEM, "Receipt has no items");
    }
    for (i, item) in receipt.items.iter().enumerate() {
        status = check_item(status, i, item);
    }
    status = check_payments(status, &receipt.payments);

    if !status.is_ok() {
        return status;
    }
    let Some(items) = items_total(&receipt.items) else {
        return status.with_error(codes::OVERFLOW, "Items total is out of range");
    };
    // No payments means "pay the total in cash" and needs no reconciliation.
    if receipt.payments.is_empty() {
        return status;
    }
    match payments_total(&receipt.payments) {
        None => status.with_error(codes::OVERFLOW, "Payments total is out of range"),
        Some(payments) if !totals_match(items, payments) => status.with_error(
            codes::TOTAL_MISMATCH,
            format!("Payments total {payments} does not match items total {items}"),
        ),
        Some(_) => status,
    }
}

/// Validate a reversal: the receipt rules plus the reference to the original.
pub fn validate_reversal_receipt(reversal: &ReversalReceipt) -> DeviceStatus {
    let mut status = validate_receipt(&reversal.receipt);
    if reversal.receipt_number.trim().is_empty() {
        status = status.with_error(codes::INVALID_REVERSAL, "receiptNumber is required");
    }
    if reversal.receipt_date_time.is_none() {
        status = status.with_error(codes::INVALID_REVERSAL, "receiptDateTime is required");
    }
    if reversal.fiscal_memory_serial_number.trim().is_empty() {
        status = status.with_error(
            codes::INVALID_REVERSAL,
            "fiscalMemorySerialNumber is required",
        );
    }
    status
}

/// A transfer amount must be strictly positive.
pub fn validate_transfer_amount(transfer: &TransferAmount) -> DeviceStatus {
    if transfer.amount <= Decimal::ZERO {
        DeviceStatus::from_error(
            codes::INVALID_AMOUNT,
            format!("Amount must be positive, got {}", transfer.amount),
        )
    } else {
        DeviceStatus::new()
    }
}

/// Device-dependent checks: payment codes and price modifier support.
pub fn validate_against_device(
    receipt: &Receipt,
    supported_payment_types: &[PaymentType],
    supports_price_modifiers: bool,
) -> DeviceStatus {
    let mut status = DeviceStatus::new();
    for payment in &receipt.payments {
        let kind = payment.payment_type;
        if matches!(kind, PaymentType::Unspecified | PaymentType::Change) {
            continue;
        }
        if !supported_payment_types.contains(&kind) {
            status = status.with_error(
                codes::UNSUPPORTED_PAYMENT_TYPE,
                format!("Unsupported payment type: {kind:?}"),
            );
        }
    }
    if !supports_price_modifiers
        && let Some(i) = receipt
            .items
            .iter()
            .position(|item| item.price_modifier_type != PriceModifierType::None)
    {
        status = status.with_error(
            codes::INVALID_ITEM,
            format!("Item {}: price modifiers are not supported by this device", i + 1),
        );
    }
    status
}
