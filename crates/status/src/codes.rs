//! Standardized status codes.
//!
//! Every vendor status bit, framing failure and validation rule maps onto one
//! of these codes, so callers can react to a condition without knowing which
//! device family produced it. `E*` codes are errors, `W*` codes are warnings.

// ── Communication / device (E1xx) ───────────────────────────────────────

/// Transport failure while talking to the device.
pub const COMMUNICATION_ERROR: &str = "E101";
/// The transport timed out while reading or writing.
pub const TRANSPORT_TIMEOUT: &str = "E102";
/// The device clock is not set.
pub const CLOCK_NOT_SET: &str = "E103";
/// The device RAM was reset.
pub const RAM_RESET: &str = "E104";
/// The device is busy serving another connection.
pub const BUSY_WITH_ANOTHER_CONNECTION: &str = "E105";
/// The peer is not a fiscal device, or the line speed does not match.
pub const NOT_FISCAL_DEVICE: &str = "E106";
/// The response frame could not be parsed.
pub const INVALID_RESPONSE: &str = "E107";
/// The device did not answer within the retry budget.
pub const NO_RESPONSE: &str = "E108";
/// The caller-supplied deadline expired before the request was sent.
pub const USER_TIMEOUT: &str = "E109";
/// General device error.
pub const GENERAL_DEVICE_ERROR: &str = "E199";

// ── Fiscal memory / electronic journal (E2xx) ───────────────────────────

/// Fiscal memory is full.
pub const FM_FULL: &str = "E201";
/// Writing to the fiscal memory failed.
pub const FM_WRITE_ERROR: &str = "E202";
/// Fiscal memory is in read-only mode.
pub const FM_READ_ONLY: &str = "E203";
/// Fiscal memory is missing.
pub const FM_MISSING: &str = "E204";
/// Electronic journal is full.
pub const EJ_FULL: &str = "E205";
/// Electronic journal or SD card error.
pub const EJ_ERROR: &str = "E206";
/// General fiscal memory error.
pub const FM_GENERAL_ERROR: &str = "E299";

// ── Printing hardware (E3xx) ────────────────────────────────────────────

/// Out of paper.
pub const OUT_OF_PAPER: &str = "E301";
/// The printer cover is open.
pub const COVER_OPEN: &str = "E302";
/// Printing mechanism failure.
pub const PRINTING_MECHANISM: &str = "E303";
/// The print head overheated.
pub const OVERHEATED: &str = "E304";
/// The external display is missing.
pub const MISSING_DISPLAY: &str = "E305";

// ── Commands and business rules (E4xx) ──────────────────────────────────

/// Syntax error in a command.
pub const SYNTAX_ERROR: &str = "E401";
/// Invalid command code.
pub const INVALID_COMMAND: &str = "E402";
/// Payments do not add up to the items total.
pub const TOTAL_MISMATCH: &str = "E403";
/// The command is not allowed in the current device state.
pub const COMMAND_NOT_ALLOWED: &str = "E404";
/// Arithmetic overflow in the device registers.
pub const OVERFLOW: &str = "E405";
/// The payment type is not supported by the device.
pub const UNSUPPORTED_PAYMENT_TYPE: &str = "E406";
/// The unique sale number is malformed.
pub const INVALID_UNIQUE_SALE_NUMBER: &str = "E407";
/// An item is malformed.
pub const INVALID_ITEM: &str = "E408";
/// The device reported a numeric error code.
pub const DEVICE_ERROR_CODE: &str = "E409";
/// An amount is malformed or out of range.
pub const INVALID_AMOUNT: &str = "E410";
/// The tax group is not supported by the device.
pub const UNSUPPORTED_TAX_GROUP: &str = "E411";
/// The reversal receipt data is malformed.
pub const INVALID_REVERSAL: &str = "E412";
/// Wrong operator password.
pub const WRONG_PASSWORD: &str = "E413";
/// The daily report must be zeroed first.
pub const DAILY_REPORT_NOT_ZEROED: &str = "E414";
/// Not enough cash in the drawer.
pub const INSUFFICIENT_CASH: &str = "E415";

// ── Driver (E5xx) ───────────────────────────────────────────────────────

/// The device model is not supported by any driver.
pub const UNSUPPORTED_DEVICE: &str = "E501";
/// The driver configuration is invalid.
pub const INVALID_CONFIG: &str = "E502";

// ── Warnings ────────────────────────────────────────────────────────────

/// Fiscal memory is almost full.
pub const FM_NEAR_FULL: &str = "W201";
/// Electronic journal is almost full.
pub const EJ_NEAR_FULL: &str = "W202";
/// Paper is almost out.
pub const NEAR_PAPER_END: &str = "W301";

/// Every code in the catalog, in catalog order.
pub const ALL: &[&str] = &[
    COMMUNICATION_ERROR,
    TRANSPORT_TIMEOUT,
    CLOCK_NOT_SET,
    RAM_RESET,
    BUSY_WITH_ANOTHER_CONNECTION,
    NOT_FISCAL_DEVICE,
    INVALID_RESPONSE,
    NO_RESPONSE,
    USER_TIMEOUT,
    GENERAL_DEVICE_ERROR,
    FM_FULL,
    FM_WRITE_ERROR,
    FM_READ_ONLY,
    FM_MISSING,
    EJ_FULL,
    EJ_ERROR,
    FM_GENERAL_ERROR,
    OUT_OF_PAPER,
    COVER_OPEN,
    PRINTING_MECHANISM,
    OVERHEATED,
    MISSING_DISPLAY,
    SYNTAX_ERROR,
    INVALID_COMMAND,
    TOTAL_MISMATCH,
    COMMAND_NOT_ALLOWED,
    OVERFLOW,
    UNSUPPORTED_PAYMENT_TYPE,
    INVALID_UNIQUE_SALE_NUMBER,
    INVALID_ITEM,
    DEVICE_ERROR_CODE,
    INVALID_AMOUNT,
    UNSUPPORTED_TAX_GROUP,
    INVALID_REVERSAL,
    WRONG_PASSWORD,
    DAILY_REPORT_NOT_ZEROED,
    INSUFFICIENT_CASH,
    UNSUPPORTED_DEVICE,
    INVALID_CONFIG,
    FM_NEAR_FULL,
    EJ_NEAR_FULL,
    NEAR_PAPER_END,
];
