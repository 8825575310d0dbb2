//! Eltrade status table.

use super::BitTableDecoder;
use super::entries::{R, StatusBit, e, i, w};
use bgfp_status::codes::*;

#[rustfmt::skip]
static ELTRADE_BITS: [StatusBit; 48] = [
    // Byte 0: general
    R,
    e(COVER_OPEN, "Cover is open"),
    e(GENERAL_DEVICE_ERROR, "General error"),
    e(PRINTING_MECHANISM, "Printing mechanism failure"),
    R,
    e(CLOCK_NOT_SET, "Clock is not set"),
    e(INVALID_COMMAND, "Invalid command"),
    e(SYNTAX_ERROR, "Syntax error"),
    // Byte 1: command execution
    R, R, R, R, R,
    e(RAM_RESET, "RAM has been reset"),
    e(COMMAND_NOT_ALLOWED, "Command not allowed"),
    e(OVERFLOW, "Overflow"),
    // Byte 2: paper and receipts
    R, R,
    i("Non-fiscal receipt is open"),
    w(EJ_NEAR_FULL, "Electronic journal nearly full"),
    i("Fiscal receipt is open"),
    e(EJ_FULL, "Electronic journal is full"),
    w(NEAR_PAPER_END, "Near paper end"),
    e(OUT_OF_PAPER, "End of paper"),
    // Byte 3: not used
    R, R, R, R, R, R, R, R,
    // Byte 4: fiscal memory
    R,
    i("Receipt printing is suspended"),
    e(FM_GENERAL_ERROR, "Fiscal memory error"),
    e(FM_FULL, "Fiscal memory is full"),
    w(FM_NEAR_FULL, "Fiscal memory is nearly full"),
    R,
    e(FM_MISSING, "Fiscal memory is missing or damaged"),
    e(FM_WRITE_ERROR, "Fiscal memory write error"),
    // Byte 5: fiscalization
    R, R, R,
    i("VAT rates are set"),
    i("Device is fiscalized"),
    i("Serial numbers are set"),
    i("Fiscal memory is formatted"),
    e(FM_READ_ONLY, "Fiscal memory is read-only"),
];

/// Eltrade, 6 status bytes.
pub const ELTRADE: BitTableDecoder = BitTableDecoder {
    table: &ELTRADE_BITS,
    bytes: 6,
    numeric_error_byte: None,
};
