//! Incotex status table. Byte 3 carries a numeric error code.
//!
//! Bits 4.4 and 4.2 both report a full fiscal memory; the firmware raises
//! them independently, so both positions are kept.

use super::BitTableDecoder;
use super::entries::{R, StatusBit, e, i, w};
use bgfp_status::codes::*;

#[rustfmt::skip]
static INCOTEX_BITS: [StatusBit; 48] = [
    // Byte 0: general
    R,
    e(COVER_OPEN, "Cover is open"),
    e(GENERAL_DEVICE_ERROR, "General error"),
    e(PRINTING_MECHANISM, "Printing mechanism failure"),
    i("No client display connected"),
    e(CLOCK_NOT_SET, "Clock is not set"),
    e(INVALID_COMMAND, "Invalid command code"),
    e(SYNTAX_ERROR, "Syntax error"),
    // Byte 1: command execution
    R, R, R, R, R,
    e(RAM_RESET, "RAM has been reset"),
    e(COMMAND_NOT_ALLOWED, "Command is not allowed"),
    e(OVERFLOW, "Overflow during command execution"),
    // Byte 2: paper and receipts
    R, R,
    i("Non-fiscal receipt is open"),
    w(EJ_NEAR_FULL, "Electronic journal nearly full"),
    i("Fiscal receipt is open"),
    e(EJ_FULL, "Electronic journal is full"),
    w(NEAR_PAPER_END, "Near paper end"),
    e(OUT_OF_PAPER, "End of paper"),
    // Byte 3: numeric error code
    R, R, R, R, R, R, R, R,
    // Byte 4: fiscal memory
    R, R,
    e(FM_GENERAL_ERROR, "Fiscal memory error"),
    e(FM_FULL, "Fiscal memory is full"),
    w(FM_NEAR_FULL, "Fiscal memory is nearly full"),
    e(FM_FULL, "No free fiscal memory records for the daily report"),
    e(FM_MISSING, "Fiscal memory is missing or damaged"),
    e(FM_WRITE_ERROR, "Error writing to the fiscal memory"),
    // Byte 5: fiscalization
    R, R, R,
    i("VAT rates are set"),
    i("Device is fiscalized"),
    i("Serial number and fiscal memory number are set"),
    i("Fiscal memory is formatted"),
    e(FM_READ_ONLY, "Fiscal memory is read-only"),
];

/// Incotex, 6 status bytes.
pub const INCOTEX: BitTableDecoder = BitTableDecoder {
    table: &INCOTEX_BITS,
    bytes: 6,
    numeric_error_byte: Some(3),
};
