//! Daisy status table. Byte 3 carries a numeric error code.

use super::BitTableDecoder;
use super::entries::{R, StatusBit, e, i, w};
use bgfp_status::codes::*;

#[rustfmt::skip]
static DAISY_BITS: [StatusBit; 48] = [
    // Byte 0: general
    R, R,
    e(GENERAL_DEVICE_ERROR, "General error"),
    e(PRINTING_MECHANISM, "Failure in printing mechanism"),
    i("No external display"),
    e(CLOCK_NOT_SET, "Date and time are not set"),
    e(INVALID_COMMAND, "Invalid command code"),
    e(SYNTAX_ERROR, "Syntax error in the received data"),
    // Byte 1: command execution
    R, R,
    e(COVER_OPEN, "Printer cover is open"),
    R, R,
    e(RAM_RESET, "RAM has been reset"),
    e(COMMAND_NOT_ALLOWED, "Command is not allowed in the current fiscal mode"),
    e(OVERFLOW, "Overflow of an amount field"),
    // Byte 2: paper and receipts
    R, R,
    i("Service receipt is open"),
    w(EJ_NEAR_FULL, "Electronic journal is nearly full"),
    i("Fiscal receipt is open"),
    e(EJ_FULL, "Electronic journal is full"),
    w(NEAR_PAPER_END, "Paper is running out"),
    e(OUT_OF_PAPER, "Out of paper"),
    // Byte 3: numeric error code
    R, R, R, R, R, R, R, R,
    // Byte 4: fiscal memory
    R, R,
    e(FM_GENERAL_ERROR, "Fiscal memory error"),
    e(FM_FULL, "Fiscal memory is full"),
    w(FM_NEAR_FULL, "Fiscal memory has space for less than 50 records"),
    e(FM_GENERAL_ERROR, "Last fiscal memory record is corrupted"),
    e(FM_MISSING, "Fiscal memory is missing"),
    e(FM_WRITE_ERROR, "Error writing to the fiscal memory"),
    // Byte 5: fiscalization
    R, R,
    i("Tax identification number is set"),
    i("VAT rates are set"),
    i("Printer is fiscalized"),
    i("Fiscal memory serial number is set"),
    i("Fiscal memory is formatted"),
    e(FM_READ_ONLY, "Fiscal memory is read-only"),
];

/// Daisy, 6 status bytes.
pub const DAISY: BitTableDecoder = BitTableDecoder {
    table: &DAISY_BITS,
    bytes: 6,
    numeric_error_byte: Some(3),
};
