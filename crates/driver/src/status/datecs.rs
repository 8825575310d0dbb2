//! Datecs status tables (C series over ISL, X series over ISL-X).

use super::BitTableDecoder;
use super::entries::{R, StatusBit, e, i, w};
use bgfp_status::codes::*;

#[rustfmt::skip]
static DATECS_C_BITS: [StatusBit; 48] = [
    // Byte 0: general
    R,
    e(COVER_OPEN, "Cover is open"),
    e(GENERAL_DEVICE_ERROR, "General error"),
    e(PRINTING_MECHANISM, "Failure in printing mechanism"),
    i("No client display connected"),
    e(CLOCK_NOT_SET, "The real time clock is not synchronized"),
    e(INVALID_COMMAND, "Command code is invalid"),
    e(SYNTAX_ERROR, "Syntax error"),
    // Byte 1: command execution
    R, R, R, R, R,
    e(RAM_RESET, "The RAM has been reset"),
    e(COMMAND_NOT_ALLOWED, "Command is not permitted"),
    e(OVERFLOW, "Overflow during command execution"),
    // Byte 2: paper and receipts
    R, R,
    i("Nonfiscal receipt is open"),
    w(EJ_NEAR_FULL, "EJ nearly full"),
    i("Fiscal receipt is open"),
    e(EJ_FULL, "EJ is full"),
    w(NEAR_PAPER_END, "Near paper end"),
    e(OUT_OF_PAPER, "End of paper"),
    // Byte 3: not used
    R, R, R, R, R, R, R, R,
    // Byte 4: fiscal memory
    R, R,
    e(FM_GENERAL_ERROR, "Fiscal memory error"),
    e(FM_FULL, "Fiscal memory is full"),
    w(FM_NEAR_FULL, "There is space for less than 50 reports in the fiscal memory"),
    R,
    e(FM_MISSING, "Fiscal memory is not found or damaged"),
    e(FM_WRITE_ERROR, "Error while writing in the fiscal memory"),
    // Byte 5: fiscalization
    R, R, R,
    i("VAT rates are set at least once"),
    i("Device is fiscalized"),
    i("Serial number and fiscal memory number are set"),
    i("Fiscal memory is formatted"),
    e(FM_READ_ONLY, "The fiscal memory is in read-only mode"),
];

#[rustfmt::skip]
static DATECS_X_BITS: [StatusBit; 64] = [
    // Byte 0: general
    R,
    e(COVER_OPEN, "Cover is open"),
    e(GENERAL_DEVICE_ERROR, "General error"),
    e(PRINTING_MECHANISM, "Failure in printing mechanism"),
    R,
    e(CLOCK_NOT_SET, "The real time clock is not synchronized"),
    e(INVALID_COMMAND, "Command code is invalid"),
    e(SYNTAX_ERROR, "Syntax error"),
    // Byte 1: command execution
    R, R, R, R, R,
    e(RAM_RESET, "The RAM has been reset"),
    e(COMMAND_NOT_ALLOWED, "Command is not permitted"),
    e(OVERFLOW, "Overflow during command execution"),
    // Byte 2: paper, receipts and journal
    R,
    e(EJ_ERROR, "SD card error"),
    i("Nonfiscal receipt is open"),
    w(EJ_NEAR_FULL, "EJ nearly full"),
    i("Fiscal receipt is open"),
    e(EJ_FULL, "EJ is full"),
    w(NEAR_PAPER_END, "Near paper end"),
    e(OUT_OF_PAPER, "End of paper"),
    // Byte 3: not used
    R, R, R, R, R, R, R, R,
    // Byte 4: fiscal memory
    R, R,
    e(FM_GENERAL_ERROR, "Fiscal memory error"),
    e(FM_FULL, "Fiscal memory is full"),
    w(FM_NEAR_FULL, "There is space for less than 60 reports in the fiscal memory"),
    i("Serial number and fiscal memory number are set"),
    i("Tax number is set"),
    e(FM_WRITE_ERROR, "Error while writing in the fiscal memory"),
    // Byte 5: fiscalization
    R, R, R,
    i("VAT rates are set at least once"),
    i("Device is fiscalized"),
    R,
    i("Fiscal memory is formatted"),
    e(FM_READ_ONLY, "The fiscal memory is in read-only mode"),
    // Bytes 6 and 7: not used
    R, R, R, R, R, R, R, R,
    R, R, R, R, R, R, R, R,
];

/// Datecs C series, 6 status bytes.
pub const DATECS_C: BitTableDecoder = BitTableDecoder {
    table: &DATECS_C_BITS,
    bytes: 6,
    numeric_error_byte: None,
};

/// Datecs X series, 8 status bytes.
pub const DATECS_X: BitTableDecoder = BitTableDecoder {
    table: &DATECS_X_BITS,
    bytes: 8,
    numeric_error_byte: None,
};
