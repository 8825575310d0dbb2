//! Tremol (ZFP) status.
//!
//! Two shapes: an ACK frame carries `STE1 STE2`, two value bytes where
//! `0x30` means no error; the read-status command returns seven flag bytes.

use super::entries::{R, StatusBit, e, i, n, w};
use super::{BitTableDecoder, StatusDecoder, length_mismatch};
use bgfp_status::DeviceStatus;
use bgfp_status::codes::*;

#[rustfmt::skip]
static TREMOL_BITS: [StatusBit; 56] = [
    // Byte 0: device
    R,
    e(GENERAL_DEVICE_ERROR, "Hardware clock error"),
    e(RAM_RESET, "RAM reset"),
    e(CLOCK_NOT_SET, "Wrong date and time"),
    e(CLOCK_NOT_SET, "Date and time are not set"),
    e(OVERHEATED, "Printer overheat"),
    i("Power down while a fiscal receipt was open"),
    e(FM_READ_ONLY, "Fiscal memory is read-only"),
    // Byte 1: registers and reports
    R,
    i("Duplicate printed"),
    e(DAILY_REPORT_NOT_ZEROED, "Operator report is not zeroed"),
    e(DAILY_REPORT_NOT_ZEROED, "Article report is not zeroed"),
    e(DAILY_REPORT_NOT_ZEROED, "Daily report is not zeroed"),
    e(DAILY_REPORT_NOT_ZEROED, "Customer report is not zeroed"),
    e(OVERFLOW, "Registers overflow"),
    e(OUT_OF_PAPER, "No paper"),
    // Byte 2: receipts and journal
    R,
    e(EJ_FULL, "SD card full"),
    w(EJ_NEAR_FULL, "SD card near full"),
    i("Invoice receipt is open"),
    i("VAT receipt is open"),
    i("Detailed receipt is open"),
    i("Fiscal receipt is open"),
    i("Non-fiscal receipt is open"),
    // Byte 3: fiscal memory
    R,
    i("Fiscal memory is produced"),
    i("Device is fiscalized"),
    i("Decimal point is set"),
    w(FM_NEAR_FULL, "Fiscal memory is nearly full"),
    e(FM_FULL, "Fiscal memory is full"),
    e(FM_GENERAL_ERROR, "Fiscal memory error"),
    e(FM_MISSING, "No fiscal memory module"),
    // Byte 4: settings
    R, R,
    i("Logo is printed"),
    i("Drawer opens automatically"),
    R,
    i("Serial speed is 9600"),
    i("Transparent display mode"),
    i("Automatic paper cutting"),
    // Byte 5: tax authority link
    R,
    i("Device is deregistered"),
    e(EJ_ERROR, "Wrong SD card"),
    R, R,
    i("No task from the tax authority"),
    e(GENERAL_DEVICE_ERROR, "Device blocked after 3 days without connection to the tax authority"),
    n("Wrong SIM card"),
    // Byte 6: modem and paper
    R, R,
    n("Data not sent to the tax authority for 24 hours"),
    w(NEAR_PAPER_END, "Near paper end"),
    n("No GPRS service"),
    n("No mobile operator"),
    n("No GPRS modem"),
    n("No SIM card"),
];

/// Tremol read-status block, 7 bytes.
pub const TREMOL_FULL: BitTableDecoder = BitTableDecoder {
    table: &TREMOL_BITS,
    bytes: 7,
    numeric_error_byte: None,
};

const STE_OK: u8 = 0x30;

fn ste1(value: u8) -> Option<(&'static str, &'static str)> {
    Some(match value {
        0x31 => (OUT_OF_PAPER, "Out of paper, printer failure"),
        0x32 => (OVERFLOW, "Registers overflow"),
        0x33 => (CLOCK_NOT_SET, "Clock failure or incorrect date"),
        0x34 => (COMMAND_NOT_ALLOWED, "Opened fiscal receipt"),
        0x35 => (COMMAND_NOT_ALLOWED, "Payment residue account"),
        0x36 => (COMMAND_NOT_ALLOWED, "Opened non-fiscal receipt"),
        0x37 => (COMMAND_NOT_ALLOWED, "Registered payment but receipt is not closed"),
        0x38 => (FM_GENERAL_ERROR, "Fiscal memory failure"),
        0x39 => (WRONG_PASSWORD, "Incorrect password"),
        0x3A => (MISSING_DISPLAY, "Missing external display"),
        0x3B => (DAILY_REPORT_NOT_ZEROED, "24 hours block, missing Z report"),
        0x3C => (OVERHEATED, "Overheated printer thermal head"),
        0x3D => (GENERAL_DEVICE_ERROR, "Interrupted power supply"),
        0x3E => (EJ_FULL, "Overflow in the electronic journal"),
        0x3F => (COMMAND_NOT_ALLOWED, "Insufficient conditions"),
        _ => return None,
    })
}

fn ste2(value: u8) -> Option<(&'static str, &'static str)> {
    Some(match value {
        0x31 => (INVALID_COMMAND, "Invalid command"),
        0x32 => (COMMAND_NOT_ALLOWED, "Illegal command"),
        0x33 => (DAILY_REPORT_NOT_ZEROED, "Z daily report is not zero"),
        0x34 => (SYNTAX_ERROR, "Syntax error"),
        0x35 => (OVERFLOW, "Input registers overflow"),
        0x36 => (INVALID_AMOUNT, "Zero input registers"),
        0x37 => (COMMAND_NOT_ALLOWED, "Unavailable transaction for correction"),
        0x38 => (INSUFFICIENT_CASH, "Insufficient amount on hand"),
        _ => return None,
    })
}

fn decode_ste(
    status: DeviceStatus,
    value: u8,
    table: fn(u8) -> Option<(&'static str, &'static str)>,
) -> DeviceStatus {
    if value == STE_OK {
        return status;
    }
    match table(value) {
        Some((code, text)) => status.with_error(code, text),
        None => status.with_error(GENERAL_DEVICE_ERROR, format!("Unknown status {value:#04X}")),
    }
}

/// Dispatches on the status length: empty (data answer), 2 (ACK) or 7.
#[derive(Debug, Clone, Copy, Default)]
pub struct TremolStatusDecoder;

impl StatusDecoder for TremolStatusDecoder {
    fn decode(&self, status: &[u8]) -> DeviceStatus {
        match *status {
            [] => DeviceStatus::new(),
            [first, second] => {
                let result = decode_ste(DeviceStatus::new(), first, ste1);
                decode_ste(result, second, ste2)
            }
            _ if status.len() == TREMOL_FULL.bytes => TREMOL_FULL.decode(status),
            _ => length_mismatch(TREMOL_FULL.bytes, status.len()),
        }
    }
}
