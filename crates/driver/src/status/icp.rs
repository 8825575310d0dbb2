//! ICP status: twelve ASCII hex characters encoding six status bytes.
//!
//! Some firmware sends the nibbles 0x30-offset like the frame LEN and CS
//! fields (`:` for 10 through `?` for 15); both spellings decode alike.

use super::entries::{R, StatusBit, e, i, w};
use super::{BitTableDecoder, StatusDecoder};
use crate::bytes::hex_pairs_decode;
use bgfp_status::DeviceStatus;
use bgfp_status::codes::*;

#[rustfmt::skip]
static ICP_BITS: [StatusBit; 48] = [
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
    R, R, R,
    e(WRONG_PASSWORD, "Wrong operator password"),
    e(DAILY_REPORT_NOT_ZEROED, "Daily report is not zeroed"),
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
    // Byte 3: journal
    R, R, R, R, R, R, R,
    e(EJ_ERROR, "SD card error"),
    // Byte 4: fiscal memory
    R, R,
    e(FM_GENERAL_ERROR, "Fiscal memory error"),
    e(FM_FULL, "Fiscal memory is full"),
    w(FM_NEAR_FULL, "Fiscal memory is nearly full"),
    R,
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

pub(super) const ICP_TABLE: BitTableDecoder = BitTableDecoder {
    table: &ICP_BITS,
    bytes: 6,
    numeric_error_byte: None,
};

/// Hex-decodes the status field, then applies the ICP bit table.
#[derive(Debug, Clone, Copy, Default)]
pub struct IcpStatusDecoder;

impl StatusDecoder for IcpStatusDecoder {
    fn decode(&self, status: &[u8]) -> DeviceStatus {
        match hex_pairs_decode(status) {
            Ok(raw) => ICP_TABLE.decode(&raw),
            Err(e) => DeviceStatus::from_error(INVALID_RESPONSE, e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_hex_status() {
        // 1.4 wrong password, 3.0 SD card error
        let status = IcpStatusDecoder.decode(b"809080818080");
        assert!(status.has_code(WRONG_PASSWORD));
        assert!(status.has_code(EJ_ERROR));
        assert_eq!(status.errors().len(), 2);
    }

    #[test]
    fn lowercase_hex_is_accepted() {
        assert!(IcpStatusDecoder.decode(b"8080808080c8").is_ok());
    }

    #[test]
    fn offset_nibbles_are_accepted() {
        // "8;" is 0x8B: 0.3 display info, 0.1 invalid command, 0.0 syntax error
        assert_eq!(
            IcpStatusDecoder.decode(b"8;8080808080"),
            IcpStatusDecoder.decode(b"8B8080808080")
        );
        let status = IcpStatusDecoder.decode(b"8<8080808080");
        assert!(status.has_code(CLOCK_NOT_SET));
    }

    #[test]
    fn bad_hex_is_invalid_response() {
        assert!(IcpStatusDecoder.decode(b"80808080808G").has_code(INVALID_RESPONSE));
        assert!(IcpStatusDecoder.decode(b"8080").has_code(INVALID_RESPONSE));
    }
}
