//! Device status decoding.
//!
//! Every family reports its state as a fixed-length block of status bytes.
//! A [`BitTableDecoder`] walks the bytes most significant bit first and
//! looks each set bit up in a flat table indexed by `byte * 8 + (7 - bit)`.
//! Bit 7 of every byte is always set by the device and is reserved.

mod daisy;
mod datecs;
mod eltrade;
mod icp;
mod incotex;
mod tremol;

pub use daisy::DAISY;
pub use datecs::{DATECS_C, DATECS_X};
pub use eltrade::ELTRADE;
pub use icp::IcpStatusDecoder;
pub use incotex::INCOTEX;
pub use tremol::{TREMOL_FULL, TremolStatusDecoder};

use bgfp_status::{DeviceStatus, Severity, StatusMessage, codes};

/// Decodes a raw status block into a [`DeviceStatus`].
pub trait StatusDecoder: Send + Sync {
    /// Decode `status`; a block of the wrong shape yields an `E107` error.
    fn decode(&self, status: &[u8]) -> DeviceStatus;
}

// ── Table entries ───────────────────────────────────────────────────────

/// Bucket a status bit is reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitKind {
    /// Goes to the error list.
    Error,
    /// Goes to the warning list.
    Warning,
    /// Goes to the info list.
    Info,
    /// Ignored.
    Reserved,
}

/// One entry of a status bit table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusBit {
    /// Where the bit is reported.
    pub kind: BitKind,
    /// Standardized code, if the condition has one.
    pub code: Option<&'static str>,
    /// Condition text.
    pub text: &'static str,
}

impl StatusBit {
    /// A reserved bit.
    pub const RESERVED: StatusBit = StatusBit {
        kind: BitKind::Reserved,
        code: None,
        text: "",
    };

    /// An error bit.
    pub const fn error(code: &'static str, text: &'static str) -> Self {
        Self {
            kind: BitKind::Error,
            code: Some(code),
            text,
        }
    }

    /// A warning bit.
    pub const fn warning(code: &'static str, text: &'static str) -> Self {
        Self {
            kind: BitKind::Warning,
            code: Some(code),
            text,
        }
    }

    /// A warning bit without a standardized code.
    pub const fn notice(text: &'static str) -> Self {
        Self {
            kind: BitKind::Warning,
            code: None,
            text,
        }
    }

    /// An informational bit.
    pub const fn info(text: &'static str) -> Self {
        Self {
            kind: BitKind::Info,
            code: None,
            text,
        }
    }

    fn to_message(self) -> Option<StatusMessage> {
        let severity = match self.kind {
            BitKind::Error => Severity::Error,
            BitKind::Warning => Severity::Warning,
            BitKind::Info => Severity::Info,
            BitKind::Reserved => return None,
        };
        Some(StatusMessage::new(severity, self.code, self.text))
    }
}

/// Short aliases used by the vendor tables.
pub(crate) mod entries {
    pub(crate) use super::StatusBit;
    pub(crate) const R: StatusBit = StatusBit::RESERVED;
    pub(crate) const fn e(code: &'static str, text: &'static str) -> StatusBit {
        StatusBit::error(code, text)
    }
    pub(crate) const fn w(code: &'static str, text: &'static str) -> StatusBit {
        StatusBit::warning(code, text)
    }
    pub(crate) const fn n(text: &'static str) -> StatusBit {
        StatusBit::notice(text)
    }
    pub(crate) const fn i(text: &'static str) -> StatusBit {
        StatusBit::info(text)
    }
}

// ── Bit table decoder ───────────────────────────────────────────────────

/// Table-driven decoder for one vendor's status block.
#[derive(Debug, Clone, Copy)]
pub struct BitTableDecoder {
    /// Flat table, `bytes * 8` entries, MSB first within each byte.
    pub table: &'static [StatusBit],
    /// Expected length of the status block.
    pub bytes: usize,
    /// Byte holding a 7-bit numeric error code instead of flags.
    pub numeric_error_byte: Option<usize>,
}

impl BitTableDecoder {
    /// Table entry for bit `bit` (0 = LSB) of byte `byte`.
    pub fn entry(&self, byte: usize, bit: usize) -> Option<&StatusBit> {
        if bit > 7 {
            return None;
        }
        self.table.get(byte * 8 + (7 - bit))
    }
}

impl StatusDecoder for BitTableDecoder {
    fn decode(&self, status: &[u8]) -> DeviceStatus {
        if status.len() != self.bytes {
            return length_mismatch(self.bytes, status.len());
        }

        let mut result = DeviceStatus::new();
        for (i, &byte) in status.iter().enumerate() {
            if Some(i) == self.numeric_error_byte {
                let value = byte & 0x7F;
                if value != 0 {
                    result = result.with_error(
                        codes::DEVICE_ERROR_CODE,
                        format!("Error code {value}, see the device manual"),
                    );
                }
                continue;
            }
            for bit in (0..8).rev() {
                if byte & (1 << bit) == 0 {
                    continue;
                }
                if let Some(message) = self.entry(i, bit).and_then(|b| b.to_message()) {
                    result.push(message);
                }
            }
        }
        result
    }
}

pub(crate) fn length_mismatch(expected: usize, actual: usize) -> DeviceStatus {
    DeviceStatus::from_error(
        codes::INVALID_RESPONSE,
        format!("Expected {expected} status bytes, got {actual}"),
    )
}
