//! ICP framing.
//!
//! Request: `02 DEVNO(4) CMD DATA LEN(2) CS(2) 03`
//! Answer:  `02 DEVNO(4) CMD DATA STATUS(12) LEN(2) CS(2) 03`
//!
//! `LEN` counts the bytes between the device number and the length field.
//! `CS` is the 8-bit additive sum from the device number through `LEN`.
//! Both are written as nibble characters. There is no sequence number.

use super::{Family, FrameCodec, Markers, ResponseFrame};
use crate::FiscalError;
use crate::bytes::{additive_sum_u8, nibble_decode, nibble_encode, slice_between};
use bgfp_status::codes;

const STX: u8 = 0x02;
const ETX: u8 = 0x03;
const NAK: u8 = 0x15;
const SYN: u8 = 0x16;

/// Device number sent in every request; devices on a point-to-point link
/// answer to any number.
pub(crate) const DEVICE_NUMBER: &[u8; 4] = b"0000";
/// Status field length in ASCII hex characters.
pub(crate) const STATUS_HEX_LEN: usize = 12;
const BODY_OFFSET: usize = 1 + DEVICE_NUMBER.len();
const TRAILER_LEN: usize = 2 + 2 + 1;
const MAX_BODY_LEN: usize = 0xFF;

static ICP_MARKERS: Markers = Markers {
    answer: &[STX],
    resend: &[NAK],
    wait: &[SYN],
    terminator: ETX,
};

/// Codec for ICP devices.
#[derive(Debug, Clone, Copy, Default)]
pub struct IcpCodec;

impl FrameCodec for IcpCodec {
    fn family(&self) -> Family {
        Family::Icp
    }

    fn markers(&self) -> &'static Markers {
        &ICP_MARKERS
    }

    fn sequence_range(&self) -> Option<(u8, u8)> {
        None
    }

    fn encode(&self, _sequence: u8, command: u16, data: &[u8]) -> Result<Vec<u8>, FiscalError> {
        let command = u8::try_from(command).map_err(|_| FiscalError::UnsupportedValue {
            code: codes::INVALID_COMMAND,
            text: format!("ICP command {command:#06X} does not fit in one byte"),
        })?;
        // Room for the status block the device appends to the same LEN field.
        let max = MAX_BODY_LEN - 1 - STATUS_HEX_LEN;
        if data.len() > max {
            return Err(FiscalError::FrameTooLarge {
                size: data.len(),
                max,
            });
        }

        let mut frame = Vec::with_capacity(data.len() + 11);
        frame.push(STX);
        frame.extend_from_slice(DEVICE_NUMBER);
        frame.push(command);
        frame.extend_from_slice(data);
        frame.extend_from_slice(&nibble_encode((1 + data.len()) as u8));
        let cs = additive_sum_u8(&frame[1..]);
        frame.extend_from_slice(&nibble_encode(cs));
        frame.push(ETX);
        Ok(frame)
    }

    fn decode(&self, frame: &[u8]) -> Result<ResponseFrame, FiscalError> {
        let min_len = BODY_OFFSET + 1 + STATUS_HEX_LEN + TRAILER_LEN;
        if frame.len() < min_len {
            return Err(FiscalError::MalformedFrame {
                details: format!("frame of {} bytes is shorter than {min_len}", frame.len()),
            });
        }
        let n = frame.len();
        if frame[0] != STX || frame[n - 1] != ETX {
            return Err(FiscalError::MalformedFrame {
                details: "missing STX/ETX".into(),
            });
        }

        let len_at = n - TRAILER_LEN;
        let cs_at = len_at + 2;
        let expected = u16::from(additive_sum_u8(slice_between(frame, 1, cs_at)?));
        let actual = nibble_decode(slice_between(frame, cs_at, n - 1)?)?;
        if expected != actual {
            return Err(FiscalError::ChecksumMismatch { expected, actual });
        }

        let body = slice_between(frame, BODY_OFFSET, len_at)?;
        let declared = usize::from(nibble_decode(slice_between(frame, len_at, cs_at)?)?);
        if declared != body.len() {
            return Err(FiscalError::MalformedFrame {
                details: format!("LEN field says {declared}, body has {} bytes", body.len()),
            });
        }

        let status_at = len_at - STATUS_HEX_LEN;
        Ok(ResponseFrame {
            sequence: None,
            command: Some(u16::from(frame[BODY_OFFSET])),
            data: slice_between(frame, BODY_OFFSET + 1, status_at)?.to_vec(),
            status: slice_between(frame, status_at, len_at)?.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(cmd: u8, data: &[u8], status: &[u8; 12]) -> Vec<u8> {
        let mut frame = vec![STX];
        frame.extend_from_slice(DEVICE_NUMBER);
        frame.push(cmd);
        frame.extend_from_slice(data);
        frame.extend_from_slice(status);
        frame.extend_from_slice(&nibble_encode((1 + data.len() + 12) as u8));
        let cs = additive_sum_u8(&frame[1..]);
        frame.extend_from_slice(&nibble_encode(cs));
        frame.push(ETX);
        frame
    }

    #[test]
    fn encode_request() {
        let frame = IcpCodec.encode(0, u16::from(b'Q'), b"").unwrap();
        assert_eq!(&frame[..6], b"\x020000Q");
        // LEN = 1
        assert_eq!(&frame[6..8], &[0x30, 0x31]);
        let cs = additive_sum_u8(&frame[1..8]);
        assert_eq!(&frame[8..10], &nibble_encode(cs));
        assert_eq!(frame[10], ETX);
    }

    #[test]
    fn decode_answer_keeps_status_as_hex() {
        let frame = answer(b'R', b"1250", b"000000000000");
        let parsed = IcpCodec.decode(&frame).unwrap();
        assert_eq!(parsed.sequence, None);
        assert_eq!(parsed.command, Some(u16::from(b'R')));
        assert_eq!(parsed.data, b"1250");
        assert_eq!(parsed.status, b"000000000000");
    }

    #[test]
    fn corrupted_byte_fails() {
        let frame = answer(b'R', b"1250", b"800000000000");
        for i in 1..frame.len() - 1 {
            let mut bad = frame.clone();
            bad[i] ^= 0x01;
            assert!(IcpCodec.decode(&bad).is_err(), "corruption at {i} not detected");
        }
    }

    #[test]
    fn wrong_len_field_is_malformed() {
        let mut frame = answer(b'R', b"12", b"000000000000");
        let n = frame.len();
        frame[n - 5..n - 3].copy_from_slice(&nibble_encode(3));
        let cs = additive_sum_u8(&frame[1..n - 3]);
        frame[n - 3..n - 1].copy_from_slice(&nibble_encode(cs));
        assert!(matches!(
            IcpCodec.decode(&frame),
            Err(FiscalError::MalformedFrame { .. })
        ));
    }

    #[test]
    fn has_no_sequence() {
        assert_eq!(IcpCodec.sequence_range(), None);
    }
}
