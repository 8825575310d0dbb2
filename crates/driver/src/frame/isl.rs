//! ISL framing (Datecs C, Daisy, Eltrade, Incotex).
//!
//! Request: `01 LEN SEQ CMD DATA 05 BCC(4) 03`
//! Answer:  `01 LEN SEQ CMD DATA 04 STATUS(6) 05 BCC(4) 03`
//!
//! `LEN` and `SEQ` are offset by 0x20. `BCC` is the 16-bit additive sum of
//! every byte after the preamble up to and including the postamble,
//! written as four nibble characters.

use super::{Family, FrameCodec, Markers, ResponseFrame};
use crate::FiscalError;
use crate::bytes::{additive_sum, nibble_decode, nibble_encode_u16, slice_between};
use bgfp_status::codes;

pub(crate) const PREAMBLE: u8 = 0x01;
pub(crate) const TERMINATOR: u8 = 0x03;
pub(crate) const SEPARATOR: u8 = 0x04;
pub(crate) const POSTAMBLE: u8 = 0x05;
pub(crate) const NAK: u8 = 0x15;
pub(crate) const SYN: u8 = 0x16;
pub(crate) const SPACE: u8 = 0x20;
pub(crate) const MAX_SEQUENCE: u8 = 0x5F;

const STATUS_LEN: usize = 6;
const DATA_OFFSET: usize = 4;
const MAX_DATA_LEN: usize = 218;

pub(crate) static ISL_MARKERS: Markers = Markers {
    answer: &[PREAMBLE],
    resend: &[NAK],
    wait: &[SYN],
    terminator: TERMINATOR,
};

/// Codec for the classic ISL envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct IslCodec;

impl FrameCodec for IslCodec {
    fn family(&self) -> Family {
        Family::Isl
    }

    fn markers(&self) -> &'static Markers {
        &ISL_MARKERS
    }

    fn sequence_range(&self) -> Option<(u8, u8)> {
        Some((0, MAX_SEQUENCE))
    }

    fn encode(&self, sequence: u8, command: u16, data: &[u8]) -> Result<Vec<u8>, FiscalError> {
        let command = u8::try_from(command).map_err(|_| FiscalError::UnsupportedValue {
            code: codes::INVALID_COMMAND,
            text: format!("ISL command {command:#06X} does not fit in one byte"),
        })?;
        if data.len() > MAX_DATA_LEN {
            return Err(FiscalError::FrameTooLarge {
                size: data.len(),
                max: MAX_DATA_LEN,
            });
        }

        let mut frame = Vec::with_capacity(data.len() + 10);
        frame.push(PREAMBLE);
        frame.push(SPACE + (DATA_OFFSET + data.len()) as u8);
        frame.push(SPACE + sequence);
        frame.push(command);
        frame.extend_from_slice(data);
        frame.push(POSTAMBLE);
        let bcc = additive_sum(&frame[1..]);
        frame.extend_from_slice(&nibble_encode_u16(bcc));
        frame.push(TERMINATOR);
        Ok(frame)
    }

    fn decode(&self, frame: &[u8]) -> Result<ResponseFrame, FiscalError> {
        let layout = locate_markers(frame, DATA_OFFSET, STATUS_LEN)?;
        Ok(ResponseFrame {
            sequence: Some(frame[2].wrapping_sub(SPACE)),
            command: Some(u16::from(frame[3])),
            data: slice_between(frame, DATA_OFFSET, layout.separator)?.to_vec(),
            status: slice_between(frame, layout.separator + 1, layout.postamble)?.to_vec(),
        })
    }

    fn matches_request(&self, sequence: u8, frame: &[u8]) -> bool {
        frame.get(2).map(|b| b.wrapping_sub(SPACE)) == Some(sequence)
    }
}

/// Marker offsets of a verified ISL-style answer.
pub(super) struct Layout {
    pub(super) separator: usize,
    pub(super) postamble: usize,
}

/// Locate separator/postamble/terminator, check their order and verify the BCC.
pub(super) fn locate_markers(
    frame: &[u8],
    data_offset: usize,
    status_len: usize,
) -> Result<Layout, FiscalError> {
    let min_len = data_offset + 1 + status_len + 1 + 4 + 1;
    if frame.len() < min_len {
        return Err(FiscalError::MalformedFrame {
            details: format!("frame of {} bytes is shorter than {min_len}", frame.len()),
        });
    }
    if frame[0] != PREAMBLE {
        return Err(FiscalError::MalformedFrame {
            details: format!("expected preamble, got {:#04X}", frame[0]),
        });
    }

    let separator = frame[data_offset..]
        .iter()
        .position(|&b| b == SEPARATOR)
        .map(|i| i + data_offset)
        .ok_or_else(|| FiscalError::MalformedFrame {
            details: "separator not found".into(),
        })?;
    let postamble = separator + 1 + status_len;
    let terminator = postamble + 5;
    if frame.get(postamble) != Some(&POSTAMBLE) {
        return Err(FiscalError::MalformedFrame {
            details: format!("expected postamble at offset {postamble}"),
        });
    }
    if terminator != frame.len() - 1 || frame[terminator] != TERMINATOR {
        return Err(FiscalError::MalformedFrame {
            details: format!(
                "expected terminator at offset {terminator}, frame has {} bytes",
                frame.len()
            ),
        });
    }

    let expected = additive_sum(slice_between(frame, 1, postamble + 1)?);
    let actual = nibble_decode(slice_between(frame, postamble + 1, terminator)?)?;
    if expected != actual {
        return Err(FiscalError::ChecksumMismatch { expected, actual });
    }
    Ok(Layout {
        separator,
        postamble,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(seq: u8, cmd: u8, data: &[u8], status: [u8; 6]) -> Vec<u8> {
        let mut frame = vec![PREAMBLE, SPACE + 11 + data.len() as u8, SPACE + seq, cmd];
        frame.extend_from_slice(data);
        frame.push(SEPARATOR);
        frame.extend_from_slice(&status);
        frame.push(POSTAMBLE);
        let bcc = additive_sum(&frame[1..]);
        frame.extend_from_slice(&nibble_encode_u16(bcc));
        frame.push(TERMINATOR);
        frame
    }

    #[test]
    fn open_receipt_frame_is_bit_exact() {
        let frame = IslCodec.encode(5, 0x30, b"1,0000,INV-0001").unwrap();
        assert_eq!(
            frame,
            vec![
                0x01, 0x33, 0x25, 0x30, 0x31, 0x2C, 0x30, 0x30, 0x30, 0x30, 0x2C, 0x49, 0x4E,
                0x56, 0x2D, 0x30, 0x30, 0x30, 0x31, 0x05, 0x30, 0x33, 0x3B, 0x31, 0x03,
            ]
        );
    }

    #[test]
    fn empty_data_frame() {
        let frame = IslCodec.encode(0, 0x4A, b"").unwrap();
        assert_eq!(frame[1], 0x24);
        assert_eq!(frame[4], POSTAMBLE);
        assert_eq!(frame.len(), 10);
    }

    #[test]
    fn wide_command_rejected() {
        assert!(matches!(
            IslCodec.encode(0, 0x100, b""),
            Err(FiscalError::UnsupportedValue { .. })
        ));
    }

    #[test]
    fn oversized_data_rejected() {
        assert!(matches!(
            IslCodec.encode(0, 0x31, &[b'x'; 219]),
            Err(FiscalError::FrameTooLarge { max: 218, .. })
        ));
    }

    #[test]
    fn decode_answer() {
        let frame = answer(5, 0x4C, b"0,0,1250,1250", [0x80, 0x80, 0x88, 0x80, 0x80, 0x80]);
        let parsed = IslCodec.decode(&frame).unwrap();
        assert_eq!(parsed.sequence, Some(5));
        assert_eq!(parsed.command, Some(0x4C));
        assert_eq!(parsed.data, b"0,0,1250,1250");
        assert_eq!(parsed.status, vec![0x80, 0x80, 0x88, 0x80, 0x80, 0x80]);
    }

    #[test]
    fn decode_rejects_any_corrupted_byte() {
        let frame = answer(9, 0x30, b"12,34", [0x80; 6]);
        for i in 1..frame.len() - 1 {
            let mut bad = frame.clone();
            bad[i] ^= 0x01;
            assert!(IslCodec.decode(&bad).is_err(), "corruption at {i} not detected");
        }
    }

    #[test]
    fn checksum_mismatch_reported() {
        let mut frame = answer(9, 0x30, b"AB", [0x80; 6]);
        let n = frame.len();
        frame[n - 2] = 0x30 + ((frame[n - 2] - 0x30 + 1) & 0x0F);
        assert!(matches!(
            IslCodec.decode(&frame),
            Err(FiscalError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn truncated_frame_is_malformed() {
        let frame = answer(1, 0x30, b"", [0x80; 6]);
        assert!(matches!(
            IslCodec.decode(&frame[..frame.len() - 3]),
            Err(FiscalError::MalformedFrame { .. })
        ));
    }

    #[test]
    fn sequence_matching() {
        let frame = answer(7, 0x30, b"", [0x80; 6]);
        assert!(IslCodec.matches_request(7, &frame));
        assert!(!IslCodec.matches_request(8, &frame));
    }
}
