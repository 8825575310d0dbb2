//! ISL-X framing used by the Datecs X series.
//!
//! Request: `01 LEN(4) SEQ CMD(4) DATA 05 BCC(4) 03`
//! Answer:  `01 LEN(4) SEQ CMD(4) DATA 04 STATUS(8) 05 BCC(4) 03`
//!
//! Identical to ISL except `LEN` and `CMD` are four nibble characters and
//! the status block is eight bytes.

use super::isl::{ISL_MARKERS, MAX_SEQUENCE, POSTAMBLE, PREAMBLE, SPACE, TERMINATOR, locate_markers};
use super::{Family, FrameCodec, Markers, ResponseFrame};
use crate::FiscalError;
use crate::bytes::{additive_sum, nibble_decode, nibble_encode_u16, slice_between};

const STATUS_LEN: usize = 8;
const DATA_OFFSET: usize = 10;
const MAX_DATA_LEN: usize = 496;

/// Codec for the extended ISL envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct IslxCodec;

impl FrameCodec for IslxCodec {
    fn family(&self) -> Family {
        Family::IslX
    }

    fn markers(&self) -> &'static Markers {
        &ISL_MARKERS
    }

    fn sequence_range(&self) -> Option<(u8, u8)> {
        Some((0, MAX_SEQUENCE))
    }

    fn encode(&self, sequence: u8, command: u16, data: &[u8]) -> Result<Vec<u8>, FiscalError> {
        if data.len() > MAX_DATA_LEN {
            return Err(FiscalError::FrameTooLarge {
                size: data.len(),
                max: MAX_DATA_LEN,
            });
        }

        let len = u16::from(SPACE) + (DATA_OFFSET + data.len()) as u16;
        let mut frame = Vec::with_capacity(data.len() + 16);
        frame.push(PREAMBLE);
        frame.extend_from_slice(&nibble_encode_u16(len));
        frame.push(SPACE + sequence);
        frame.extend_from_slice(&nibble_encode_u16(command));
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
            sequence: Some(frame[5].wrapping_sub(SPACE)),
            command: Some(nibble_decode(slice_between(frame, 6, DATA_OFFSET)?)?),
            data: slice_between(frame, DATA_OFFSET, layout.separator)?.to_vec(),
            status: slice_between(frame, layout.separator + 1, layout.postamble)?.to_vec(),
        })
    }

    fn matches_request(&self, sequence: u8, frame: &[u8]) -> bool {
        frame.get(5).map(|b| b.wrapping_sub(SPACE)) == Some(sequence)
    }
}
