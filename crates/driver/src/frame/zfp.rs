//! ZFP framing (Tremol).
//!
//! Request:     `02 LEN NBL CMD DATA CS(2) 0A`
//! Data answer: `02 LEN NBL DATA CS(2) 0A`
//! ACK answer:  `06 NBL STE1 STE2 CS(2) 0A`
//!
//! `LEN` and `NBL` are offset by 0x20. `CS` is the XOR of every byte after
//! the leading marker up to the checksum, written as two nibble characters.
//! Every request is preceded by a one-byte ping.

use tracing::{debug, warn};

use super::{Family, FrameCodec, Markers, ResponseFrame};
use crate::bytes::{nibble_decode, nibble_encode, slice_between, xor_sum};
use crate::{Channel, FiscalError, FrameRetries};
use bgfp_status::codes;

const STX: u8 = 0x02;
const ACK: u8 = 0x06;
const NAK: u8 = 0x15;
const RETRY: u8 = 0x0E;
const ETX: u8 = 0x0A;
const SPACE: u8 = 0x20;
const PING: u8 = 0x09;
const MAX_SEQUENCE: u8 = 0x5F;
const MAX_DATA_LEN: usize = 0xFF - SPACE as usize - 3;
const ACK_FRAME_LEN: usize = 7;

static ZFP_MARKERS: Markers = Markers {
    answer: &[STX, ACK],
    resend: &[NAK],
    wait: &[RETRY],
    terminator: ETX,
};

/// Device state reported in reply to a ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingState {
    /// `0x40`: send the request.
    Ready,
    /// `0x41`: ping again.
    Busy,
    /// `0x42`
    OutOfPaper,
    /// `0x43`
    Overheated,
    /// `0x44`
    MissingDisplay,
    /// `0x45`
    BusyWithAnotherConnection,
    /// `0x46`
    WaitingForPassword,
    /// `0x47`
    WrongPassword,
    /// Any other reply; logged and retried.
    Unknown(u8),
}

impl PingState {
    /// Classify a ping reply byte.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x40 => PingState::Ready,
            0x41 => PingState::Busy,
            0x42 => PingState::OutOfPaper,
            0x43 => PingState::Overheated,
            0x44 => PingState::MissingDisplay,
            0x45 => PingState::BusyWithAnotherConnection,
            0x46 => PingState::WaitingForPassword,
            0x47 => PingState::WrongPassword,
            other => PingState::Unknown(other),
        }
    }

    /// The error for a state that stops the request, if any.
    pub fn to_error(self) -> Option<FiscalError> {
        let (code, text) = match self {
            PingState::Ready | PingState::Busy | PingState::Unknown(_) => return None,
            PingState::OutOfPaper => (codes::OUT_OF_PAPER, "Out of paper"),
            PingState::Overheated => (codes::OVERHEATED, "Overheated"),
            PingState::MissingDisplay => (codes::MISSING_DISPLAY, "Missing external display"),
            PingState::BusyWithAnotherConnection => (
                codes::BUSY_WITH_ANOTHER_CONNECTION,
                "Device is busy with another connection",
            ),
            PingState::WaitingForPassword => {
                (codes::WRONG_PASSWORD, "Device is waiting for a password")
            }
            PingState::WrongPassword => (codes::WRONG_PASSWORD, "Wrong password"),
        };
        Some(FiscalError::DeviceReported {
            code: code.into(),
            text: text.to_string(),
        })
    }
}

/// Codec for Tremol ZFP devices.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZfpCodec;

impl ZfpCodec {
    /// Ping until the device reports ready, a fatal state, or the retries run out.
    pub fn ping(
        &self,
        channel: &mut dyn Channel,
        retries: &FrameRetries,
    ) -> Result<(), FiscalError> {
        for attempt in 1..=retries.max_ping_retries {
            channel.write(&[PING])?;
            let reply = match channel.read() {
                Ok(reply) => reply,
                Err(FiscalError::ReadTimeout) => {
                    debug!(channel = channel.descriptor(), attempt, "ping timed out");
                    continue;
                }
                Err(e) => return Err(e),
            };
            let Some(&last) = reply.last() else {
                continue;
            };
            let state = PingState::from_byte(last);
            match state {
                PingState::Ready => return Ok(()),
                PingState::Busy => {
                    warn!(channel = channel.descriptor(), attempt, "device busy, pinging again");
                }
                PingState::Unknown(byte) => {
                    warn!(
                        channel = channel.descriptor(),
                        attempt, "unexpected ping reply {byte:#04X}"
                    );
                }
                fatal => {
                    if let Some(err) = fatal.to_error() {
                        return Err(err);
                    }
                }
            }
        }
        Err(FiscalError::ReadTimeout)
    }
}

impl FrameCodec for ZfpCodec {
    fn family(&self) -> Family {
        Family::Zfp
    }

    fn markers(&self) -> &'static Markers {
        &ZFP_MARKERS
    }

    fn sequence_range(&self) -> Option<(u8, u8)> {
        Some((0, MAX_SEQUENCE))
    }

    fn encode(&self, sequence: u8, command: u16, data: &[u8]) -> Result<Vec<u8>, FiscalError> {
        let command = u8::try_from(command).map_err(|_| FiscalError::UnsupportedValue {
            code: codes::INVALID_COMMAND,
            text: format!("ZFP command {command:#06X} does not fit in one byte"),
        })?;
        if data.len() > MAX_DATA_LEN {
            return Err(FiscalError::FrameTooLarge {
                size: data.len(),
                max: MAX_DATA_LEN,
            });
        }

        let mut frame = Vec::with_capacity(data.len() + 7);
        frame.push(STX);
        frame.push(SPACE + 3 + data.len() as u8);
        frame.push(SPACE + sequence);
        frame.push(command);
        frame.extend_from_slice(data);
        let cs = xor_sum(&frame[1..]);
        frame.extend_from_slice(&nibble_encode(cs));
        frame.push(ETX);
        Ok(frame)
    }

    fn decode(&self, frame: &[u8]) -> Result<ResponseFrame, FiscalError> {
        match frame.first() {
            Some(&ACK) => decode_ack(frame),
            Some(&STX) => decode_data(frame),
            other => Err(FiscalError::MalformedFrame {
                details: format!("unexpected leading byte {other:02X?}"),
            }),
        }
    }

    fn matches_request(&self, sequence: u8, frame: &[u8]) -> bool {
        let at = if frame.first() == Some(&ACK) { 1 } else { 2 };
        frame.get(at).map(|b| b.wrapping_sub(SPACE)) == Some(sequence)
    }

    fn before_request(
        &self,
        channel: &mut dyn Channel,
        retries: &FrameRetries,
    ) -> Result<(), FiscalError> {
        self.ping(channel, retries)
    }
}

fn verify_xor(frame: &[u8], cs_at: usize) -> Result<(), FiscalError> {
    let expected = u16::from(xor_sum(slice_between(frame, 1, cs_at)?));
    let actual = nibble_decode(slice_between(frame, cs_at, cs_at + 2)?)?;
    if expected != actual {
        return Err(FiscalError::ChecksumMismatch { expected, actual });
    }
    Ok(())
}

fn decode_ack(frame: &[u8]) -> Result<ResponseFrame, FiscalError> {
    if frame.len() != ACK_FRAME_LEN || frame[ACK_FRAME_LEN - 1] != ETX {
        return Err(FiscalError::MalformedFrame {
            details: format!("ACK frame must be {ACK_FRAME_LEN} bytes, got {}", frame.len()),
        });
    }
    verify_xor(frame, 4)?;
    Ok(ResponseFrame {
        sequence: Some(frame[1].wrapping_sub(SPACE)),
        command: None,
        data: Vec::new(),
        status: frame[2..4].to_vec(),
    })
}

fn decode_data(frame: &[u8]) -> Result<ResponseFrame, FiscalError> {
    // 02 LEN NBL <n> CS CS 0A
    if frame.len() < 6 || frame[frame.len() - 1] != ETX {
        return Err(FiscalError::MalformedFrame {
            details: format!("data frame of {} bytes is too short", frame.len()),
        });
    }
    let cs_at = frame.len() - 3;
    let data_len = cs_at - 3;
    let declared = usize::from(frame[1].wrapping_sub(SPACE));
    if declared != data_len + 2 {
        return Err(FiscalError::MalformedFrame {
            details: format!("LEN field says {declared}, frame carries {}", data_len + 2),
        });
    }
    verify_xor(frame, cs_at)?;
    Ok(ResponseFrame {
        sequence: Some(frame[2].wrapping_sub(SPACE)),
        command: None,
        data: slice_between(frame, 3, cs_at)?.to_vec(),
        status: Vec::new(),
    })
}
