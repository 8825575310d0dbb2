//! Protocol framing: one [`FrameCodec`] per device family.
//!
//! A codec builds request frames and parses answer frames; the shared
//! write/read/resend loop lives in [`exchange`]. Codecs hold no mutable
//! state, so the rolling sequence number is kept by the caller in a
//! [`FrameSequence`].

pub(crate) mod exchange;
mod icp;
mod isl;
mod islx;
mod zfp;

pub use icp::IcpCodec;
pub use isl::IslCodec;
pub use islx::IslxCodec;
pub use zfp::{PingState, ZfpCodec};

use rand::Rng;

use crate::{Channel, FiscalError, FrameRetries};

/// Wire protocol family.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Family {
    /// PREAMBLE/POSTAMBLE framing with 1-byte length and command.
    Isl,
    /// ISL with 4-nibble length and command (Datecs X series).
    IslX,
    /// STX/ETX framing with a device number field.
    Icp,
    /// Tremol STX/ETX framing with ping handshake.
    Zfp,
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Family::Isl => write!(f, "ISL"),
            Family::IslX => write!(f, "ISL-X"),
            Family::Icp => write!(f, "ICP"),
            Family::Zfp => write!(f, "ZFP"),
        }
    }
}

/// A parsed answer frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponseFrame {
    /// Sequence number echoed by the device, if the family has one.
    pub sequence: Option<u8>,
    /// Command echoed by the device, if the family has one.
    pub command: Option<u16>,
    /// Payload bytes in the device code page.
    pub data: Vec<u8>,
    /// Raw status field, handed to a [`StatusDecoder`](crate::StatusDecoder).
    pub status: Vec<u8>,
}

/// Classification of the leading byte of a received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// The device wants the request written again.
    Resend,
    /// The device is still processing; keep reading.
    Wait,
    /// Start of an answer frame.
    Answer,
}

/// Control bytes of one family, used to cut the byte stream into frames.
#[derive(Debug, Clone, Copy)]
pub struct Markers {
    /// Bytes that start an answer frame.
    pub answer: &'static [u8],
    /// Single-byte "write the request again" signals.
    pub resend: &'static [u8],
    /// Single-byte "still busy" signals.
    pub wait: &'static [u8],
    /// Last byte of an answer frame.
    pub terminator: u8,
}

impl Markers {
    /// Classify the first byte of a frame.
    pub fn classify(&self, first: u8) -> Option<FrameKind> {
        if self.resend.contains(&first) {
            Some(FrameKind::Resend)
        } else if self.wait.contains(&first) {
            Some(FrameKind::Wait)
        } else if self.answer.contains(&first) {
            Some(FrameKind::Answer)
        } else {
            None
        }
    }
}

/// Builds and parses frames of one family.
pub trait FrameCodec: Send + Sync {
    /// The family this codec speaks.
    fn family(&self) -> Family;

    /// Control bytes used by the exchange loop.
    fn markers(&self) -> &'static Markers;

    /// Inclusive range of sequence numbers, or `None` if the family has none.
    fn sequence_range(&self) -> Option<(u8, u8)>;

    /// Build the request frame.
    fn encode(&self, sequence: u8, command: u16, data: &[u8]) -> Result<Vec<u8>, FiscalError>;

    /// Parse a complete answer frame and verify its checksum.
    fn decode(&self, frame: &[u8]) -> Result<ResponseFrame, FiscalError>;

    /// `true` unless the frame visibly answers a different request.
    fn matches_request(&self, _sequence: u8, _frame: &[u8]) -> bool {
        true
    }

    /// Handshake run before every request (ZFP ping). Default: none.
    fn before_request(
        &self,
        _channel: &mut dyn Channel,
        _retries: &FrameRetries,
    ) -> Result<(), FiscalError> {
        Ok(())
    }
}

// ── Sequence numbers ────────────────────────────────────────────────────

/// Rolling frame sequence number.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    current: u8,
    min: u8,
    max: u8,
}

impl FrameSequence {
    /// Start at `start` (clamped into `min..=max`); the first
    /// [`next`](Self::next) returns the value after it.
    pub fn new(min: u8, max: u8, start: u8) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            current: start.clamp(min, max),
            min,
            max,
        }
    }

    /// Randomly seeded sequence, as devices expect after a reconnect.
    pub fn random(min: u8, max: u8) -> Self {
        let start = rand::rng().random_range(min.min(max)..=max.max(min));
        Self::new(min, max, start)
    }

    /// Sequence for a codec: random within its range, or a fixed zero.
    pub fn for_codec(codec: &dyn FrameCodec) -> Self {
        match codec.sequence_range() {
            Some((min, max)) => Self::random(min, max),
            None => Self::new(0, 0, 0),
        }
    }

    /// Advance, wrapping from `max` back to `min`, and return the new value.
    pub fn next(&mut self) -> u8 {
        self.current = if self.current >= self.max {
            self.min
        } else {
            self.current + 1
        };
        self.current
    }

    /// Last value returned by [`next`](Self::next) (or the start value).
    pub fn current(&self) -> u8 {
        self.current
    }
}
