//! One device session: channel, codec, status decoder and sequence number
//! behind a single lock.

use std::time::Instant;

use parking_lot::Mutex;
use tracing::debug;

use bgfp_status::DeviceStatus;

use crate::commands::Command;
use crate::cp1251;
use crate::frame::exchange::transact;
use crate::frame::{FrameCodec, FrameSequence};
use crate::{Channel, FiscalError, PrinterConfig, StatusDecoder};

/// A decoded answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// Payload bytes in the device code page.
    pub data: Vec<u8>,
    /// Payload decoded to text.
    pub text: String,
    /// Status decoded from the frame status field.
    pub status: DeviceStatus,
}

struct Session {
    channel: Box<dyn Channel>,
    sequence: FrameSequence,
}

/// Serializes request/response cycles on one channel.
///
/// The lock is held for one write + read-retry cycle, not for a whole
/// receipt: callers running multi-command sequences must make sure no one
/// else uses the device meanwhile.
pub struct Link {
    session: Mutex<Session>,
    codec: &'static dyn FrameCodec,
    decoder: &'static dyn StatusDecoder,
    config: PrinterConfig,
    descriptor: String,
    deadline: Mutex<Option<Instant>>,
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("descriptor", &self.descriptor)
            .field("family", &self.codec.family())
            .finish_non_exhaustive()
    }
}

impl Link {
    /// Wrap `channel`, seeding the sequence number randomly.
    pub fn new(
        channel: Box<dyn Channel>,
        codec: &'static dyn FrameCodec,
        decoder: &'static dyn StatusDecoder,
        config: PrinterConfig,
    ) -> Self {
        let descriptor = channel.descriptor().to_string();
        let sequence = FrameSequence::for_codec(codec);
        Self {
            session: Mutex::new(Session { channel, sequence }),
            codec,
            decoder,
            config,
            descriptor,
            deadline: Mutex::new(None),
        }
    }

    /// Replace the sequence counter (deterministic tests).
    pub fn with_sequence(mut self, sequence: FrameSequence) -> Self {
        self.session.get_mut().sequence = sequence;
        self
    }

    /// Channel descriptor.
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Install or clear the caller deadline.
    pub fn set_deadline(&self, deadline: Option<Instant>) {
        *self.deadline.lock() = deadline;
    }

    /// Decode a status block with this device's decoder.
    pub fn decode_status(&self, status: &[u8]) -> DeviceStatus {
        self.decoder.decode(status)
    }

    /// Send `command` and wait for its answer.
    pub fn request(&self, command: &Command) -> Result<Response, FiscalError> {
        if let Some(deadline) = *self.deadline.lock()
            && Instant::now() >= deadline
        {
            return Err(FiscalError::UserTimeout);
        }

        let data = cp1251::encode(&command.data);
        let mut session = self.session.lock();
        let sequence = session.sequence.next();
        let frame = self.codec.encode(sequence, command.code, &data)?;
        debug!(
            channel = %self.descriptor,
            command = format_args!("{:#04X}", command.code),
            sequence,
            "request {:?}",
            command.data
        );

        let raw = transact(
            session.channel.as_mut(),
            self.codec,
            &frame,
            sequence,
            &self.config.retries,
            self.config.trace_io,
        )?
        .ok_or(FiscalError::NoResponse {
            attempts: self.config.retries.max_write_retries,
        })?;
        drop(session);

        let answer = self.codec.decode(&raw)?;
        let text = cp1251::decode(&answer.data);
        let status = self.decoder.decode(&answer.status);
        debug!(channel = %self.descriptor, ok = status.is_ok(), "response {text:?}");
        Ok(Response {
            data: answer.data,
            text,
            status,
        })
    }

    /// Give the channel back, e.g. to probe it with another vendor.
    pub fn into_channel(self) -> Box<dyn Channel> {
        self.session.into_inner().channel
    }
}
