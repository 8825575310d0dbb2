//! The write / wait / resend / read loop shared by every family.
//!
//! 1. Write the request frame.
//! 2. Read chunks and cut them into candidate frames with a [`FrameScanner`].
//! 3. Resend marker: write again (bounded by `max_write_retries`).
//!    Wait marker: keep reading (bounded by `max_read_retries`).
//!    Answer frame: return it.
//! 4. A 0x00 as the very first response byte is fatal.
//! 5. A read timeout, or running out of write retries, means "no response".

use tracing::{debug, trace, warn};

use super::{FrameCodec, FrameKind, Markers};
use crate::bytes::hex_dump;
use crate::{Channel, FiscalError, FrameRetries};

/// Upper bound on an answer frame; guards against runaway reads.
pub(crate) const MAX_FRAME_SIZE: usize = 2048;

/// Byte-level splitter turning a stream into frames.
///
/// Outside a frame, resend/wait bytes are emitted as one-byte frames and
/// anything that is not an answer marker is skipped. Inside a frame, bytes
/// are collected until the family terminator.
pub(crate) struct FrameScanner {
    markers: &'static Markers,
    current: Vec<u8>,
}

impl FrameScanner {
    pub(crate) fn new(markers: &'static Markers) -> Self {
        Self {
            markers,
            current: Vec::with_capacity(256),
        }
    }

    /// Feed received bytes; returns every frame completed by them.
    pub(crate) fn feed(&mut self, bytes: &[u8]) -> Result<Vec<Vec<u8>>, FiscalError> {
        let mut frames = Vec::new();
        for &byte in bytes {
            if self.current.is_empty() {
                match self.markers.classify(byte) {
                    Some(FrameKind::Resend) | Some(FrameKind::Wait) => frames.push(vec![byte]),
                    Some(FrameKind::Answer) => self.current.push(byte),
                    None => trace!("skipping stray byte {byte:#04X}"),
                }
                continue;
            }
            if self.current.len() >= MAX_FRAME_SIZE {
                return Err(FiscalError::FrameTooLarge {
                    size: self.current.len() + 1,
                    max: MAX_FRAME_SIZE,
                });
            }
            self.current.push(byte);
            if byte == self.markers.terminator {
                frames.push(std::mem::take(&mut self.current));
            }
        }
        Ok(frames)
    }
}

/// Transact one request. Returns the raw answer frame, or `None` when the
/// device never answered.
pub(crate) fn transact(
    channel: &mut dyn Channel,
    codec: &dyn FrameCodec,
    request: &[u8],
    sequence: u8,
    retries: &FrameRetries,
    trace_io: bool,
) -> Result<Option<Vec<u8>>, FiscalError> {
    codec.before_request(channel, retries)?;

    let markers = codec.markers();
    let mut first_byte_seen = false;

    for attempt in 1..=retries.max_write_retries {
        if trace_io {
            debug!(
                channel = channel.descriptor(),
                attempt,
                "TX ({} bytes): {}",
                request.len(),
                hex_dump(request)
            );
        }
        channel.write(request)?;

        let mut scanner = FrameScanner::new(markers);
        let mut resend = false;

        'read: for _ in 0..retries.max_read_retries {
            let chunk = match channel.read() {
                Ok(chunk) => chunk,
                Err(FiscalError::ReadTimeout) => {
                    warn!(channel = channel.descriptor(), "read timed out, no response");
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };
            if trace_io {
                debug!(
                    channel = channel.descriptor(),
                    "RX ({} bytes): {}",
                    chunk.len(),
                    hex_dump(&chunk)
                );
            }
            if !first_byte_seen && let Some(&first) = chunk.first() {
                first_byte_seen = true;
                if first == 0x00 {
                    return Err(FiscalError::NotFiscalDevice);
                }
            }

            for frame in scanner.feed(&chunk)? {
                match frame.first().and_then(|&b| markers.classify(b)) {
                    Some(FrameKind::Resend) => {
                        warn!(channel = channel.descriptor(), attempt, "device asked to resend");
                        resend = true;
                        break 'read;
                    }
                    Some(FrameKind::Wait) => {}
                    Some(FrameKind::Answer) => {
                        if codec.matches_request(sequence, &frame) {
                            return Ok(Some(frame));
                        }
                        warn!(
                            channel = channel.descriptor(),
                            "skipping answer with stale sequence number"
                        );
                    }
                    None => {}
                }
            }
        }

        if !resend {
            debug!(
                channel = channel.descriptor(),
                attempt, "read retries exhausted, writing request again"
            );
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{IslCodec, ZfpCodec};
    use std::collections::VecDeque;

    struct Scripted {
        replies: VecDeque<Result<Vec<u8>, FiscalError>>,
        writes: Vec<Vec<u8>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<Vec<u8>, FiscalError>>) -> Self {
            Self {
                replies: replies.into(),
                writes: Vec::new(),
            }
        }
    }

    impl Channel for Scripted {
        fn descriptor(&self) -> &str {
            "scripted"
        }

        fn read(&mut self) -> Result<Vec<u8>, FiscalError> {
            self.replies
                .pop_front()
                .unwrap_or(Err(FiscalError::ReadTimeout))
        }

        fn write(&mut self, data: &[u8]) -> Result<(), FiscalError> {
            self.writes.push(data.to_vec());
            Ok(())
        }
    }

    fn isl_answer(seq: u8) -> Vec<u8> {
        let mut frame = vec![0x01, 0x20 + 11, 0x20 + seq, 0x4A, 0x04];
        frame.extend_from_slice(&[0x80; 6]);
        frame.push(0x05);
        let sum = crate::bytes::additive_sum(&frame[1..]);
        frame.extend_from_slice(&crate::bytes::nibble_encode_u16(sum));
        frame.push(0x03);
        frame
    }

    #[test]
    fn scanner_splits_controls_and_frames() {
        let mut scanner = FrameScanner::new(IslCodec.markers());
        let mut input = vec![0x16, 0x16, 0xFF];
        input.extend(isl_answer(3));
        let frames = scanner.feed(&input).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0], vec![0x16]);
        assert_eq!(frames[2], isl_answer(3));
    }

    #[test]
    fn scanner_handles_split_reads() {
        let mut scanner = FrameScanner::new(IslCodec.markers());
        let answer = isl_answer(7);
        let (a, b) = answer.split_at(6);
        assert!(scanner.feed(a).unwrap().is_empty());
        assert_eq!(scanner.feed(b).unwrap(), vec![answer.clone()]);
    }

    #[test]
    fn scanner_rejects_runaway_frame() {
        let mut scanner = FrameScanner::new(IslCodec.markers());
        let mut input = vec![0x01];
        input.extend(vec![b'X'; MAX_FRAME_SIZE + 1]);
        assert!(matches!(
            scanner.feed(&input),
            Err(FiscalError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn waits_through_syn_then_returns_answer() {
        let mut channel = Scripted::new(vec![
            Ok(vec![0x16]),
            Ok(vec![0x16, 0x16]),
            Ok(isl_answer(5)),
        ]);
        let frame = transact(
            &mut channel,
            &IslCodec,
            b"req",
            5,
            &FrameRetries::default(),
            false,
        )
        .unwrap();
        assert_eq!(frame, Some(isl_answer(5)));
        assert_eq!(channel.writes.len(), 1);
    }

    #[test]
    fn nak_triggers_resend() {
        let mut channel = Scripted::new(vec![Ok(vec![0x15]), Ok(isl_answer(5))]);
        let frame = transact(
            &mut channel,
            &IslCodec,
            b"req",
            5,
            &FrameRetries::default(),
            false,
        )
        .unwrap();
        assert!(frame.is_some());
        assert_eq!(channel.writes, vec![b"req".to_vec(), b"req".to_vec()]);
    }

    #[test]
    fn nak_forever_exhausts_write_retries() {
        let mut channel = Scripted::new((0..10).map(|_| Ok(vec![0x15])).collect());
        let retries = FrameRetries {
            max_write_retries: 3,
            ..FrameRetries::default()
        };
        let frame = transact(&mut channel, &IslCodec, b"req", 5, &retries, false).unwrap();
        assert!(frame.is_none());
        assert_eq!(channel.writes.len(), 3);
    }

    #[test]
    fn stale_sequence_is_skipped() {
        let mut stale_then_fresh = isl_answer(4);
        stale_then_fresh.extend(isl_answer(5));
        let mut channel = Scripted::new(vec![Ok(stale_then_fresh)]);
        let frame = transact(
            &mut channel,
            &IslCodec,
            b"req",
            5,
            &FrameRetries::default(),
            false,
        )
        .unwrap();
        assert_eq!(frame, Some(isl_answer(5)));
    }

    #[test]
    fn zero_first_byte_is_fatal() {
        let mut channel = Scripted::new(vec![Ok(vec![0x00, 0x00])]);
        let err = transact(
            &mut channel,
            &IslCodec,
            b"req",
            5,
            &FrameRetries::default(),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, FiscalError::NotFiscalDevice));
    }

    #[test]
    fn read_timeout_is_no_response() {
        let mut channel = Scripted::new(vec![Ok(vec![0x16])]);
        let frame = transact(
            &mut channel,
            &IslCodec,
            b"req",
            5,
            &FrameRetries::default(),
            false,
        )
        .unwrap();
        assert!(frame.is_none());
    }

    #[test]
    fn transport_error_propagates() {
        let mut channel = Scripted::new(vec![Err(FiscalError::ConnectionClosed)]);
        let err = transact(
            &mut channel,
            &IslCodec,
            b"req",
            5,
            &FrameRetries::default(),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, FiscalError::ConnectionClosed));
    }

    #[test]
    fn zfp_pings_before_writing() {
        let ack = {
            let mut f = vec![0x06, 0x25, 0x30, 0x30];
            let cs = crate::bytes::xor_sum(&f[1..]);
            f.extend_from_slice(&crate::bytes::nibble_encode(cs));
            f.push(0x0A);
            f
        };
        let mut channel = Scripted::new(vec![Ok(vec![0x40]), Ok(ack.clone())]);
        let frame = transact(
            &mut channel,
            &ZfpCodec,
            b"req",
            5,
            &FrameRetries::default(),
            false,
        )
        .unwrap();
        assert_eq!(frame, Some(ack));
        assert_eq!(channel.writes[0], vec![0x09]);
        assert_eq!(channel.writes[1], b"req".to_vec());
    }
}
