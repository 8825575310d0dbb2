//! Shared test helpers: in-memory fiscal devices speaking ISL, ISL-X, ICP
//! and ZFP.
//!
//! Each mock implements [`Channel`], parses the request frames the driver
//! writes, asks a handler for the answer and queues the answer frame for the
//! next `read`. Frames of another family are ignored, so the driver sees
//! silence, exactly like a real device on the wrong protocol.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use bgfp_driver::bytes::{
    additive_sum, additive_sum_u8, nibble_decode, nibble_encode, nibble_encode_u16, xor_sum,
};
use bgfp_driver::{Channel, FiscalError, cp1251};

/// Every command a mock received, as `(code, decoded data)`.
pub type CommandLog = Arc<Mutex<Vec<(u16, String)>>>;

/// Commands seen so far.
pub fn commands(log: &CommandLog) -> Vec<(u16, String)> {
    log.lock().unwrap().clone()
}

/// Command codes seen so far.
pub fn codes(log: &CommandLog) -> Vec<u16> {
    log.lock().unwrap().iter().map(|(code, _)| *code).collect()
}

// ── ISL / ISL-X ─────────────────────────────────────────────────────────

/// Which ISL envelope a mock speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    /// One-byte LEN and CMD, 6 status bytes.
    Isl,
    /// Nibble-encoded LEN and CMD, 8 status bytes.
    IslX,
}

impl Envelope {
    fn status_len(self) -> usize {
        match self {
            Envelope::Isl => 6,
            Envelope::IslX => 8,
        }
    }
}

/// Answer data plus raw status bytes.
pub struct IslReply {
    pub data: String,
    pub status: Vec<u8>,
}

impl IslReply {
    /// An answer with a clean status block.
    pub fn ok(envelope: Envelope, data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            status: vec![0x80; envelope.status_len()],
        }
    }

    /// An answer with `bit` set in status byte `byte`.
    pub fn with_bit(envelope: Envelope, data: impl Into<String>, byte: usize, bit: u8) -> Self {
        let mut reply = Self::ok(envelope, data);
        reply.status[byte] |= 1 << bit;
        reply
    }
}

type IslHandler = Box<dyn FnMut(u16, &str) -> IslReply + Send>;

/// An ISL or ISL-X device.
pub struct MockIslDevice {
    descriptor: String,
    envelope: Envelope,
    handler: IslHandler,
    pending: VecDeque<Vec<u8>>,
    log: CommandLog,
}

impl MockIslDevice {
    pub fn new(
        descriptor: &str,
        envelope: Envelope,
        handler: impl FnMut(u16, &str) -> IslReply + Send + 'static,
    ) -> (Self, CommandLog) {
        let log = CommandLog::default();
        let device = Self {
            descriptor: descriptor.to_string(),
            envelope,
            handler: Box::new(handler),
            pending: VecDeque::new(),
            log: Arc::clone(&log),
        };
        (device, log)
    }

    /// `(sequence, command, data)` of a well-formed request, else `None`.
    fn parse(&self, req: &[u8]) -> Option<(u8, u16, Vec<u8>)> {
        if req.len() < 10 || req[0] != 0x01 || *req.last()? != 0x03 || req[req.len() - 6] != 0x05
        {
            return None;
        }
        match self.envelope {
            Envelope::Isl => {
                if usize::from(req[1].checked_sub(0x20)?) + 6 != req.len() {
                    return None;
                }
                Some((req[2] - 0x20, u16::from(req[3]), req[4..req.len() - 6].to_vec()))
            }
            Envelope::IslX => {
                if req.len() < 16 {
                    return None;
                }
                let len = usize::from(nibble_decode(&req[1..5]).ok()?);
                if len.checked_sub(0x20)? + 6 != req.len() {
                    return None;
                }
                let cmd = nibble_decode(&req[6..10]).ok()?;
                Some((req[5] - 0x20, cmd, req[10..req.len() - 6].to_vec()))
            }
        }
    }

    fn answer(&self, seq: u8, cmd: u16, reply: &IslReply) -> Vec<u8> {
        let data = cp1251::encode(&reply.data);
        let mut frame = vec![0x01];
        match self.envelope {
            Envelope::Isl => {
                frame.push(0x20 + 4 + data.len() as u8 + 1 + reply.status.len() as u8);
                frame.push(0x20 + seq);
                frame.push(cmd as u8);
            }
            Envelope::IslX => {
                let len = 0x20 + 10 + data.len() as u16 + 1 + reply.status.len() as u16;
                frame.extend_from_slice(&nibble_encode_u16(len));
                frame.push(0x20 + seq);
                frame.extend_from_slice(&nibble_encode_u16(cmd));
            }
        }
        frame.extend_from_slice(&data);
        frame.push(0x04);
        frame.extend_from_slice(&reply.status);
        frame.push(0x05);
        let bcc = additive_sum(&frame[1..]);
        frame.extend_from_slice(&nibble_encode_u16(bcc));
        frame.push(0x03);
        frame
    }
}

impl Channel for MockIslDevice {
    fn descriptor(&self) -> &str {
        &self.descriptor
    }

    fn read(&mut self) -> Result<Vec<u8>, FiscalError> {
        self.pending.pop_front().ok_or(FiscalError::ReadTimeout)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), FiscalError> {
        let Some((seq, cmd, payload)) = self.parse(data) else {
            return Ok(());
        };
        let text = cp1251::decode(&payload);
        self.log.lock().unwrap().push((cmd, text.clone()));
        let reply = (self.handler)(cmd, &text);
        let frame = self.answer(seq, cmd, &reply);
        // a SYN keep-alive first, as busy devices do
        self.pending.push_back(vec![0x16]);
        self.pending.push_back(frame);
        Ok(())
    }
}

/// A healthy Datecs C device (serial `DT279013`).
pub fn datecs_c(cmd: u16, _data: &str) -> IslReply {
    let data = match cmd {
        0x5A => "FP-700,1.00BG 12Mar20 1030,A1B2,00000000,DT279013,02279013",
        0x30 => "0000123,0000045",
        0x31 => "P",
        0x35 => "D0",
        0x38 => "0000124,0000046",
        0x3E => "01-03-24 10:15:30",
        0x46 => "P,10000,0,0",
        0x4C => "1,3,240,240",
        0x63 => "204567890,1",
        0x71 => "0000124",
        _ => "",
    };
    IslReply::ok(Envelope::Isl, data)
}

/// A healthy Daisy device (serial `DY448967`).
pub fn daisy(cmd: u16, data: &str) -> IslReply {
    match cmd {
        0x5A => IslReply::ok(
            Envelope::Isl,
            "CompactM,ONL-4.01BG 13Jun19 1045,F1E0,00000000,DY448967,36607003",
        ),
        other => datecs_c(other, data),
    }
}

/// A healthy Datecs X device (serial `DT525860`).
pub fn datecs_x(cmd: u16, _data: &str) -> IslReply {
    let data = match cmd {
        0x5A => "0\tFP-2000\t1.00BG\t25Jan21\t1200\tCB70\t00000000\tDT525860\t02525860\t",
        0x30 => "0\t124\t",
        0x3E => "0\t01-03-24 10:15:30\t",
        0x46 => "0\t+10000\t0\t0\t",
        0x4C => "0\t1\t3\t0\t+240\t0\t",
        0x63 => "0\t204567890\t",
        0x71 => "0\t0000124\t",
        _ => "0\t",
    };
    IslReply::ok(Envelope::IslX, data)
}

// ── ZFP ─────────────────────────────────────────────────────────────────

/// What a ZFP mock answers to one request.
pub enum ZfpReply {
    /// `06 NBL STE1 STE2 CS 0A`
    Ack(u8, u8),
    /// `02 LEN NBL DATA CS 0A`
    Data(Vec<u8>),
}

impl ZfpReply {
    /// A clean ACK.
    pub fn ack() -> Self {
        ZfpReply::Ack(0x30, 0x30)
    }

    /// A text data answer.
    pub fn text(text: &str) -> Self {
        ZfpReply::Data(cp1251::encode(text))
    }
}

type ZfpHandler = Box<dyn FnMut(u16, &str) -> ZfpReply + Send>;

/// A Tremol device: answers pings from `ping_replies` (then ready) and
/// requests through the handler.
pub struct MockZfpDevice {
    descriptor: String,
    handler: ZfpHandler,
    ping_replies: VecDeque<u8>,
    pending: VecDeque<Vec<u8>>,
    log: CommandLog,
    pings: Arc<Mutex<usize>>,
}

impl MockZfpDevice {
    pub fn new(
        descriptor: &str,
        handler: impl FnMut(u16, &str) -> ZfpReply + Send + 'static,
    ) -> (Self, CommandLog) {
        let log = CommandLog::default();
        let device = Self {
            descriptor: descriptor.to_string(),
            handler: Box::new(handler),
            ping_replies: VecDeque::new(),
            pending: VecDeque::new(),
            log: Arc::clone(&log),
            pings: Arc::default(),
        };
        (device, log)
    }

    /// Answer the first pings with these bytes instead of "ready".
    pub fn with_ping_replies(mut self, replies: &[u8]) -> Self {
        self.ping_replies = replies.iter().copied().collect();
        self
    }

    /// Shared ping counter.
    pub fn ping_counter(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.pings)
    }

    fn parse(req: &[u8]) -> Option<(u8, u16, Vec<u8>)> {
        if req.len() < 7 || req[0] != 0x02 || *req.last()? != 0x0A {
            return None;
        }
        if usize::from(req[1].checked_sub(0x20)?) + 4 != req.len() {
            return None;
        }
        let cs_at = req.len() - 3;
        if u16::from(xor_sum(&req[1..cs_at])) != nibble_decode(&req[cs_at..cs_at + 2]).ok()? {
            return None;
        }
        Some((req[2] - 0x20, u16::from(req[3]), req[4..cs_at].to_vec()))
    }

    fn answer(seq: u8, reply: &ZfpReply) -> Vec<u8> {
        let mut frame = match reply {
            ZfpReply::Ack(ste1, ste2) => vec![0x06, 0x20 + seq, *ste1, *ste2],
            ZfpReply::Data(data) => {
                let mut frame = vec![0x02, 0x20 + 2 + data.len() as u8, 0x20 + seq];
                frame.extend_from_slice(data);
                frame
            }
        };
        let cs = xor_sum(&frame[1..]);
        frame.extend_from_slice(&nibble_encode(cs));
        frame.push(0x0A);
        frame
    }
}

impl Channel for MockZfpDevice {
    fn descriptor(&self) -> &str {
        &self.descriptor
    }

    fn read(&mut self) -> Result<Vec<u8>, FiscalError> {
        self.pending.pop_front().ok_or(FiscalError::ReadTimeout)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), FiscalError> {
        if data == [0x09] {
            *self.pings.lock().unwrap() += 1;
            let state = self.ping_replies.pop_front().unwrap_or(0x40);
            self.pending.push_back(vec![state]);
            return Ok(());
        }
        let Some((seq, cmd, payload)) = Self::parse(data) else {
            return Ok(());
        };
        let text = cp1251::decode(&payload);
        self.log.lock().unwrap().push((cmd, text.clone()));
        let reply = (self.handler)(cmd, &text);
        self.pending.push_back(Self::answer(seq, &reply));
        Ok(())
    }
}

/// A healthy Tremol device (serial `ZK133759`).
pub fn tremol(cmd: u16, _data: &str) -> ZfpReply {
    match cmd {
        0x20 => ZfpReply::Data(vec![0x80; 7]),
        0x60 => ZfpReply::text("ZK133759;50163145"),
        0x61 => ZfpReply::text("204567890"),
        0x68 => ZfpReply::text("01-03-2024 10:15:30"),
        0x6E => ZfpReply::text("125.50;0;0"),
        0x71 => ZfpReply::text("0000124"),
        0x72 => ZfpReply::text("0;2.40;0;0"),
        0x90 => ZfpReply::text("FP01-KL V2;Ver. 1.05"),
        _ => ZfpReply::ack(),
    }
}

// ── ICP ─────────────────────────────────────────────────────────────────

/// Answer data plus the six raw status bytes of an ICP device.
pub struct IcpReply {
    pub data: String,
    pub status: [u8; 6],
}

impl IcpReply {
    /// An answer with a clean status block.
    pub fn ok(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            status: [0x80; 6],
        }
    }

    /// An answer with `bit` set in status byte `byte`.
    pub fn with_bit(data: impl Into<String>, byte: usize, bit: u8) -> Self {
        let mut reply = Self::ok(data);
        reply.status[byte] |= 1 << bit;
        reply
    }
}

type IcpHandler = Box<dyn FnMut(u16, &str) -> IcpReply + Send>;

/// An ICP device. Status bytes go out as hex digits, or as 0x30-offset
/// nibbles after [`MockIcpDevice::with_offset_nibbles`].
pub struct MockIcpDevice {
    descriptor: String,
    handler: IcpHandler,
    offset_nibbles: bool,
    pending: VecDeque<Vec<u8>>,
    log: CommandLog,
}

impl MockIcpDevice {
    pub fn new(
        descriptor: &str,
        handler: impl FnMut(u16, &str) -> IcpReply + Send + 'static,
    ) -> (Self, CommandLog) {
        let log = CommandLog::default();
        let device = Self {
            descriptor: descriptor.to_string(),
            handler: Box::new(handler),
            offset_nibbles: false,
            pending: VecDeque::new(),
            log: Arc::clone(&log),
        };
        (device, log)
    }

    /// Spell the status nibbles 10..15 as `:;<=>?`.
    pub fn with_offset_nibbles(mut self) -> Self {
        self.offset_nibbles = true;
        self
    }

    /// `(command, data)` of a well-formed request, else `None`.
    fn parse(req: &[u8]) -> Option<(u16, Vec<u8>)> {
        let n = req.len();
        if n < 11 || req[0] != 0x02 || req[n - 1] != 0x03 || &req[1..5] != b"0000" {
            return None;
        }
        let len_at = n - 5;
        let cs_at = n - 3;
        if usize::from(nibble_decode(&req[len_at..cs_at]).ok()?) != len_at - 5 {
            return None;
        }
        if u16::from(additive_sum_u8(&req[1..cs_at])) != nibble_decode(&req[cs_at..n - 1]).ok()? {
            return None;
        }
        Some((u16::from(req[5]), req[6..len_at].to_vec()))
    }

    fn status_text(&self, status: &[u8; 6]) -> Vec<u8> {
        if self.offset_nibbles {
            status.iter().flat_map(|b| nibble_encode(*b)).collect()
        } else {
            status
                .iter()
                .flat_map(|b| format!("{b:02X}").into_bytes())
                .collect()
        }
    }

    fn answer(&self, cmd: u16, reply: &IcpReply) -> Vec<u8> {
        let data = cp1251::encode(&reply.data);
        let status = self.status_text(&reply.status);
        let mut frame = vec![0x02];
        frame.extend_from_slice(b"0000");
        frame.push(cmd as u8);
        frame.extend_from_slice(&data);
        frame.extend_from_slice(&status);
        frame.extend_from_slice(&nibble_encode((1 + data.len() + status.len()) as u8));
        let cs = additive_sum_u8(&frame[1..]);
        frame.extend_from_slice(&nibble_encode(cs));
        frame.push(0x03);
        frame
    }
}

impl Channel for MockIcpDevice {
    fn descriptor(&self) -> &str {
        &self.descriptor
    }

    fn read(&mut self) -> Result<Vec<u8>, FiscalError> {
        self.pending.pop_front().ok_or(FiscalError::ReadTimeout)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), FiscalError> {
        let Some((cmd, payload)) = Self::parse(data) else {
            return Ok(());
        };
        let text = cp1251::decode(&payload);
        self.log.lock().unwrap().push((cmd, text.clone()));
        let reply = (self.handler)(cmd, &text);
        self.pending.push_back(vec![0x16]);
        self.pending.push_back(self.answer(cmd, &reply));
        Ok(())
    }
}

/// A healthy ISL ICP device (serial `IS123456`).
pub fn icp(cmd: u16, _data: &str) -> IcpReply {
    let data = match cmd as u8 {
        b'I' => "ISL5011;1.02;IS123456;54123456",
        b'D' => "01-03-2024 10:15:30",
        b'F' => "204567890",
        b'K' => "12550;0",
        b'N' => "0000124",
        b'R' => "240",
        _ => "",
    };
    IcpReply::ok(data)
}

// ── Requests ────────────────────────────────────────────────────────────

/// Fast-failing driver config; the mocks answer synchronously.
pub fn quick_config() -> bgfp_driver::DriverConfig {
    let mut config = bgfp_driver::DriverConfig::default();
    config.printer.retries.max_write_retries = 2;
    config.printer.retries.max_read_retries = 8;
    config.printer.retries.max_ping_retries = 3;
    config
}
