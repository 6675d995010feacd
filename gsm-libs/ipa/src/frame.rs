//! frame - IPA frame codec
//!
//! ```text
//! +-----------+-----------+----------+---------------------+
//! |  len_hi   |  len_lo   | protocol |  payload (len bytes) |
//! +-----------+-----------+----------+---------------------+
//! ```
//!
//! `len` counts payload bytes only.

use crate::protocol::{HEADER_LEN, protocol_name};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub protocol: u8,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(protocol: impl Into<u8>, payload: Vec<u8>) -> Self {
        Frame {
            protocol: protocol.into(),
            payload,
        }
    }

    /// Prepend the header.  Fails if the payload does not fit the 16-bit length field.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let len = u16::try_from(self.payload.len()).map_err(|_| {
            Error::ProtocolViolation(format!(
                "payload of {} bytes does not fit a frame",
                self.payload.len()
            ))
        })?;
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.payload.len());
        bytes.extend_from_slice(&len.to_be_bytes());
        bytes.push(self.protocol);
        bytes.extend_from_slice(&self.payload);
        Ok(bytes)
    }

    /// Decode a datagram, which must carry exactly one complete frame.
    pub fn decode_datagram(datagram: &[u8], max_payload: usize) -> Result<Frame> {
        if datagram.len() < HEADER_LEN {
            return Err(Error::ProtocolViolation(format!(
                "datagram of {} bytes is shorter than a header",
                datagram.len()
            )));
        }
        let len = u16::from_be_bytes([datagram[0], datagram[1]]) as usize;
        if len > max_payload {
            return Err(oversize(len, max_payload));
        }
        if datagram.len() != HEADER_LEN + len {
            return Err(Error::ProtocolViolation(format!(
                "header announces {len} bytes but datagram carries {}",
                datagram.len() - HEADER_LEN
            )));
        }
        Ok(Frame {
            protocol: datagram[2],
            payload: datagram[HEADER_LEN..].to_vec(),
        })
    }

    pub fn protocol_name(&self) -> &'static str {
        protocol_name(self.protocol)
    }
}

fn oversize(len: usize, max_payload: usize) -> Error {
    Error::ProtocolViolation(format!(
        "frame of {len} bytes exceeds maximum of {max_payload}"
    ))
}

/// Assembles frames out of an arbitrarily fragmented byte stream.
///
/// The reader never holds more than one header plus `max_payload` bytes: the header is
/// validated before any payload byte is accepted.
#[derive(Debug)]
pub struct FrameReader {
    max_payload: usize,
    header: [u8; HEADER_LEN],
    header_len: usize,
    payload: Vec<u8>,
    failed: bool,
}

impl FrameReader {
    pub fn new(max_payload: usize) -> Self {
        FrameReader {
            max_payload,
            header: [0; HEADER_LEN],
            header_len: 0,
            payload: Vec::new(),
            failed: false,
        }
    }

    /// Lazily yield the frames completed by `input`.  Partial state is kept in the reader, so
    /// the next call picks up where this one stopped.  After an error the reader yields
    /// nothing further - the stream position is lost and the connection must be closed.
    pub fn frames<'r>(&'r mut self, input: &'r [u8]) -> Frames<'r> {
        Frames {
            reader: self,
            input,
        }
    }

    /// Number of bytes currently held for an incomplete frame.
    pub fn buffered(&self) -> usize {
        self.header_len + self.payload.len()
    }

    fn payload_len(&self) -> usize {
        u16::from_be_bytes([self.header[0], self.header[1]]) as usize
    }

    fn next_frame(&mut self, input: &mut &[u8]) -> Option<Result<Frame>> {
        if self.failed {
            return None;
        }

        if self.header_len < HEADER_LEN {
            let take = (HEADER_LEN - self.header_len).min(input.len());
            self.header[self.header_len..self.header_len + take].copy_from_slice(&input[..take]);
            self.header_len += take;
            *input = &input[take..];
            if self.header_len < HEADER_LEN {
                return None;
            }
            let len = self.payload_len();
            if len > self.max_payload {
                self.failed = true;
                return Some(Err(oversize(len, self.max_payload)));
            }
            self.payload.reserve_exact(len);
        }

        let wanted = self.payload_len() - self.payload.len();
        let take = wanted.min(input.len());
        self.payload.extend_from_slice(&input[..take]);
        *input = &input[take..];
        if take < wanted {
            return None;
        }

        self.header_len = 0;
        Some(Ok(Frame {
            protocol: self.header[2],
            payload: std::mem::take(&mut self.payload),
        }))
    }
}

pub struct Frames<'r> {
    reader: &'r mut FrameReader,
    input: &'r [u8],
}

impl Iterator for Frames<'_> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_frame(&mut self.input)
    }
}
