//! connection - per-socket framing state: inbound assembly and a bounded outbound queue
//!
//! A `Connection` does no I/O of its own.  The owner hands it bytes that were read and a
//! writer to drain into when the socket is writable, which keeps the queueing rules testable
//! without sockets.

use crate::frame::{FrameReader, Frames};
use crate::{Error, Frame, Result};
use std::collections::VecDeque;
use std::io::{ErrorKind, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// Everything queued has been handed to the socket.
    Drained,
    /// The socket would block.  The unsent remainder stays queued.
    Blocked,
}

#[derive(Debug)]
pub struct Connection {
    reader: FrameReader,
    tx_queue: VecDeque<Vec<u8>>,
    // Bytes of the frame at the head of tx_queue already accepted by the socket.
    tx_offset: usize,
    max_queue_depth: usize,
}

impl Connection {
    pub fn new(max_payload: usize, max_queue_depth: usize) -> Self {
        Connection {
            reader: FrameReader::new(max_payload),
            tx_queue: VecDeque::new(),
            tx_offset: 0,
            max_queue_depth,
        }
    }

    /// Frames completed by newly read bytes.
    pub fn on_readable<'a>(&'a mut self, data: &'a [u8]) -> Frames<'a> {
        self.reader.frames(data)
    }

    /// Queue a frame for transmission.  The frame is encoded here so a later write failure
    /// can never split it.
    pub fn enqueue(&mut self, frame: &Frame) -> Result<()> {
        if self.tx_queue.len() >= self.max_queue_depth {
            return Err(Error::ResourceExhaustion(format!(
                "outbound queue full ({} frames)",
                self.max_queue_depth
            )));
        }
        self.tx_queue.push_back(frame.encode()?);
        Ok(())
    }

    /// Write as much of the queue as `writer` will take without blocking.
    pub fn on_writable<W: Write>(&mut self, writer: &mut W) -> Result<WriteStatus> {
        while let Some(head) = self.tx_queue.front() {
            match writer.write(&head[self.tx_offset..]) {
                Ok(0) => return Err(Error::Transport(ErrorKind::WriteZero.into())),
                Ok(n) => {
                    self.tx_offset += n;
                    if self.tx_offset == head.len() {
                        self.tx_queue.pop_front();
                        self.tx_offset = 0;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(WriteStatus::Blocked),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(WriteStatus::Drained)
    }

    pub fn queue_len(&self) -> usize {
        self.tx_queue.len()
    }

    /// Release every queued frame, returning how many there were.
    pub fn clear(&mut self) -> usize {
        let released = self.tx_queue.len();
        self.tx_queue.clear();
        self.tx_offset = 0;
        released
    }
}
