//! mock - an IPA framed TCP connection driven by a test script

use anyhow::{Result, anyhow, bail, ensure};
use async_std::future;
use async_std::io::{ReadExt, WriteExt};
use async_std::net::{TcpStream, ToSocketAddrs};
use ipa::protocol::DEFAULT_MAX_PAYLOAD;
use ipa::{Frame, FrameReader, MsgType, Protocol};
use slog::{Logger, debug};
use std::collections::VecDeque;
use std::time::Duration;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub struct IpaConnection {
    stream: TcpStream,
    reader: FrameReader,
    ready: VecDeque<Frame>,
    logger: Logger,
}

impl IpaConnection {
    pub async fn connect<A: ToSocketAddrs>(addr: A, logger: &Logger) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::from_stream(stream, logger))
    }

    pub fn from_stream(stream: TcpStream, logger: &Logger) -> Self {
        IpaConnection {
            stream,
            reader: FrameReader::new(DEFAULT_MAX_PAYLOAD),
            ready: VecDeque::new(),
            logger: logger.clone(),
        }
    }

    pub async fn send(&mut self, frame: &Frame) -> Result<()> {
        debug!(self.logger, "<< {} frame", frame.protocol_name());
        self.send_raw(&frame.encode()?).await
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).await?;
        Ok(())
    }

    pub async fn recv(&mut self) -> Result<Frame> {
        self.recv_within(RECV_TIMEOUT).await
    }

    async fn recv_within(&mut self, timeout: Duration) -> Result<Frame> {
        let mut buf = [0u8; 4096];
        loop {
            if let Some(frame) = self.ready.pop_front() {
                debug!(self.logger, ">> {} frame", frame.protocol_name());
                return Ok(frame);
            }
            let n = future::timeout(timeout, self.stream.read(&mut buf)).await??;
            if n == 0 {
                bail!("Connection closed");
            }
            for frame in self.reader.frames(&buf[..n]) {
                self.ready.push_back(frame?);
            }
        }
    }

    /// Receive an IPA control message of the given type, returning what follows the type byte.
    pub async fn recv_ipa(&mut self, msg_type: MsgType) -> Result<Vec<u8>> {
        let frame = self.recv().await?;
        ensure!(
            frame.protocol == u8::from(Protocol::Ipaccess),
            "Expected IPA frame, got {}",
            frame.protocol_name()
        );
        let (&t, body) = frame
            .payload
            .split_first()
            .ok_or_else(|| anyhow!("Empty IPA frame"))?;
        ensure!(
            t == u8::from(msg_type),
            "Expected {:?}, got message type {:#04x}",
            msg_type,
            t
        );
        Ok(body.to_vec())
    }

    /// Receive the payload of a frame with the given protocol tag.
    pub async fn recv_payload(&mut self, protocol: Protocol) -> Result<Vec<u8>> {
        let frame = self.recv().await?;
        ensure!(
            frame.protocol == u8::from(protocol),
            "Expected {:?} frame, got {}",
            protocol,
            frame.protocol_name()
        );
        Ok(frame.payload)
    }

    /// Check that nothing arrives for a short while.
    pub async fn expect_nothing(&mut self) -> Result<()> {
        match self.recv_within(Duration::from_millis(300)).await {
            Ok(frame) => bail!("Unexpected {} frame {:?}", frame.protocol_name(), frame),
            Err(e) if e.is::<future::TimeoutError>() => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn close(&self) -> Result<()> {
        self.stream.shutdown(std::net::Shutdown::Both)?;
        Ok(())
    }

    /// Wait for the far end to close the connection.
    pub async fn expect_closed(&mut self) -> Result<()> {
        loop {
            match self.recv().await {
                // Frames queued before the close may still arrive.
                Ok(_) => continue,
                Err(e) if e.is::<future::TimeoutError>() => bail!("Connection was not closed"),
                Err(_) => return Ok(()),
            }
        }
    }
}
