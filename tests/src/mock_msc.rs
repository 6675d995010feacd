//! mock_msc - the core network end the NAT connects to

use crate::IpaConnection;
use anyhow::{Result, ensure};
use async_std::future;
use async_std::net::TcpListener;
use ipa::{Frame, Protocol};
use sccp::{Header, MessageType};
use slog::{Logger, info, o};
use std::net::SocketAddr;
use std::time::Duration;

pub struct MockMsc {
    listener: TcpListener,
    logger: Logger,
}

impl MockMsc {
    pub async fn new(logger: &Logger) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        Ok(MockMsc {
            listener,
            logger: logger.new(o!("msc" => 1)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Wait for the NAT to connect.
    pub async fn accept(&self) -> Result<IpaConnection> {
        let (stream, peer) =
            future::timeout(Duration::from_secs(5), self.listener.accept()).await??;
        info!(self.logger, "NAT connected from {}", peer);
        Ok(IpaConnection::from_stream(stream, &self.logger))
    }
}

pub async fn send_sccp(conn: &mut IpaConnection, message: Vec<u8>) -> Result<()> {
    conn.send(&Frame::new(Protocol::Sccp, message)).await
}

/// Receive an SCCP message of type `t`, returning its header and bytes.
pub async fn recv_sccp(conn: &mut IpaConnection, t: MessageType) -> Result<(Header, Vec<u8>)> {
    let payload = conn.recv_payload(Protocol::Sccp).await?;
    let header = sccp::parse(&payload)?;
    ensure!(
        header.message_type == Some(t),
        "Expected SCCP {:?}, got {:#04x}",
        t,
        header.raw_type
    );
    Ok((header, payload))
}
