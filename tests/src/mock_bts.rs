//! mock_bts - a BTS that opens its OML and RSL connections to the proxy

use crate::IpaConnection;
use anyhow::Result;
use ipa::{Frame, IdTag, IdentityTags, MsgType, Protocol, UnitId, build};
use slog::{Logger, info, o};
use std::net::SocketAddr;

pub struct MockBts {
    pub unit: UnitId,
    pub oml: IpaConnection,
    pub rsl: Option<IpaConnection>,
    logger: Logger,
}

impl MockBts {
    /// Connect the OML leg and answer the identity request.
    pub async fn connect_oml(addr: SocketAddr, unit: UnitId, logger: &Logger) -> Result<Self> {
        let logger = logger.new(o!("bts" => unit.to_string()));
        let mut oml = IpaConnection::connect(addr, &logger.new(o!("leg" => "OML"))).await?;
        identify(&mut oml, unit).await?;
        info!(logger, "OML connection identified");
        Ok(MockBts {
            unit,
            oml,
            rsl: None,
            logger,
        })
    }

    pub async fn connect_rsl(&mut self, addr: SocketAddr) -> Result<()> {
        let mut rsl = IpaConnection::connect(addr, &self.logger.new(o!("leg" => "RSL"))).await?;
        identify(&mut rsl, self.unit).await?;
        info!(self.logger, "RSL connection identified");
        self.rsl = Some(rsl);
        Ok(())
    }

    pub fn rsl(&mut self) -> Result<&mut IpaConnection> {
        self.rsl
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("RSL connection not open"))
    }

    pub async fn send_oml(&mut self, payload: &[u8]) -> Result<()> {
        self.oml.send(&Frame::new(Protocol::Oml, payload.to_vec())).await
    }

    pub async fn send_rsl(&mut self, payload: &[u8]) -> Result<()> {
        self.rsl()?
            .send(&Frame::new(Protocol::Rsl, payload.to_vec()))
            .await
    }
}

/// Wait for the identity request on a freshly opened leg and answer it with `unit`.
pub async fn identify(conn: &mut IpaConnection, unit: UnitId) -> Result<()> {
    conn.recv_ipa(MsgType::IdGet).await?;
    send_identity(conn, unit).await?;
    conn.recv_ipa(MsgType::IdAck).await?;
    Ok(())
}

/// Declare `unit` without waiting for the outcome.
pub async fn send_identity(conn: &mut IpaConnection, unit: UnitId) -> Result<()> {
    let mut tags = IdentityTags::default();
    tags.push(IdTag::Unit, format!("{unit}\0").as_bytes())?;
    tags.push(IdTag::MacAddr, &[0x00, 0x02, 0x95, 0x00, 0x41, 0xb3])?;
    tags.push(IdTag::UnitName, b"nbts-00-02-95-00-41-B3\0")?;
    conn.send(&build::id_resp(&tags)).await
}
