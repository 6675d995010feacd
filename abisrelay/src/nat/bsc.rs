//! bsc - one connected controller as seen by the NAT

use super::Event;
use super::paging::PagingTarget;
use crate::data::bscs::{BscCreds, BscTable};
use ipa::net::{ConnId, TcpLink};
use ipa::{IdTag, IdentityTags, ParseError};
use slog::Logger;
use std::net::SocketAddr;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BscStats {
    pub sccp_connections: u64,
    pub forwarded: u64,
    pub dropped: u64,
}

/// Inventory view of a controller.
#[derive(Debug, Clone)]
pub struct BscStatus {
    pub id: ConnId,
    pub peer: SocketAddr,
    pub token: Option<String>,
    pub lac: Option<u16>,
    pub live_references: usize,
    pub stats: BscStats,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthError {
    #[error("malformed identity response - {0}")]
    Malformed(#[from] ParseError),
    #[error("no unit name in identity response")]
    NoToken,
    #[error("unknown token '{0}'")]
    UnknownToken(String),
}

/// Match the unit name of an identity response (message type byte excluded) against the
/// configured tokens.
pub fn check_identity<'a>(
    entries: &[u8],
    bscs: &'a BscTable,
) -> Result<(String, &'a BscCreds), AuthError> {
    let tags = IdentityTags::parse(entries)?;
    let token = tags.text(IdTag::UnitName).ok_or(AuthError::NoToken)??;
    bscs.get(token)
        .map(|creds| (token.to_string(), creds))
        .ok_or_else(|| AuthError::UnknownToken(token.to_string()))
}

pub struct BscConnection {
    pub link: TcpLink<Event>,
    pub logger: Logger,
    pub accepted_at: Instant,
    token: Option<String>,
    lac: Option<u16>,
    pub stats: BscStats,
}

impl BscConnection {
    pub fn new(link: TcpLink<Event>, logger: Logger) -> Self {
        BscConnection {
            link,
            logger,
            accepted_at: Instant::now(),
            token: None,
            lac: None,
            stats: BscStats::default(),
        }
    }

    pub fn authenticate(&mut self, token: String, creds: &BscCreds) {
        self.token = Some(token);
        self.lac = Some(creds.lac);
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn status(&self, live_references: usize) -> BscStatus {
        BscStatus {
            id: self.link.id(),
            peer: self.link.peer(),
            token: self.token.clone(),
            lac: self.lac,
            live_references,
            stats: self.stats.clone(),
        }
    }
}

impl PagingTarget for BscConnection {
    fn lac(&self) -> Option<u16> {
        self.lac
    }

    fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}
