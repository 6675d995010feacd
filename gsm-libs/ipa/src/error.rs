//! error - failure taxonomy shared by the proxy and the NAT
//!
//! Every variant is scoped to a single connection.  The relays close the offending connection
//! for everything except `NotFound`, which is logged and dropped.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed header, oversize frame, out-of-order handshake, duplicate reference.
    #[error("Protocol violation - {0}")]
    ProtocolViolation(String),

    /// Outbound queue full, reference space exhausted, socket could not be allocated.
    #[error("Resource exhaustion - {0}")]
    ResourceExhaustion(String),

    #[error("Not found - {0}")]
    NotFound(String),

    #[error("Transport error - {0}")]
    Transport(#[from] std::io::Error),
}

impl Error {
    pub fn is_fatal_to_connection(&self) -> bool {
        !matches!(self, Error::NotFound(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure to parse an identity string or identity entry list.  Callers must not substitute
/// defaults.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing {0} field")]
    MissingField(&'static str),

    #[error("bad {field} field '{value}'")]
    BadField { field: &'static str, value: String },

    #[error("trailing garbage '{0}'")]
    TrailingGarbage(String),

    #[error("truncated identity entry at offset {0}")]
    Truncated(usize),

    #[error("no unit id tag present")]
    NoUnitId,

    #[error("not valid text")]
    NotText,
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::ProtocolViolation(format!("identity - {e}"))
    }
}
