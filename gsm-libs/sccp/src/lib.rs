//! sccp - SCCP reference fields and BSSMAP paging, as much as a NAT needs to see
pub mod bssmap;
pub mod build;
mod message;

pub use bssmap::CellIdentifierList;
pub use message::*;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SccpError {
    #[error("SCCP message too short ({0} bytes)")]
    TooShort(usize),
    #[error("SCCP message type {0:#04x} has no such reference field")]
    NoSuchField(u8),
    #[error("Not a UDT")]
    NotUdt,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BssmapError {
    #[error("BSSAP message too short ({0} bytes)")]
    TooShort(usize),
    #[error("Discriminator {0:#04x} is not BSSMAP")]
    NotBssmap(u8),
    #[error("BSSMAP message type {0:#04x} is not PAGING")]
    NotPaging(u8),
    #[error("IE {0:#04x} is truncated")]
    TruncatedIe(u8),
    #[error("No cell identifier list")]
    NoCellIdentifierList,
}
