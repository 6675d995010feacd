//! message - just enough of the SCCP message layouts (Q.713) to find and patch the local
//! reference fields of connection-oriented messages and the user data of a UDT

use crate::SccpError;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// Release cause used when the NAT releases a connection on a peer's behalf.
pub const RELEASE_CAUSE_SCCP_FAILURE: u8 = 0x10;

/// Refusal cause used when the NAT refuses a connection that the MSC never confirmed.
pub const REFUSAL_CAUSE_SCCP_FAILURE: u8 = 0x11;

const REF_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum MessageType {
    /// Connection request
    Cr = 0x01,
    /// Connection confirm
    Cc = 0x02,
    /// Connection refused
    Cref = 0x03,
    /// Released
    Rlsd = 0x04,
    /// Release complete
    Rlc = 0x05,
    /// Data form 1
    Dt1 = 0x06,
    /// Unitdata
    Udt = 0x09,
    /// Inactivity test
    It = 0x10,
}

impl MessageType {
    /// Offset of the destination local reference, for messages that carry one.
    pub fn dst_ref_offset(self) -> Option<usize> {
        match self {
            MessageType::Cc
            | MessageType::Cref
            | MessageType::Rlsd
            | MessageType::Rlc
            | MessageType::Dt1
            | MessageType::It => Some(1),
            MessageType::Cr | MessageType::Udt => None,
        }
    }

    /// Offset of the source local reference, for messages that carry one.
    pub fn src_ref_offset(self) -> Option<usize> {
        match self {
            MessageType::Cr => Some(1),
            MessageType::Cc | MessageType::Rlsd | MessageType::Rlc | MessageType::It => Some(4),
            MessageType::Cref | MessageType::Dt1 | MessageType::Udt => None,
        }
    }
}

/// A 24-bit SCCP local reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalRef(u32);

impl LocalRef {
    pub const MAX: u32 = 0x00ff_ffff;

    pub fn new(value: u32) -> Option<Self> {
        (value <= Self::MAX).then_some(LocalRef(value))
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn from_bytes(b: [u8; REF_LEN]) -> Self {
        LocalRef(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    pub fn to_bytes(self) -> [u8; REF_LEN] {
        let b = self.0.to_be_bytes();
        [b[1], b[2], b[3]]
    }
}

impl fmt::Display for LocalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:06x}", self.0)
    }
}

/// The message type and reference fields of an SCCP message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub raw_type: u8,
    /// None for message types this crate does not know.
    pub message_type: Option<MessageType>,
    pub dst_ref: Option<LocalRef>,
    pub src_ref: Option<LocalRef>,
}

pub fn parse(data: &[u8]) -> Result<Header, SccpError> {
    let Some(&raw_type) = data.first() else {
        return Err(SccpError::TooShort(0));
    };
    let message_type = MessageType::try_from(raw_type).ok();
    let (dst_ref, src_ref) = match message_type {
        Some(t) => (
            read_ref(data, t.dst_ref_offset())?,
            read_ref(data, t.src_ref_offset())?,
        ),
        None => (None, None),
    };
    Ok(Header {
        raw_type,
        message_type,
        dst_ref,
        src_ref,
    })
}

fn read_ref(data: &[u8], offset: Option<usize>) -> Result<Option<LocalRef>, SccpError> {
    let Some(offset) = offset else {
        return Ok(None);
    };
    let Some(field) = data.get(offset..offset + REF_LEN) else {
        return Err(SccpError::TooShort(data.len()));
    };
    Ok(Some(LocalRef::from_bytes([field[0], field[1], field[2]])))
}

fn patch(data: &mut [u8], offset: Option<usize>, r: LocalRef) -> Result<(), SccpError> {
    let len = data.len();
    let offset = offset.ok_or(SccpError::NoSuchField(data[0]))?;
    let field = data
        .get_mut(offset..offset + REF_LEN)
        .ok_or(SccpError::TooShort(len))?;
    field.copy_from_slice(&r.to_bytes());
    Ok(())
}

/// Overwrite the source local reference in place.  No other byte changes.
pub fn set_src_ref(data: &mut [u8], r: LocalRef) -> Result<(), SccpError> {
    let t = known_type(data)?;
    patch(data, t.src_ref_offset(), r)
}

/// Overwrite the destination local reference in place.  No other byte changes.
pub fn set_dst_ref(data: &mut [u8], r: LocalRef) -> Result<(), SccpError> {
    let t = known_type(data)?;
    patch(data, t.dst_ref_offset(), r)
}

fn known_type(data: &[u8]) -> Result<MessageType, SccpError> {
    let raw = *data.first().ok_or(SccpError::TooShort(0))?;
    MessageType::try_from(raw).map_err(|_| SccpError::NoSuchField(raw))
}

/// User data of a UDT, located through the third variable-part pointer.
pub fn udt_data(data: &[u8]) -> Result<&[u8], SccpError> {
    if data.first() != Some(&u8::from(MessageType::Udt)) {
        return Err(SccpError::NotUdt);
    }
    const PTR_DATA: usize = 4;
    let ptr = *data.get(PTR_DATA).ok_or(SccpError::TooShort(data.len()))? as usize;
    let start = PTR_DATA + ptr;
    let len = *data.get(start).ok_or(SccpError::TooShort(data.len()))? as usize;
    data.get(start + 1..start + 1 + len)
        .ok_or(SccpError::TooShort(data.len()))
}
