//! protocol - IPA protocol tags, IPA message types and identity tags

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Length of the frame header: 16-bit big endian payload length, then the protocol tag.
pub const HEADER_LEN: usize = 3;

/// Largest payload the original nanoBTS stack could be asked to buffer (4096 byte message
/// buffer less its reserved headroom).
pub const DEFAULT_MAX_PAYLOAD: usize = 4096 - 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Protocol {
    Rsl = 0x00,
    Mgcp = 0xfc,
    Sccp = 0xfd,
    Ipaccess = 0xfe,
    Oml = 0xff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum MsgType {
    Ping = 0x00,
    Pong = 0x01,
    IdGet = 0x04,
    IdResp = 0x05,
    IdAck = 0x06,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum IdTag {
    SerNr = 0x00,
    UnitName = 0x01,
    Location1 = 0x02,
    Location2 = 0x03,
    EquipVers = 0x04,
    SwVersion = 0x05,
    IpAddr = 0x06,
    MacAddr = 0x07,
    Unit = 0x08,
}

impl IdTag {
    pub fn name(&self) -> &'static str {
        match self {
            IdTag::SerNr => "Serial_Number",
            IdTag::UnitName => "Unit_Name",
            IdTag::Location1 => "Location_1",
            IdTag::Location2 => "Location_2",
            IdTag::EquipVers => "Equipment_Version",
            IdTag::SwVersion => "Software_Version",
            IdTag::IpAddr => "IP_Address",
            IdTag::MacAddr => "MAC_Address",
            IdTag::Unit => "Unit_ID",
        }
    }
}

/// Name of a raw protocol tag for log output.
pub fn protocol_name(tag: u8) -> &'static str {
    match Protocol::try_from(tag) {
        Ok(Protocol::Rsl) => "RSL",
        Ok(Protocol::Mgcp) => "MGCP",
        Ok(Protocol::Sccp) => "SCCP",
        Ok(Protocol::Ipaccess) => "IPA",
        Ok(Protocol::Oml) => "OML",
        Err(_) => "other",
    }
}
