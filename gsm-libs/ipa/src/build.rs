//! build - construction of the IPA control messages (protocol 0xfe)

use crate::identity::IdentityTags;
use crate::protocol::{IdTag, MsgType, Protocol};
use crate::Frame;

fn ipaccess(msg_type: MsgType, body: &[u8]) -> Frame {
    let mut payload = vec![u8::from(msg_type)];
    payload.extend_from_slice(body);
    Frame::new(Protocol::Ipaccess, payload)
}

pub fn ping() -> Frame {
    ipaccess(MsgType::Ping, &[])
}

pub fn pong() -> Frame {
    ipaccess(MsgType::Pong, &[])
}

pub fn id_ack() -> Frame {
    ipaccess(MsgType::IdAck, &[])
}

/// Identity request asking for each of `tags`.
pub fn id_get(tags: &[IdTag]) -> Frame {
    let body: Vec<u8> = tags.iter().flat_map(|t| [0x01, u8::from(*t)]).collect();
    ipaccess(MsgType::IdGet, &body)
}

/// The identity request sent to a BTS as soon as it connects.
pub fn id_get_bts() -> Frame {
    id_get(&[
        IdTag::Unit,
        IdTag::MacAddr,
        IdTag::Location1,
        IdTag::Location2,
        IdTag::EquipVers,
        IdTag::SwVersion,
        IdTag::UnitName,
        IdTag::SerNr,
    ])
}

pub fn id_resp(tags: &IdentityTags) -> Frame {
    ipaccess(MsgType::IdResp, &tags.encode())
}
