//! build - construct SCCP and BSSMAP messages

use crate::bssmap::{CELL_IDENT_LAC, DISC_BSSMAP, IE_CELL_IDENTIFIER_LIST, IE_IMSI, MSG_PAGING};
use crate::{LocalRef, MessageType};

// Called/calling party address used toward the MSC: route on SSN, SSN 254 (BSSAP).
const SSN_BSSAP_ADDRESS: [u8; 2] = [0x42, 0xfe];

fn header(t: MessageType) -> Vec<u8> {
    vec![t.into()]
}

/// Connection request with `data` as the optional user data parameter.
pub fn cr(src: LocalRef, data: &[u8]) -> Vec<u8> {
    let mut m = header(MessageType::Cr);
    m.extend_from_slice(&src.to_bytes());
    // Protocol class 2, pointers to the called party address and the optional part.
    m.extend_from_slice(&[0x02, 0x02, 0x04, 0x02]);
    m.extend_from_slice(&SSN_BSSAP_ADDRESS);
    m.push(0x0f);
    m.push(data.len() as u8);
    m.extend_from_slice(data);
    m.push(0x00);
    m
}

pub fn cc(dst: LocalRef, src: LocalRef) -> Vec<u8> {
    let mut m = header(MessageType::Cc);
    m.extend_from_slice(&dst.to_bytes());
    m.extend_from_slice(&src.to_bytes());
    m.extend_from_slice(&[0x02, 0x00]);
    m
}

pub fn cref(dst: LocalRef, cause: u8) -> Vec<u8> {
    let mut m = header(MessageType::Cref);
    m.extend_from_slice(&dst.to_bytes());
    m.extend_from_slice(&[cause, 0x00]);
    m
}

pub fn rlsd(dst: LocalRef, src: LocalRef, cause: u8) -> Vec<u8> {
    let mut m = header(MessageType::Rlsd);
    m.extend_from_slice(&dst.to_bytes());
    m.extend_from_slice(&src.to_bytes());
    m.extend_from_slice(&[cause, 0x00]);
    m
}

pub fn rlc(dst: LocalRef, src: LocalRef) -> Vec<u8> {
    let mut m = header(MessageType::Rlc);
    m.extend_from_slice(&dst.to_bytes());
    m.extend_from_slice(&src.to_bytes());
    m
}

pub fn dt1(dst: LocalRef, data: &[u8]) -> Vec<u8> {
    let mut m = header(MessageType::Dt1);
    m.extend_from_slice(&dst.to_bytes());
    // Segmenting/reassembling, then the pointer to the data.
    m.extend_from_slice(&[0x00, 0x01, data.len() as u8]);
    m.extend_from_slice(data);
    m
}

pub fn it(dst: LocalRef, src: LocalRef) -> Vec<u8> {
    let mut m = header(MessageType::It);
    m.extend_from_slice(&dst.to_bytes());
    m.extend_from_slice(&src.to_bytes());
    // Protocol class, sequencing, credit.
    m.extend_from_slice(&[0x02, 0x00, 0x00, 0x00]);
    m
}

/// Unitdata between two BSSAP SSN addresses.
pub fn udt(data: &[u8]) -> Vec<u8> {
    let mut m = header(MessageType::Udt);
    // Class 0, pointers to called party, calling party and data.
    m.extend_from_slice(&[0x00, 0x03, 0x05, 0x07]);
    m.push(0x02);
    m.extend_from_slice(&SSN_BSSAP_ADDRESS);
    m.push(0x02);
    m.extend_from_slice(&SSN_BSSAP_ADDRESS);
    m.push(data.len() as u8);
    m.extend_from_slice(data);
    m
}

/// BSSMAP PAGING for `imsi` (already BCD encoded) over a list of LACs.
pub fn paging(imsi: &[u8], lacs: &[u16]) -> Vec<u8> {
    let mut ies = vec![IE_IMSI, imsi.len() as u8];
    ies.extend_from_slice(imsi);
    ies.push(IE_CELL_IDENTIFIER_LIST);
    ies.push(1 + 2 * lacs.len() as u8);
    ies.push(CELL_IDENT_LAC);
    for lac in lacs {
        ies.extend_from_slice(&lac.to_be_bytes());
    }
    let mut m = vec![DISC_BSSMAP, 1 + ies.len() as u8, MSG_PAGING];
    m.extend(ies);
    m
}
