//! bssmap - locate the cell identifier list of a BSSMAP PAGING (TS 48.008, 3.2.1.19)

use crate::BssmapError;

pub const DISC_BSSMAP: u8 = 0x00;
pub const MSG_PAGING: u8 = 0x52;

pub const IE_IMSI: u8 = 0x08;
pub const IE_TMSI: u8 = 0x09;
pub const IE_CELL_IDENTIFIER_LIST: u8 = 0x1a;
pub const IE_CHANNEL_NEEDED: u8 = 0x20;
pub const IE_EMLPP_PRIORITY: u8 = 0x3b;

pub const CELL_IDENT_LAC: u8 = 0x05;
pub const CELL_IDENT_BSS: u8 = 0x06;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellIdentifierList {
    /// All cells of the BSS.  Does not identify any one controller.
    WholeBss,
    Lacs(Vec<u16>),
    /// A discriminator the NAT does not route on (CGI, LAI, ...).
    Unsupported(u8),
}

/// Single octet value IEs.  Every other IE in a paging message is TLV.
fn is_tv(tag: u8) -> bool {
    matches!(tag, IE_CHANNEL_NEEDED | IE_EMLPP_PRIORITY)
}

/// Iterate the (tag, value) pairs of a BSSMAP IE list.
fn ies(mut data: &[u8]) -> impl Iterator<Item = Result<(u8, &[u8]), BssmapError>> {
    std::iter::from_fn(move || {
        let (&tag, rest) = data.split_first()?;
        let item = if is_tv(tag) {
            rest.split_first_chunk::<1>()
                .map(|(v, rest)| (v.as_slice(), rest))
        } else {
            rest.split_first().and_then(|(&len, rest)| {
                let len = len as usize;
                (rest.len() >= len).then(|| rest.split_at(len))
            })
        };
        match item {
            Some((value, rest)) => {
                data = rest;
                Some(Ok((tag, value)))
            }
            None => {
                data = &[];
                Some(Err(BssmapError::TruncatedIe(tag)))
            }
        }
    })
}

/// Extract the cell identifier list from BSSAP user data holding a BSSMAP PAGING.
pub fn paging_cell_identifier_list(bssap: &[u8]) -> Result<CellIdentifierList, BssmapError> {
    let [disc, len, msg_type, ..] = bssap else {
        return Err(BssmapError::TooShort(bssap.len()));
    };
    if *disc != DISC_BSSMAP {
        return Err(BssmapError::NotBssmap(*disc));
    }
    if *msg_type != MSG_PAGING {
        return Err(BssmapError::NotPaging(*msg_type));
    }
    // The length octet covers the message type, so it is at least 1.  A length running past
    // the buffer is cut to what was received.
    let end = (2 + *len as usize).min(bssap.len());
    let Some(body) = bssap.get(3..end) else {
        return Err(BssmapError::TooShort(bssap.len()));
    };
    for ie in ies(body) {
        let (tag, value) = ie?;
        if tag == IE_CELL_IDENTIFIER_LIST {
            return parse_cell_identifier_list(value);
        }
    }
    Err(BssmapError::NoCellIdentifierList)
}

pub fn parse_cell_identifier_list(value: &[u8]) -> Result<CellIdentifierList, BssmapError> {
    let Some((&disc, cells)) = value.split_first() else {
        return Err(BssmapError::TruncatedIe(IE_CELL_IDENTIFIER_LIST));
    };
    Ok(match disc {
        CELL_IDENT_BSS => CellIdentifierList::WholeBss,
        CELL_IDENT_LAC => CellIdentifierList::Lacs(
            cells
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect(),
        ),
        other => CellIdentifierList::Unsupported(other),
    })
}

pub fn is_paging(bssap: &[u8]) -> bool {
    matches!(bssap, [DISC_BSSMAP, _, MSG_PAGING, ..])
}
