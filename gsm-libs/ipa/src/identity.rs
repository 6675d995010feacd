//! identity - identity entries carried in an ID_RESP and the site/bts/trx unit id

use crate::{Error, ParseError, Result};
use crate::protocol::IdTag;
use std::fmt;
use std::str::FromStr;

/// Identity of a radio unit as declared in its Unit_ID tag, e.g. `1801/0/0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitId {
    pub site_id: u16,
    pub bts_id: u16,
    pub trx_id: u16,
}

impl UnitId {
    pub fn new(site_id: u16, bts_id: u16, trx_id: u16) -> Self {
        UnitId {
            site_id,
            bts_id,
            trx_id,
        }
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.site_id, self.bts_id, self.trx_id)
    }
}

impl FromStr for UnitId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.split('/');
        let site_id = parse_field(fields.next(), "site")?;
        let bts_id = parse_field(fields.next(), "bts")?;
        let trx_id = parse_field(fields.next(), "trx")?;
        if let Some(rest) = fields.next() {
            return Err(ParseError::TrailingGarbage(format!("/{rest}")));
        }
        Ok(UnitId::new(site_id, bts_id, trx_id))
    }
}

fn parse_field(field: Option<&str>, name: &'static str) -> Result<u16, ParseError> {
    let Some(field) = field else {
        return Err(ParseError::MissingField(name));
    };
    if field.is_empty() {
        return Err(ParseError::MissingField(name));
    }
    // u16::from_str accepts a leading '+', which is not part of the format.
    if !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::BadField {
            field: name,
            value: field.to_string(),
        });
    }
    field.parse().map_err(|_| ParseError::BadField {
        field: name,
        value: field.to_string(),
    })
}

/// The entries of an identity response, in the order received.  Unknown tags are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityTags(Vec<(u8, Vec<u8>)>);

impl IdentityTags {
    /// Parse a sequence of `{len, tag, value}` entries.  Consumption stops at the end of the
    /// input; an entry running past the end is an error.
    pub fn parse(mut data: &[u8]) -> Result<Self, ParseError> {
        let total = data.len();
        let mut entries = vec![];
        while !data.is_empty() {
            let offset = total - data.len();
            let [len, tag, rest @ ..] = data else {
                return Err(ParseError::Truncated(offset));
            };
            let len = *len as usize;
            if rest.len() < len {
                return Err(ParseError::Truncated(offset));
            }
            entries.push((*tag, rest[..len].to_vec()));
            data = &rest[len..];
        }
        Ok(IdentityTags(entries))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = vec![];
        for (tag, value) in &self.0 {
            bytes.push(value.len() as u8);
            bytes.push(*tag);
            bytes.extend_from_slice(value);
        }
        bytes
    }

    /// Append an entry.  The length octet limits a value to 255 bytes.
    pub fn push(&mut self, tag: IdTag, value: &[u8]) -> Result<()> {
        if value.len() > u8::MAX as usize {
            return Err(Error::ProtocolViolation(format!(
                "{} identity value of {} bytes",
                tag.name(),
                value.len()
            )));
        }
        self.0.push((tag.into(), value.to_vec()));
        Ok(())
    }

    /// First value carried for `tag`.
    pub fn get(&self, tag: IdTag) -> Option<&[u8]> {
        let tag: u8 = tag.into();
        self.0
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, v)| v.as_slice())
    }

    /// Textual value of `tag`, without any NUL terminator.
    pub fn text(&self, tag: IdTag) -> Option<Result<&str, ParseError>> {
        self.get(tag).map(as_text)
    }

    pub fn unit_id(&self) -> Result<UnitId, ParseError> {
        let text = self.text(IdTag::Unit).ok_or(ParseError::NoUnitId)??;
        text.parse()
    }

    /// Recognized entries as (name, printable value) pairs, for logging and inventory.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, String)> + '_ {
        self.0.iter().filter_map(|(tag, value)| {
            let tag = IdTag::try_from(*tag).ok()?;
            let value = match tag {
                IdTag::MacAddr => hex::encode(value),
                _ => String::from_utf8_lossy(trim_nul(value)).into_owned(),
            };
            Some((tag.name(), value))
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for IdentityTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.named() {
            write!(f, "{name}='{value}' ")?;
        }
        Ok(())
    }
}

fn trim_nul(value: &[u8]) -> &[u8] {
    match value.iter().position(|b| *b == 0) {
        Some(end) => &value[..end],
        None => value,
    }
}

fn as_text(value: &[u8]) -> Result<&str, ParseError> {
    let value = match value {
        [head @ .., 0] => head,
        _ => value,
    };
    std::str::from_utf8(value).map_err(|_| ParseError::NotText)
}
