//! paging - choose the controller that serves the location area named in a PAGING

use ipa::net::ConnId;
use sccp::CellIdentifierList;
use sccp::bssmap;
use std::collections::BTreeMap;
use thiserror::Error;

/// What the router needs to know about a controller.
pub trait PagingTarget {
    fn lac(&self) -> Option<u16>;
    fn is_authenticated(&self) -> bool;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PagingError {
    #[error("malformed paging - {0}")]
    Malformed(#[from] sccp::BssmapError),

    #[error("BSS-wide paging cannot be routed to one controller")]
    BssWide,

    #[error("cell identifier discriminator {0:#04x} not supported")]
    Unsupported(u8),

    #[error("no authenticated controller serves LACs {0:?}")]
    NoMatch(Vec<u16>),
}

/// For each LAC in message order, the first authenticated controller (in registration order)
/// serving it.  `controllers` is keyed by connection id, which increases with registration.
pub fn route<T: PagingTarget>(
    bssap: &[u8],
    controllers: &BTreeMap<ConnId, T>,
) -> Result<ConnId, PagingError> {
    let lacs = match bssmap::paging_cell_identifier_list(bssap)? {
        CellIdentifierList::Lacs(lacs) => lacs,
        CellIdentifierList::WholeBss => return Err(PagingError::BssWide),
        CellIdentifierList::Unsupported(disc) => return Err(PagingError::Unsupported(disc)),
    };
    let chosen = lacs.iter().find_map(|lac| {
        controllers
            .iter()
            .find(|(_, c)| c.is_authenticated() && c.lac() == Some(*lac))
            .map(|(id, _)| *id)
    });
    chosen.ok_or(PagingError::NoMatch(lacs))
}
