//! bts_proxy - Abis/IP proxy correlating the OML and RSL connections of each BTS
mod proxy;
mod table;

pub use proxy::{BtsStatus, ProxyHandle, ProxyStatus};
pub use table::{BtsEntry, BtsTable, Leg, Removed, UnitKey};

pub const PROXY_FROM_BTS: usize = 0;
pub const PROXY_TO_BTS: usize = 1;
pub const PROXY_TO_OBSERVER: usize = 2;
pub const PROXY_INJECTED: usize = 3;
pub const PROXY_CORRELATED: usize = 4;
pub const PROXY_NO_OBSERVER: usize = 5;
pub const PROXY_REJECTED: usize = 6;
pub const PROXY_DROP_BEFORE_ID: usize = 7;
pub const PROXY_DROP_NO_RSL: usize = 8;
pub const PROXY_DROP_BAD_DATAGRAM: usize = 9;
pub const PROXY_UDP_ERROR: usize = 10;
pub const PROXY_CLOSED: usize = 11;
pub const PROXY_NUM_COUNTERS: usize = 12;

pub const PROXY_FIRST_WARN_IDX: usize = PROXY_REJECTED;

pub const PROXY_COUNTER_NAMES: [&str; PROXY_NUM_COUNTERS] = [
    "from_bts",
    "to_bts",
    "to_observer",
    "injected",
    "correlated",
    "no_observer",
    "rejected",
    "before_id",
    "no_rsl",
    "bad_datagram",
    "udp_error",
    "closed",
];
