//! nat - BSC-NAT: many controllers multiplexed onto one MSC connection
mod bsc;
mod paging;
mod reference;
mod relay;

pub use bsc::{AuthError, BscStats, BscStatus, check_identity};
pub use paging::{PagingError, PagingTarget, route};
pub use reference::{Mapping, ReferenceTranslator};
pub use relay::{NatHandle, NatStatus};

use relay::Event;

pub const NAT_FROM_BSC: usize = 0;
pub const NAT_TO_BSC: usize = 1;
pub const NAT_FROM_MSC: usize = 2;
pub const NAT_TO_MSC: usize = 3;
pub const NAT_SCCP_OPENED: usize = 4;
pub const NAT_PAGING_ROUTED: usize = 5;
pub const NAT_BSC_AUTHENTICATED: usize = 6;
pub const NAT_MSC_CONNECTED: usize = 7;
pub const NAT_AUTH_FAILED: usize = 8;
pub const NAT_AUTH_TIMEOUT: usize = 9;
pub const NAT_DROP_UNAUTHENTICATED: usize = 10;
pub const NAT_DROP_MSC_DOWN: usize = 11;
pub const NAT_DROP_UNKNOWN_REF: usize = 12;
pub const NAT_DROP_MALFORMED: usize = 13;
pub const NAT_DROP_FROM_MSC: usize = 14;
pub const NAT_DROP_PAGING_MALFORMED: usize = 15;
pub const NAT_DROP_PAGING_BSS_WIDE: usize = 16;
pub const NAT_DROP_PAGING_UNSUPPORTED: usize = 17;
pub const NAT_DROP_PAGING_NO_MATCH: usize = 18;
pub const NAT_CLOSED_BSC: usize = 19;
pub const NAT_MSC_LOST: usize = 20;
pub const NAT_NUM_COUNTERS: usize = 21;

pub const NAT_FIRST_WARN_IDX: usize = NAT_AUTH_FAILED;

pub const NAT_COUNTER_NAMES: [&str; NAT_NUM_COUNTERS] = [
    "from_bsc",
    "to_bsc",
    "from_msc",
    "to_msc",
    "sccp_opened",
    "paging_routed",
    "bsc_authenticated",
    "msc_connected",
    "auth_failed",
    "auth_timeout",
    "unauthenticated",
    "msc_down",
    "unknown_ref",
    "malformed",
    "msc_unroutable",
    "paging_malformed",
    "paging_bss_wide",
    "paging_unsupported",
    "paging_no_match",
    "bsc_closed",
    "msc_lost",
];
