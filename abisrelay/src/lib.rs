mod counters;
mod data;
pub mod bts_proxy;
pub mod nat;

pub use bts_proxy::{Leg, ProxyHandle, ProxyStatus};
pub use data::bscs::{self, BscTable};
pub use data::{NatConfig, ProxyConfig};
pub use data::{BSC_PORT, OML_PORT, RSL_PORT, UDP_BSC_BASE, UDP_BTS_BASE};
pub use nat::{NatHandle, NatStatus};
