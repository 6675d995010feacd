use ipa::net::LinkLimits;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

pub const OML_PORT: u16 = 3002;
pub const RSL_PORT: u16 = 3003;
pub const UDP_BTS_BASE: u16 = 10000;
pub const UDP_BSC_BASE: u16 = 20000;
pub const BSC_PORT: u16 = 5000;

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    // Address the OML and RSL listeners and the injection sockets bind to.
    pub ip_addr: IpAddr,

    // Listen ports for the management and signalling legs.  0 picks an ephemeral port.
    pub oml_port: u16,
    pub rsl_port: u16,

    // Injection sockets of a BTS bind to base + site%1000 + bts%100.
    pub udp_bts_base: u16,
    pub udp_bsc_base: u16,

    pub limits: LinkLimits,
}

impl ProxyConfig {
    pub fn new(ip_addr: IpAddr) -> Self {
        ProxyConfig {
            ip_addr,
            oml_port: OML_PORT,
            rsl_port: RSL_PORT,
            udp_bts_base: UDP_BTS_BASE,
            udp_bsc_base: UDP_BSC_BASE,
            limits: LinkLimits::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NatConfig {
    // Address the controller listener binds to.
    pub ip_addr: IpAddr,
    pub bsc_port: u16,

    // The MSC the NAT connects to, and the unit name the NAT gives when the MSC asks who it is.
    pub msc_addr: SocketAddr,
    pub msc_token: String,

    // Controllers that have not authenticated within this time are disconnected.
    pub auth_timeout: Duration,

    // Delay before reconnecting to the MSC after a failure or loss.
    pub msc_reconnect_interval: Duration,

    // An MSC connection attempt that has not completed within this time has failed.
    pub msc_connect_timeout: Duration,

    pub limits: LinkLimits,
}

impl NatConfig {
    pub fn new(ip_addr: IpAddr, msc_addr: SocketAddr) -> Self {
        NatConfig {
            ip_addr,
            bsc_port: BSC_PORT,
            msc_addr,
            msc_token: "abisrelay".to_string(),
            auth_timeout: Duration::from_secs(2),
            msc_reconnect_interval: Duration::from_secs(5),
            msc_connect_timeout: Duration::from_secs(5),
            limits: LinkLimits::default(),
        }
    }
}
