//! net - non-blocking socket plumbing for a single-owner relay loop
//!
//! Each socket gets a small reader task that posts what it reads to the relay's event channel.
//! The relay owns all the state and writes without blocking; when a socket would block it
//! spawns a one-shot waiter that posts `IoEvent::Writable` on readiness.  Because the event
//! channel is bounded, a slow relay stalls the readers rather than growing memory.

mod link;
mod listener;
mod ticker;
mod udp;

pub use link::{Keepalive, KeepaliveTimer, TcpLink};
pub use listener::{Listener, bind_tcp, connect_tcp};
pub use ticker::Ticker;
pub use udp::{UdpLink, bind_udp};

use crate::protocol::DEFAULT_MAX_PAYLOAD;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

pub type ConnId = u32;

/// Size of each socket read.
pub const READ_CHUNK: usize = 4096;

/// Depth of the event channel between I/O tasks and the relay loop.
pub const EVENT_QUEUE_DEPTH: usize = 256;

#[derive(Debug)]
pub enum IoEvent {
    Received(ConnId, Vec<u8>),
    /// EOF (no error) or a read failure.
    Closed(ConnId, Option<io::Error>),
    Writable(ConnId),
    Datagram(ConnId, Vec<u8>, SocketAddr),
}

/// Per-link limits applied by both relays.
#[derive(Debug, Clone)]
pub struct LinkLimits {
    pub max_payload: usize,
    pub max_queue_depth: usize,
    /// Receive silence after which a PING is sent.
    pub ping_interval: Duration,
    /// Further silence after the PING before the link is declared dead.
    pub pong_timeout: Duration,
}

impl Default for LinkLimits {
    fn default() -> Self {
        LinkLimits {
            max_payload: DEFAULT_MAX_PAYLOAD,
            max_queue_depth: 100,
            ping_interval: Duration::from_secs(20),
            pong_timeout: Duration::from_secs(5),
        }
    }
}
