//! proxy - the BTS proxy event loop
//!
//! Each BTS opens an OML connection and then an RSL connection.  Both are asked for their
//! identity and correlated by (site, bts).  The OML connection brings two UDP injection
//! sockets into existence: whatever the BTS sends is copied to the most recent sender on
//! those sockets, and whatever arrives on them is queued toward the BTS.

use super::table::{BtsTable, Leg, Removed, UnitKey};
use super::*;
use crate::counters::{Counters, spawn_stats_task};
use crate::data::ProxyConfig;
use anyhow::{Result, anyhow};
use async_channel::{Receiver, Sender};
use async_io::Async;
use async_std::sync::Mutex;
use async_std::task::{self, JoinHandle};
use ipa::net::{
    ConnId, EVENT_QUEUE_DEPTH, IoEvent, Keepalive, Listener, TcpLink, Ticker, UdpLink, bind_tcp,
    bind_udp,
};
use ipa::{Error, Frame, IdentityTags, MsgType, Protocol, UnitId, build};
use slog::{Logger, debug, info, o, warn};
use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};
use stop_token::StopSource;

const TICK: Duration = Duration::from_secs(1);
const LISTEN_BACKLOG: i32 = 64;

pub enum Event {
    Io(IoEvent),
    Accepted(Leg, Async<TcpStream>, SocketAddr),
    Tick,
    WriteFrame {
        unit: UnitKey,
        leg: Leg,
        frame: Frame,
        reply: Sender<ipa::Result<()>>,
    },
    Status(Sender<ProxyStatus>),
    Shutdown,
}

impl From<IoEvent> for Event {
    fn from(e: IoEvent) -> Self {
        Event::Io(e)
    }
}

#[derive(Debug, Clone)]
pub struct BtsStatus {
    pub unit: UnitId,
    pub oml_peer: SocketAddr,
    pub rsl_peer: Option<SocketAddr>,
    pub udp_bts: SocketAddr,
    pub udp_bsc: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct ProxyStatus {
    pub bts: Vec<BtsStatus>,
    /// TCP connections, identified or not.
    pub connections: usize,
    pub counters: Vec<(&'static str, usize)>,
}

impl ProxyStatus {
    pub fn counter(&self, name: &str) -> usize {
        self.counters
            .iter()
            .find(|(n, _)| *n == name)
            .map_or(0, |(_, v)| *v)
    }

    pub fn find(&self, site_id: u16, bts_id: u16) -> Option<&BtsStatus> {
        self.bts
            .iter()
            .find(|b| b.unit.site_id == site_id && b.unit.bts_id == bts_id)
    }
}

#[derive(Clone)]
pub struct ProxyHandle {
    events: Sender<Event>,
    oml_addr: SocketAddr,
    rsl_addr: SocketAddr,
    max_payload: usize,
    logger: Logger,
    relay_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl ProxyHandle {
    pub async fn start(config: ProxyConfig, logger: Logger) -> Result<Self> {
        let (events, rx) = async_channel::bounded(EVENT_QUEUE_DEPTH);
        let oml = Listener::spawn(
            bind_tcp(SocketAddr::new(config.ip_addr, config.oml_port), LISTEN_BACKLOG)?,
            events.clone(),
            |s, a| Event::Accepted(Leg::Oml, s, a),
            logger.clone(),
        )?;
        let rsl = Listener::spawn(
            bind_tcp(SocketAddr::new(config.ip_addr, config.rsl_port), LISTEN_BACKLOG)?,
            events.clone(),
            |s, a| Event::Accepted(Leg::Rsl, s, a),
            logger.clone(),
        )?;
        let (oml_addr, rsl_addr) = (oml.local_addr(), rsl.local_addr());
        info!(&logger, "Listen for BTS OML on {} and RSL on {}", oml_addr, rsl_addr);

        let stop = StopSource::new();
        let counters = Counters::new(&PROXY_COUNTER_NAMES, PROXY_FIRST_WARN_IDX);
        spawn_stats_task(logger.clone(), counters.clone(), stop.token());

        let max_payload = config.limits.max_payload;
        let relay = Relay {
            config,
            logger: logger.clone(),
            events: events.clone(),
            counters,
            conns: HashMap::new(),
            table: BtsTable::default(),
            udp_owners: HashMap::new(),
            next_id: 0,
            doomed: vec![],
            _listeners: [oml, rsl],
            _ticker: Ticker::spawn(TICK, events.clone(), || Event::Tick),
            _stop: stop,
        };
        let relay_task = task::spawn(relay.run(rx));

        Ok(ProxyHandle {
            events,
            oml_addr,
            rsl_addr,
            max_payload,
            logger,
            relay_task: Arc::new(Mutex::new(Some(relay_task))),
        })
    }

    pub fn oml_addr(&self) -> SocketAddr {
        self.oml_addr
    }

    pub fn rsl_addr(&self) -> SocketAddr {
        self.rsl_addr
    }

    /// Write one frame to a leg of the BTS `site_id/bts_id`.
    pub async fn write_frame(
        &self,
        site_id: u16,
        bts_id: u16,
        leg: Leg,
        protocol: impl Into<u8>,
        payload: Vec<u8>,
    ) -> ipa::Result<()> {
        if payload.len() > self.max_payload {
            return Err(Error::ProtocolViolation(format!(
                "payload of {} bytes exceeds maximum of {}",
                payload.len(),
                self.max_payload
            )));
        }
        let (reply, rx) = async_channel::bounded(1);
        let event = Event::WriteFrame {
            unit: (site_id, bts_id),
            leg,
            frame: Frame::new(protocol, payload),
            reply,
        };
        self.events.send(event).await.map_err(|_| relay_stopped())?;
        rx.recv().await.map_err(|_| relay_stopped())?
    }

    pub async fn status(&self) -> Result<ProxyStatus> {
        let (reply, rx) = async_channel::bounded(1);
        self.events
            .send(Event::Status(reply))
            .await
            .map_err(|_| anyhow!("BTS proxy has stopped"))?;
        Ok(rx.recv().await?)
    }

    pub async fn graceful_shutdown(self) {
        info!(&self.logger, "Shutting down");
        let _ = self.events.send(Event::Shutdown).await;
        if let Some(h) = self.relay_task.lock().await.take() {
            h.await;
        }
    }
}

fn relay_stopped() -> Error {
    Error::Transport(io::Error::new(
        io::ErrorKind::NotConnected,
        "proxy has stopped",
    ))
}

/// The two UDP injection points of a BTS.
struct Injection {
    // Observer sees the BTS's OML and other non-RSL traffic.
    to_bts: UdpLink,
    // Observer sees the BTS's RSL traffic.
    to_bsc: UdpLink,
}

impl Injection {
    fn bind(
        config: &ProxyConfig,
        unit: UnitId,
        ids: (ConnId, ConnId),
        events: &Sender<Event>,
    ) -> ipa::Result<Self> {
        let offset = unit.site_id % 1000 + unit.bts_id % 100;
        let open = |base: u16, id: ConnId| -> ipa::Result<UdpLink> {
            let port = base.checked_add(offset).ok_or_else(|| {
                Error::ResourceExhaustion(format!("no UDP port {base}+{offset} for {unit}"))
            })?;
            let socket = bind_udp(SocketAddr::new(config.ip_addr, port))
                .map_err(|e| Error::ResourceExhaustion(format!("{e:#}")))?;
            UdpLink::spawn(id, socket, events.clone())
        };
        Ok(Injection {
            to_bts: open(config.udp_bts_base, ids.0)?,
            to_bsc: open(config.udp_bsc_base, ids.1)?,
        })
    }

    fn ids(&self) -> [ConnId; 2] {
        [self.to_bts.id(), self.to_bsc.id()]
    }
}

enum LegState {
    AwaitId,
    Established(UnitKey),
}

struct BtsConnection {
    link: TcpLink<Event>,
    leg: Leg,
    state: LegState,
    logger: Logger,
}

struct Relay {
    config: ProxyConfig,
    logger: Logger,
    events: Sender<Event>,
    counters: Arc<Counters>,
    conns: HashMap<ConnId, BtsConnection>,
    table: BtsTable<Injection>,
    udp_owners: HashMap<ConnId, UnitKey>,
    next_id: ConnId,
    // Connections to tear down once the current event has been handled.
    doomed: Vec<(ConnId, String)>,
    _listeners: [Listener; 2],
    _ticker: Ticker,
    _stop: StopSource,
}

impl Relay {
    async fn run(mut self, rx: Receiver<Event>) {
        while let Ok(event) = rx.recv().await {
            if let Event::Shutdown = event {
                break;
            }
            self.handle(event);
            self.reap();
        }
        for (_, conn) in self.conns {
            conn.link.close();
        }
        info!(&self.logger, "BTS proxy stopped");
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::Io(IoEvent::Received(id, data)) => self.on_received(id, &data),
            Event::Io(IoEvent::Closed(id, e)) => self.on_closed(id, e),
            Event::Io(IoEvent::Writable(id)) => {
                if let Some(conn) = self.conns.get_mut(&id) {
                    if let Err(e) = conn.link.on_writable() {
                        self.doom(id, e.to_string());
                    }
                }
            }
            Event::Io(IoEvent::Datagram(id, data, from)) => self.on_datagram(id, &data, from),
            Event::Accepted(leg, stream, peer) => self.on_accepted(leg, stream, peer),
            Event::Tick => self.on_tick(Instant::now()),
            Event::WriteFrame {
                unit,
                leg,
                frame,
                reply,
            } => {
                let result = self.write_to_bts(unit, leg, &frame);
                let _ = reply.try_send(result);
            }
            Event::Status(reply) => {
                let _ = reply.try_send(self.status());
            }
            Event::Shutdown => {}
        }
    }

    fn next_conn_id(&mut self) -> ConnId {
        self.next_id += 1;
        self.next_id
    }

    fn doom(&mut self, id: ConnId, reason: String) {
        self.doomed.push((id, reason));
    }

    fn reap(&mut self) {
        // Tearing down an OML leg dooms its RSL leg.
        while !self.doomed.is_empty() {
            for (id, reason) in std::mem::take(&mut self.doomed) {
                self.teardown(id, &reason);
            }
        }
    }

    fn teardown(&mut self, id: ConnId, reason: &str) {
        let Some(conn) = self.conns.remove(&id) else {
            return;
        };
        let released = conn.link.close();
        self.counters.incr(PROXY_CLOSED);
        info!(&conn.logger, "{} connection closed - {}", conn.leg, reason;
            "released_frames" => released);

        match self.table.remove_leg(id) {
            Some(Removed::Oml(entry)) => {
                for udp in entry.sockets.ids() {
                    self.udp_owners.remove(&udp);
                }
                info!(&conn.logger, "Released BTS {}", entry.unit);
                if let Some(rsl) = entry.rsl {
                    self.doom(rsl, "OML connection closed".to_string());
                }
            }
            Some(Removed::Rsl(_)) | None => {}
        }
    }

    fn on_closed(&mut self, id: ConnId, e: Option<io::Error>) {
        if let Some(unit) = self.udp_owners.get(&id) {
            // The injection socket failed.  The BTS itself is unaffected.
            warn!(&self.logger, "Injection socket of {:?} failed - {:?}", unit, e);
            self.counters.incr(PROXY_UDP_ERROR);
            return;
        }
        let reason = e.map_or("closed by peer".to_string(), |e| e.to_string());
        self.doom(id, reason);
    }

    fn on_accepted(&mut self, leg: Leg, stream: Async<TcpStream>, peer: SocketAddr) {
        let id = self.next_conn_id();
        let logger = self.logger.new(o!("conn" => id, "leg" => leg.to_string()));
        let link = TcpLink::spawn(id, stream, peer, &self.config.limits, self.events.clone());
        info!(&logger, "BTS connected from {}", peer);
        self.conns.insert(
            id,
            BtsConnection {
                link,
                leg,
                state: LegState::AwaitId,
                logger,
            },
        );
        self.send_to_bts(id, &build::id_get_bts());
    }

    fn on_tick(&mut self, now: Instant) {
        let mut pings = vec![];
        for (id, conn) in self.conns.iter_mut() {
            match conn.link.keepalive(now, &self.config.limits) {
                Keepalive::SendPing => pings.push(*id),
                Keepalive::Dead => self.doomed.push((*id, "keepalive timeout".to_string())),
                Keepalive::Alive => {}
            }
        }
        for id in pings {
            self.send_to_bts(id, &build::ping());
        }
    }

    fn send_to_bts(&mut self, id: ConnId, frame: &Frame) {
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        match conn.link.send(frame) {
            Ok(()) => self.counters.incr(PROXY_TO_BTS),
            Err(e) => self.doom(id, e.to_string()),
        }
    }

    fn write_to_bts(&mut self, unit: UnitKey, leg: Leg, frame: &Frame) -> ipa::Result<()> {
        let id = self
            .table
            .get(&unit)
            .and_then(|entry| entry.conn(leg))
            .ok_or_else(|| Error::NotFound(format!("{leg} connection of BTS {unit:?}")))?;
        let Some(conn) = self.conns.get_mut(&id) else {
            return Err(Error::NotFound(format!("{leg} connection of BTS {unit:?}")));
        };
        conn.link
            .send(frame)
            .inspect_err(|e| self.doomed.push((id, e.to_string())))
    }

    fn status(&self) -> ProxyStatus {
        let peer = |id: ConnId| self.conns.get(&id).map(|c| c.link.peer());
        let bts = self
            .table
            .values()
            .filter_map(|entry| {
                Some(BtsStatus {
                    unit: entry.unit,
                    oml_peer: peer(entry.oml)?,
                    rsl_peer: entry.rsl.and_then(peer),
                    udp_bts: entry.sockets.to_bts.local_addr(),
                    udp_bsc: entry.sockets.to_bsc.local_addr(),
                })
            })
            .collect();
        ProxyStatus {
            bts,
            connections: self.conns.len(),
            counters: self.counters.snapshot(),
        }
    }

    fn on_received(&mut self, id: ConnId, data: &[u8]) {
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        let frames: Vec<ipa::Result<Frame>> = conn.link.on_received(data).collect();
        for frame in frames {
            if self.doomed.iter().any(|(d, _)| *d == id) {
                break;
            }
            match frame {
                Ok(frame) => self.from_bts(id, frame),
                Err(e) => self.doom(id, e.to_string()),
            }
        }
    }

    fn from_bts(&mut self, id: ConnId, frame: Frame) {
        self.counters.incr(PROXY_FROM_BTS);
        if frame.protocol == u8::from(Protocol::Ipaccess) {
            self.ipaccess(id, &frame.payload);
            return;
        }
        let Some(conn) = self.conns.get(&id) else {
            return;
        };
        let LegState::Established(unit) = conn.state else {
            debug!(&conn.logger, "Dropping {} frame before identity", frame.protocol_name());
            self.counters.incr(PROXY_DROP_BEFORE_ID);
            return;
        };
        let Some(entry) = self.table.get(&unit) else {
            return;
        };
        let socket = if frame.protocol == u8::from(Protocol::Rsl) {
            &entry.sockets.to_bsc
        } else {
            &entry.sockets.to_bts
        };
        match socket.send(&frame) {
            Ok(true) => self.counters.incr(PROXY_TO_OBSERVER),
            Ok(false) => self.counters.incr(PROXY_NO_OBSERVER),
            Err(e) => {
                debug!(&conn.logger, "Failed to copy frame to observer - {}", e);
                self.counters.incr(PROXY_UDP_ERROR);
            }
        }
    }

    fn ipaccess(&mut self, id: ConnId, payload: &[u8]) {
        let Some(conn) = self.conns.get(&id) else {
            return;
        };
        let logger = conn.logger.clone();
        let Some((&msg_type, body)) = payload.split_first() else {
            return;
        };
        match MsgType::try_from(msg_type) {
            Ok(MsgType::Ping) => self.send_to_bts(id, &build::pong()),
            Ok(MsgType::Pong) => debug!(&logger, "PONG"),
            Ok(MsgType::IdAck) => self.send_to_bts(id, &build::id_ack()),
            Ok(MsgType::IdResp) => {
                if let Err(e) = self.identify(id, body) {
                    warn!(&logger, "Rejecting connection - {}", e);
                    self.counters.incr(PROXY_REJECTED);
                    self.doom(id, e.to_string());
                }
            }
            _ => debug!(&logger, "Ignoring IPA message type {:#04x}", msg_type),
        }
    }

    /// Correlate a connection by the identity it has just declared.
    fn identify(&mut self, id: ConnId, entries: &[u8]) -> ipa::Result<()> {
        let Some(conn) = self.conns.get(&id) else {
            return Ok(());
        };
        let leg = conn.leg;
        if let LegState::Established(_) = conn.state {
            debug!(&conn.logger, "Ignoring repeated identity response");
            return Ok(());
        }
        let tags = IdentityTags::parse(entries)?;
        let unit = tags.unit_id()?;
        info!(&conn.logger, "Identity {}", tags; "unit" => unit.to_string());

        // Only an OML leg gets sockets, so only it takes ids for them.
        let (config, events, next_id) = (&self.config, &self.events, &mut self.next_id);
        let mut udp_ids = None;
        let key = self.table.correlate(id, leg, unit, || {
            let ids = (*next_id + 1, *next_id + 2);
            *next_id += 2;
            udp_ids = Some(ids);
            Injection::bind(config, unit, ids, events)
        })?;
        if let Some((to_bts, to_bsc)) = udp_ids {
            self.udp_owners.insert(to_bts, key);
            self.udp_owners.insert(to_bsc, key);
        }
        if let Some(conn) = self.conns.get_mut(&id) {
            conn.state = LegState::Established(key);
            conn.logger = conn.logger.new(o!("bts" => unit.to_string()));
            info!(&conn.logger, "{} connection correlated", leg);
        }
        self.counters.incr(PROXY_CORRELATED);
        self.send_to_bts(id, &build::id_ack());
        Ok(())
    }

    fn on_datagram(&mut self, udp_id: ConnId, data: &[u8], from: SocketAddr) {
        let Some(unit) = self.udp_owners.get(&udp_id).copied() else {
            return;
        };
        let Some(entry) = self.table.get_mut(&unit) else {
            return;
        };
        let socket = if entry.sockets.to_bts.id() == udp_id {
            &mut entry.sockets.to_bts
        } else {
            &mut entry.sockets.to_bsc
        };
        socket.set_observer(from);

        let frame = match Frame::decode_datagram(data, self.config.limits.max_payload) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(&self.logger, "Bad datagram from {} - {}", from, e);
                self.counters.incr(PROXY_DROP_BAD_DATAGRAM);
                return;
            }
        };
        let leg = if frame.protocol == u8::from(Protocol::Rsl) {
            Leg::Rsl
        } else {
            Leg::Oml
        };
        let Some(target) = entry.conn(leg) else {
            self.counters.incr(PROXY_DROP_NO_RSL);
            return;
        };
        self.counters.incr(PROXY_INJECTED);
        self.send_to_bts(target, &frame);
    }
}
