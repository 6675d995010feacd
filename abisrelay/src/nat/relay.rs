//! relay - the NAT event loop
//!
//! A single task owns the controller table, the MSC link and the reference translator.  Socket
//! readers, the listener and the tick timer only post events to it.

use super::bsc::{BscConnection, BscStatus, check_identity};
use super::paging::{self, PagingError, PagingTarget};
use super::reference::ReferenceTranslator;
use super::*;
use crate::counters::{Counters, spawn_stats_task};
use crate::data::NatConfig;
use crate::data::bscs::BscTable;
use anyhow::{Result, anyhow};
use async_channel::{Receiver, Sender};
use async_io::Async;
use async_std::sync::Mutex;
use async_std::task::{self, JoinHandle};
use ipa::net::{
    ConnId, EVENT_QUEUE_DEPTH, IoEvent, Keepalive, Listener, TcpLink, Ticker, bind_tcp,
    connect_tcp,
};
use ipa::{Error, Frame, IdTag, IdentityTags, MsgType, Protocol, build};
use sccp::{
    LocalRef, MessageType, REFUSAL_CAUSE_SCCP_FAILURE, RELEASE_CAUSE_SCCP_FAILURE, bssmap,
};
use slog::{Logger, debug, info, o, warn};
use std::collections::BTreeMap;
use std::io;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};
use stop_token::StopSource;
use stop_token::prelude::*;

const TICK: Duration = Duration::from_secs(1);
const LISTEN_BACKLOG: i32 = 64;

pub enum Event {
    Io(IoEvent),
    BscAccepted(Async<TcpStream>, SocketAddr),
    MscConnected(io::Result<Async<TcpStream>>),
    Tick,
    WriteFrame {
        token: String,
        frame: Frame,
        reply: Sender<ipa::Result<()>>,
    },
    Status(Sender<NatStatus>),
    Shutdown,
}

impl From<IoEvent> for Event {
    fn from(e: IoEvent) -> Self {
        Event::Io(e)
    }
}

#[derive(Debug, Clone)]
pub struct NatStatus {
    pub msc_connected: bool,
    pub controllers: Vec<BscStatus>,
    pub live_references: usize,
    pub counters: Vec<(&'static str, usize)>,
}

impl NatStatus {
    pub fn counter(&self, name: &str) -> usize {
        self.counters
            .iter()
            .find(|(n, _)| *n == name)
            .map_or(0, |(_, v)| *v)
    }
}

#[derive(Clone)]
pub struct NatHandle {
    events: Sender<Event>,
    local_addr: SocketAddr,
    max_payload: usize,
    logger: Logger,
    relay_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl NatHandle {
    pub async fn start(config: NatConfig, bscs: &'static BscTable, logger: Logger) -> Result<Self> {
        let listen_addr = SocketAddr::new(config.ip_addr, config.bsc_port);
        let listener = bind_tcp(listen_addr, LISTEN_BACKLOG)?;
        let (events, rx) = async_channel::bounded(EVENT_QUEUE_DEPTH);
        let listener = Listener::spawn(
            listener,
            events.clone(),
            Event::BscAccepted,
            logger.clone(),
        )?;
        let local_addr = listener.local_addr();
        info!(&logger, "Listen for connections from BSCs on {}", local_addr);

        let stop = StopSource::new();
        let counters = Counters::new(&NAT_COUNTER_NAMES, NAT_FIRST_WARN_IDX);
        spawn_stats_task(logger.clone(), counters.clone(), stop.token());

        let max_payload = config.limits.max_payload;
        let mut relay = Relay {
            _ticker: Ticker::spawn(TICK, events.clone(), || Event::Tick),
            _listener: listener,
            config,
            bscs,
            logger: logger.clone(),
            events: events.clone(),
            counters,
            controllers: BTreeMap::new(),
            msc: Msc::Connecting,
            refs: ReferenceTranslator::new(),
            next_id: 0,
            doomed: vec![],
            stop,
        };
        relay.connect_msc();
        let relay_task = task::spawn(relay.run(rx));

        Ok(NatHandle {
            events,
            local_addr,
            max_payload,
            logger,
            relay_task: Arc::new(Mutex::new(Some(relay_task))),
        })
    }

    /// Address the controller listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Write one frame to the authenticated controller presenting `token`.
    pub async fn write_frame(
        &self,
        token: &str,
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
            token: token.to_string(),
            frame: Frame::new(protocol, payload),
            reply,
        };
        self.events.send(event).await.map_err(|_| relay_stopped())?;
        rx.recv().await.map_err(|_| relay_stopped())?
    }

    pub async fn status(&self) -> Result<NatStatus> {
        let (reply, rx) = async_channel::bounded(1);
        self.events
            .send(Event::Status(reply))
            .await
            .map_err(|_| anyhow!("NAT relay has stopped"))?;
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
        "relay has stopped",
    ))
}

enum Msc {
    Connecting,
    Down(Instant),
    Up(TcpLink<Event>),
}

/// Why a frame from the MSC could not be delivered, and which counter it goes against.
struct Dropped(usize, String);

struct Relay {
    config: NatConfig,
    bscs: &'static BscTable,
    logger: Logger,
    events: Sender<Event>,
    counters: Arc<Counters>,
    // Keyed by connection id, so iteration is in registration order.
    controllers: BTreeMap<ConnId, BscConnection>,
    msc: Msc,
    refs: ReferenceTranslator,
    next_id: ConnId,
    // Connections to tear down once the current event has been handled.
    doomed: Vec<(ConnId, String)>,
    _listener: Listener,
    _ticker: Ticker,
    stop: StopSource,
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
        self.close_everything();
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::Io(IoEvent::Received(id, data)) => self.on_received(id, &data),
            Event::Io(IoEvent::Closed(id, e)) => {
                let reason = e.map_or("closed by peer".to_string(), |e| e.to_string());
                self.doom(id, reason);
            }
            Event::Io(IoEvent::Writable(id)) => self.on_writable(id),
            Event::Io(IoEvent::Datagram(..)) => {}
            Event::BscAccepted(stream, peer) => self.on_accepted(stream, peer),
            Event::MscConnected(result) => self.on_msc_connected(result),
            Event::Tick => self.on_tick(Instant::now()),
            Event::WriteFrame {
                token,
                frame,
                reply,
            } => {
                let result = self.write_to_bsc(&token, &frame);
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

    fn msc_link_id(&self) -> Option<ConnId> {
        match &self.msc {
            Msc::Up(link) => Some(link.id()),
            _ => None,
        }
    }

    fn doom(&mut self, id: ConnId, reason: String) {
        self.doomed.push((id, reason));
    }

    fn is_doomed(&self, id: ConnId) -> bool {
        self.doomed.iter().any(|(d, _)| *d == id)
    }

    fn reap(&mut self) {
        // Tearing down a controller can fail a write to the MSC, which dooms that in turn.
        while !self.doomed.is_empty() {
            for (id, reason) in std::mem::take(&mut self.doomed) {
                self.teardown(id, &reason);
            }
        }
    }

    fn teardown(&mut self, id: ConnId, reason: &str) {
        if self.msc_link_id() == Some(id) {
            let Msc::Up(link) = std::mem::replace(&mut self.msc, Msc::Down(Instant::now())) else {
                return;
            };
            let released = link.close();
            let cleared = self.refs.clear();
            self.counters.incr(NAT_MSC_LOST);
            warn!(&self.logger, "Lost MSC connection - {reason}";
                "released_frames" => released, "released_references" => cleared.len());

            // Each controller learns that its connections are gone.
            for m in cleared {
                let message = match m.core_ref {
                    Some(core_ref) => {
                        sccp::build::rlsd(m.controller_ref, core_ref, RELEASE_CAUSE_SCCP_FAILURE)
                    }
                    None => sccp::build::cref(m.controller_ref, REFUSAL_CAUSE_SCCP_FAILURE),
                };
                self.send_to_bsc(m.owner, &Frame::new(Protocol::Sccp, message));
            }
            return;
        }

        let Some(bsc) = self.controllers.remove(&id) else {
            return;
        };
        let logger = bsc.logger.clone();
        let released = bsc.link.close();
        let mappings = self.refs.close_all(id);
        self.counters.incr(NAT_CLOSED_BSC);
        info!(&logger, "BSC disconnected - {reason}";
            "released_frames" => released, "released_references" => mappings.len());

        // The MSC only knows connections it has confirmed.
        for m in mappings {
            if let Some(core_ref) = m.core_ref {
                let rlsd = sccp::build::rlsd(core_ref, m.nat_ref, RELEASE_CAUSE_SCCP_FAILURE);
                self.send_to_msc(&Frame::new(Protocol::Sccp, rlsd));
            }
        }
    }

    fn close_everything(self) {
        for (_, bsc) in self.controllers {
            bsc.link.close();
        }
        if let Msc::Up(link) = self.msc {
            link.close();
        }
        info!(&self.logger, "NAT relay stopped");
    }

    fn on_accepted(&mut self, stream: Async<TcpStream>, peer: SocketAddr) {
        let id = self.next_conn_id();
        let logger = self.logger.new(o!("bsc" => id));
        let link = TcpLink::spawn(id, stream, peer, &self.config.limits, self.events.clone());
        info!(&logger, "BSC connected from {}", peer);
        self.controllers.insert(id, BscConnection::new(link, logger));
        self.send_to_bsc(id, &build::id_get(&[IdTag::UnitName]));
    }

    fn connect_msc(&mut self) {
        self.msc = Msc::Connecting;
        let addr = self.config.msc_addr;
        let limit = self.config.msc_connect_timeout;
        let events = self.events.clone();
        let stop = self.stop.token();
        task::spawn(async move {
            if let Ok(result) = connect_tcp(addr, limit).timeout_at(stop).await {
                let _ = events.send(Event::MscConnected(result)).await;
            }
        });
    }

    fn on_msc_connected(&mut self, result: io::Result<Async<TcpStream>>) {
        if !matches!(self.msc, Msc::Connecting) {
            return;
        }
        let addr = self.config.msc_addr;
        match result {
            Ok(stream) => {
                let id = self.next_conn_id();
                let link = TcpLink::spawn(id, stream, addr, &self.config.limits, self.events.clone());
                info!(&self.logger, "Connected to MSC at {}", addr);
                self.counters.incr(NAT_MSC_CONNECTED);
                self.msc = Msc::Up(link);
            }
            Err(e) => {
                warn!(&self.logger, "Failed to connect to MSC at {} - {}", addr, e);
                self.msc = Msc::Down(Instant::now());
            }
        }
    }

    fn on_tick(&mut self, now: Instant) {
        let limits = &self.config.limits;
        let mut pings = vec![];
        for (id, bsc) in self.controllers.iter_mut() {
            if !bsc.is_authenticated()
                && now.duration_since(bsc.accepted_at) >= self.config.auth_timeout
            {
                self.counters.incr(NAT_AUTH_TIMEOUT);
                self.doomed
                    .push((*id, "authentication timeout".to_string()));
                continue;
            }
            match bsc.link.keepalive(now, limits) {
                Keepalive::SendPing => pings.push(*id),
                Keepalive::Dead => self.doomed.push((*id, "keepalive timeout".to_string())),
                Keepalive::Alive => {}
            }
        }
        for id in pings {
            self.send_to_bsc(id, &build::ping());
        }

        match &mut self.msc {
            Msc::Up(link) => {
                let id = link.id();
                match link.keepalive(now, &self.config.limits) {
                    Keepalive::SendPing => self.send_to_msc(&build::ping()),
                    Keepalive::Dead => self.doom(id, "keepalive timeout".to_string()),
                    Keepalive::Alive => {}
                }
            }
            Msc::Down(since) if now.duration_since(*since) >= self.config.msc_reconnect_interval => {
                info!(&self.logger, "Reconnecting to MSC");
                self.connect_msc();
            }
            _ => {}
        }
    }

    fn on_writable(&mut self, id: ConnId) {
        let result = if self.msc_link_id() == Some(id) {
            match &mut self.msc {
                Msc::Up(link) => link.on_writable(),
                _ => Ok(()),
            }
        } else if let Some(bsc) = self.controllers.get_mut(&id) {
            bsc.link.on_writable()
        } else {
            Ok(())
        };
        if let Err(e) = result {
            self.doom(id, e.to_string());
        }
    }

    fn on_received(&mut self, id: ConnId, data: &[u8]) {
        let frames: Vec<ipa::Result<Frame>> = if self.msc_link_id() == Some(id) {
            match &mut self.msc {
                Msc::Up(link) => link.on_received(data).collect(),
                _ => return,
            }
        } else if let Some(bsc) = self.controllers.get_mut(&id) {
            bsc.link.on_received(data).collect()
        } else {
            return;
        };

        for frame in frames {
            if self.is_doomed(id) {
                break;
            }
            match frame {
                Ok(frame) if self.msc_link_id() == Some(id) => self.from_msc(frame),
                Ok(frame) => self.from_bsc(id, frame),
                Err(e) => self.doom(id, e.to_string()),
            }
        }
    }

    fn send_to_bsc(&mut self, id: ConnId, frame: &Frame) {
        let Some(bsc) = self.controllers.get_mut(&id) else {
            return;
        };
        match bsc.link.send(frame) {
            Ok(()) => self.counters.incr(NAT_TO_BSC),
            Err(e) => self.doom(id, e.to_string()),
        }
    }

    fn send_to_msc(&mut self, frame: &Frame) {
        let Msc::Up(link) = &mut self.msc else {
            self.counters.incr(NAT_DROP_MSC_DOWN);
            return;
        };
        let id = link.id();
        match link.send(frame) {
            Ok(()) => self.counters.incr(NAT_TO_MSC),
            Err(e) => self.doom(id, e.to_string()),
        }
    }

    fn write_to_bsc(&mut self, token: &str, frame: &Frame) -> ipa::Result<()> {
        let Some(id) = self
            .controllers
            .iter()
            .find(|(_, bsc)| bsc.token() == Some(token))
            .map(|(id, _)| *id)
        else {
            return Err(Error::NotFound(format!("BSC with token {token}")));
        };
        let Some(bsc) = self.controllers.get_mut(&id) else {
            return Err(Error::NotFound(format!("BSC with token {token}")));
        };
        bsc.link.send(frame).inspect_err(|e| self.doomed.push((id, e.to_string())))
    }

    fn status(&self) -> NatStatus {
        NatStatus {
            msc_connected: matches!(self.msc, Msc::Up(_)),
            controllers: self
                .controllers
                .iter()
                .map(|(id, bsc)| bsc.status(self.refs.owned_count(*id)))
                .collect(),
            live_references: self.refs.live_count(),
            counters: self.counters.snapshot(),
        }
    }

    fn from_bsc(&mut self, id: ConnId, mut frame: Frame) {
        self.counters.incr(NAT_FROM_BSC);
        if frame.protocol == u8::from(Protocol::Ipaccess) {
            self.bsc_ipaccess(id, &frame.payload);
            return;
        }

        let msc_up = matches!(self.msc, Msc::Up(_));
        let Some(bsc) = self.controllers.get_mut(&id) else {
            return;
        };
        let gate = if !bsc.is_authenticated() {
            Some(NAT_DROP_UNAUTHENTICATED)
        } else if !msc_up {
            Some(NAT_DROP_MSC_DOWN)
        } else {
            None
        };
        if let Some(counter) = gate {
            debug!(&bsc.logger, "Dropping {} frame", frame.protocol_name();
                "reason" => NAT_COUNTER_NAMES[counter]);
            bsc.stats.dropped += 1;
            self.counters.incr(counter);
            return;
        }

        if frame.protocol == u8::from(Protocol::Sccp) {
            if let Err(e) = self.translate_from_bsc(id, &mut frame.payload) {
                self.drop_from_bsc(id, e);
                return;
            }
        }
        if let Some(bsc) = self.controllers.get_mut(&id) {
            bsc.stats.forwarded += 1;
        }
        self.send_to_msc(&frame);
    }

    fn drop_from_bsc(&mut self, id: ConnId, e: Error) {
        let Some(bsc) = self.controllers.get_mut(&id) else {
            return;
        };
        bsc.stats.dropped += 1;
        if e.is_fatal_to_connection() {
            self.counters.incr(NAT_DROP_MALFORMED);
            self.doom(id, e.to_string());
        } else {
            warn!(&bsc.logger, "Dropping SCCP message - {}", e);
            self.counters.incr(NAT_DROP_UNKNOWN_REF);
        }
    }

    /// Renumber the controller's reference in place.
    fn translate_from_bsc(&mut self, id: ConnId, payload: &mut [u8]) -> ipa::Result<()> {
        let header = sccp::parse(payload).map_err(sccp_violation)?;
        let Some(t) = header.message_type else {
            return Ok(());
        };
        match t {
            MessageType::Cr => {
                let src = present(header.src_ref, "source")?;
                let nat_ref = self.refs.open(id, src)?;
                sccp::set_src_ref(payload, nat_ref).map_err(sccp_violation)?;
                self.counters.incr(NAT_SCCP_OPENED);
                if let Some(bsc) = self.controllers.get_mut(&id) {
                    bsc.stats.sccp_connections += 1;
                    debug!(&bsc.logger, "SCCP connection {} -> {}", src, nat_ref);
                }
            }
            MessageType::Cc | MessageType::Rlsd | MessageType::Rlc | MessageType::It => {
                let src = present(header.src_ref, "source")?;
                let mapping = *self.refs.lookup_controller(id, src)?;
                // The destination must be the MSC end of this same connection.
                if header.dst_ref != mapping.core_ref {
                    return Err(Error::NotFound(format!(
                        "MSC reference for controller reference {src}"
                    )));
                }
                sccp::set_src_ref(payload, mapping.nat_ref).map_err(sccp_violation)?;
                if t == MessageType::Rlc {
                    self.refs.close(mapping.nat_ref)?;
                }
            }
            MessageType::Cref | MessageType::Dt1 => {
                // Addressed to the MSC's reference, which must belong to this controller.
                let dst = present(header.dst_ref, "destination")?;
                self.refs.lookup_core(id, dst)?;
            }
            MessageType::Udt => {}
        }
        Ok(())
    }

    fn bsc_ipaccess(&mut self, id: ConnId, payload: &[u8]) {
        let Some(bsc) = self.controllers.get(&id) else {
            return;
        };
        let logger = bsc.logger.clone();
        let Some((&msg_type, body)) = payload.split_first() else {
            return;
        };
        match MsgType::try_from(msg_type) {
            Ok(MsgType::Ping) => self.send_to_bsc(id, &build::pong()),
            Ok(MsgType::Pong) => debug!(&logger, "PONG"),
            Ok(MsgType::IdResp) => self.authenticate(id, body),
            Ok(MsgType::IdAck) => debug!(&logger, "ID_ACK"),
            _ => debug!(&logger, "Ignoring IPA message type {:#04x}", msg_type),
        }
    }

    fn authenticate(&mut self, id: ConnId, entries: &[u8]) {
        let Some(bsc) = self.controllers.get_mut(&id) else {
            return;
        };
        if bsc.is_authenticated() {
            debug!(&bsc.logger, "Ignoring repeated identity response");
            return;
        }
        match check_identity(entries, self.bscs) {
            Ok((token, creds)) => {
                info!(&bsc.logger, "BSC authenticated with token {} for LAC {}", token, creds.lac);
                bsc.authenticate(token, creds);
                self.counters.incr(NAT_BSC_AUTHENTICATED);
                self.send_to_bsc(id, &build::id_ack());
            }
            Err(e) => {
                warn!(&bsc.logger, "BSC authentication failed - {}", e);
                self.counters.incr(NAT_AUTH_FAILED);
                self.doom(id, format!("authentication failed - {e}"));
            }
        }
    }

    fn from_msc(&mut self, mut frame: Frame) {
        self.counters.incr(NAT_FROM_MSC);
        if frame.protocol == u8::from(Protocol::Ipaccess) {
            self.msc_ipaccess(&frame.payload);
            return;
        }
        let result = if frame.protocol == u8::from(Protocol::Sccp) {
            self.translate_from_msc(&mut frame.payload)
        } else {
            Err(Dropped(
                NAT_DROP_FROM_MSC,
                format!("{} frame from MSC", frame.protocol_name()),
            ))
        };
        match result {
            Ok(owner) => {
                if let Some(bsc) = self.controllers.get_mut(&owner) {
                    bsc.stats.forwarded += 1;
                }
                self.send_to_bsc(owner, &frame);
            }
            Err(Dropped(counter, reason)) => {
                debug!(&self.logger, "Dropping message from MSC - {}", reason);
                self.counters.incr(counter);
            }
        }
    }

    /// Renumber the NAT reference back to the owning controller's, returning that controller.
    fn translate_from_msc(&mut self, payload: &mut [u8]) -> Result<ConnId, Dropped> {
        let malformed = |e: sccp::SccpError| Dropped(NAT_DROP_MALFORMED, e.to_string());
        let header = sccp::parse(payload).map_err(malformed)?;
        let t = match header.message_type {
            Some(MessageType::Udt) => return self.route_paging(payload),
            Some(MessageType::Cr) | None => {
                return Err(Dropped(
                    NAT_DROP_FROM_MSC,
                    format!("SCCP message type {:#04x}", header.raw_type),
                ));
            }
            Some(t) => t,
        };
        let Some(nat_ref) = header.dst_ref else {
            return Err(Dropped(NAT_DROP_MALFORMED, "no destination reference".into()));
        };
        let mapping = *self
            .refs
            .lookup_nat(nat_ref)
            .map_err(|e| Dropped(NAT_DROP_UNKNOWN_REF, e.to_string()))?;
        sccp::set_dst_ref(payload, mapping.controller_ref).map_err(malformed)?;
        match t {
            MessageType::Cc => {
                if let Some(core_ref) = header.src_ref {
                    let _ = self.refs.set_core_ref(nat_ref, core_ref);
                }
            }
            MessageType::Cref | MessageType::Rlc => {
                if let Err(e) = self.refs.close(nat_ref) {
                    debug!(&self.logger, "{}", e);
                }
            }
            _ => {}
        }
        Ok(mapping.owner)
    }

    fn route_paging(&self, payload: &[u8]) -> Result<ConnId, Dropped> {
        let data = sccp::udt_data(payload).map_err(|e| Dropped(NAT_DROP_MALFORMED, e.to_string()))?;
        if !bssmap::is_paging(data) {
            return Err(Dropped(NAT_DROP_FROM_MSC, "UDT is not a PAGING".into()));
        }
        let id = paging::route(data, &self.controllers).map_err(|e| {
            let counter = match e {
                PagingError::Malformed(_) => NAT_DROP_PAGING_MALFORMED,
                PagingError::BssWide => NAT_DROP_PAGING_BSS_WIDE,
                PagingError::Unsupported(_) => NAT_DROP_PAGING_UNSUPPORTED,
                PagingError::NoMatch(_) => NAT_DROP_PAGING_NO_MATCH,
            };
            Dropped(counter, e.to_string())
        })?;
        self.counters.incr(NAT_PAGING_ROUTED);
        Ok(id)
    }

    fn msc_ipaccess(&mut self, payload: &[u8]) {
        let Some(&msg_type) = payload.first() else {
            return;
        };
        match MsgType::try_from(msg_type) {
            Ok(MsgType::Ping) => self.send_to_msc(&build::pong()),
            Ok(MsgType::IdGet) => {
                let mut tags = IdentityTags::default();
                match tags.push(IdTag::UnitName, self.config.msc_token.as_bytes()) {
                    Ok(()) => self.send_to_msc(&build::id_resp(&tags)),
                    Err(e) => warn!(&self.logger, "Cannot answer MSC identity request - {e}"),
                }
            }
            Ok(t) => debug!(&self.logger, "{:?} from MSC", t),
            Err(_) => debug!(&self.logger, "Ignoring IPA message type {:#04x} from MSC", msg_type),
        }
    }
}

fn sccp_violation(e: sccp::SccpError) -> Error {
    Error::ProtocolViolation(format!("SCCP - {e}"))
}

fn present(r: Option<LocalRef>, field: &str) -> ipa::Result<LocalRef> {
    r.ok_or_else(|| Error::ProtocolViolation(format!("SCCP - missing {field} reference")))
}
