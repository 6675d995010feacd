//! link - a framed TCP connection owned by the relay loop

use super::{ConnId, IoEvent, LinkLimits, READ_CHUNK};
use crate::connection::{Connection, WriteStatus};
use crate::frame::Frames;
use crate::{Frame, Result};
use async_channel::Sender;
use async_io::Async;
use async_std::task;
use futures_lite::AsyncReadExt;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Instant;
use stop_token::prelude::*;
use stop_token::{StopSource, StopToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keepalive {
    Alive,
    SendPing,
    Dead,
}

/// Tracks receive silence on a link.  A PING goes out after `ping_interval` of silence; the
/// link is dead if nothing at all arrives within `pong_timeout` of that PING.
#[derive(Debug, Clone, Copy)]
pub struct KeepaliveTimer {
    last_rx: Instant,
    ping_sent: Option<Instant>,
}

impl KeepaliveTimer {
    pub fn new(now: Instant) -> Self {
        KeepaliveTimer {
            last_rx: now,
            ping_sent: None,
        }
    }

    /// Any traffic counts as proof of life.
    pub fn on_activity(&mut self, now: Instant) {
        self.last_rx = now;
        self.ping_sent = None;
    }

    pub fn poll(&mut self, now: Instant, limits: &LinkLimits) -> Keepalive {
        match self.ping_sent {
            Some(sent) if now.duration_since(sent) >= limits.pong_timeout => Keepalive::Dead,
            Some(_) => Keepalive::Alive,
            None if now.duration_since(self.last_rx) >= limits.ping_interval => {
                self.ping_sent = Some(now);
                Keepalive::SendPing
            }
            None => Keepalive::Alive,
        }
    }
}

pub struct TcpLink<E> {
    id: ConnId,
    peer: SocketAddr,
    stream: Arc<Async<TcpStream>>,
    conn: Connection,
    events: Sender<E>,
    // Dropping this stops the reader task and any writable waiter.
    stop: StopSource,
    write_pending: bool,
    keepalive: KeepaliveTimer,
}

impl<E: From<IoEvent> + Send + 'static> TcpLink<E> {
    pub fn spawn(
        id: ConnId,
        stream: Async<TcpStream>,
        peer: SocketAddr,
        limits: &LinkLimits,
        events: Sender<E>,
    ) -> Self {
        let stream = Arc::new(stream);
        let stop = StopSource::new();
        task::spawn(read_loop(
            id,
            stream.clone(),
            events.clone(),
            stop.token(),
        ));
        TcpLink {
            id,
            peer,
            stream,
            conn: Connection::new(limits.max_payload, limits.max_queue_depth),
            events,
            stop,
            write_pending: false,
            keepalive: KeepaliveTimer::new(Instant::now()),
        }
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Feed bytes from the reader task.
    pub fn on_received<'a>(&'a mut self, data: &'a [u8]) -> Frames<'a> {
        self.keepalive.on_activity(Instant::now());
        self.conn.on_readable(data)
    }

    /// Queue a frame and push as much as possible to the socket right away.
    pub fn send(&mut self, frame: &Frame) -> Result<()> {
        self.conn.enqueue(frame)?;
        self.flush()
    }

    pub fn on_writable(&mut self) -> Result<()> {
        self.write_pending = false;
        self.flush()
    }

    fn flush(&mut self) -> Result<()> {
        if self.write_pending {
            return Ok(());
        }
        if self.conn.on_writable(&mut self.stream.get_ref())? == WriteStatus::Blocked {
            self.write_pending = true;
            self.await_writable();
        }
        Ok(())
    }

    fn await_writable(&self) {
        let stream = self.stream.clone();
        let events = self.events.clone();
        let id = self.id;
        let stop = self.stop.token();
        task::spawn(async move {
            if let Ok(Ok(())) = stream.writable().timeout_at(stop).await {
                let _ = events.send(IoEvent::Writable(id).into()).await;
            }
        });
    }

    /// Called from the relay's periodic tick.
    pub fn keepalive(&mut self, now: Instant, limits: &LinkLimits) -> Keepalive {
        self.keepalive.poll(now, limits)
    }

    pub fn queue_len(&self) -> usize {
        self.conn.queue_len()
    }

    /// Shut the socket and release everything still queued.  Returns the number of frames
    /// released.
    pub fn close(mut self) -> usize {
        let released = self.conn.clear();
        let _ = self.stream.get_ref().shutdown(Shutdown::Both);
        released
    }
}

async fn read_loop<E: From<IoEvent>>(
    id: ConnId,
    stream: Arc<Async<TcpStream>>,
    events: Sender<E>,
    stop: StopToken,
) {
    let mut buf = vec![0u8; READ_CHUNK];
    let mut reader = &*stream;
    loop {
        let event = match reader.read(&mut buf).timeout_at(stop.clone()).await {
            Err(_stopped) => return,
            Ok(Ok(0)) => IoEvent::Closed(id, None),
            Ok(Ok(n)) => IoEvent::Received(id, buf[..n].to_vec()),
            Ok(Err(e)) => IoEvent::Closed(id, Some(e)),
        };
        let closed = matches!(event, IoEvent::Closed(..));
        if events.send(event.into()).await.is_err() || closed {
            return;
        }
    }
}
