//! udp - datagram socket carrying one frame per datagram

use super::{ConnId, IoEvent};
use crate::protocol::HEADER_LEN;
use crate::{Frame, Result};
use anyhow::Context;
use async_channel::Sender;
use async_io::Async;
use async_std::task;
use socket2::{Domain, Protocol, Socket, Type};
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use stop_token::StopSource;
use stop_token::prelude::*;

pub fn bind_udp(addr: SocketAddr) -> anyhow::Result<Async<UdpSocket>> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket
        .bind(&addr.into())
        .context(format!("Failed to bind {addr}"))?;
    Ok(Async::new(UdpSocket::from(socket))?)
}

/// A UDP endpoint.  The most recent sender is remembered as the observer and receives
/// whatever the relay sends out of this socket.
pub struct UdpLink {
    id: ConnId,
    socket: Arc<Async<UdpSocket>>,
    local_addr: SocketAddr,
    observer: Option<SocketAddr>,
    _stop: StopSource,
}

impl UdpLink {
    pub fn spawn<E>(id: ConnId, socket: Async<UdpSocket>, events: Sender<E>) -> Result<Self>
    where
        E: From<IoEvent> + Send + 'static,
    {
        let local_addr = socket.get_ref().local_addr()?;
        let socket = Arc::new(socket);
        let stop = StopSource::new();
        let token = stop.token();
        let rx_socket = socket.clone();
        task::spawn(async move {
            let mut buf = vec![0u8; u16::MAX as usize + HEADER_LEN];
            loop {
                let event = match rx_socket.recv_from(&mut buf).timeout_at(token.clone()).await {
                    Err(_stopped) => return,
                    Ok(Ok((n, from))) => IoEvent::Datagram(id, buf[..n].to_vec(), from),
                    // A previous send_to hit a closed port.  Not fatal for the socket.
                    Ok(Err(e))
                        if matches!(
                            e.kind(),
                            ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset
                        ) =>
                    {
                        continue;
                    }
                    Ok(Err(e)) => IoEvent::Closed(id, Some(e)),
                };
                let closed = matches!(event, IoEvent::Closed(..));
                if events.send(event.into()).await.is_err() || closed {
                    return;
                }
            }
        });
        Ok(UdpLink {
            id,
            socket,
            local_addr,
            observer: None,
            _stop: stop,
        })
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn observer(&self) -> Option<SocketAddr> {
        self.observer
    }

    pub fn set_observer(&mut self, addr: SocketAddr) {
        self.observer = Some(addr);
    }

    /// Send a frame to the observer without blocking.  Returns false if there is no observer.
    pub fn send(&self, frame: &Frame) -> Result<bool> {
        let Some(observer) = self.observer else {
            return Ok(false);
        };
        self.socket.get_ref().send_to(&frame.encode()?, observer)?;
        Ok(true)
    }
}
