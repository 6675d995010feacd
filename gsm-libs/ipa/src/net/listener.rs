//! listener - TCP listening socket that posts accepted streams to the relay loop, and the
//! outbound connect used toward an upstream peer

use anyhow::{Context, Result};
use async_channel::Sender;
use async_io::Async;
use async_std::{future, task};
use slog::{Logger, warn};
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::Duration;
use stop_token::StopSource;
use stop_token::prelude::*;

/// Bind a listening socket with SO_REUSEADDR so a restarted relay can rebind at once.
pub fn bind_tcp(addr: SocketAddr, backlog: i32) -> Result<Async<TcpListener>> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket
        .bind(&addr.into())
        .context(format!("Failed to bind {addr}"))?;
    socket.listen(backlog)?;
    Ok(Async::new(TcpListener::from(socket))?)
}

/// Connect to `addr`, failing with `TimedOut` if the handshake has not completed within
/// `limit`.
pub async fn connect_tcp(addr: SocketAddr, limit: Duration) -> io::Result<Async<TcpStream>> {
    future::timeout(limit, Async::<TcpStream>::connect(addr))
        .await
        .unwrap_or_else(|_| {
            Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("Connection to {addr} timed out"),
            ))
        })
}

pub struct Listener {
    local_addr: SocketAddr,
    _stop: StopSource,
}

impl Listener {
    /// Accept connections until dropped, wrapping each stream into an event with `wrap`.
    pub fn spawn<E, F>(
        listener: Async<TcpListener>,
        events: Sender<E>,
        wrap: F,
        logger: Logger,
    ) -> Result<Self>
    where
        E: Send + 'static,
        F: Fn(Async<TcpStream>, SocketAddr) -> E + Send + 'static,
    {
        let local_addr = listener.get_ref().local_addr()?;
        let stop = StopSource::new();
        let token = stop.token();
        task::spawn(async move {
            loop {
                match listener.accept().timeout_at(token.clone()).await {
                    Err(_stopped) => return,
                    Ok(Ok((stream, addr))) => {
                        if events.send(wrap(stream, addr)).await.is_err() {
                            return;
                        }
                    }
                    Ok(Err(e)) => {
                        // Typically fd exhaustion.  Back off rather than spin.
                        warn!(logger, "Accept on {local_addr} failed - {e}");
                        task::sleep(Duration::from_millis(100)).await;
                    }
                }
            }
        });
        Ok(Listener {
            local_addr,
            _stop: stop,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}
