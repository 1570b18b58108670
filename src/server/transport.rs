//! Tokio adapter for the connection state machine.
//!
//! [`TcpTransport`] implements [`Stream`] over a `TcpStream` with
//! non-blocking writes and an outbound queue. [`drive`] is the per-connection
//! reactor loop: it turns socket readiness, timer expiry and static file
//! completions into `Connection` events.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncWriteExt, Interest};
use tokio::net::TcpStream;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error};

use crate::config::ServerSettings;
use crate::dispatch::{DispatchChain, FileLoad};
use crate::http::connection::{Connection, ReadyState, Stream};

/// Default buffer size for reads
const BUFFER_SIZE: usize = 8192;

/// How long queued bytes may take to leave after a destroy.
const LINGER: Duration = Duration::from_secs(1);

type PendingLoad = Pin<Box<dyn Future<Output = FileLoad> + Send>>;

/// A `TcpStream` seen through the [`Stream`] collaborator interface.
pub struct TcpTransport {
    socket: TcpStream,
    peer: SocketAddr,
    outbound: BytesMut,
    state: ReadyState,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    shutdown_pending: bool,
    half_close_on_drain: bool,
}

impl TcpTransport {
    pub fn new(socket: TcpStream, peer: SocketAddr) -> Self {
        Self {
            socket,
            peer,
            outbound: BytesMut::with_capacity(BUFFER_SIZE),
            state: ReadyState::Open,
            timeout: None,
            deadline: None,
            shutdown_pending: false,
            half_close_on_drain: false,
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn has_outbound(&self) -> bool {
        !self.outbound.is_empty()
    }

    /// Writes as much of the queue as the socket takes without blocking.
    fn flush_now(&mut self) -> io::Result<()> {
        while !self.outbound.is_empty() {
            match self.socket.try_write(&self.outbound) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => self.outbound.advance(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Pushes the inactivity deadline out after inbound traffic.
    fn touch(&mut self) {
        if self.state == ReadyState::Open {
            if let Some(timeout) = self.timeout {
                self.deadline = Some(Instant::now() + timeout);
            }
        }
    }

    /// Gives bytes queued before a destroy (an upgrade rejection, say) a
    /// bounded chance to leave before the socket is dropped.
    async fn linger(&mut self) {
        if self.outbound.is_empty() {
            return;
        }
        let pending = self.outbound.split();
        match tokio::time::timeout(LINGER, self.socket.write_all(&pending)).await {
            Ok(Ok(())) => debug!(peer = %self.peer, bytes = pending.len(), "flushed before close"),
            Ok(Err(e)) => debug!(peer = %self.peer, error = %e, "flush before close failed"),
            Err(_) => debug!(peer = %self.peer, dropped = pending.len(), "gave up flushing before close"),
        }
    }

    async fn finish_shutdown(&mut self) {
        if self.shutdown_pending && self.outbound.is_empty() {
            self.shutdown_pending = false;
            if let Err(e) = self.socket.shutdown().await {
                debug!(peer = %self.peer, error = %e, "shutdown failed");
            }
        }
    }
}

impl Stream for TcpTransport {
    fn ready_state(&self) -> ReadyState {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) -> bool {
        if self.state == ReadyState::Closed {
            return false;
        }
        self.outbound.extend_from_slice(bytes);
        match self.flush_now() {
            Ok(()) => self.outbound.is_empty(),
            Err(e) => {
                error!(peer = %self.peer, error = %e, "write failed");
                self.outbound.clear();
                self.destroy();
                false
            }
        }
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
        self.deadline = Some(Instant::now() + timeout);
    }

    fn half_close(&mut self) {
        if self.state == ReadyState::Open {
            self.state = ReadyState::HalfClosed;
            self.shutdown_pending = true;
        }
    }

    /// Queued bytes are kept for [`TcpTransport::linger`]; nothing new is
    /// accepted once closed.
    fn destroy(&mut self) {
        self.state = ReadyState::Closed;
        self.shutdown_pending = false;
    }

    fn defer_half_close(&mut self) {
        self.half_close_on_drain = true;
    }

    fn take_deferred_half_close(&mut self) -> bool {
        std::mem::take(&mut self.half_close_on_drain)
    }
}

/// Runs one connection until it is closed.
pub async fn drive(
    socket: TcpStream,
    peer: SocketAddr,
    chain: Arc<DispatchChain>,
    settings: ServerSettings,
) -> anyhow::Result<()> {
    let mut conn = Connection::new(TcpTransport::new(socket, peer), chain, &settings);
    let mut buf = vec![0u8; BUFFER_SIZE];
    let mut peer_eof = false;
    let mut failure: Option<io::Error> = None;
    let mut load: Option<PendingLoad> = None;

    loop {
        conn.stream_mut().finish_shutdown().await;

        if conn.state() == ReadyState::Closed {
            break;
        }
        if peer_eof && conn.state() == ReadyState::HalfClosed && !conn.stream().has_outbound() {
            debug!(peer = %peer, "both sides finished");
            break;
        }

        if load.is_none() {
            if let Some(fetch) = conn.pending_fetch().cloned() {
                load = Some(Box::pin(async move { fetch.load().await }));
            }
        }

        // No reads while a static lookup is pending; the peer waits on TCP
        // flow control instead of growing the backlog.
        let mut interest: Option<Interest> = None;
        if !peer_eof && load.is_none() {
            interest = Some(Interest::READABLE);
        }
        if conn.stream().has_outbound() {
            interest = Some(match interest {
                Some(i) => i.add(Interest::WRITABLE),
                None => Interest::WRITABLE,
            });
        }
        let deadline = conn.stream().deadline;

        tokio::select! {
            ready = conn.stream().socket.ready(interest.unwrap_or(Interest::READABLE)), if interest.is_some() => {
                let ready = match ready {
                    Ok(ready) => ready,
                    Err(e) => {
                        conn.on_error(&e);
                        failure = Some(e);
                        break;
                    }
                };

                if ready.is_writable() && conn.stream().has_outbound() {
                    if let Err(e) = conn.stream_mut().flush_now() {
                        conn.on_error(&e);
                        failure = Some(e);
                        break;
                    }
                    if !conn.stream().has_outbound() {
                        conn.on_drain();
                    }
                }

                if (ready.is_readable() || ready.is_read_closed()) && !peer_eof {
                    match conn.stream().socket.try_read(&mut buf) {
                        Ok(0) => {
                            peer_eof = true;
                            conn.on_end();
                        }
                        Ok(n) => {
                            conn.stream_mut().touch();
                            conn.on_data(&buf[..n]);
                        }
                        Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                        Err(e) => {
                            conn.on_error(&e);
                            failure = Some(e);
                            break;
                        }
                    }
                }
            }

            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                conn.on_timeout();
            }

            loaded = poll_load(&mut load), if load.is_some() => {
                load = None;
                conn.complete_fetch(loaded);
            }
        }
    }

    if failure.is_none() {
        conn.stream_mut().linger().await;
    }
    conn.on_close(failure.is_some());

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

async fn poll_load(load: &mut Option<PendingLoad>) -> FileLoad {
    match load {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}
