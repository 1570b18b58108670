use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::config::ServerSettings;
use crate::dispatch::{Dispatch, DispatchChain, FileLoad, StaticFetch};
use crate::http::assembler::Assembler;
use crate::http::parser::{BodyRejected, Flow, MessageEvents, Tokenizer, MAX_HEAD_SIZE};
use crate::http::request::{Method, Request};
use crate::http::response::{Response, ResponseRecord};

/// How long a half-closed connection may linger before it is destroyed.
pub const HALF_CLOSE_GRACE: Duration = Duration::from_secs(10);

/// Pipelined input held back while a static lookup is pending.
pub const MAX_BACKLOG: usize = 2 * MAX_HEAD_SIZE;

const UPGRADE_REJECTION: &[u8] = b"protocol upgrades are not supported";

/// Readiness of the underlying stream. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Open,
    /// Our side sent FIN; we may still read but never write again.
    HalfClosed,
    Closed,
}

/// The reactor-level stream a connection writes to.
///
/// Implementations are non-blocking: `write` queues what it cannot send
/// immediately and reports whether everything left synchronously.
pub trait Stream {
    fn ready_state(&self) -> ReadyState;

    /// Returns `true` when all bytes were flushed synchronously.
    fn write(&mut self, bytes: &[u8]) -> bool;

    /// Arms (or re-arms) the inactivity timeout.
    fn set_timeout(&mut self, timeout: Duration);

    /// Sends FIN once queued bytes are out; moves to [`ReadyState::HalfClosed`].
    fn half_close(&mut self);

    /// Tears the stream down; later writes are refused. Bytes already
    /// queued get a bounded, best-effort flush before the socket goes.
    fn destroy(&mut self);

    /// Asks for a half-close on the next drain notification.
    fn defer_half_close(&mut self);

    /// Consumes a pending [`Stream::defer_half_close`] request.
    fn take_deferred_half_close(&mut self) -> bool;
}

/// One accepted connection: its stream, tokenizer state and the single
/// request/response pair reused across every message it carries.
///
/// The connection is driven entirely from the outside by the `on_*` event
/// methods; it never blocks and never touches a socket directly.
pub struct Connection<S> {
    stream: S,
    tokenizer: Tokenizer,
    assembler: Assembler,
    response: ResponseRecord,
    chain: Arc<DispatchChain>,
    pending: Option<StaticFetch>,
    backlog: Vec<u8>,
    closed: bool,
}

impl<S: Stream> Connection<S> {
    /// Sets up a freshly accepted stream and arms the keep-alive timeout.
    pub fn new(mut stream: S, chain: Arc<DispatchChain>, settings: &ServerSettings) -> Self {
        stream.set_timeout(settings.keep_alive_timeout());
        debug!("connection established");

        Self {
            stream,
            tokenizer: Tokenizer::new(),
            assembler: Assembler::new(),
            response: ResponseRecord::new(),
            chain,
            pending: None,
            backlog: Vec::new(),
            closed: false,
        }
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn state(&self) -> ReadyState {
        if self.closed {
            ReadyState::Closed
        } else {
            self.stream.ready_state()
        }
    }

    pub fn request(&self) -> &Request {
        self.assembler.request()
    }

    pub fn response(&self) -> &ResponseRecord {
        &self.response
    }

    /// The static lookup a suspended dispatch is waiting on, if any.
    pub fn pending_fetch(&self) -> Option<&StaticFetch> {
        self.pending.as_ref()
    }

    /// Bytes received while a dispatch was suspended.
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    pub fn on_data(&mut self, data: &[u8]) {
        if self.state() == ReadyState::Closed {
            return;
        }
        debug!(bytes = data.len(), "received data");

        if self.pending.is_some() {
            if self.backlog.len() + data.len() > MAX_BACKLOG {
                warn!(
                    held = self.backlog.len(),
                    received = data.len(),
                    "too much pipelined input during a static lookup, destroying connection"
                );
                self.stream.destroy();
                return;
            }
            self.backlog.extend_from_slice(data);
            return;
        }
        self.feed(data);
    }

    fn feed(&mut self, data: &[u8]) {
        let execution = {
            let mut exchange = Exchange {
                assembler: &mut self.assembler,
                response: &mut self.response,
                stream: &mut self.stream,
                chain: &self.chain,
                pending: &mut self.pending,
            };
            self.tokenizer.execute(data, &mut exchange)
        };

        if execution.upgrade {
            warn!("upgrade requested, upgrades are not supported");
            self.stream.write(UPGRADE_REJECTION);
            self.stream.destroy();
        } else if execution.paused {
            self.backlog.extend_from_slice(&data[execution.consumed..]);
        } else if execution.error.is_some() || execution.consumed != data.len() {
            warn!(
                consumed = execution.consumed,
                received = data.len(),
                error = ?execution.error,
                "tokenizer did not consume all input, destroying connection"
            );
            self.stream.destroy();
        }
    }

    /// Delivers the result of the static lookup the dispatch suspended on
    /// and continues the chain, then any pipelined bytes held back meanwhile.
    pub fn complete_fetch(&mut self, load: FileLoad) {
        let Some(fetch) = self.pending.take() else {
            warn!("static file load completed with no dispatch waiting");
            return;
        };
        if self.state() == ReadyState::Closed {
            return;
        }

        let dispatch = {
            let mut response = Response::new(&mut self.response, &mut self.stream);
            self.chain
                .resume(&fetch, load, self.assembler.request(), &mut response)
        };
        if let Dispatch::Suspended(next) = dispatch {
            self.pending = Some(next);
            return;
        }

        let backlog = std::mem::take(&mut self.backlog);
        if !backlog.is_empty() {
            self.feed(&backlog);
        }
    }

    /// The peer sent FIN. We may still be writing, so nothing changes here.
    pub fn on_end(&mut self) {
        debug!("peer sent FIN");
    }

    pub fn on_timeout(&mut self) {
        match self.state() {
            ReadyState::Open => {
                debug!("connection timed out, sending FIN");
                self.stream.half_close();
                self.stream.set_timeout(HALF_CLOSE_GRACE);
            }
            ReadyState::HalfClosed | ReadyState::Closed => {
                warn!("connection timed out after it was ended, destroying");
                self.stream.destroy();
            }
        }
    }

    /// Everything queued has been written.
    pub fn on_drain(&mut self) {
        if self.stream.take_deferred_half_close() {
            debug!("all data sent, closing connection");
            self.stream.half_close();
        }
    }

    pub fn on_error(&mut self, err: &std::io::Error) {
        error!(error = %err, "stream error");
    }

    /// Releases every buffer the connection owns.
    pub fn on_close(&mut self, had_error: bool) {
        self.assembler.release();
        self.response.release();
        self.tokenizer = Tokenizer::new();
        self.pending = None;
        self.backlog = Vec::new();
        self.closed = true;

        if had_error {
            warn!("connection closed with an error (possibly from timeout)");
        } else {
            debug!("connection closed");
        }
    }
}

/// Routes tokenizer events into the assembler and, once a message is
/// complete, through the dispatch chain.
struct Exchange<'c> {
    assembler: &'c mut Assembler,
    response: &'c mut ResponseRecord,
    stream: &'c mut dyn Stream,
    chain: &'c DispatchChain,
    pending: &'c mut Option<StaticFetch>,
}

impl MessageEvents for Exchange<'_> {
    fn on_message_begin(&mut self) {
        self.assembler.message_begin();
        self.response.reset();
    }

    fn on_url(&mut self, fragment: &[u8]) {
        self.assembler.url(fragment);
    }

    fn on_header_field(&mut self, fragment: &[u8]) {
        self.assembler.header_field(fragment);
    }

    fn on_header_value(&mut self, fragment: &[u8]) {
        self.assembler.header_value(fragment);
    }

    fn on_headers_complete(&mut self, method: Method) {
        self.assembler.headers_complete(method);
    }

    fn on_body(&mut self, fragment: &[u8]) -> Result<(), BodyRejected> {
        self.assembler.body(fragment).map_err(|e| {
            warn!(error = %e, "could not grow request body");
            BodyRejected
        })
    }

    fn on_message_complete(&mut self) -> Flow {
        if self.stream.ready_state() != ReadyState::Open {
            debug!("message arrived after the connection ended, ignoring");
            return Flow::Continue;
        }
        let Some(request) = self.assembler.message_complete() else {
            return Flow::Continue;
        };

        let mut response = Response::new(&mut *self.response, &mut *self.stream);
        match self.chain.dispatch(request, &mut response) {
            Dispatch::Done => Flow::Continue,
            Dispatch::Suspended(fetch) => {
                *self.pending = Some(fetch);
                Flow::Pause
            }
        }
    }
}
