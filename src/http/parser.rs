//! Incremental HTTP/1.1 request tokenizer.
//!
//! Bytes are fed in whatever pieces the socket hands over. Head bytes are
//! buffered until `httparse` reports a complete head, then the ordered
//! events of [`MessageEvents`] are emitted. Bodies are framed by
//! `Content-Length` only; chunked transfer-encoding is refused.

use crate::http::request::Method;

/// Largest request head accepted before the message is declared malformed.
pub const MAX_HEAD_SIZE: usize = 80 * 1024;

/// Header slots tried first; doubled while `httparse` runs out of them.
const INITIAL_HEADER_SLOTS: usize = 64;

/// A header line takes at least three bytes, so a head within
/// [`MAX_HEAD_SIZE`] never needs more slots than this.
const MAX_HEADER_SLOTS: usize = MAX_HEAD_SIZE / 3;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid request head")]
    InvalidRequest,
    #[error("unknown request method")]
    InvalidMethod,
    #[error("request head too large")]
    HeaderTooLarge,
    #[error("too many header lines")]
    TooManyHeaders,
    #[error("invalid Content-Length")]
    InvalidContentLength,
    #[error("transfer-encoding is not supported")]
    UnsupportedTransferEncoding,
    #[error("body fragment could not be stored")]
    BodyRejected,
    #[error("tokenizer already failed on this connection")]
    Failed,
}

/// What the consumer wants after a message completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Stop right after this message; the caller re-feeds the rest later.
    Pause,
}

/// Returned by [`MessageEvents::on_body`] when a fragment cannot be kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyRejected;

/// Receiver of tokenizer events, in the order they are declared here.
pub trait MessageEvents {
    fn on_message_begin(&mut self);
    fn on_url(&mut self, fragment: &[u8]);
    fn on_header_field(&mut self, fragment: &[u8]);
    fn on_header_value(&mut self, fragment: &[u8]);
    fn on_headers_complete(&mut self, method: Method);
    fn on_body(&mut self, fragment: &[u8]) -> Result<(), BodyRejected>;
    fn on_message_complete(&mut self) -> Flow;
}

/// Outcome of one [`Tokenizer::execute`] call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Execution {
    /// Bytes of the input that were accepted.
    pub consumed: usize,
    /// The head asked for a protocol upgrade; nothing after it was consumed.
    pub upgrade: bool,
    /// A consumer asked to pause at a message boundary.
    pub paused: bool,
    pub error: Option<ParseError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Head,
    Body { remaining: usize },
    Upgraded,
    Failed,
}

struct Head {
    len: usize,
    content_length: usize,
    upgrade: bool,
}

/// Per-connection tokenizer state.
#[derive(Debug)]
pub struct Tokenizer {
    state: State,
    head: Vec<u8>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            state: State::Head,
            head: Vec::new(),
        }
    }

    pub fn is_upgraded(&self) -> bool {
        self.state == State::Upgraded
    }

    /// Feeds `data`, emitting events for everything that can be decoded.
    pub fn execute<E: MessageEvents>(&mut self, data: &[u8], events: &mut E) -> Execution {
        let mut offset = 0;

        loop {
            match self.state {
                State::Failed => {
                    return Execution {
                        consumed: offset,
                        error: Some(ParseError::Failed),
                        ..Execution::default()
                    };
                }
                State::Upgraded => {
                    return Execution {
                        consumed: offset,
                        upgrade: true,
                        ..Execution::default()
                    };
                }
                _ if offset == data.len() => {
                    return Execution {
                        consumed: offset,
                        ..Execution::default()
                    };
                }
                State::Head => {
                    let buffered = self.head.len();
                    let take = (data.len() - offset).min(MAX_HEAD_SIZE.saturating_sub(buffered));
                    self.head.extend_from_slice(&data[offset..offset + take]);

                    let head = match parse_head(&self.head, events) {
                        Ok(Some(head)) => head,
                        Ok(None) if self.head.len() >= MAX_HEAD_SIZE => {
                            return self.fail(offset, ParseError::HeaderTooLarge);
                        }
                        Ok(None) => {
                            offset += take;
                            continue;
                        }
                        Err(e) => return self.fail(offset, e),
                    };

                    offset += head.len - buffered;
                    self.head.clear();

                    if head.upgrade {
                        self.state = State::Upgraded;
                        continue;
                    }

                    self.state = State::Body {
                        remaining: head.content_length,
                    };
                    if head.content_length == 0 && self.complete(events) == Flow::Pause {
                        return Execution {
                            consumed: offset,
                            paused: true,
                            ..Execution::default()
                        };
                    }
                }
                State::Body { remaining } => {
                    let take = remaining.min(data.len() - offset);
                    if events.on_body(&data[offset..offset + take]).is_err() {
                        return self.fail(offset, ParseError::BodyRejected);
                    }
                    offset += take;
                    self.state = State::Body {
                        remaining: remaining - take,
                    };

                    if remaining == take && self.complete(events) == Flow::Pause {
                        return Execution {
                            consumed: offset,
                            paused: true,
                            ..Execution::default()
                        };
                    }
                }
            }
        }
    }

    fn complete<E: MessageEvents>(&mut self, events: &mut E) -> Flow {
        self.state = State::Head;
        events.on_message_complete()
    }

    fn fail(&mut self, consumed: usize, error: ParseError) -> Execution {
        self.state = State::Failed;
        self.head = Vec::new();
        Execution {
            consumed,
            error: Some(error),
            ..Execution::default()
        }
    }
}

/// Parses a buffered head; events are only emitted once it is complete.
fn parse_head<E: MessageEvents>(buf: &[u8], events: &mut E) -> Result<Option<Head>, ParseError> {
    let mut slots = INITIAL_HEADER_SLOTS;

    loop {
        let mut headers = vec![httparse::EMPTY_HEADER; slots];
        let mut req = httparse::Request::new(&mut headers);

        match req.parse(buf) {
            Ok(httparse::Status::Complete(len)) => return emit_head(&req, len, events).map(Some),
            Ok(httparse::Status::Partial) => return Ok(None),
            Err(httparse::Error::TooManyHeaders) if slots < MAX_HEADER_SLOTS => {
                slots = (slots * 2).min(MAX_HEADER_SLOTS);
            }
            Err(httparse::Error::TooManyHeaders) => return Err(ParseError::TooManyHeaders),
            Err(_) => return Err(ParseError::InvalidRequest),
        }
    }
}

fn emit_head<E: MessageEvents>(
    req: &httparse::Request<'_, '_>,
    len: usize,
    events: &mut E,
) -> Result<Head, ParseError> {
    let method = req
        .method
        .and_then(Method::from_str)
        .ok_or(ParseError::InvalidMethod)?;
    let path = req.path.ok_or(ParseError::InvalidRequest)?;

    let mut content_length: Option<usize> = None;
    let mut upgrade_header = false;
    let mut connection_upgrade = false;

    for header in req.headers.iter() {
        if header.name.eq_ignore_ascii_case("Content-Length") {
            let parsed = std::str::from_utf8(header.value)
                .ok()
                .and_then(|v| v.trim().parse::<usize>().ok())
                .ok_or(ParseError::InvalidContentLength)?;
            if content_length.is_some_and(|existing| existing != parsed) {
                return Err(ParseError::InvalidContentLength);
            }
            content_length = Some(parsed);
        } else if header.name.eq_ignore_ascii_case("Transfer-Encoding") {
            if !header.value.eq_ignore_ascii_case(b"identity") {
                return Err(ParseError::UnsupportedTransferEncoding);
            }
        } else if header.name.eq_ignore_ascii_case("Upgrade") {
            upgrade_header = true;
        } else if header.name.eq_ignore_ascii_case("Connection") {
            connection_upgrade |= header
                .value
                .split(|&b| b == b',')
                .any(|token| token.trim_ascii().eq_ignore_ascii_case(b"upgrade"));
        }
    }

    events.on_message_begin();
    events.on_url(path.as_bytes());
    for header in req.headers.iter() {
        events.on_header_field(header.name.as_bytes());
        events.on_header_value(header.value);
    }
    events.on_headers_complete(method);

    Ok(Head {
        len,
        content_length: content_length.unwrap_or(0),
        upgrade: method == Method::CONNECT || (upgrade_header && connection_upgrade),
    })
}
