#![allow(dead_code)]

use std::time::Duration;

use ember::dispatch::DispatchChain;
use ember::http::connection::{ReadyState, Stream};
use ember::http::request::Request;
use ember::http::response::{Response, ResponseRecord};

/// In-memory stream recording everything a connection does to it.
#[derive(Debug)]
pub struct MockStream {
    pub written: Vec<u8>,
    pub state: ReadyState,
    pub timeouts: Vec<Duration>,
    pub half_closes: usize,
    pub destroyed: bool,
    pub deferred_half_close: bool,
    /// What `write` reports; `false` simulates a full socket buffer.
    pub flushes: bool,
}

impl MockStream {
    pub fn new() -> Self {
        Self {
            written: Vec::new(),
            state: ReadyState::Open,
            timeouts: Vec::new(),
            half_closes: 0,
            destroyed: false,
            deferred_half_close: false,
            flushes: true,
        }
    }

    pub fn written_str(&self) -> String {
        String::from_utf8_lossy(&self.written).into_owned()
    }
}

impl Stream for MockStream {
    fn ready_state(&self) -> ReadyState {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) -> bool {
        if self.state == ReadyState::Closed {
            return false;
        }
        self.written.extend_from_slice(bytes);
        self.flushes
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeouts.push(timeout);
    }

    fn half_close(&mut self) {
        self.half_closes += 1;
        if self.state == ReadyState::Open {
            self.state = ReadyState::HalfClosed;
        }
    }

    fn destroy(&mut self) {
        self.destroyed = true;
        self.state = ReadyState::Closed;
    }

    fn defer_half_close(&mut self) {
        self.deferred_half_close = true;
    }

    fn take_deferred_half_close(&mut self) -> bool {
        std::mem::take(&mut self.deferred_half_close)
    }
}

/// A response as read back off the wire.
#[derive(Debug)]
pub struct WireResponse {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl WireResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn header_count(&self, name: &str) -> usize {
        self.headers
            .iter()
            .filter(|(field, _)| field.eq_ignore_ascii_case(name))
            .count()
    }
}

/// Splits a byte stream holding one or more responses. Bodies are framed
/// by `Content-Length`, absent meaning empty.
pub fn parse_responses(mut bytes: &[u8]) -> Vec<WireResponse> {
    let mut responses = Vec::new();

    while !bytes.is_empty() {
        let head_end = bytes
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("response head terminator");
        let head = std::str::from_utf8(&bytes[..head_end]).expect("utf-8 head");
        let mut lines = head.split("\r\n");

        let status_line = lines.next().expect("status line");
        let mut parts = status_line.splitn(3, ' ');
        assert_eq!(parts.next(), Some("HTTP/1.1"));
        let status = parts.next().expect("status code").parse().expect("numeric status");
        let reason = parts.next().unwrap_or("").to_string();

        let headers: Vec<(String, String)> = lines
            .map(|line| {
                let (field, value) = line.split_once(": ").expect("header line");
                (field.to_string(), value.to_string())
            })
            .collect();

        let length = headers
            .iter()
            .find(|(field, _)| field == "Content-Length")
            .map(|(_, value)| value.parse::<usize>().expect("numeric length"))
            .unwrap_or(0);

        let body_start = head_end + 4;
        responses.push(WireResponse {
            status,
            reason,
            headers,
            body: bytes[body_start..body_start + length].to_vec(),
        });
        bytes = &bytes[body_start + length..];
    }

    responses
}

/// Runs `request` through `chain` against a mock stream, reading static
/// files on the calling thread.
pub fn dispatch(chain: &DispatchChain, request: &Request) -> (MockStream, ResponseRecord) {
    let mut stream = MockStream::new();
    let mut record = ResponseRecord::new();
    {
        let mut response = Response::new(&mut record, &mut stream);
        chain.dispatch_blocking(request, &mut response);
    }
    (stream, record)
}
