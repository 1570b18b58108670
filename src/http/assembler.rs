//! Incremental request assembly.
//!
//! The tokenizer may split a URL, a header name or a header value across
//! any number of callbacks. The [`Assembler`] stitches those fragments back
//! together into a [`Request`], tracking which buffer the next fragment
//! extends with an explicit [`HeaderCursor`].

use std::collections::TryReserveError;

use tracing::{debug, warn};

use crate::http::request::{HeaderLine, Method, Request};
use crate::http::url::parse_url;

/// Which header buffer the most recent fragment went into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderCursor {
    /// No header byte seen yet in this message.
    #[default]
    AwaitingField,
    /// Accumulating the name of the newest header line.
    InField,
    /// Accumulating the value of the newest header line.
    InValue,
}

/// Builds one [`Request`] at a time from ordered tokenizer events.
#[derive(Debug, Default)]
pub struct Assembler {
    request: Request,
    cursor: HeaderCursor,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn cursor(&self) -> HeaderCursor {
        self.cursor
    }

    /// Drops whatever the previous message left behind and starts empty.
    pub fn message_begin(&mut self) {
        self.request.reset();
        self.cursor = HeaderCursor::AwaitingField;
        debug!("message begun");
    }

    /// Appends a URL fragment and re-derives offsets over the whole target.
    pub fn url(&mut self, fragment: &[u8]) {
        self.request.url.extend_from_slice(fragment);
        self.request.url_info = match parse_url(&self.request.url) {
            Ok(info) => Some(info),
            Err(e) => {
                debug!(error = %e, "request target not parseable (yet)");
                None
            }
        };
    }

    pub fn header_field(&mut self, fragment: &[u8]) {
        match (self.cursor, self.request.header_lines.last_mut()) {
            (HeaderCursor::InField, Some(line)) => {
                debug!(
                    previous_len = line.field.len(),
                    added = fragment.len(),
                    "continuing header field"
                );
                line.field.extend_from_slice(fragment);
            }
            _ => {
                self.request
                    .header_lines
                    .push(HeaderLine::new(fragment, Vec::<u8>::new()));
            }
        }
        self.cursor = HeaderCursor::InField;
    }

    pub fn header_value(&mut self, fragment: &[u8]) {
        match (self.cursor, self.request.header_lines.last_mut()) {
            (HeaderCursor::InField | HeaderCursor::InValue, Some(line)) => {
                line.value.extend_from_slice(fragment);
            }
            _ => {
                warn!("header value arrived before any header field");
                self.request
                    .header_lines
                    .push(HeaderLine::new(Vec::<u8>::new(), fragment));
            }
        }
        self.cursor = HeaderCursor::InValue;
    }

    /// The only point at which the method is recorded.
    pub fn headers_complete(&mut self, method: Method) {
        self.request.method = Some(method);
        debug!(
            method = method.as_str(),
            headers = self.request.header_lines.len(),
            "headers complete"
        );
    }

    /// Appends a body fragment. Growth that cannot be allocated is
    /// reported instead of aborting.
    pub fn body(&mut self, fragment: &[u8]) -> Result<(), TryReserveError> {
        self.request.body.try_reserve(fragment.len())?;
        self.request.body.extend_from_slice(fragment);
        Ok(())
    }

    /// Returns the finished request, or `None` when the target carried no
    /// path; such a message is a protocol error and is dropped unanswered.
    pub fn message_complete(&mut self) -> Option<&Request> {
        if self.request.path().is_none() {
            warn!(
                url = %String::from_utf8_lossy(&self.request.url),
                "no path in request target, dropping request"
            );
            return None;
        }
        debug!(body_len = self.request.body.len(), "message complete");
        Some(&self.request)
    }

    /// Frees every buffer; used when the owning connection closes.
    pub fn release(&mut self) {
        self.request = Request::default();
        self.cursor = HeaderCursor::AwaitingField;
    }
}
