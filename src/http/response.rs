use tracing::{debug, warn};

use crate::http::connection::{ReadyState, Stream};
use crate::http::request::HeaderLine;
use crate::http::writer::serialize_head;

/// Numeric HTTP status code.
///
/// Any value may be sent; only a fixed set carries a reason phrase when the
/// handler does not supply its own message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(u16);

impl StatusCode {
    pub const CONTINUE: StatusCode = StatusCode(100);
    pub const OK: StatusCode = StatusCode(200);
    pub const CREATED: StatusCode = StatusCode(201);
    pub const NO_CONTENT: StatusCode = StatusCode(204);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const FORBIDDEN: StatusCode = StatusCode(403);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const SERVICE_UNAVAILABLE: StatusCode = StatusCode(503);

    pub const fn new(code: u16) -> Self {
        StatusCode(code)
    }

    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use ember::http::response::StatusCode;
    /// assert_eq!(StatusCode::OK.as_u16(), 200);
    /// assert_eq!(StatusCode::NOT_FOUND.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Returns the standard reason phrase, or `""` for codes outside the table.
    ///
    /// # Example
    ///
    /// ```
    /// # use ember::http::response::StatusCode;
    /// assert_eq!(StatusCode::OK.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::new(418).reason_phrase(), "");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self.0 {
            100 => "Continue",
            101 => "Switching Protocols",
            200 => "OK",
            201 => "Created",
            202 => "Accepted",
            203 => "Non-Authoritative Information",
            204 => "No Content",
            205 => "Reset Content",
            206 => "Partial Content",
            400 => "Bad Request",
            401 => "Unauthorized",
            402 => "Payment Required",
            403 => "Forbidden",
            404 => "Not Found",
            503 => "Service Unavailable",
            _ => "",
        }
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode(code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResponseError {
    #[error("connection has already ended")]
    ConnectionEnded,
    #[error("response status was never set")]
    StatusNotSet,
    #[error("connection closed while writing the response")]
    WriteFailed,
}

/// How [`Response::end`] finished the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    /// Everything flushed; the write side is already half-closed.
    HalfClosed,
    /// Bytes are still queued; the half-close happens on drain.
    OnDrain,
}

/// The per-message response state owned by a connection.
///
/// `status == None` means no handler has set one yet. After a send the
/// record is emptied so the next message on the connection starts clean.
#[derive(Debug, Clone, Default)]
pub struct ResponseRecord {
    pub(crate) status: Option<StatusCode>,
    pub(crate) status_message: Option<String>,
    pub(crate) header_lines: Vec<HeaderLine>,
    pub(crate) body: Vec<u8>,
    pub(crate) content_type: Option<String>,
}

impl ResponseRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reset(&mut self) {
        self.status = None;
        self.status_message = None;
        self.header_lines.clear();
        self.body.clear();
        self.content_type = None;
    }

    /// Frees every buffer; used when the owning connection closes.
    pub(crate) fn release(&mut self) {
        *self = ResponseRecord::default();
    }
}

/// A handler's view of the response: the record plus the stream it goes to.
///
/// Every mutator consults the stream's ready state first and refuses to
/// touch a response whose connection has been half-closed or closed.
pub struct Response<'a> {
    record: &'a mut ResponseRecord,
    stream: &'a mut dyn Stream,
}

impl<'a> Response<'a> {
    pub fn new(record: &'a mut ResponseRecord, stream: &'a mut dyn Stream) -> Self {
        Self { record, stream }
    }

    fn ensure_open(&self, action: &'static str) -> Result<(), ResponseError> {
        match self.stream.ready_state() {
            ReadyState::Open => Ok(()),
            state => {
                warn!(action, ?state, "connection has already ended");
                Err(ResponseError::ConnectionEnded)
            }
        }
    }

    fn ensure_not_closed(&self, action: &'static str) -> Result<(), ResponseError> {
        if self.stream.ready_state() == ReadyState::Closed {
            warn!(action, "connection has already closed");
            return Err(ResponseError::ConnectionEnded);
        }
        Ok(())
    }

    pub fn ready_state(&self) -> ReadyState {
        self.stream.ready_state()
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.record.status
    }

    pub fn status_message(&self) -> Option<&str> {
        self.record.status_message.as_deref()
    }

    /// Looks up a header by name (case-insensitive).
    pub fn header(&self, field: &str) -> Option<&[u8]> {
        self.record
            .header_lines
            .iter()
            .find(|line| line.field_matches(field))
            .map(|line| line.value.as_slice())
    }

    pub fn header_lines(&self) -> &[HeaderLine] {
        &self.record.header_lines
    }

    pub fn body(&self) -> &[u8] {
        &self.record.body
    }

    pub fn content_type(&self) -> Option<&str> {
        self.record.content_type.as_deref()
    }

    /// Sets the status. An empty or absent message means the reason phrase
    /// is looked up when the response is serialized.
    pub fn set_status(
        &mut self,
        code: impl Into<StatusCode>,
        message: Option<&str>,
    ) -> Result<(), ResponseError> {
        self.ensure_open("set status")?;
        self.record.status = Some(code.into());
        if let Some(message) = message.filter(|m| !m.is_empty()) {
            self.record.status_message = Some(message.to_string());
        }
        Ok(())
    }

    /// Adds a header, replacing the value of an existing line whose name
    /// matches case-insensitively. The replaced line takes the new spelling.
    pub fn add_header(&mut self, field: &str, value: &str) -> Result<(), ResponseError> {
        self.ensure_open("add header")?;
        match self
            .record
            .header_lines
            .iter_mut()
            .find(|line| line.field_matches(field))
        {
            Some(line) => *line = HeaderLine::new(field, value),
            None => self.record.header_lines.push(HeaderLine::new(field, value)),
        }
        Ok(())
    }

    pub fn clear_headers(&mut self) -> Result<(), ResponseError> {
        self.ensure_not_closed("clear headers")?;
        self.record.header_lines = Vec::new();
        Ok(())
    }

    /// Replaces the body; see [`Response::add_to_body`].
    pub fn set_body(&mut self, body: &[u8], content_type: Option<&str>) -> Result<(), ResponseError> {
        self.ensure_open("set body")?;
        self.clear_body()?;
        self.add_to_body(body, content_type)
    }

    /// Appends to the body. A non-empty `content_type` replaces the stored one.
    pub fn add_to_body(&mut self, body: &[u8], content_type: Option<&str>) -> Result<(), ResponseError> {
        self.ensure_open("add to body")?;
        if !body.is_empty() {
            debug!(bytes = body.len(), "appending to response body");
            self.record.body.extend_from_slice(body);
        }
        if let Some(content_type) = content_type.filter(|t| !t.is_empty()) {
            self.record.content_type = Some(content_type.to_string());
        }
        Ok(())
    }

    pub fn clear_body(&mut self) -> Result<(), ResponseError> {
        self.ensure_not_closed("clear body")?;
        self.record.body = Vec::new();
        self.record.content_type = None;
        Ok(())
    }

    /// Serializes and writes the response, then empties the record.
    ///
    /// Returns `Ok(true)` when every byte left synchronously and `Ok(false)`
    /// when some are still queued, in which case closing must wait for the
    /// stream to drain.
    pub fn send(&mut self) -> Result<bool, ResponseError> {
        self.ensure_open("send")?;
        let Some(status) = self.record.status else {
            warn!("response status not set, not sending anything");
            return Err(ResponseError::StatusNotSet);
        };

        let head = serialize_head(self.record, status);
        let mut flushed = self.stream.write(&head);
        if self.stream.ready_state() == ReadyState::Closed {
            warn!("connection closed while writing headers");
            return Err(ResponseError::WriteFailed);
        }

        if !self.record.body.is_empty() {
            flushed = self.stream.write(&self.record.body);
            if self.stream.ready_state() == ReadyState::Closed {
                warn!("connection closed while writing body");
                return Err(ResponseError::WriteFailed);
            }
        }

        debug!(
            status = status.as_u16(),
            body_len = self.record.body.len(),
            flushed,
            "response sent"
        );
        self.record.reset();

        Ok(flushed)
    }

    /// Sends with `Connection: close` and half-closes the connection, right
    /// away if the write flushed or once the stream drains otherwise.
    ///
    /// With no status set nothing is written; the connection is simply ended.
    pub fn end(&mut self) -> Result<Ending, ResponseError> {
        self.ensure_open("end")?;

        let finished = if self.record.status.is_none() {
            true
        } else {
            self.add_header("Connection", "close")?;
            self.send()?
        };

        if finished {
            debug!("closing connection");
            self.stream.half_close();
            Ok(Ending::HalfClosed)
        } else {
            debug!("did not send all data, will end connection on drain");
            self.stream.defer_half_close();
            Ok(Ending::OnDrain)
        }
    }
}
