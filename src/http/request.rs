use crate::http::url::{parse_url, UrlInfo};

/// HTTP request methods.
///
/// Represents the HTTP method/verb of a request. Routers match on exact
/// equality; static directories only answer GET and HEAD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// PATCH - Partial modification of a resource
    PATCH,
    /// CONNECT - Establish a tunnel (treated as an upgrade, never served)
    CONNECT,
    /// TRACE - Loop-back test
    TRACE,
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// # Arguments
    ///
    /// * `s` - String representation of the method (case-sensitive, typically uppercase)
    ///
    /// # Returns
    ///
    /// `Some(Method)` if the string matches a known method, `None` otherwise.
    ///
    /// # Example
    ///
    /// ```
    /// # use ember::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("get"), None);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "HEAD" => Some(Method::HEAD),
            "OPTIONS" => Some(Method::OPTIONS),
            "PATCH" => Some(Method::PATCH),
            "CONNECT" => Some(Method::CONNECT),
            "TRACE" => Some(Method::TRACE),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::CONNECT => "CONNECT",
            Method::TRACE => "TRACE",
        }
    }
}

/// One header line exactly as delivered on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderLine {
    pub field: Vec<u8>,
    pub value: Vec<u8>,
}

impl HeaderLine {
    pub fn new(field: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn field_matches(&self, name: &str) -> bool {
        self.field.eq_ignore_ascii_case(name.as_bytes())
    }
}

/// Represents an HTTP request assembled from tokenizer events.
///
/// Header lines are kept in arrival order and never merged: two `Accept`
/// lines stay two entries. The record is owned by one connection and
/// cleared in place at the start of every message on that connection.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub(crate) url: Vec<u8>,
    pub(crate) url_info: Option<UrlInfo>,
    pub(crate) method: Option<Method>,
    pub(crate) header_lines: Vec<HeaderLine>,
    pub(crate) body: Vec<u8>,
}

/// Builder for constructing Request objects outside of a connection.
pub struct RequestBuilder {
    method: Option<Method>,
    url: Option<Vec<u8>>,
    header_lines: Vec<HeaderLine>,
    body: Vec<u8>,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            url: None,
            header_lines: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn url(mut self, url: impl Into<Vec<u8>>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Appends a header line; repeated names produce repeated lines.
    pub fn header(mut self, field: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        self.header_lines.push(HeaderLine::new(field, value));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        let url = self.url.ok_or("url missing")?;
        let url_info = parse_url(&url).map_err(|_| "url invalid")?;
        Ok(Request {
            url,
            url_info: Some(url_info),
            method: Some(self.method.ok_or("method missing")?),
            header_lines: self.header_lines,
            body: self.body,
        })
    }
}

impl Request {
    /// Clears every buffer, keeping allocations for the next message.
    pub(crate) fn reset(&mut self) {
        self.url.clear();
        self.url_info = None;
        self.method = None;
        self.header_lines.clear();
        self.body.clear();
    }

    /// The raw request target as accumulated from the wire.
    pub fn url(&self) -> &[u8] {
        &self.url
    }

    pub fn url_info(&self) -> Option<&UrlInfo> {
        self.url_info.as_ref()
    }

    pub fn method(&self) -> Option<Method> {
        self.method
    }

    /// The path component of the target, if the target has one.
    pub fn path(&self) -> Option<&[u8]> {
        self.url_info
            .as_ref()
            .and_then(|info| UrlInfo::slice(&self.url, &info.path))
    }

    /// The path as text; `None` when absent or not valid UTF-8.
    pub fn path_str(&self) -> Option<&str> {
        self.path().and_then(|p| std::str::from_utf8(p).ok())
    }

    pub fn query(&self) -> Option<&[u8]> {
        self.url_info
            .as_ref()
            .and_then(|info| UrlInfo::slice(&self.url, &info.query))
    }

    pub fn header_lines(&self) -> &[HeaderLine] {
        &self.header_lines
    }

    /// Retrieves the first header value with this name (case-insensitive).
    ///
    /// # Returns
    ///
    /// `Some(&[u8])` with the header value if present, `None` otherwise.
    pub fn header(&self, name: &str) -> Option<&[u8]> {
        self.header_lines
            .iter()
            .find(|line| line.field_matches(name))
            .map(|line| line.value.as_slice())
    }

    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.header(name).and_then(|v| std::str::from_utf8(v).ok())
    }

    /// Every value carried under `name`, in wire order.
    pub fn headers_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a [u8]> + 'a {
        self.header_lines
            .iter()
            .filter(move |line| line.field_matches(name))
            .map(|line| line.value.as_slice())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}
