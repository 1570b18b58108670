//! Request-target offset parsing.
//!
//! The parser never copies: it records byte ranges into the raw target so
//! the offsets stay valid only against the exact buffer they were derived
//! from. Callers that accumulate a target in fragments must re-run
//! [`parse_url`] over the whole buffer after every append.

use std::ops::Range;

/// Byte ranges of the components found in a request target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlInfo {
    pub schema: Option<Range<usize>>,
    pub host: Option<Range<usize>>,
    pub port: Option<Range<usize>>,
    pub path: Option<Range<usize>>,
    pub query: Option<Range<usize>>,
    pub fragment: Option<Range<usize>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlError {
    #[error("empty request target")]
    Empty,
    #[error("invalid byte {byte:#04x} at offset {offset}")]
    InvalidByte { byte: u8, offset: usize },
    #[error("malformed authority")]
    MalformedAuthority,
    #[error("unsupported request target form")]
    Unsupported,
}

impl UrlInfo {
    /// Resolves `range` against `buf`, the buffer this info was parsed from.
    pub fn slice<'a>(buf: &'a [u8], range: &Option<Range<usize>>) -> Option<&'a [u8]> {
        range.as_ref().and_then(|r| buf.get(r.clone()))
    }
}

/// Parses origin-form (`/p?q#f`), absolute-form (`http://host:port/p?q`)
/// and asterisk-form (`*`) targets.
pub fn parse_url(buf: &[u8]) -> Result<UrlInfo, UrlError> {
    if buf.is_empty() {
        return Err(UrlError::Empty);
    }

    if let Some(offset) = buf.iter().position(|&b| b <= b' ' || b == 0x7f) {
        return Err(UrlError::InvalidByte { byte: buf[offset], offset });
    }

    let mut info = UrlInfo::default();

    if buf == b"*" {
        return Ok(info);
    }

    if buf[0] == b'/' {
        parse_tail(buf, 0, &mut info);
        return Ok(info);
    }

    let scheme_end = find(buf, b"://").ok_or(UrlError::Unsupported)?;
    if scheme_end == 0
        || !buf[0].is_ascii_alphabetic()
        || !buf[..scheme_end]
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'))
    {
        return Err(UrlError::Unsupported);
    }
    info.schema = Some(0..scheme_end);

    let authority_start = scheme_end + 3;
    let authority_end = buf[authority_start..]
        .iter()
        .position(|b| matches!(b, b'/' | b'?' | b'#'))
        .map(|p| authority_start + p)
        .unwrap_or(buf.len());

    parse_authority(buf, authority_start, authority_end, &mut info)?;
    parse_tail(buf, authority_end, &mut info);

    Ok(info)
}

fn parse_authority(
    buf: &[u8],
    start: usize,
    end: usize,
    info: &mut UrlInfo,
) -> Result<(), UrlError> {
    // userinfo is skipped, only host and port are recorded
    let host_start = buf[start..end]
        .iter()
        .rposition(|&b| b == b'@')
        .map(|p| start + p + 1)
        .unwrap_or(start);

    if host_start == end {
        return Err(UrlError::MalformedAuthority);
    }

    let host_end = if buf[host_start] == b'[' {
        let close = buf[host_start..end]
            .iter()
            .position(|&b| b == b']')
            .ok_or(UrlError::MalformedAuthority)?;
        host_start + close + 1
    } else {
        buf[host_start..end]
            .iter()
            .position(|&b| b == b':')
            .map(|p| host_start + p)
            .unwrap_or(end)
    };

    if host_end == host_start {
        return Err(UrlError::MalformedAuthority);
    }
    info.host = Some(host_start..host_end);

    if host_end < end {
        if buf[host_end] != b':' {
            return Err(UrlError::MalformedAuthority);
        }
        let port = host_end + 1..end;
        if port.is_empty() || !buf[port.clone()].iter().all(u8::is_ascii_digit) {
            return Err(UrlError::MalformedAuthority);
        }
        info.port = Some(port);
    }

    Ok(())
}

fn parse_tail(buf: &[u8], start: usize, info: &mut UrlInfo) {
    let fragment_at = buf[start..].iter().position(|&b| b == b'#').map(|p| start + p);
    let before_fragment = fragment_at.unwrap_or(buf.len());
    let query_at = buf[start..before_fragment]
        .iter()
        .position(|&b| b == b'?')
        .map(|p| start + p);
    let path_end = query_at.unwrap_or(before_fragment);

    if path_end > start {
        info.path = Some(start..path_end);
    }
    if let Some(q) = query_at {
        info.query = Some(q + 1..before_fragment);
    }
    if let Some(f) = fragment_at {
        info.fragment = Some(f + 1..buf.len());
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
