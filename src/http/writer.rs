use crate::http::response::{ResponseRecord, StatusCode};

const HTTP_VERSION: &str = "HTTP/1.1";

/// Serializes the status line and header block of a response.
///
/// The buffer is sized from the record before anything is written, so the
/// header count never bounds what can be emitted.
pub fn serialize_head(record: &ResponseRecord, status: StatusCode) -> Vec<u8> {
    let reason = record
        .status_message
        .as_deref()
        .unwrap_or_else(|| status.reason_phrase());
    let content_type = record.content_type.as_deref();

    let capacity = HTTP_VERSION.len()
        + 8
        + reason.len()
        + record
            .header_lines
            .iter()
            .map(|line| line.field.len() + line.value.len() + 4)
            .sum::<usize>()
        + 40
        + content_type.map(|t| t.len() + 16).unwrap_or(0)
        + 2;
    let mut buf = Vec::with_capacity(capacity);

    // Status line
    let status_line = format!("{} {} {}\r\n", HTTP_VERSION, status.as_u16(), reason);
    buf.extend_from_slice(status_line.as_bytes());

    // Headers
    for line in &record.header_lines {
        buf.extend_from_slice(&line.field);
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(&line.value);
        buf.extend_from_slice(b"\r\n");
    }

    if !record.body.is_empty() {
        buf.extend_from_slice(format!("Content-Length: {}\r\n", record.body.len()).as_bytes());
    }
    if let Some(content_type) = content_type {
        buf.extend_from_slice(b"Content-Type: ");
        buf.extend_from_slice(content_type.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf
}
