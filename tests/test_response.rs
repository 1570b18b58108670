mod common;

use common::{parse_responses, MockStream};
use ember::http::connection::{ReadyState, Stream};
use ember::http::response::{Ending, Response, ResponseError, ResponseRecord, StatusCode};

#[test]
fn test_status_code_as_u16() {
    assert_eq!(StatusCode::OK.as_u16(), 200);
    assert_eq!(StatusCode::CREATED.as_u16(), 201);
    assert_eq!(StatusCode::NOT_FOUND.as_u16(), 404);
    assert_eq!(StatusCode::SERVICE_UNAVAILABLE.as_u16(), 503);
    assert_eq!(StatusCode::from(299).as_u16(), 299);
}

#[test]
fn test_status_code_reason_phrase() {
    let named = [
        (100, "Continue"),
        (101, "Switching Protocols"),
        (200, "OK"),
        (201, "Created"),
        (202, "Accepted"),
        (203, "Non-Authoritative Information"),
        (204, "No Content"),
        (205, "Reset Content"),
        (206, "Partial Content"),
        (400, "Bad Request"),
        (401, "Unauthorized"),
        (402, "Payment Required"),
        (403, "Forbidden"),
        (404, "Not Found"),
        (503, "Service Unavailable"),
    ];
    for (code, phrase) in named {
        assert_eq!(StatusCode::new(code).reason_phrase(), phrase);
    }

    assert_eq!(StatusCode::new(500).reason_phrase(), "");
    assert_eq!(StatusCode::new(302).reason_phrase(), "");
}

#[test]
fn test_add_header_replaces_case_insensitively() {
    let mut stream = MockStream::new();
    let mut record = ResponseRecord::new();
    let mut res = Response::new(&mut record, &mut stream);

    res.add_header("X-Thing", "one").unwrap();
    res.add_header("x-thing", "two").unwrap();

    assert_eq!(res.header_lines().len(), 1);
    assert_eq!(res.header("X-THING"), Some(&b"two"[..]));
    assert_eq!(res.header_lines()[0].field, b"x-thing".to_vec());
}

#[test]
fn test_add_header_appends_distinct_fields_in_order() {
    let mut stream = MockStream::new();
    let mut record = ResponseRecord::new();
    let mut res = Response::new(&mut record, &mut stream);

    for i in 0..20 {
        res.add_header(&format!("X-{i}"), &i.to_string()).unwrap();
    }

    assert_eq!(res.header_lines().len(), 20);
    assert_eq!(res.header_lines()[7].field, b"X-7".to_vec());
}

#[test]
fn test_send_serializes_head_and_body() {
    let mut stream = MockStream::new();
    let mut record = ResponseRecord::new();
    {
        let mut res = Response::new(&mut record, &mut stream);
        res.set_status(200u16, None).unwrap();
        res.add_header("X-Custom", "value").unwrap();
        res.set_body(b"hello", Some("text/plain")).unwrap();
        assert!(res.send().unwrap());
    }

    assert_eq!(
        stream.written_str(),
        "HTTP/1.1 200 OK\r\nX-Custom: value\r\nContent-Length: 5\r\nContent-Type: text/plain\r\n\r\nhello"
    );
}

#[test]
fn test_send_without_body_omits_content_length() {
    let mut stream = MockStream::new();
    let mut record = ResponseRecord::new();
    {
        let mut res = Response::new(&mut record, &mut stream);
        res.set_status(204u16, None).unwrap();
        res.send().unwrap();
    }

    assert_eq!(stream.written_str(), "HTTP/1.1 204 No Content\r\n\r\n");
}

#[test]
fn test_custom_status_message_and_unnamed_code() {
    let mut stream = MockStream::new();
    let mut record = ResponseRecord::new();
    {
        let mut res = Response::new(&mut record, &mut stream);
        res.set_status(299u16, None).unwrap();
        res.send().unwrap();
        res.set_status(200u16, Some("Fine")).unwrap();
        res.send().unwrap();
    }

    assert_eq!(
        stream.written_str(),
        "HTTP/1.1 299 \r\n\r\nHTTP/1.1 200 Fine\r\n\r\n"
    );
}

#[test]
fn test_send_resets_the_response() {
    let mut stream = MockStream::new();
    let mut record = ResponseRecord::new();
    let mut res = Response::new(&mut record, &mut stream);

    res.set_status(201u16, None).unwrap();
    res.add_header("X-A", "1").unwrap();
    res.set_body(b"abc", Some("text/plain")).unwrap();
    res.send().unwrap();

    assert_eq!(res.status(), None);
    assert!(res.header_lines().is_empty());
    assert!(res.body().is_empty());
    assert_eq!(res.content_type(), None);
    assert_eq!(res.send(), Err(ResponseError::StatusNotSet));
}

#[test]
fn test_send_without_status_writes_nothing() {
    let mut stream = MockStream::new();
    let mut record = ResponseRecord::new();
    {
        let mut res = Response::new(&mut record, &mut stream);
        res.set_body(b"orphan", None).unwrap();
        assert_eq!(res.send(), Err(ResponseError::StatusNotSet));
    }

    assert!(stream.written.is_empty());
}

#[test]
fn test_add_to_body_appends_and_keeps_content_type() {
    let mut stream = MockStream::new();
    let mut record = ResponseRecord::new();
    let mut res = Response::new(&mut record, &mut stream);

    res.add_to_body(b"ab", Some("text/plain")).unwrap();
    res.add_to_body(b"cd", None).unwrap();
    res.add_to_body(b"", Some("")).unwrap();

    assert_eq!(res.body(), b"abcd");
    assert_eq!(res.content_type(), Some("text/plain"));

    res.set_body(b"x", None).unwrap();
    assert_eq!(res.body(), b"x");
    assert_eq!(res.content_type(), None);
}

#[test]
fn test_clear_headers_and_body() {
    let mut stream = MockStream::new();
    let mut record = ResponseRecord::new();
    let mut res = Response::new(&mut record, &mut stream);

    res.add_header("X-A", "1").unwrap();
    res.set_body(b"abc", Some("text/plain")).unwrap();
    res.clear_headers().unwrap();
    res.clear_body().unwrap();

    assert!(res.header_lines().is_empty());
    assert!(res.body().is_empty());
    assert_eq!(res.content_type(), None);
}

#[test]
fn test_end_adds_connection_close_and_half_closes() {
    let mut stream = MockStream::new();
    let mut record = ResponseRecord::new();
    {
        let mut res = Response::new(&mut record, &mut stream);
        res.set_status(200u16, None).unwrap();
        res.set_body(b"bye", None).unwrap();
        assert_eq!(res.end(), Ok(Ending::HalfClosed));
    }

    let responses = parse_responses(&stream.written);
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].header("Connection"), Some("close"));
    assert_eq!(responses[0].body, b"bye".to_vec());
    assert_eq!(stream.state, ReadyState::HalfClosed);
    assert_eq!(stream.half_closes, 1);
}

#[test]
fn test_end_defers_half_close_until_drain() {
    let mut stream = MockStream::new();
    stream.flushes = false;
    let mut record = ResponseRecord::new();
    {
        let mut res = Response::new(&mut record, &mut stream);
        res.set_status(200u16, None).unwrap();
        assert_eq!(res.end(), Ok(Ending::OnDrain));
    }

    assert_eq!(stream.state, ReadyState::Open);
    assert!(stream.deferred_half_close);
}

#[test]
fn test_end_without_status_only_closes() {
    let mut stream = MockStream::new();
    let mut record = ResponseRecord::new();
    {
        let mut res = Response::new(&mut record, &mut stream);
        assert_eq!(res.end(), Ok(Ending::HalfClosed));
    }

    assert!(stream.written.is_empty());
    assert_eq!(stream.state, ReadyState::HalfClosed);
}

#[test]
fn test_mutators_refuse_after_end() {
    let mut stream = MockStream::new();
    let mut record = ResponseRecord::new();
    let mut res = Response::new(&mut record, &mut stream);

    res.set_status(200u16, None).unwrap();
    res.end().unwrap();

    assert_eq!(res.set_status(200u16, None), Err(ResponseError::ConnectionEnded));
    assert_eq!(res.add_header("X", "1"), Err(ResponseError::ConnectionEnded));
    assert_eq!(res.set_body(b"x", None), Err(ResponseError::ConnectionEnded));
    assert_eq!(res.add_to_body(b"x", None), Err(ResponseError::ConnectionEnded));
    assert_eq!(res.send(), Err(ResponseError::ConnectionEnded));
    assert_eq!(res.end(), Err(ResponseError::ConnectionEnded));
    assert_eq!(res.status(), None);

    // clearing is still allowed while only half-closed
    assert_eq!(res.clear_body(), Ok(()));
    assert_eq!(res.clear_headers(), Ok(()));
}

#[test]
fn test_clear_refused_once_closed() {
    let mut stream = MockStream::new();
    stream.state = ReadyState::Closed;
    let mut record = ResponseRecord::new();
    let mut res = Response::new(&mut record, &mut stream);

    assert_eq!(res.clear_body(), Err(ResponseError::ConnectionEnded));
    assert_eq!(res.clear_headers(), Err(ResponseError::ConnectionEnded));
}

#[test]
fn test_write_failure_is_reported() {
    struct Breaking(MockStream);
    impl Stream for Breaking {
        fn ready_state(&self) -> ReadyState {
            self.0.state
        }
        fn write(&mut self, _bytes: &[u8]) -> bool {
            self.0.state = ReadyState::Closed;
            false
        }
        fn set_timeout(&mut self, timeout: std::time::Duration) {
            self.0.set_timeout(timeout)
        }
        fn half_close(&mut self) {
            self.0.half_close()
        }
        fn destroy(&mut self) {
            self.0.destroy()
        }
        fn defer_half_close(&mut self) {
            self.0.defer_half_close()
        }
        fn take_deferred_half_close(&mut self) -> bool {
            self.0.take_deferred_half_close()
        }
    }

    let mut stream = Breaking(MockStream::new());
    let mut record = ResponseRecord::new();
    let mut res = Response::new(&mut record, &mut stream);

    res.set_status(200u16, None).unwrap();
    assert_eq!(res.send(), Err(ResponseError::WriteFailed));
}
