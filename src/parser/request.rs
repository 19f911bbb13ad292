use crate::errors::ParseError;
use crate::http::request::HttpRequest;
use crate::http::types::{Method, Version};
use crate::limits::{MAX_METHOD_SIZE, MAX_MINOR_VERSION_SIZE, MAX_URI_SIZE};
use crate::parser::common::{is_ctl, BoundedBuf, ParseStatus};
use crate::parser::headers::HeadersParser;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum LineState {
    MethodStart,
    Method,
    Uri,
    VersionH,
    VersionT1,
    VersionT2,
    VersionP,
    VersionSlash,
    MajorStart,
    Major,
    MinorStart,
    Minor,
    ExpectNewline1,
    Parsed,
}

/// Streaming parser for a request line:
/// `METHOD SP URI SP HTTP/maj.min CRLF`.
#[derive(Debug)]
struct RequestLineParser {
    state: LineState,
    minor_digits: usize,
    method_raw: BoundedBuf<MAX_METHOD_SIZE>,
    uri: BoundedBuf<MAX_URI_SIZE>,
    method: Option<Method>,
    version: Version,
}

impl RequestLineParser {
    fn new() -> Self {
        RequestLineParser {
            state: LineState::MethodStart,
            minor_digits: 0,
            method_raw: BoundedBuf::new(),
            uri: BoundedBuf::new(),
            method: None,
            version: Version::default(),
        }
    }

    fn parse(&mut self, byte: u8) -> Result<ParseStatus, ParseError> {
        match self.state {
            LineState::MethodStart => {
                if !byte.is_ascii_alphabetic() || !self.method_raw.push(byte) {
                    return Err(ParseError::UnknownMethodType);
                }
                self.state = LineState::Method;
                Ok(ParseStatus::Partial)
            }
            LineState::Method => {
                if byte == b' ' {
                    self.method = Some(
                        Method::from_bytes(self.method_raw.as_slice())
                            .ok_or(ParseError::UnknownMethodType)?,
                    );
                    self.state = LineState::Uri;
                    return Ok(ParseStatus::Partial);
                }
                if !byte.is_ascii_alphabetic() || !self.method_raw.push(byte) {
                    return Err(ParseError::UnknownMethodType);
                }
                Ok(ParseStatus::Partial)
            }
            LineState::Uri => {
                if byte == b' ' {
                    self.state = LineState::VersionH;
                    return Ok(ParseStatus::Partial);
                }
                if byte > 127 || is_ctl(byte) {
                    return Err(ParseError::IncorrectUri);
                }
                if !self.uri.push(byte) {
                    return Err(ParseError::IncorrectUriSize);
                }
                Ok(ParseStatus::Partial)
            }
            LineState::VersionH => self.expect_version_byte(byte, b'h', LineState::VersionT1),
            LineState::VersionT1 => self.expect_version_byte(byte, b't', LineState::VersionT2),
            LineState::VersionT2 => self.expect_version_byte(byte, b't', LineState::VersionP),
            LineState::VersionP => self.expect_version_byte(byte, b'p', LineState::VersionSlash),
            LineState::VersionSlash => {
                if byte != b'/' {
                    return Err(ParseError::UnknownHttpVersion);
                }
                self.state = LineState::MajorStart;
                Ok(ParseStatus::Partial)
            }
            LineState::MajorStart => {
                if byte != b'0' && byte != b'1' {
                    return Err(ParseError::UnknownHttpVersion);
                }
                self.version.major = byte - b'0';
                self.state = LineState::Major;
                Ok(ParseStatus::Partial)
            }
            LineState::Major => {
                if byte != b'.' {
                    return Err(ParseError::UnknownHttpVersion);
                }
                self.state = LineState::MinorStart;
                Ok(ParseStatus::Partial)
            }
            LineState::MinorStart => {
                if !byte.is_ascii_digit() {
                    return Err(ParseError::UnknownHttpVersion);
                }
                self.minor_digits = 1;
                self.version.minor = (byte - b'0') as u16;
                self.state = LineState::Minor;
                Ok(ParseStatus::Partial)
            }
            LineState::Minor => {
                if byte == b'\r' {
                    self.state = LineState::ExpectNewline1;
                    return Ok(ParseStatus::Partial);
                }
                if !byte.is_ascii_digit() {
                    return Err(ParseError::UnknownHttpVersion);
                }
                self.version.minor = self.version.minor * 10 + (byte - b'0') as u16;
                self.minor_digits += 1;
                if self.minor_digits >= MAX_MINOR_VERSION_SIZE {
                    return Err(ParseError::UnknownHttpVersion);
                }
                Ok(ParseStatus::Partial)
            }
            LineState::ExpectNewline1 => {
                if byte != b'\n' {
                    return Err(ParseError::NewLine1Error);
                }
                self.state = LineState::Parsed;
                Ok(ParseStatus::Complete)
            }
            LineState::Parsed => Err(ParseError::AlreadyParsed),
        }
    }

    /// The `HTTP/` literal matches case-insensitively.
    fn expect_version_byte(
        &mut self,
        byte: u8,
        expected: u8,
        next: LineState,
    ) -> Result<ParseStatus, ParseError> {
        if byte.to_ascii_lowercase() != expected {
            return Err(ParseError::UnknownHttpVersion);
        }
        self.state = next;
        Ok(ParseStatus::Partial)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum MessageState {
    FirstLine,
    Headers,
    Body,
    Parsed,
}

/// Streaming parser for a full HTTP request.
///
/// Feed bytes with [`parse`](Self::parse) or [`parse_bytes`](Self::parse_bytes)
/// until a terminal result; the terminal result is latched, so further calls
/// repeat the error or report [`ParseError::AlreadyParsed`]. A body is only
/// consumed for `POST` requests announcing a `Content-Length`.
#[derive(Debug)]
pub struct RequestParser {
    state: MessageState,
    line: RequestLineParser,
    headers: HeadersParser,
    body_size: usize,
    body: Vec<u8>,
    failed: Option<ParseError>,
    popped: bool,
}

impl RequestParser {
    pub fn new() -> Self {
        RequestParser {
            state: MessageState::FirstLine,
            line: RequestLineParser::new(),
            headers: HeadersParser::new(),
            body_size: 0,
            body: Vec::new(),
            failed: None,
            popped: false,
        }
    }

    /// Discards all state, ready for the next message on a kept-alive
    /// connection.
    pub fn reset(&mut self) {
        *self = RequestParser::new();
    }

    /// Feeds one byte.
    pub fn parse(&mut self, byte: u8) -> Result<ParseStatus, ParseError> {
        if let Some(error) = self.failed {
            return Err(error);
        }
        let result = self.parse_inner(byte);
        if let Err(error) = result {
            self.failed = Some(error);
        }
        result
    }

    fn parse_inner(&mut self, byte: u8) -> Result<ParseStatus, ParseError> {
        match self.state {
            MessageState::FirstLine => {
                if self.line.parse(byte)? == ParseStatus::Complete {
                    self.state = MessageState::Headers;
                }
                Ok(ParseStatus::Partial)
            }
            MessageState::Headers => {
                if self.headers.parse(byte)? == ParseStatus::Partial {
                    return Ok(ParseStatus::Partial);
                }
                if self.line.method == Some(Method::Post) {
                    // A malformed Content-Length is treated as no body.
                    if let Some(length) = self.headers.content_length() {
                        self.body_size = length;
                    }
                }
                if self.body_size == 0 {
                    self.state = MessageState::Parsed;
                    return Ok(ParseStatus::Complete);
                }
                self.body.reserve(self.body_size);
                self.state = MessageState::Body;
                Ok(ParseStatus::Partial)
            }
            MessageState::Body => {
                self.body.push(byte);
                if self.body.len() != self.body_size {
                    return Ok(ParseStatus::Partial);
                }
                self.state = MessageState::Parsed;
                Ok(ParseStatus::Complete)
            }
            MessageState::Parsed => Err(ParseError::AlreadyParsed),
        }
    }

    /// Feeds a byte range, stopping at the first terminal result. Bytes after
    /// a completed message are left unconsumed by design; the caller resets
    /// the parser before the next message.
    pub fn parse_bytes(&mut self, bytes: &[u8]) -> Result<ParseStatus, ParseError> {
        for &byte in bytes {
            if self.parse(byte)? == ParseStatus::Complete {
                return Ok(ParseStatus::Complete);
            }
        }
        Ok(ParseStatus::Partial)
    }

    /// Yields the assembled request, at most once, after `Complete`.
    pub fn pop_request(&mut self) -> Option<HttpRequest> {
        if self.state != MessageState::Parsed || self.popped {
            return None;
        }
        self.popped = true;

        let method = self.line.method?;
        let uri = String::from_utf8(self.line.uri.as_slice().to_vec()).ok()?;
        Some(HttpRequest::new(
            method,
            uri,
            self.line.version,
            self.headers.pop_headers(),
            std::mem::take(&mut self.body),
        ))
    }
}

impl Default for RequestParser {
    fn default() -> Self {
        RequestParser::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::types::Version;

    fn parse_all(input: &[u8]) -> (RequestParser, Result<ParseStatus, ParseError>) {
        let mut parser = RequestParser::new();
        let result = parser.parse_bytes(input);
        (parser, result)
    }

    #[test]
    fn parses_get_without_body() {
        let (mut parser, result) = parse_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n");
        assert_eq!(result, Ok(ParseStatus::Complete));

        let request = parser.pop_request().unwrap();
        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.uri(), "/");
        assert_eq!(request.version(), Version { major: 1, minor: 1 });
        assert_eq!(request.headers().get("host"), Some("x"));
        assert!(request.body().is_empty());
    }

    #[test]
    fn parses_post_with_body() {
        let (mut parser, result) =
            parse_all(b"POST /a HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc");
        assert_eq!(result, Ok(ParseStatus::Complete));

        let request = parser.pop_request().unwrap();
        assert_eq!(request.method(), Method::Post);
        assert_eq!(request.uri(), "/a");
        assert_eq!(request.headers().get("Content-Length"), Some("3"));
        assert_eq!(request.body(), b"abc");
    }

    #[test]
    fn body_ignored_for_non_post() {
        // Content-Length on a GET does not switch the parser into the body
        // state; the message completes at the end of the header block.
        let (mut parser, result) = parse_all(b"GET / HTTP/1.1\r\nContent-Length: 3\r\n\r\n");
        assert_eq!(result, Ok(ParseStatus::Complete));
        assert!(parser.pop_request().unwrap().body().is_empty());
    }

    #[test]
    fn malformed_content_length_means_no_body() {
        let (mut parser, result) =
            parse_all(b"POST / HTTP/1.1\r\nContent-Length: nan\r\n\r\n");
        assert_eq!(result, Ok(ParseStatus::Complete));
        assert!(parser.pop_request().unwrap().body().is_empty());
    }

    #[test]
    fn rejects_malformed_request_lines() {
        #[rustfmt::skip]
        let cases: [(&[u8], ParseError); 9] = [
            (b" GET / HTTP/1.1\r\n",       ParseError::UnknownMethodType),
            (b"G3T / HTTP/1.1\r\n",        ParseError::UnknownMethodType),
            (b"FROB / HTTP/1.1\r\n",       ParseError::UnknownMethodType),
            (b"GET /\x01 HTTP/1.1\r\n",    ParseError::IncorrectUri),
            (b"GET / FTP/1.1\r\n",         ParseError::UnknownHttpVersion),
            (b"GET / HTTP/9.9\r\n",        ParseError::UnknownHttpVersion),
            (b"GET / HTTP/1.12345\r\n",    ParseError::UnknownHttpVersion),
            (b"GET / HTTP/1.1\rX",         ParseError::NewLine1Error),
            (b"GET / HTTP/1.1\n",          ParseError::UnknownHttpVersion),
        ];

        for (input, expected) in cases {
            let (_, result) = parse_all(input);
            assert_eq!(result, Err(expected), "input {input:?}");
        }
    }

    #[test]
    fn method_longer_than_cap_rejects() {
        let input = format!("{} / HTTP/1.1\r\n\r\n", "A".repeat(MAX_METHOD_SIZE + 1));
        let (_, result) = parse_all(input.as_bytes());
        assert_eq!(result, Err(ParseError::UnknownMethodType));
    }

    #[test]
    fn uri_longer_than_cap_rejects() {
        let input = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(MAX_URI_SIZE));
        let (_, result) = parse_all(input.as_bytes());
        assert_eq!(result, Err(ParseError::IncorrectUriSize));
    }

    #[test]
    fn version_literal_is_case_insensitive() {
        let (mut parser, result) = parse_all(b"GET / http/1.1\r\n\r\n");
        assert_eq!(result, Ok(ParseStatus::Complete));
        assert!(parser.pop_request().is_some());
    }

    #[test]
    fn streaming_is_chunking_independent() {
        let input = b"POST /echo HTTP/1.0\r\nContent-Length: 5\r\nHost: h\r\n\r\nhello";

        let (mut whole, whole_result) = parse_all(input);

        let mut byte_at_a_time = RequestParser::new();
        let mut last = Ok(ParseStatus::Partial);
        for &byte in input.iter() {
            last = byte_at_a_time.parse(byte);
            if last != Ok(ParseStatus::Partial) {
                break;
            }
        }

        assert_eq!(whole_result, Ok(ParseStatus::Complete));
        assert_eq!(last, Ok(ParseStatus::Complete));
        assert_eq!(whole.pop_request(), byte_at_a_time.pop_request());
    }

    #[test]
    fn terminal_results_latch() {
        let (mut parser, result) = parse_all(b"GET / HTTP/1.1\r\n\r\n");
        assert_eq!(result, Ok(ParseStatus::Complete));
        assert_eq!(parser.parse(b'G'), Err(ParseError::AlreadyParsed));
        assert_eq!(parser.parse(b'G'), Err(ParseError::AlreadyParsed));

        let (mut failed, result) = parse_all(b"FROB / HTTP/1.1\r\n");
        assert_eq!(result, Err(ParseError::UnknownMethodType));
        assert_eq!(failed.parse(b'x'), Err(ParseError::UnknownMethodType));
        assert!(failed.pop_request().is_none());
    }

    #[test]
    fn pop_request_yields_once() {
        let (mut parser, _) = parse_all(b"GET /once HTTP/1.1\r\n\r\n");
        assert!(parser.pop_request().is_some());
        assert!(parser.pop_request().is_none());
    }

    #[test]
    fn reset_accepts_a_new_message() {
        let (mut parser, _) = parse_all(b"GET / HTTP/1.1\r\n\r\n");
        assert!(parser.pop_request().is_some());

        parser.reset();
        assert_eq!(
            parser.parse_bytes(b"POST /b HTTP/1.1\r\nContent-Length: 2\r\n\r\nok"),
            Ok(ParseStatus::Complete)
        );
        assert_eq!(parser.pop_request().unwrap().body(), b"ok");
    }

    #[test]
    fn round_trips_packed_requests() {
        let mut headers = crate::http::types::HeaderMap::new();
        headers.insert("Host", "round.trip");
        headers.insert("X-Token", "abc123");
        let original = HttpRequest::new(
            Method::Post,
            "/path/file.txt",
            Version::default(),
            headers,
            b"payload".to_vec(),
        );

        let (mut parser, result) = parse_all(&original.pack_to_bytes());
        assert_eq!(result, Ok(ParseStatus::Complete));

        let reparsed = parser.pop_request().unwrap();
        assert_eq!(reparsed.method(), original.method());
        assert_eq!(reparsed.uri(), original.uri());
        assert_eq!(reparsed.version(), original.version());
        assert_eq!(reparsed.body(), original.body());
        for (name, value) in original.headers().iter() {
            assert_eq!(reparsed.headers().get(name), Some(value), "header {name}");
        }
    }
}
