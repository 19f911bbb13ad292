use crate::errors::ParseError;
use crate::http::types::HeaderMap;
use crate::limits::{MAX_BODY_SIZE, MAX_HEADERS_BLOCK_SIZE};
use crate::parser::common::{is_ctl, is_special, ParseStatus};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    LineStart,
    Lws,
    Name,
    Value,
    ExpectNewline2,
    ExpectNewline3,
    Parsed,
}

/// Streaming parser for a header block, shared by the request and response
/// parsers.
///
/// Header names are stored lowercased; duplicate names keep the first value.
/// The total bytes consumed, terminator included, are counted against the
/// 8192-byte section cap.
#[derive(Debug)]
pub(crate) struct HeadersParser {
    state: State,
    name: Vec<u8>,
    value: Vec<u8>,
    consumed: usize,
    headers: HeaderMap,
}

impl HeadersParser {
    pub(crate) fn new() -> Self {
        HeadersParser {
            state: State::LineStart,
            name: Vec::new(),
            value: Vec::new(),
            consumed: 0,
            headers: HeaderMap::new(),
        }
    }

    pub(crate) fn parse(&mut self, byte: u8) -> Result<ParseStatus, ParseError> {
        self.consumed += 1;
        if self.consumed > MAX_HEADERS_BLOCK_SIZE {
            return Err(ParseError::HttpHeadersSectionSizeIsBig);
        }

        match self.state {
            State::LineStart => {
                if byte == b'\r' {
                    self.state = State::ExpectNewline3;
                    return Ok(ParseStatus::Partial);
                }
                if !self.name.is_empty() && (byte == b' ' || byte == b'\t') {
                    self.state = State::Lws;
                    return Ok(ParseStatus::Partial);
                }
                if byte > 127 || is_ctl(byte) || is_special(byte) {
                    return Err(ParseError::HttpHeaderKeyError);
                }
                self.name.push(byte.to_ascii_lowercase());
                self.state = State::Name;
                Ok(ParseStatus::Partial)
            }
            State::Lws => {
                if byte == b'\r' {
                    self.state = State::ExpectNewline2;
                    return Ok(ParseStatus::Partial);
                }
                if byte == b' ' || byte == b'\t' {
                    return Ok(ParseStatus::Partial);
                }
                if is_ctl(byte) {
                    return Err(ParseError::HttpHeaderValueError);
                }
                self.value.push(byte);
                self.state = State::Value;
                Ok(ParseStatus::Partial)
            }
            State::Name => {
                if byte == b':' {
                    self.state = State::Lws;
                    return Ok(ParseStatus::Partial);
                }
                if byte > 127 || is_ctl(byte) || is_special(byte) {
                    return Err(ParseError::HttpHeaderKeyError);
                }
                self.name.push(byte.to_ascii_lowercase());
                Ok(ParseStatus::Partial)
            }
            State::Value => {
                if byte == b'\r' {
                    self.state = State::ExpectNewline2;
                    return Ok(ParseStatus::Partial);
                }
                if is_ctl(byte) {
                    return Err(ParseError::HttpHeaderValueError);
                }
                self.value.push(byte);
                Ok(ParseStatus::Partial)
            }
            State::ExpectNewline2 => {
                if byte != b'\n' {
                    return Err(ParseError::HttpHeaderValueError);
                }
                if !self.name.is_empty() {
                    self.emit_header()?;
                }
                self.state = State::LineStart;
                Ok(ParseStatus::Partial)
            }
            State::ExpectNewline3 => {
                if byte != b'\n' {
                    return Err(ParseError::NewLine2Error);
                }
                self.state = State::Parsed;
                Ok(ParseStatus::Complete)
            }
            State::Parsed => Err(ParseError::AlreadyParsed),
        }
    }

    fn emit_header(&mut self) -> Result<(), ParseError> {
        let name = String::from_utf8(std::mem::take(&mut self.name))
            .map_err(|_| ParseError::HttpHeaderKeyError)?;
        let value = String::from_utf8(std::mem::take(&mut self.value))
            .map_err(|_| ParseError::HttpHeaderValueError)?;
        // First writer wins: a duplicate name leaves the stored value alone.
        self.headers.insert(name, value);
        Ok(())
    }

    /// Framing length from `Content-Length`: `Some(0)` when the header is
    /// absent, `None` when it is malformed or exceeds the body cap. Spaces
    /// are skipped; the accumulation is overflow-safe against the cap.
    pub(crate) fn content_length(&self) -> Option<usize> {
        let Some(value) = self.headers.get("Content-Length") else {
            return Some(0);
        };

        let mut length: usize = 0;
        for byte in value.bytes() {
            if byte == b' ' {
                continue;
            }
            if !byte.is_ascii_digit() {
                return None;
            }
            if length > MAX_BODY_SIZE / 10 {
                return None;
            }
            length *= 10;
            let digit = (byte - b'0') as usize;
            if length > MAX_BODY_SIZE - digit {
                return None;
            }
            length += digit;
        }
        Some(length)
    }

    /// Whether `Transfer-Encoding: chunked` selects chunked body framing.
    pub(crate) fn is_chunked(&self) -> bool {
        self.headers
            .get("Transfer-Encoding")
            .is_some_and(|value| value.eq_ignore_ascii_case("chunked"))
    }

    /// Moves the assembled headers out, leaving an empty map behind.
    pub(crate) fn pop_headers(&mut self) -> HeaderMap {
        std::mem::take(&mut self.headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(parser: &mut HeadersParser, bytes: &[u8]) -> Result<ParseStatus, ParseError> {
        for &byte in bytes {
            match parser.parse(byte)? {
                ParseStatus::Complete => return Ok(ParseStatus::Complete),
                ParseStatus::Partial => {}
            }
        }
        Ok(ParseStatus::Partial)
    }

    #[test]
    fn parses_header_lines() {
        #[rustfmt::skip]
        let cases: [(&[u8], &[(&str, &str)]); 5] = [
            (b"Host: example.test\r\n\r\n",        &[("host", "example.test")]),
            (b"HOST: x\r\n\r\n",                   &[("host", "x")]),
            (b"A: 1\r\nB: 2\r\n\r\n",              &[("a", "1"), ("b", "2")]),
            (b"Empty:\r\n\r\n",                    &[("empty", "")]),
            (b"Padded:    spaced value\r\n\r\n",   &[("padded", "spaced value")]),
        ];

        for (input, expected) in cases {
            let mut parser = HeadersParser::new();
            assert_eq!(feed(&mut parser, input), Ok(ParseStatus::Complete));

            let headers = parser.pop_headers();
            assert_eq!(headers.len(), expected.len());
            for (name, value) in expected {
                assert_eq!(headers.get(name), Some(*value), "header {name}");
            }
        }
    }

    #[test]
    fn duplicate_names_keep_first_value() {
        let mut parser = HeadersParser::new();
        feed(&mut parser, b"X-Id: one\r\nX-ID: two\r\nx-id: three\r\n\r\n").unwrap();

        let headers = parser.pop_headers();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("x-id"), Some("one"));
    }

    #[test]
    fn rejects_malformed_lines() {
        #[rustfmt::skip]
        let cases: [(&[u8], ParseError); 6] = [
            (b": value\r\n",        ParseError::HttpHeaderKeyError),
            (b"Bad name: v\r\n",    ParseError::HttpHeaderKeyError),
            (b"Na@me: v\r\n",       ParseError::HttpHeaderKeyError),
            (b"Name: va\x01lue\r\n", ParseError::HttpHeaderValueError),
            (b"Name: value\rX",     ParseError::HttpHeaderValueError),
            (b"\rX",                ParseError::NewLine2Error),
        ];

        for (input, expected) in cases {
            let mut parser = HeadersParser::new();
            assert_eq!(feed(&mut parser, input), Err(expected), "input {input:?}");
        }
    }

    #[test]
    fn enforces_section_size_cap() {
        let mut parser = HeadersParser::new();
        let line = b"X-Filler: yyyyyyyyyyyyyyyyyyyyyyyyyyyyyy\r\n";

        let mut total = 0;
        let result = loop {
            match feed(&mut parser, line) {
                Ok(ParseStatus::Partial) => total += line.len(),
                other => break other,
            }
        };
        assert_eq!(result, Err(ParseError::HttpHeadersSectionSizeIsBig));
        assert!(total <= MAX_HEADERS_BLOCK_SIZE);
    }

    #[test]
    fn content_length_parsing() {
        #[rustfmt::skip]
        let cases: [(&str, Option<usize>); 7] = [
            ("0",          Some(0)),
            ("42",         Some(42)),
            ("  42  ",     Some(42)),
            ("4194304",    Some(MAX_BODY_SIZE)),
            ("4194305",    None),
            ("12a",        None),
            ("-1",         None),
        ];

        for (value, expected) in cases {
            let mut parser = HeadersParser::new();
            let input = format!("Content-Length: {value}\r\n\r\n");
            feed(&mut parser, input.as_bytes()).unwrap();
            assert_eq!(parser.content_length(), expected, "value {value:?}");
        }

        let absent = HeadersParser::new();
        assert_eq!(absent.content_length(), Some(0));
    }

    #[test]
    fn chunked_detection() {
        #[rustfmt::skip]
        let cases = [
            ("Transfer-Encoding: chunked\r\n\r\n",  true),
            ("transfer-encoding: Chunked\r\n\r\n",  true),
            ("Transfer-Encoding: identity\r\n\r\n", false),
            ("\r\n",                                false),
        ];

        for (input, expected) in cases {
            let mut parser = HeadersParser::new();
            feed(&mut parser, input.as_bytes()).unwrap();
            assert_eq!(parser.is_chunked(), expected, "input {input:?}");
        }
    }

    #[test]
    fn terminal_state_latches() {
        let mut parser = HeadersParser::new();
        assert_eq!(feed(&mut parser, b"\r\n"), Ok(ParseStatus::Complete));
        assert_eq!(parser.parse(b'x'), Err(ParseError::AlreadyParsed));
    }
}
