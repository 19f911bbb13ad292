use crate::errors::ParseError;
use crate::http::response::HttpResponse;
use crate::http::types::{StatusCode, Version};
use crate::limits::{
    MAX_MINOR_VERSION_SIZE, MAX_STATUS_CODE, MAX_STATUS_CODE_SIZE, MAX_STATUS_TEXT_SIZE,
};
use crate::parser::common::{hex_value, is_ctl, BoundedBuf, ParseStatus};
use crate::parser::headers::HeadersParser;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum LineState {
    VersionH,
    VersionT1,
    VersionT2,
    VersionP,
    VersionSlash,
    MajorStart,
    Major,
    MinorStart,
    Minor,
    CodeStart,
    Code,
    StatusText,
    ExpectNewline1,
    Parsed,
}

/// Streaming parser for a status line:
/// `HTTP/maj.min SP CODE (SP|HT) TEXT CRLF`, where the status text may be
/// empty when CR follows the code directly.
#[derive(Debug)]
struct StatusLineParser {
    state: LineState,
    minor_digits: usize,
    code: u32,
    code_digits: usize,
    status_code: Option<StatusCode>,
    status_text: BoundedBuf<MAX_STATUS_TEXT_SIZE>,
    version: Version,
}

impl StatusLineParser {
    fn new() -> Self {
        StatusLineParser {
            state: LineState::VersionH,
            minor_digits: 0,
            code: 0,
            code_digits: 0,
            status_code: None,
            status_text: BoundedBuf::new(),
            version: Version::default(),
        }
    }

    fn parse(&mut self, byte: u8) -> Result<ParseStatus, ParseError> {
        match self.state {
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
                if byte == b' ' {
                    self.state = LineState::CodeStart;
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
            LineState::CodeStart => {
                if !byte.is_ascii_digit() {
                    return Err(ParseError::UnknownStatusCode);
                }
                self.code = (byte - b'0') as u32;
                self.code_digits = 1;
                self.state = LineState::Code;
                Ok(ParseStatus::Partial)
            }
            LineState::Code => {
                if byte == b' ' || byte == b'\t' || byte == b'\r' {
                    self.status_code = Some(
                        StatusCode::from_u32(self.code).ok_or(ParseError::UnknownStatusCode)?,
                    );
                    self.state = if byte == b'\r' {
                        LineState::ExpectNewline1
                    } else {
                        LineState::StatusText
                    };
                    return Ok(ParseStatus::Partial);
                }
                if !byte.is_ascii_digit() {
                    return Err(ParseError::UnknownStatusCode);
                }
                self.code_digits += 1;
                if self.code_digits > MAX_STATUS_CODE_SIZE {
                    return Err(ParseError::UnknownStatusCode);
                }
                self.code = self.code * 10 + (byte - b'0') as u32;
                if self.code > MAX_STATUS_CODE {
                    return Err(ParseError::UnknownStatusCode);
                }
                Ok(ParseStatus::Partial)
            }
            LineState::StatusText => {
                if byte == b'\r' {
                    self.state = LineState::ExpectNewline1;
                    return Ok(ParseStatus::Partial);
                }
                if is_ctl(byte) || !self.status_text.push(byte) {
                    return Err(ParseError::IncorrectStatusText);
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
enum ChunkState {
    SizeStart,
    Size,
    Newline1,
    Body,
    ExpectCr,
    Newline2,
    Parsed,
}

/// Streaming parser for a chunked body. A zero-sized chunk terminates the
/// stream; trailer headers are not supported.
#[derive(Debug)]
struct ChunkParser {
    state: ChunkState,
    chunk_size: usize,
    current: Vec<u8>,
    chunks: Vec<Vec<u8>>,
    body_size: usize,
}

impl ChunkParser {
    fn new() -> Self {
        ChunkParser {
            state: ChunkState::SizeStart,
            chunk_size: 0,
            current: Vec::new(),
            chunks: Vec::new(),
            body_size: 0,
        }
    }

    fn parse(&mut self, byte: u8) -> Result<ParseStatus, ParseError> {
        match self.state {
            ChunkState::SizeStart => {
                self.chunk_size = 0;
                if byte == b'\r' {
                    self.state = ChunkState::Newline1;
                    return Ok(ParseStatus::Partial);
                }
                let digit = hex_value(byte).ok_or(ParseError::BodyChunkError)?;
                self.chunk_size = digit as usize;
                self.state = ChunkState::Size;
                Ok(ParseStatus::Partial)
            }
            ChunkState::Size => {
                if byte == b'\r' {
                    self.state = ChunkState::Newline1;
                    return Ok(ParseStatus::Partial);
                }
                let digit = hex_value(byte).ok_or(ParseError::BodyChunkError)?;
                self.chunk_size = self
                    .chunk_size
                    .checked_mul(16)
                    .and_then(|size| size.checked_add(digit as usize))
                    .ok_or(ParseError::BodyChunkError)?;
                Ok(ParseStatus::Partial)
            }
            ChunkState::Newline1 => {
                if byte != b'\n' {
                    return Err(ParseError::BodyChunkError);
                }
                if self.chunk_size == 0 {
                    self.state = ChunkState::Parsed;
                    return Ok(ParseStatus::Complete);
                }
                self.current.reserve(self.chunk_size);
                self.state = ChunkState::Body;
                Ok(ParseStatus::Partial)
            }
            ChunkState::Body => {
                self.current.push(byte);
                if self.current.len() == self.chunk_size {
                    self.body_size += self.current.len();
                    self.chunks.push(std::mem::take(&mut self.current));
                    self.chunk_size = 0;
                    self.state = ChunkState::ExpectCr;
                }
                Ok(ParseStatus::Partial)
            }
            ChunkState::ExpectCr => {
                if byte != b'\r' {
                    return Err(ParseError::BodyChunkError);
                }
                self.state = ChunkState::Newline2;
                Ok(ParseStatus::Partial)
            }
            ChunkState::Newline2 => {
                if byte != b'\n' {
                    return Err(ParseError::BodyChunkError);
                }
                self.state = ChunkState::SizeStart;
                Ok(ParseStatus::Partial)
            }
            ChunkState::Parsed => Err(ParseError::AlreadyParsed),
        }
    }

    /// Concatenation of all chunk payloads, in arrival order.
    fn pop_body(&mut self) -> Vec<u8> {
        let mut body = Vec::with_capacity(self.body_size);
        for chunk in self.chunks.drain(..) {
            body.extend_from_slice(&chunk);
        }
        body
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum MessageState {
    StatusLine,
    Headers,
    Body,
    ChunkedBody,
    Parsed,
}

/// Streaming parser for a full HTTP response.
///
/// After the header block, `Transfer-Encoding: chunked` selects the chunk
/// parser; otherwise the body length comes from `Content-Length` (absent or
/// malformed means zero). Terminal results latch exactly like
/// [`RequestParser`](crate::parser::request::RequestParser).
#[derive(Debug)]
pub struct ResponseParser {
    state: MessageState,
    line: StatusLineParser,
    headers: HeadersParser,
    chunks: ChunkParser,
    body_size: usize,
    body: Vec<u8>,
    failed: Option<ParseError>,
    popped: bool,
}

impl ResponseParser {
    pub fn new() -> Self {
        ResponseParser {
            state: MessageState::StatusLine,
            line: StatusLineParser::new(),
            headers: HeadersParser::new(),
            chunks: ChunkParser::new(),
            body_size: 0,
            body: Vec::new(),
            failed: None,
            popped: false,
        }
    }

    pub fn reset(&mut self) {
        *self = ResponseParser::new();
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
            MessageState::StatusLine => {
                if self.line.parse(byte)? == ParseStatus::Complete {
                    self.state = MessageState::Headers;
                }
                Ok(ParseStatus::Partial)
            }
            MessageState::Headers => {
                if self.headers.parse(byte)? == ParseStatus::Partial {
                    return Ok(ParseStatus::Partial);
                }
                if self.headers.is_chunked() {
                    self.state = MessageState::ChunkedBody;
                    return Ok(ParseStatus::Partial);
                }
                if let Some(length) = self.headers.content_length() {
                    self.body_size = length;
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
            MessageState::ChunkedBody => {
                if self.chunks.parse(byte)? == ParseStatus::Partial {
                    return Ok(ParseStatus::Partial);
                }
                self.body = self.chunks.pop_body();
                self.body_size = self.body.len();
                self.state = MessageState::Parsed;
                Ok(ParseStatus::Complete)
            }
            MessageState::Parsed => Err(ParseError::AlreadyParsed),
        }
    }

    /// Feeds a byte range, stopping at the first terminal result.
    pub fn parse_bytes(&mut self, bytes: &[u8]) -> Result<ParseStatus, ParseError> {
        for &byte in bytes {
            if self.parse(byte)? == ParseStatus::Complete {
                return Ok(ParseStatus::Complete);
            }
        }
        Ok(ParseStatus::Partial)
    }

    /// Yields the assembled response, at most once, after `Complete`.
    pub fn pop_response(&mut self) -> Option<HttpResponse> {
        if self.state != MessageState::Parsed || self.popped {
            return None;
        }
        self.popped = true;

        let status_code = self.line.status_code?;
        let status_text = String::from_utf8(self.line.status_text.as_slice().to_vec()).ok()?;
        Some(HttpResponse::from_parts(
            status_code,
            self.headers.pop_headers(),
            std::mem::take(&mut self.body),
            status_text,
            self.line.version,
        ))
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        ResponseParser::new()
    }
}
