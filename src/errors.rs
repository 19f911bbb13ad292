use std::{error, fmt};

/// Terminal failure of a streaming parser.
///
/// Every kind carries a fixed human-readable message; the message is what a
/// server logs before answering `400 Bad Request` and what a client logs
/// before abandoning a request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Request method is not one of the recognized tokens, or is malformed.
    UnknownMethodType,
    /// Control byte or other illegal byte inside the request URI.
    IncorrectUri,
    /// Request URI exceeds the URI size cap.
    IncorrectUriSize,
    /// Version literal, major digit, or minor digits are not acceptable.
    UnknownHttpVersion,
    /// First line was not terminated by CRLF.
    NewLine1Error,
    /// Header block was not terminated by CRLF.
    NewLine2Error,
    /// Parser reached a state it has no transition for.
    UnknownState,
    /// Bytes fed after the message already reached a terminal state.
    AlreadyParsed,
    /// Illegal byte inside a header name.
    HttpHeaderKeyError,
    /// Illegal byte inside a header value, or a header line without LF.
    HttpHeaderValueError,
    /// Header block exceeds its total size cap.
    HttpHeadersSectionSizeIsBig,
    /// Status code is malformed, too large, or not a recognized code.
    UnknownStatusCode,
    /// Status text contains a control byte or exceeds its size cap.
    IncorrectStatusText,
    /// Chunked body framing violated (bad hex size, missing CRLF).
    BodyChunkError,
}

impl ParseError {
    /// Fixed message for this error kind.
    pub const fn message(&self) -> &'static str {
        match self {
            ParseError::UnknownMethodType => "Unknown method type",
            ParseError::IncorrectUri => "Incorrect URI",
            ParseError::IncorrectUriSize => "URI size is too big",
            ParseError::UnknownHttpVersion => "Unknown http version",
            ParseError::NewLine1Error => "Can't find new line after first http line",
            ParseError::NewLine2Error => "Can't find new line after header section",
            ParseError::UnknownState => "Internal error unknown parsing state",
            ParseError::AlreadyParsed => "Message was already parsed",
            ParseError::HttpHeaderKeyError => "Http key error",
            ParseError::HttpHeaderValueError => "Http value error",
            ParseError::HttpHeadersSectionSizeIsBig => "Headers section is too big",
            ParseError::UnknownStatusCode => "Unknown status code",
            ParseError::IncorrectStatusText => "Incorrect status text",
            ParseError::BodyChunkError => "Can't read body chunks",
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl error::Error for ParseError {}
