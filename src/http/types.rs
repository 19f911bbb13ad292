//! Core HTTP protocol types: methods, versions, status codes, header map.

use std::borrow::Borrow;
use std::collections::{hash_map, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};

// METHOD

/// HTTP request methods recognized on the wire.
///
/// Methods are parsed case-sensitively from their uppercase wire form; a
/// token outside this set is a parse error, so a constructed request always
/// carries a known method.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Options,
    Connect,
    Head,
    Patch,
    Delete,
    Trace,
}

impl Method {
    /// Resolves an uppercase wire token (`b"GET"`, `b"POST"`, ...).
    #[inline]
    pub fn from_bytes(src: &[u8]) -> Option<Self> {
        match src {
            b"GET" => Some(Method::Get),
            b"POST" => Some(Method::Post),
            b"PUT" => Some(Method::Put),
            b"OPTIONS" => Some(Method::Options),
            b"CONNECT" => Some(Method::Connect),
            b"HEAD" => Some(Method::Head),
            b"PATCH" => Some(Method::Patch),
            b"DELETE" => Some(Method::Delete),
            b"TRACE" => Some(Method::Trace),
            _ => None,
        }
    }

    /// Wire form of the method.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Options => "OPTIONS",
            Method::Connect => "CONNECT",
            Method::Head => "HEAD",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Trace => "TRACE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// VERSION

/// HTTP protocol version as a `(major, minor)` pair.
///
/// Defaults to `HTTP/1.1`. The parsers only accept major versions 0 and 1.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u8,
    pub minor: u16,
}

impl Default for Version {
    #[inline]
    fn default() -> Self {
        Version { major: 1, minor: 1 }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}

// STATUS CODE

/// HTTP status codes recognized by this crate.
///
/// The response parser rejects any code outside this set, so a constructed
/// response always carries a recognized code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok = 200,
    Created = 201,
    Accepted = 202,
    NoContent = 204,
    MultipleChoices = 300,
    MovedPermanently = 301,
    MovedTemporarily = 302,
    NotModified = 304,
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    InternalServerError = 500,
    NotImplemented = 501,
    BadGateway = 502,
    ServiceUnavailable = 503,
}

impl StatusCode {
    /// Resolves a numeric code; `None` for anything outside the recognized set.
    #[inline]
    pub fn from_u32(code: u32) -> Option<Self> {
        match code {
            200 => Some(StatusCode::Ok),
            201 => Some(StatusCode::Created),
            202 => Some(StatusCode::Accepted),
            204 => Some(StatusCode::NoContent),
            300 => Some(StatusCode::MultipleChoices),
            301 => Some(StatusCode::MovedPermanently),
            302 => Some(StatusCode::MovedTemporarily),
            304 => Some(StatusCode::NotModified),
            400 => Some(StatusCode::BadRequest),
            401 => Some(StatusCode::Unauthorized),
            403 => Some(StatusCode::Forbidden),
            404 => Some(StatusCode::NotFound),
            500 => Some(StatusCode::InternalServerError),
            501 => Some(StatusCode::NotImplemented),
            502 => Some(StatusCode::BadGateway),
            503 => Some(StatusCode::ServiceUnavailable),
            _ => None,
        }
    }

    /// Numeric value of the code.
    #[inline]
    pub const fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Canonical status phrase sent when the application supplies none.
    pub const fn default_text(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::Accepted => "Accepted",
            StatusCode::NoContent => "No Content",
            StatusCode::MultipleChoices => "Multiple Choices",
            StatusCode::MovedPermanently => "Moved Permanently",
            StatusCode::MovedTemporarily => "Moved Temporarily",
            StatusCode::NotModified => "Not Modified",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
            StatusCode::BadGateway => "Bad Gateway",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }

    /// Canonical HTML page used by stock responses. Empty for `200 OK`.
    pub(crate) fn default_html(&self) -> String {
        if matches!(self, StatusCode::Ok) {
            return String::new();
        }
        let text = self.default_text();
        format!(
            "<html><head><title>{text}</title></head>\
             <body><h1>{} {text}</h1></body></html>",
            self.as_u16()
        )
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

// HEADER NAME

/// Owned header name preserving its wire spelling.
///
/// Equality and hashing fold ASCII case, so the map below treats `Host`,
/// `HOST` and `host` as the same key while writing back whichever spelling
/// was inserted first. Non-ASCII bytes compare literally.
#[derive(Debug, Clone)]
pub struct HeaderName(String);

impl HeaderName {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for HeaderName {
    #[inline]
    fn from(name: String) -> Self {
        HeaderName(name)
    }
}

impl PartialEq for HeaderName {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for HeaderName {}

impl Hash for HeaderName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_folded(self.0.as_bytes(), state);
    }
}

/// Borrowed lookup key with the same folded hash and equality as
/// [`HeaderName`], so `get`/`remove` take a plain `&str` without allocating.
#[repr(transparent)]
struct HeaderNameRef(str);

impl HeaderNameRef {
    #[inline]
    fn new(name: &str) -> &Self {
        // SAFETY: HeaderNameRef is a repr(transparent) wrapper around str,
        // so the reference cast is layout-compatible.
        unsafe { &*(name as *const str as *const HeaderNameRef) }
    }
}

impl Borrow<HeaderNameRef> for HeaderName {
    #[inline]
    fn borrow(&self) -> &HeaderNameRef {
        HeaderNameRef::new(&self.0)
    }
}

impl PartialEq for HeaderNameRef {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for HeaderNameRef {}

impl Hash for HeaderNameRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_folded(self.0.as_bytes(), state);
    }
}

fn hash_folded<H: Hasher>(bytes: &[u8], state: &mut H) {
    for &byte in bytes {
        state.write_u8(byte.to_ascii_uppercase());
    }
    state.write_u8(0xff);
}

// HEADER MAP

/// Header map with ASCII-case-insensitive keys.
///
/// Keys are unique under case folding; the spelling used at first insertion
/// is preserved on the wire. Iteration order is unspecified.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderMap {
    entries: HashMap<HeaderName, String>,
}

impl HeaderMap {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts only when no case-variant of `name` is present; the first
    /// writer wins. Returns whether the entry was inserted.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        match self.entries.entry(HeaderName(name.into())) {
            hash_map::Entry::Occupied(_) => false,
            hash_map::Entry::Vacant(slot) => {
                slot.insert(value.into());
                true
            }
        }
    }

    /// Inserts or replaces the value for `name`. The stored key keeps the
    /// spelling it had when first inserted.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(HeaderName(name.into()), value.into());
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(HeaderNameRef::new(name))
            .map(String::as_str)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(HeaderNameRef::new(name))
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(HeaderNameRef::new(name))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut map = HeaderMap::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}
