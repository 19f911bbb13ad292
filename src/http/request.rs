use crate::http::types::{HeaderMap, Method, Version};

/// Assembled HTTP request.
///
/// The constructor and setters keep the derived state consistent: the URI
/// always begins with `/`, `Content-Length` mirrors the body, and the
/// keep-alive flag follows the `Connection` header.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    method: Method,
    uri: String,
    version: Version,
    headers: HeaderMap,
    body: Vec<u8>,
    keep_alive: bool,
}

impl HttpRequest {
    pub fn new(
        method: Method,
        uri: impl Into<String>,
        version: Version,
        headers: HeaderMap,
        body: Vec<u8>,
    ) -> Self {
        let mut request = HttpRequest {
            method,
            uri: String::new(),
            version,
            headers,
            body: Vec::new(),
            keep_alive: false,
        };
        request.set_uri(uri);
        request.set_body(body);
        if let Some(value) = request.headers.get("Connection") {
            request.keep_alive = is_keep_alive(value);
        }
        request
    }

    #[inline]
    pub const fn method(&self) -> Method {
        self.method
    }

    #[inline]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[inline]
    pub const fn version(&self) -> Version {
        self.version
    }

    #[inline]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Whether the request asked to reuse the connection
    /// (`Connection: keep-alive`, compared case-insensitively).
    #[inline]
    pub const fn is_keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Replaces the URI, normalizing it to begin with `/`. An empty URI
    /// becomes `/`.
    pub fn set_uri(&mut self, uri: impl Into<String>) {
        let uri = uri.into();
        self.uri = if uri.is_empty() {
            "/".to_string()
        } else if !uri.starts_with('/') {
            format!("/{uri}")
        } else {
            uri
        };
    }

    /// Sets a header, replacing any case-variant of `name`. Updates the
    /// keep-alive flag when the header is `Connection`.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        if name.eq_ignore_ascii_case("Connection") {
            self.keep_alive = is_keep_alive(&value);
        }
        self.headers.set(name, value);
        self
    }

    /// Replaces the body and synchronizes `Content-Length`: set to the body
    /// length, or removed when the body is empty.
    pub fn set_body(&mut self, body: Vec<u8>) {
        self.body = body;
        if self.body.is_empty() {
            self.headers.remove("Content-Length");
        } else {
            self.headers.set("Content-Length", self.body.len().to_string());
        }
    }

    /// Serializes the request to its wire form:
    /// `METHOD URI HTTP/maj.min\r\n` + header lines + `\r\n` + body.
    pub fn pack_to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(64 + self.uri.len() + self.body.len());
        buffer.extend_from_slice(self.method.as_str().as_bytes());
        buffer.push(b' ');
        buffer.extend_from_slice(self.uri.as_bytes());
        buffer.push(b' ');
        buffer.extend_from_slice(self.version.to_string().as_bytes());
        buffer.extend_from_slice(b"\r\n");
        for (name, value) in self.headers.iter() {
            buffer.extend_from_slice(name.as_bytes());
            buffer.extend_from_slice(b": ");
            buffer.extend_from_slice(value.as_bytes());
            buffer.extend_from_slice(b"\r\n");
        }
        buffer.extend_from_slice(b"\r\n");
        buffer.extend_from_slice(&self.body);
        buffer
    }
}

#[inline]
pub(crate) fn is_keep_alive(value: &str) -> bool {
    value.eq_ignore_ascii_case("keep-alive")
}
