use crate::http::types::{HeaderMap, StatusCode, Version};

/// Assembled HTTP response.
///
/// The status text defaults to the canonical phrase for the status code, and
/// `Content-Length` mirrors the body exactly as it does for requests.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    status_code: StatusCode,
    status_text: String,
    version: Version,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl HttpResponse {
    /// Empty response with the default status text and version.
    pub fn new(status_code: StatusCode) -> Self {
        Self::from_parts(
            status_code,
            HeaderMap::new(),
            Vec::new(),
            String::new(),
            Version::default(),
        )
    }

    /// Builds a response from parsed or application-supplied parts. An empty
    /// `status_text` falls back to the canonical phrase for the code.
    pub fn from_parts(
        status_code: StatusCode,
        headers: HeaderMap,
        body: Vec<u8>,
        status_text: String,
        version: Version,
    ) -> Self {
        let status_text = if status_text.is_empty() {
            status_code.default_text().to_string()
        } else {
            status_text
        };
        let mut response = HttpResponse {
            status_code,
            status_text,
            version,
            headers,
            body: Vec::new(),
        };
        response.set_body(body);
        response
    }

    /// Canonical response for a status code: default status text, default
    /// HTML page, `Content-Type: text/html`.
    pub fn stock(status_code: StatusCode) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", "text/html");
        Self::from_parts(
            status_code,
            headers,
            status_code.default_html().into_bytes(),
            String::new(),
            Version::default(),
        )
    }

    #[inline]
    pub const fn status_code(&self) -> StatusCode {
        self.status_code
    }

    #[inline]
    pub fn status_text(&self) -> &str {
        &self.status_text
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

    pub fn set_status_text(&mut self, status_text: impl Into<String>) {
        self.status_text = status_text.into();
    }

    /// Sets a header, replacing any case-variant of `name`.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.headers.set(name, value);
        self
    }

    /// Replaces the body and synchronizes `Content-Length`.
    pub fn set_body(&mut self, body: Vec<u8>) {
        self.body = body;
        if self.body.is_empty() {
            self.headers.remove("Content-Length");
        } else {
            self.headers.set("Content-Length", self.body.len().to_string());
        }
    }

    /// Serializes the response to its wire form:
    /// `HTTP/maj.min CODE TEXT\r\n` + header lines + `\r\n` + body.
    pub fn pack_to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(64 + self.status_text.len() + self.body.len());
        buffer.extend_from_slice(self.version.to_string().as_bytes());
        buffer.push(b' ');
        buffer.extend_from_slice(self.status_code.to_string().as_bytes());
        buffer.push(b' ');
        buffer.extend_from_slice(self.status_text.as_bytes());
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_defaults_by_code() {
        assert_eq!(HttpResponse::new(StatusCode::Ok).status_text(), "OK");
        assert_eq!(
            HttpResponse::new(StatusCode::NotFound).status_text(),
            "Not Found"
        );

        let custom = HttpResponse::from_parts(
            StatusCode::Ok,
            HeaderMap::new(),
            Vec::new(),
            "Fine".to_string(),
            Version::default(),
        );
        assert_eq!(custom.status_text(), "Fine");
    }

    #[test]
    fn stock_response_shape() {
        let response = HttpResponse::stock(StatusCode::BadRequest);

        assert_eq!(response.status_code(), StatusCode::BadRequest);
        assert_eq!(response.headers().get("content-type"), Some("text/html"));
        let body = String::from_utf8(response.body().to_vec()).unwrap();
        assert!(body.contains("<h1>400 Bad Request</h1>"));
        assert_eq!(
            response.headers().get("content-length"),
            Some(body.len().to_string().as_str())
        );

        // The stock 200 page is empty, so it carries no Content-Length.
        let ok = HttpResponse::stock(StatusCode::Ok);
        assert!(ok.body().is_empty());
        assert_eq!(ok.headers().get("content-length"), None);
    }

    #[test]
    fn pack_to_bytes_wire_form() {
        let mut response = HttpResponse::new(StatusCode::Ok);
        response.set_header("Content-Type", "text/plain");
        response.set_body(b"hello".to_vec());

        let text = String::from_utf8(response.pack_to_bytes()).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Type: text/plain\r\n"));
        assert!(text.contains("Content-Length: 5\r\n"));
        assert!(text.ends_with("\r\n\r\nhello"));
    }
}
