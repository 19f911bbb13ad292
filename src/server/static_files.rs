use crate::http::request::HttpRequest;
use crate::http::response::HttpResponse;
use crate::http::types::StatusCode;
use crate::parser::common::hex_value;
use crate::server::connection::{Handler, RequestContext};
use log::{debug, warn};
use memchr::memchr2;
use std::io;
use std::path::{Path, PathBuf};

/// Request handler serving files from a document root.
///
/// The request URI is percent-decoded and resolved inside the root;
/// directories render as an HTML index, regular files are served with a
/// MIME type guessed from the extension. Paths escaping the root yield 404.
pub struct StaticFiles {
    doc_root: PathBuf,
}

impl StaticFiles {
    pub fn new(doc_root: impl Into<PathBuf>) -> Self {
        StaticFiles {
            doc_root: doc_root.into(),
        }
    }

    async fn respond(&self, request: &HttpRequest) -> HttpResponse {
        let Some(decoded) = uri_decode(request.uri()) else {
            return HttpResponse::stock(StatusCode::BadRequest);
        };
        let Ok(relative) = simdutf8::basic::from_utf8(&decoded) else {
            return HttpResponse::stock(StatusCode::BadRequest);
        };
        let relative = relative.strip_prefix('/').unwrap_or(relative);
        debug!("serving {relative:?}");

        let mut response = match self.load(relative).await {
            Ok(response) => response,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return HttpResponse::stock(StatusCode::NotFound);
            }
            Err(error) => {
                warn!("can't serve {relative:?}: {error}");
                return HttpResponse::stock(StatusCode::InternalServerError);
            }
        };

        if request.is_keep_alive() {
            response.set_header("Connection", "keep-alive");
        }
        response
    }

    async fn load(&self, relative: &str) -> io::Result<HttpResponse> {
        let root = tokio::fs::canonicalize(&self.doc_root).await?;
        let target = tokio::fs::canonicalize(root.join(relative)).await?;
        if !target.starts_with(&root) {
            debug!("{relative:?} escapes the document root");
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }

        let metadata = tokio::fs::metadata(&target).await?;
        let mut response = HttpResponse::new(StatusCode::Ok);
        if metadata.is_dir() {
            let listing = directory_listing(&target, relative, target != root).await?;
            response.set_header("Content-Type", "text/html");
            response.set_body(listing.into_bytes());
        } else if metadata.is_file() {
            let extension = target
                .extension()
                .and_then(|extension| extension.to_str())
                .unwrap_or("");
            response.set_header("Content-Type", content_type_for(extension));
            response.set_body(tokio::fs::read(&target).await?);
        } else {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        Ok(response)
    }
}

impl Handler for StaticFiles {
    async fn handle(&self, mut context: RequestContext) {
        let response = self.respond(context.request()).await;
        context.send(response);
    }
}

/// Decodes `+` to space and `%XX` hex escapes. `None` on a truncated or
/// non-hex escape.
fn uri_decode(uri: &str) -> Option<Vec<u8>> {
    let bytes = uri.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut rest = bytes;
    while let Some(position) = memchr2(b'%', b'+', rest) {
        decoded.extend_from_slice(&rest[..position]);
        if rest[position] == b'+' {
            decoded.push(b' ');
            rest = &rest[position + 1..];
        } else {
            let high = hex_value(*rest.get(position + 1)?)?;
            let low = hex_value(*rest.get(position + 2)?)?;
            decoded.push(high * 16 + low);
            rest = &rest[position + 3..];
        }
    }
    decoded.extend_from_slice(rest);
    Some(decoded)
}

async fn directory_listing(path: &Path, shown: &str, link_parent: bool) -> io::Result<String> {
    let mut page = format!(
        "<html><head><title>Index of {shown}</title></head>\n<body>\n\
         <h1>Index of {shown}</h1><hr><pre>\n"
    );
    if link_parent {
        page.push_str("<a href=\"../\">../</a>\n");
    }
    let mut entries = tokio::fs::read_dir(path).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        page.push_str(&format!("<a href=\"{name}\">{name}</a>\n"));
    }
    page.push_str("</pre><hr></body>\n</html>");
    Ok(page)
}

fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "gif" => "image/gif",
        "htm" | "html" => "text/html",
        "jpg" => "image/jpg",
        "png" => "image/png",
        "json" => "application/json",
        "txt" => "text/plain",
        _ => "text/plain",
    }
}
