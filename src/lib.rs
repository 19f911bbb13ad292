//! tandem_http - HTTP/1.1 endpoint pair over a shared protocol core
//!
//! The crate splits into three layers:
//!
//! - **Protocol core**: the message model ([`HttpRequest`], [`HttpResponse`],
//!   [`HeaderMap`] with ASCII-case-insensitive keys) and incremental
//!   streaming parsers ([`RequestParser`], [`ResponseParser`]) that consume
//!   bytes as they arrive and enforce strict grammar and size caps.
//! - **Server**: [`Server`] binds a listener, runs a pool of worker threads,
//!   and drives one task per connection through the
//!   read → parse → dispatch → write → keep-alive cycle, with per-connection
//!   deadlines and signal-driven graceful shutdown. [`StaticFiles`] is a
//!   ready-made [`Handler`] serving a document root.
//! - **Client**: [`RequestSender`] owns a single-worker executor and resolves,
//!   connects, writes and reads each request under one deadline, delivering
//!   the outcome to a callback exactly once.
//!
//! # Server example
//!
//! ```no_run
//! use tandem_http::{Server, StaticFiles};
//!
//! fn main() -> std::io::Result<()> {
//!     Server::new(4, "0.0.0.0", 8080, StaticFiles::new("./public"))?.run()
//! }
//! ```
//!
//! # Client example
//!
//! ```no_run
//! use std::time::Duration;
//! use tandem_http::{HeaderMap, HttpRequest, Method, RequestSender, Version};
//!
//! let request = HttpRequest::new(
//!     Method::Get,
//!     "/index.html",
//!     Version::default(),
//!     HeaderMap::new(),
//!     Vec::new(),
//! );
//! let sender = RequestSender::new("127.0.0.1", 8080, Duration::from_secs(60))?;
//! sender.send_request(
//!     &request,
//!     |response| match response {
//!         Some(response) => println!("{}", response.status_code()),
//!         None => eprintln!("request failed"),
//!     },
//!     None,
//!     None,
//!     None,
//! );
//! # Ok::<(), std::io::Error>(())
//! ```

pub(crate) mod http {
    pub(crate) mod request;
    pub(crate) mod response;
    pub(crate) mod types;
}
pub(crate) mod parser {
    pub(crate) mod common;
    pub(crate) mod headers;
    pub(crate) mod request;
    pub(crate) mod response;
}
pub(crate) mod server {
    pub(crate) mod connection;
    pub(crate) mod server_impl;
    pub(crate) mod static_files;
}
pub(crate) mod client {
    pub(crate) mod request;
    pub(crate) mod sender;
}
pub(crate) mod errors;
pub mod limits;

pub use crate::{
    client::request::ResponseHandler,
    client::sender::RequestSender,
    errors::ParseError,
    http::{
        request::HttpRequest,
        response::HttpResponse,
        types::{HeaderMap, HeaderName, Method, StatusCode, Version},
    },
    parser::{common::ParseStatus, request::RequestParser, response::ResponseParser},
    server::{
        connection::{Handler, RequestContext},
        server_impl::Server,
        static_files::StaticFiles,
    },
};
