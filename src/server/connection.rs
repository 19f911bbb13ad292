use crate::http::request::HttpRequest;
use crate::http::response::HttpResponse;
use crate::http::types::StatusCode;
use crate::limits::READ_BUFFER_SIZE;
use crate::parser::common::ParseStatus;
use crate::parser::request::RequestParser;
use crate::server::server_impl::ServerState;
use log::{debug, warn};
use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::timeout;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Application-side request handler.
///
/// The handler receives one [`RequestContext`] per parsed request and must
/// answer it through [`RequestContext::send`] — directly, or from any task
/// the context is moved into. A context dropped without a reply produces a
/// stock `500 Internal Server Error` automatically.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, context: RequestContext) -> impl Future<Output = ()> + Send;
}

/// A parsed request plus the one-shot right to answer it.
pub struct RequestContext {
    request: HttpRequest,
    reply: Option<oneshot::Sender<HttpResponse>>,
    state: Arc<ServerState>,
}

impl RequestContext {
    #[inline]
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// Whether the connection can still take a response.
    pub fn is_alive(&self) -> bool {
        !self.state.is_stopped()
            && self.reply.as_ref().is_some_and(|reply| !reply.is_closed())
    }

    /// Sends the response. Succeeds at most once per request; fails when a
    /// response was already sent, the server is stopping, or the connection
    /// is gone.
    pub fn send(&mut self, response: HttpResponse) -> bool {
        let Some(reply) = self.reply.take() else {
            return false;
        };
        if self.state.is_stopped() {
            return false;
        }
        reply.send(response).is_ok()
    }
}

impl Drop for RequestContext {
    fn drop(&mut self) {
        if self.reply.is_some() {
            self.send(HttpResponse::stock(StatusCode::InternalServerError));
        }
    }
}

/// One accepted socket: reads requests, dispatches them to the handler,
/// writes responses, and loops while the peer keeps the connection alive.
///
/// All I/O for the socket happens inside this connection's task, so parser
/// and buffer state need no synchronization. A single deadline covers the
/// whole lifetime of the connection, keep-alive reuse included; when it
/// fires, the socket is dropped and in-flight operations unwind.
pub(crate) struct Connection<H: Handler> {
    id: u64,
    started: Instant,
    handler: Arc<H>,
    state: Arc<ServerState>,
    deadline: Duration,
    parser: RequestParser,
    buffer: Vec<u8>,
}

impl<H: Handler> Connection<H> {
    pub(crate) fn new(handler: Arc<H>, state: Arc<ServerState>, deadline: Duration) -> Self {
        state.add_connection();
        Connection {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            started: Instant::now(),
            handler,
            state,
            deadline,
            parser: RequestParser::new(),
            buffer: vec![0; READ_BUFFER_SIZE],
        }
    }

    pub(crate) async fn run(mut self, mut stream: TcpStream) {
        debug!("start connection {}", self.id);
        let deadline = self.deadline;
        // A zero deadline disables the timer.
        let outcome = if deadline.is_zero() {
            Ok(self.drive(&mut stream).await)
        } else {
            timeout(deadline, self.drive(&mut stream)).await
        };
        match outcome {
            Ok(Ok(())) => debug!("finish connection {}", self.id),
            Ok(Err(error)) => warn!("connection {}: {}", self.id, error),
            Err(_) => debug!("stop connection {} because of timeout", self.id),
        }
    }

    async fn drive(&mut self, stream: &mut TcpStream) -> io::Result<()> {
        loop {
            let outcome = loop {
                let count = stream.read(&mut self.buffer).await?;
                if count == 0 {
                    debug!("connection {} closed by peer", self.id);
                    return Ok(());
                }
                match self.parser.parse_bytes(&self.buffer[..count]) {
                    Ok(ParseStatus::Partial) => continue,
                    Ok(ParseStatus::Complete) => break Ok(()),
                    Err(error) => break Err(error),
                }
            };

            let (response, keep_alive) = match outcome {
                Ok(()) => match self.parser.pop_request() {
                    Some(request) => {
                        let keep_alive = request.is_keep_alive();
                        let response = match self.dispatch(request).await {
                            Some(response) => response,
                            // The handler observed the stopped server and
                            // skipped the reply; nothing left to write.
                            None => return Ok(()),
                        };
                        (response, keep_alive)
                    }
                    None => (HttpResponse::stock(StatusCode::BadRequest), false),
                },
                Err(error) => {
                    warn!("connection {}: {}", self.id, error);
                    (HttpResponse::stock(StatusCode::BadRequest), false)
                }
            };

            if self.state.is_stopped() {
                return Ok(());
            }
            stream.write_all(&response.pack_to_bytes()).await?;
            debug!(
                "finish request on connection {} after {} micros",
                self.id,
                self.started.elapsed().as_micros()
            );

            if !keep_alive {
                return Ok(());
            }
            self.parser.reset();
        }
    }

    async fn dispatch(&self, request: HttpRequest) -> Option<HttpResponse> {
        let (reply, response) = oneshot::channel();
        let context = RequestContext {
            request,
            reply: Some(reply),
            state: self.state.clone(),
        };
        self.handler.handle(context).await;
        response.await.ok()
    }
}

impl<H: Handler> Drop for Connection<H> {
    fn drop(&mut self) {
        self.state.remove_connection();
    }
}
