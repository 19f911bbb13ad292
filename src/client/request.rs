use crate::http::response::HttpResponse;
use crate::limits::READ_BUFFER_SIZE;
use crate::parser::common::ParseStatus;
use crate::parser::response::ResponseParser;
use log::{debug, error};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{lookup_host, TcpStream};
use tokio::time::timeout;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Callback receiving the outcome of a request: the parsed response, or
/// `None` on any failure (resolve, connect, write, read, parse, timeout).
pub type ResponseHandler = Box<dyn FnOnce(Option<HttpResponse>) + Send + 'static>;

/// Holds the response handler and guarantees it runs exactly once.
///
/// Success delivers the response through [`deliver`](Self::deliver); every
/// other path — error return, deadline, the task being dropped during
/// shutdown — reaches the `Drop` impl, which delivers `None`.
pub(crate) struct ResponseSlot {
    handler: Option<ResponseHandler>,
}

impl ResponseSlot {
    pub(crate) fn new(handler: ResponseHandler) -> Self {
        ResponseSlot {
            handler: Some(handler),
        }
    }

    fn deliver(&mut self, response: HttpResponse) {
        if let Some(handler) = self.handler.take() {
            handler(Some(response));
        }
    }
}

impl Drop for ResponseSlot {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            handler(None);
        }
    }
}

/// Runs one request to completion: resolve, connect, write, read and parse
/// the response, then hand it to the slot. The deadline covers the whole
/// pipeline.
pub(crate) async fn execute(
    request_bytes: Vec<u8>,
    address: String,
    port: u16,
    deadline: Duration,
    mut slot: ResponseSlot,
) {
    let request_id = NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed);
    let started = Instant::now();
    debug!("start request {request_id} to {address}:{port}");

    // A zero deadline disables the timer.
    let outcome = if deadline.is_zero() {
        Ok(exchange(&request_bytes, &address, port).await)
    } else {
        timeout(deadline, exchange(&request_bytes, &address, port)).await
    };
    match outcome {
        Ok(Ok(response)) => {
            slot.deliver(response);
            debug!(
                "finish request {request_id} after {} micros",
                started.elapsed().as_micros()
            );
        }
        Ok(Err(error)) => error!("request {request_id}: {error}"),
        Err(_) => debug!("stop request {request_id} because of timeout"),
    }
}

async fn exchange(request_bytes: &[u8], address: &str, port: u16) -> io::Result<HttpResponse> {
    let endpoints = lookup_host((address, port)).await?;
    let mut stream = connect_first(endpoints).await?;

    stream.write_all(request_bytes).await?;

    let mut parser = ResponseParser::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let count = stream.read(&mut buffer).await?;
        if count == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before a full response",
            ));
        }
        match parser.parse_bytes(&buffer[..count]) {
            Ok(ParseStatus::Partial) => continue,
            Ok(ParseStatus::Complete) => break,
            Err(error) => return Err(io::Error::new(io::ErrorKind::InvalidData, error)),
        }
    }

    parser
        .pop_response()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "no response after parse"))
}

/// Connects to the resolved endpoints in order; the first success wins.
async fn connect_first(endpoints: impl Iterator<Item = SocketAddr>) -> io::Result<TcpStream> {
    let mut last_error = None;
    for endpoint in endpoints {
        match TcpStream::connect(endpoint).await {
            Ok(stream) => return Ok(stream),
            Err(error) => last_error = Some(error),
        }
    }
    Err(last_error.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::AddrNotAvailable, "address resolved to nothing")
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::DEFAULT_TIMEOUT;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    fn slot_counting(
        calls: Arc<AtomicUsize>,
        sender: oneshot::Sender<Option<HttpResponse>>,
    ) -> ResponseSlot {
        ResponseSlot::new(Box::new(move |response| {
            calls.fetch_add(1, Ordering::SeqCst);
            let _ = sender.send(response);
        }))
    }

    async fn canned_server(reply: &'static [u8]) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut sink = [0u8; 1024];
            let _ = stream.read(&mut sink).await.unwrap();
            stream.write_all(reply).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn delivers_parsed_response_once() {
        let addr = canned_server(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok").await;
        let calls = Arc::new(AtomicUsize::new(0));
        let (sender, receiver) = oneshot::channel();

        execute(
            b"GET / HTTP/1.1\r\n\r\n".to_vec(),
            addr.ip().to_string(),
            addr.port(),
            DEFAULT_TIMEOUT,
            slot_counting(calls.clone(), sender),
        )
        .await;

        let response = receiver.await.unwrap().unwrap();
        assert_eq!(response.body(), b"ok");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn connect_failure_delivers_none() {
        // Bind-then-drop leaves a port with no listener behind it.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let calls = Arc::new(AtomicUsize::new(0));
        let (sender, receiver) = oneshot::channel();

        execute(
            b"GET / HTTP/1.1\r\n\r\n".to_vec(),
            addr.ip().to_string(),
            addr.port(),
            DEFAULT_TIMEOUT,
            slot_counting(calls.clone(), sender),
        )
        .await;

        assert_eq!(receiver.await.unwrap(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_response_delivers_none() {
        let addr = canned_server(b"NOT HTTP AT ALL\r\n\r\n").await;
        let (sender, receiver) = oneshot::channel();

        execute(
            b"GET / HTTP/1.1\r\n\r\n".to_vec(),
            addr.ip().to_string(),
            addr.port(),
            DEFAULT_TIMEOUT,
            slot_counting(Arc::new(AtomicUsize::new(0)), sender),
        )
        .await;

        assert_eq!(receiver.await.unwrap(), None);
    }

    #[tokio::test]
    async fn deadline_delivers_none() {
        // A listener that accepts and then stays silent.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });
        let calls = Arc::new(AtomicUsize::new(0));
        let (sender, receiver) = oneshot::channel();

        execute(
            b"GET / HTTP/1.1\r\n\r\n".to_vec(),
            addr.ip().to_string(),
            addr.port(),
            Duration::from_millis(50),
            slot_counting(calls.clone(), sender),
        )
        .await;

        assert_eq!(receiver.await.unwrap(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
