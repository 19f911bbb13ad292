use crate::limits::DEFAULT_TIMEOUT;
use crate::server::connection::{Connection, Handler};
use log::{debug, error, info};
use std::io;
use std::net::ToSocketAddrs;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;

/// Shared server lifecycle state.
///
/// `stopped` flips false→true exactly once; the connection count is bumped
/// when a connection is created and dropped when its task finishes. The
/// shutdown path parks on `idle` instead of polling the counter.
pub(crate) struct ServerState {
    connection_count: AtomicUsize,
    stopped: AtomicBool,
    stopping: Notify,
    idle: Notify,
}

impl ServerState {
    pub(crate) fn new() -> Self {
        ServerState {
            connection_count: AtomicUsize::new(0),
            stopped: AtomicBool::new(false),
            stopping: Notify::new(),
            idle: Notify::new(),
        }
    }

    pub(crate) fn add_connection(&self) {
        self.connection_count.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn remove_connection(&self) {
        if self.connection_count.fetch_sub(1, Ordering::SeqCst) == 1 {
            // notify_one stores a permit, so the waiter can't miss a wakeup
            // that lands before it registers.
            self.idle.notify_one();
        }
    }

    pub(crate) fn connection_count(&self) -> usize {
        self.connection_count.load(Ordering::SeqCst)
    }

    /// Flips the server to stopped. Only the first caller wins; that caller
    /// also wakes the accept loop.
    pub(crate) fn stop(&self) -> bool {
        let flipped = self
            .stopped
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if flipped {
            self.stopping.notify_one();
            self.idle.notify_one();
        }
        flipped
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub(crate) async fn stopped_notified(&self) {
        while !self.is_stopped() {
            self.stopping.notified().await;
        }
    }

    /// Blocks until the server is stopped and the last connection is gone.
    pub(crate) async fn wait_idle(&self) {
        loop {
            if self.is_stopped() && self.connection_count() == 0 {
                return;
            }
            self.idle.notified().await;
        }
    }
}

/// HTTP server: a bound listener, a worker-thread pool, and a handler.
///
/// [`run`](Self::run) drives everything: it builds a tokio runtime with the
/// configured number of worker threads, accepts connections until a
/// termination signal arrives, then drains live connections before
/// returning.
pub struct Server<H: Handler> {
    listener: std::net::TcpListener,
    thread_count: usize,
    handler: Arc<H>,
    state: Arc<ServerState>,
    connection_timeout: Duration,
}

impl<H: Handler> Server<H> {
    /// Resolves `address:port`, binds it with address reuse, and prepares
    /// `thread_count` workers. Fails on an unresolvable endpoint or a zero
    /// thread count.
    pub fn new(thread_count: usize, address: &str, port: u16, handler: H) -> io::Result<Self> {
        if thread_count == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "thread count should be more than 0 for http server",
            ));
        }

        let endpoint = (address, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::AddrNotAvailable, "address resolved to nothing")
            })?;

        let socket = socket2::Socket::new(
            socket2::Domain::for_address(endpoint),
            socket2::Type::STREAM,
            Some(socket2::Protocol::TCP),
        )?;
        socket.set_reuse_address(true)?;
        socket.bind(&endpoint.into())?;
        socket.listen(1024)?;
        socket.set_nonblocking(true)?;

        Ok(Server {
            listener: socket.into(),
            thread_count,
            handler: Arc::new(handler),
            state: Arc::new(ServerState::new()),
            connection_timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Deadline covering each connection's whole lifetime.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Address the listener is bound to, useful when binding port 0.
    pub fn local_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the server until a termination signal stops it and the last
    /// connection drains.
    pub fn run(self) -> io::Result<()> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.thread_count)
            .enable_all()
            .build()?;
        runtime.block_on(self.serve())
    }

    async fn serve(self) -> io::Result<()> {
        let listener = TcpListener::from_std(self.listener)?;
        info!("listening on {}", listener.local_addr()?);

        let state = self.state.clone();
        tokio::spawn(async move {
            let signal = wait_for_termination_signal().await;
            info!("got signal {signal}");
            state.stop();
        });

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!("accepted connection from {peer}");
                        let connection = Connection::new(
                            self.handler.clone(),
                            self.state.clone(),
                            self.connection_timeout,
                        );
                        tokio::spawn(connection.run(stream));
                    }
                    Err(error) => error!("acceptor error: {error}"),
                },
                _ = self.state.stopped_notified() => break,
            }
        }

        // Acceptor closed; wait for in-flight connections to finish.
        drop(listener);
        self.state.wait_idle().await;
        info!("server stopped");
        Ok(())
    }
}

#[cfg(unix)]
async fn wait_for_termination_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = match signal(SignalKind::interrupt()) {
        Ok(stream) => stream,
        Err(error) => {
            error!("can't install SIGINT handler: {error}");
            return "none";
        }
    };
    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(error) => {
            error!("can't install SIGTERM handler: {error}");
            return "none";
        }
    };
    let mut quit = match signal(SignalKind::quit()) {
        Ok(stream) => stream,
        Err(error) => {
            error!("can't install SIGQUIT handler: {error}");
            return "none";
        }
    };

    tokio::select! {
        _ = interrupt.recv() => "SIGINT",
        _ = terminate.recv() => "SIGTERM",
        _ = quit.recv() => "SIGQUIT",
    }
}

#[cfg(not(unix))]
async fn wait_for_termination_signal() -> &'static str {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!("can't wait for ctrl-c: {error}");
    }
    "ctrl-c"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::HttpResponse;
    use crate::http::types::StatusCode;
    use crate::server::connection::RequestContext;
    use std::io::{Read, Write};
    use std::net::TcpStream;

    struct OkHandler;

    impl Handler for OkHandler {
        async fn handle(&self, mut context: RequestContext) {
            let mut response = HttpResponse::new(StatusCode::Ok);
            response.set_body(b"fine".to_vec());
            context.send(response);
        }
    }

    #[test]
    fn rejects_zero_threads() {
        let result = Server::new(0, "127.0.0.1", 0, OkHandler);
        assert!(result.is_err());
    }

    #[test]
    fn serves_and_drains_on_stop() {
        let server = Server::new(2, "127.0.0.1", 0, OkHandler)
            .unwrap()
            .with_connection_timeout(Duration::from_secs(5));
        let addr = server.local_addr().unwrap();
        let state = server.state.clone();

        let worker = std::thread::spawn(move || server.run());

        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .write_all(b"GET / HTTP/1.1\r\nHost: t\r\n\r\n")
            .unwrap();
        let mut reply = Vec::new();
        stream.read_to_end(&mut reply).unwrap();
        let reply = String::from_utf8(reply).unwrap();
        assert!(reply.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(reply.ends_with("fine"));

        assert!(state.stop());
        assert!(!state.stop());
        worker.join().unwrap().unwrap();
        assert_eq!(state.connection_count(), 0);
    }

    #[test]
    fn state_stop_is_idempotent() {
        let state = ServerState::new();
        assert!(!state.is_stopped());
        assert!(state.stop());
        assert!(!state.stop());
        assert!(state.is_stopped());
    }

    #[test]
    fn end_to_end_with_request_sender() {
        use crate::client::sender::RequestSender;
        use crate::http::request::HttpRequest;
        use crate::http::types::{HeaderMap, Method, Version};
        use crate::server::static_files::StaticFiles;
        use std::sync::mpsc;

        let root = std::env::temp_dir().join(format!("tandem_http_e2e_{}", std::process::id()));
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("index.html"), b"<h1>home</h1>").unwrap();

        let server = Server::new(2, "127.0.0.1", 0, StaticFiles::new(&root)).unwrap();
        let addr = server.local_addr().unwrap();
        let state = server.state.clone();
        let worker = std::thread::spawn(move || server.run());

        let mut sender = RequestSender::new(
            addr.ip().to_string(),
            addr.port(),
            Duration::from_secs(5),
        )
        .unwrap();
        let request = HttpRequest::new(
            Method::Get,
            "/index.html",
            Version::default(),
            HeaderMap::new(),
            Vec::new(),
        );
        let (tx, rx) = mpsc::channel();
        sender.send_request(
            &request,
            move |response| {
                let _ = tx.send(response);
            },
            None,
            None,
            None,
        );

        let response = rx.recv().unwrap().expect("server should answer");
        assert_eq!(response.status_code(), crate::http::types::StatusCode::Ok);
        assert_eq!(response.body(), b"<h1>home</h1>");
        assert_eq!(response.headers().get("content-type"), Some("text/html"));

        sender.stop();
        state.stop();
        worker.join().unwrap().unwrap();
    }
}
