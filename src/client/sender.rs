use crate::client::request::{execute, ResponseSlot};
use crate::http::request::HttpRequest;
use crate::http::response::HttpResponse;
use log::debug;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared client lifecycle state: in-flight request count plus a stop flag
/// that flips exactly once.
pub(crate) struct ClientState {
    request_count: AtomicUsize,
    stopped: AtomicBool,
}

impl ClientState {
    fn new() -> Self {
        ClientState {
            request_count: AtomicUsize::new(0),
            stopped: AtomicBool::new(false),
        }
    }

    fn stop(&self) -> bool {
        self.stopped
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub(crate) fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight count when the request task ends, normally or
/// by cancellation.
struct InFlight(Arc<ClientState>);

impl InFlight {
    fn new(state: Arc<ClientState>) -> Self {
        state.request_count.fetch_add(1, Ordering::SeqCst);
        InFlight(state)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.request_count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Issues HTTP requests and owns the executor they run on.
///
/// The sender drives a single-worker runtime. Each
/// [`send_request`](Self::send_request) spawns one request pipeline; the
/// response handler is invoked exactly once per accepted request, with
/// `None` on any failure — including requests cut short by
/// [`stop`](Self::stop).
pub struct RequestSender {
    runtime: Option<tokio::runtime::Runtime>,
    state: Arc<ClientState>,
    address: String,
    port: u16,
    timeout: Duration,
}

impl RequestSender {
    /// Creates a sender with default target address, port and per-request
    /// deadline. A zero `timeout` disables the deadline.
    pub fn new(address: impl Into<String>, port: u16, timeout: Duration) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;
        Ok(RequestSender {
            runtime: Some(runtime),
            state: Arc::new(ClientState::new()),
            address: address.into(),
            port,
            timeout,
        })
    }

    /// Sends `request`, delivering the outcome to `handler`. The optional
    /// arguments override the sender's defaults for this call only. A
    /// stopped sender ignores the call.
    pub fn send_request<F>(
        &self,
        request: &HttpRequest,
        handler: F,
        address: Option<String>,
        port: Option<u16>,
        timeout: Option<Duration>,
    ) where
        F: FnOnce(Option<HttpResponse>) + Send + 'static,
    {
        if self.state.is_stopped() {
            return;
        }
        let Some(runtime) = &self.runtime else {
            return;
        };

        let request_bytes = request.pack_to_bytes();
        let address = address.unwrap_or_else(|| self.address.clone());
        let port = port.unwrap_or(self.port);
        let deadline = timeout.unwrap_or(self.timeout);
        let slot = ResponseSlot::new(Box::new(handler));
        let in_flight = InFlight::new(self.state.clone());

        runtime.spawn(async move {
            let _in_flight = in_flight;
            execute(request_bytes, address, port, deadline, slot).await;
        });
    }

    /// Stops the sender: no new requests are accepted, the executor shuts
    /// down, and its worker thread is joined. Requests still in flight have
    /// their handlers invoked with `None` as their tasks unwind.
    pub fn stop(&mut self) {
        if !self.state.stop() {
            return;
        }
        debug!(
            "stopping request sender with {} requests in flight",
            self.state.request_count()
        );
        if let Some(runtime) = self.runtime.take() {
            // Dropping the runtime cancels outstanding tasks at their next
            // await point and joins the worker thread.
            drop(runtime);
        }
    }
}

impl Drop for RequestSender {
    fn drop(&mut self) {
        self.stop();
    }
}
