//! Shared helpers for link integration tests.
//!
//! `MockTransport` follows queued plans (unplanned attempts fail), hands out
//! in-memory duplex streams whose far ends go to the test through
//! `MockControl`, and records every write the session performs.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::sync::mpsc;
use tokio::time::timeout;

use btlink::config::LinkConfig;
use btlink::transport::{Connection, Transport};
use btlink::{ConnectionState, Coordinator, EventLoop, LinkHandler, PeerAddress};

pub const WAIT: Duration = Duration::from_secs(2);

/// What the next connect or accept does.
#[derive(Debug, Clone)]
pub enum Plan {
    Succeed(String),
    SucceedAfter(Duration, String),
    Fail,
    Hang,
}

#[derive(Default)]
struct MockInner {
    plans: Mutex<VecDeque<Plan>>,
    accept_plans: Mutex<VecDeque<Plan>>,
    addresses: Mutex<Vec<String>>,
    connects: AtomicUsize,
    accepts: AtomicUsize,
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
}

pub struct MockTransport {
    inner: Arc<MockInner>,
    peers: mpsc::UnboundedSender<DuplexStream>,
}

pub struct MockControl {
    inner: Arc<MockInner>,
    peers: mpsc::UnboundedReceiver<DuplexStream>,
}

impl MockTransport {
    pub fn new() -> (Self, MockControl) {
        let inner = Arc::new(MockInner::default());
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                inner: inner.clone(),
                peers: tx,
            },
            MockControl { inner, peers: rx },
        )
    }

    async fn establish(&self, plan: Option<Plan>) -> io::Result<Connection<RecordingStream>> {
        let name = match plan.unwrap_or(Plan::Fail) {
            Plan::Succeed(name) => name,
            Plan::SucceedAfter(delay, name) => {
                tokio::time::sleep(delay).await;
                name
            }
            Plan::Fail => {
                return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
            }
            Plan::Hang => std::future::pending().await,
        };

        let (local, remote) = tokio::io::duplex(4096);
        let _ = self.peers.send(remote);
        let stream = RecordingStream {
            inner: local,
            writes: self.inner.writes.clone(),
        };
        Ok(Connection::new(stream, name))
    }
}

impl Transport for MockTransport {
    type Stream = RecordingStream;

    async fn connect(&self, address: &PeerAddress) -> io::Result<Connection<RecordingStream>> {
        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        self.inner.addresses.lock().push(address.to_string());
        let plan = self.inner.plans.lock().pop_front();
        self.establish(plan).await
    }

    async fn accept(&self) -> io::Result<Connection<RecordingStream>> {
        self.inner.accepts.fetch_add(1, Ordering::SeqCst);
        let plan = self.inner.accept_plans.lock().pop_front();
        self.establish(plan).await
    }
}

impl MockControl {
    /// Queue the outcome of the next connect.
    pub fn plan(&self, plan: Plan) {
        self.inner.plans.lock().push_back(plan);
    }

    /// Queue the outcome of the next accept.
    pub fn plan_accept(&self, plan: Plan) {
        self.inner.accept_plans.lock().push_back(plan);
    }

    pub fn connect_count(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    pub fn accept_count(&self) -> usize {
        self.inner.accepts.load(Ordering::SeqCst)
    }

    pub fn addresses(&self) -> Vec<String> {
        self.inner.addresses.lock().clone()
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.inner.writes.lock().clone()
    }

    /// Far end of the next established connection.
    pub async fn next_peer(&mut self) -> DuplexStream {
        timeout(WAIT, self.peers.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("transport dropped")
    }
}

/// Duplex stream that records what is written to it.
pub struct RecordingStream {
    inner: DuplexStream,
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl AsyncRead for RecordingStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for RecordingStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let result = Pin::new(&mut this.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = result {
            this.writes.lock().push(buf[..n].to_vec());
        }
        result
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

/// One application callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    Status(ConnectionState),
    WriteSuccess(Vec<u8>),
    Message(Vec<u8>),
    Peer(String),
    Notice(String),
}

/// Handler forwarding each callback to the test.
pub struct RecordingHandler {
    tx: mpsc::UnboundedSender<Callback>,
}

impl LinkHandler for RecordingHandler {
    fn on_connection_status_update(&mut self, state: ConnectionState) {
        let _ = self.tx.send(Callback::Status(state));
    }

    fn on_write_success(&mut self, bytes: &[u8]) {
        let _ = self.tx.send(Callback::WriteSuccess(bytes.to_vec()));
    }

    fn on_new_message(&mut self, bytes: &[u8]) {
        let _ = self.tx.send(Callback::Message(bytes.to_vec()));
    }

    fn on_peer_identified(&mut self, name: &str) {
        let _ = self.tx.send(Callback::Peer(name.to_string()));
    }

    fn on_notice(&mut self, text: &str) {
        let _ = self.tx.send(Callback::Notice(text.to_string()));
    }
}

pub struct Callbacks {
    rx: mpsc::UnboundedReceiver<Callback>,
}

impl Callbacks {
    pub async fn next(&mut self) -> Callback {
        timeout(WAIT, self.rx.recv())
            .await
            .expect("timed out waiting for a callback")
            .expect("event loop stopped")
    }

    /// Collect callbacks up to and including the first one matching `done`.
    pub async fn until(&mut self, done: impl Fn(&Callback) -> bool) -> Vec<Callback> {
        let mut seen = Vec::new();
        loop {
            let callback = self.next().await;
            let finished = done(&callback);
            seen.push(callback);
            if finished {
                return seen;
            }
        }
    }

    /// Assert nothing arrives for `window`.
    pub async fn expect_quiet(&mut self, window: Duration) {
        if let Ok(Some(callback)) = timeout(window, self.rx.recv()).await {
            panic!("unexpected callback: {:?}", callback);
        }
    }
}

/// Coordinator over a mock transport whose event loop is not yet running.
pub fn link_with(config: &LinkConfig) -> (Coordinator<MockTransport>, MockControl, EventLoop) {
    let (transport, control) = MockTransport::new();
    let (coordinator, event_loop) = Coordinator::new(transport, config);
    (coordinator, control, event_loop)
}

/// Run `event_loop` in the background, recording its callbacks.
pub fn run_loop(event_loop: EventLoop) -> Callbacks {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(event_loop.run(RecordingHandler { tx }));
    Callbacks { rx }
}

/// Coordinator over a mock transport with its event loop running.
pub fn spawn_link() -> (Coordinator<MockTransport>, MockControl, Callbacks) {
    let (coordinator, control, event_loop) = link_with(&LinkConfig::default());
    (coordinator, control, run_loop(event_loop))
}

/// Poll `check` until it holds.
pub async fn wait_for(check: impl Fn() -> bool) {
    timeout(WAIT, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for condition");
}
