// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Transport session.
//!
//! Owns the live connection through a background worker task. Each connect
//! or listen starts a new attempt with a fresh generation number; events
//! are stamped with it and the receiving side drops anything produced by an
//! attempt that has since been superseded.

use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::event::{
    LinkEvent, TaggedEvent, CONNECTION_LOST_NOTICE, CONNECT_FAILED_NOTICE, NOT_CONNECTED_NOTICE,
};
use super::state::{ConnectionState, PeerAddress};
use crate::config::LinkConfig;
use crate::error::{LinkError, LinkResult};
use crate::transport::{Connection, Transport};

/// Generation counter and state, always updated together.
#[derive(Debug, Default)]
struct AttemptState {
    generation: u64,
    state: ConnectionState,
    /// Last state whose `StateChanged` made it into the event queue.
    announced: ConnectionState,
}

#[derive(Debug, Default)]
struct Shared {
    inner: Mutex<AttemptState>,
}

impl Shared {
    fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    /// Open a new generation in `state`. Returns it with the previous state.
    fn begin(&self, state: ConnectionState) -> (u64, ConnectionState) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        let previous = std::mem::replace(&mut inner.state, state);
        (inner.generation, previous)
    }

    /// Return to `None` within the current generation.
    ///
    /// Returns whether observers still need to hear about it: false only
    /// when the session is idle and `None` was the last state queued.
    fn reset(&self) -> (u64, bool) {
        let mut inner = self.inner.lock();
        let pending = inner.state != ConnectionState::None
            || inner.announced != ConnectionState::None;
        inner.state = ConnectionState::None;
        (inner.generation, pending)
    }

    fn announce(&self, generation: u64, state: ConnectionState) {
        let mut inner = self.inner.lock();
        if inner.generation == generation {
            inner.announced = state;
        }
    }

    /// Set `state` if `generation` is still the live one.
    fn set_if_current(&self, generation: u64, state: ConnectionState) -> bool {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return false;
        }
        inner.state = state;
        true
    }
}

/// What a worker should do to obtain its connection.
#[derive(Debug, Clone)]
enum Attempt {
    Connect(PeerAddress),
    Listen,
}

impl Attempt {
    fn initial_state(&self) -> ConnectionState {
        match self {
            Attempt::Connect(_) => ConnectionState::Connecting,
            Attempt::Listen => ConnectionState::Listening,
        }
    }
}

/// Emitter bound to one attempt.
#[derive(Clone)]
struct AttemptLink {
    generation: u64,
    shared: Arc<Shared>,
    event_tx: mpsc::Sender<TaggedEvent>,
}

impl AttemptLink {
    fn is_current(&self) -> bool {
        self.shared.generation() == self.generation
    }

    async fn emit(&self, event: LinkEvent) {
        if !self.is_current() {
            trace!("Attempt {} superseded, not emitting {}", self.generation, event.kind());
            return;
        }
        let announced = match event {
            LinkEvent::StateChanged(state) => Some(state),
            _ => None,
        };
        let tagged = TaggedEvent {
            generation: self.generation,
            event,
        };
        if self.event_tx.send(tagged).await.is_err() {
            debug!("Event receiver dropped");
            return;
        }
        if let Some(state) = announced {
            self.shared.announce(self.generation, state);
        }
    }

    /// Move to `state` and announce it. False when the attempt is stale.
    async fn transition(&self, state: ConnectionState) -> bool {
        if !self.shared.set_if_current(self.generation, state) {
            return false;
        }
        self.emit(LinkEvent::StateChanged(state)).await;
        true
    }

    async fn fail(&self, notice: &str) {
        if self.transition(ConnectionState::None).await {
            self.emit(LinkEvent::Notice(notice.to_string())).await;
        }
    }
}

/// Running attempt.
struct Worker {
    handle: JoinHandle<()>,
    write_tx: mpsc::Sender<Vec<u8>>,
}

impl Worker {
    /// Abort the task and wait until it is gone.
    async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}

/// Receiving end of a session's events.
///
/// Yields events in production order and silently drops those of
/// superseded attempts.
pub struct SessionEvents {
    rx: mpsc::Receiver<TaggedEvent>,
    shared: Arc<Shared>,
}

impl SessionEvents {
    /// Next live event, or `None` once the session is gone.
    pub async fn recv(&mut self) -> Option<LinkEvent> {
        self.recv_tagged().await.map(|tagged| tagged.event)
    }

    pub(crate) async fn recv_tagged(&mut self) -> Option<TaggedEvent> {
        loop {
            let tagged = self.rx.recv().await?;
            if tagged.generation == self.shared.generation() {
                return Some(tagged);
            }
            debug!(
                "Dropping stale {} from attempt {}",
                tagged.event.kind(),
                tagged.generation
            );
        }
    }
}

/// One peer connection at a time over a host supplied transport.
pub struct TransportSession<T: Transport> {
    transport: Arc<T>,
    shared: Arc<Shared>,
    event_tx: mpsc::Sender<TaggedEvent>,
    worker: AsyncMutex<Option<Worker>>,
    write_queue_capacity: usize,
    read_buffer_size: usize,
}

impl<T: Transport> TransportSession<T> {
    /// Create an idle session and the receiver for its events.
    pub fn new(transport: T, config: &LinkConfig) -> (Self, SessionEvents) {
        let (event_tx, rx) = mpsc::channel(config.event_queue_capacity.max(1));
        let shared = Arc::new(Shared::default());

        let session = Self {
            transport: Arc::new(transport),
            shared: shared.clone(),
            event_tx,
            worker: AsyncMutex::new(None),
            write_queue_capacity: config.write_queue_capacity.max(1),
            read_buffer_size: config.read_buffer_size.max(1),
        };

        (session, SessionEvents { rx, shared })
    }

    /// Current state snapshot.
    pub fn current_state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Start an outbound connection, cancelling any previous attempt.
    pub async fn connect(&self, address: PeerAddress) {
        info!("Connecting to {}", address);
        self.start(Attempt::Connect(address)).await;
    }

    /// Wait for an inbound connection, cancelling any previous attempt.
    pub async fn listen(&self) {
        info!("Listening for an inbound connection");
        self.start(Attempt::Listen).await;
    }

    async fn start(&self, attempt: Attempt) {
        let initial = attempt.initial_state();
        let mut worker = self.worker.lock().await;

        let superseded = worker.take();
        let had_attempt = superseded.is_some();
        if let Some(previous) = superseded {
            debug!("Cancelling previous attempt");
            previous.shutdown().await;
        }

        let (generation, previous) = self.shared.begin(initial);
        let link = AttemptLink {
            generation,
            shared: self.shared.clone(),
            event_tx: self.event_tx.clone(),
        };

        // Route through None so observers only see valid edges, even when the
        // old attempt's final events were dropped as stale.
        if had_attempt || previous != ConnectionState::None {
            link.emit(LinkEvent::StateChanged(ConnectionState::None)).await;
        }
        link.emit(LinkEvent::StateChanged(initial)).await;

        let (write_tx, write_rx) = mpsc::channel(self.write_queue_capacity);
        let handle = tokio::spawn(run_attempt(
            self.transport.clone(),
            attempt,
            link,
            write_rx,
            self.read_buffer_size,
        ));

        *worker = Some(Worker { handle, write_tx });
    }

    /// Queue `bytes` for the peer.
    ///
    /// Without a connection a notice is emitted instead.
    pub async fn write(&self, bytes: Vec<u8>) {
        let worker = self.worker.lock().await;

        let queued = match worker.as_ref() {
            Some(worker) if self.shared.state() == ConnectionState::Connected => {
                worker.write_tx.send(bytes).await.is_ok()
            }
            _ => false,
        };

        if !queued {
            warn!("Write requested while not connected");
            let link = AttemptLink {
                generation: self.shared.generation(),
                shared: self.shared.clone(),
                event_tx: self.event_tx.clone(),
            };
            link.emit(LinkEvent::Notice(NOT_CONNECTED_NOTICE.to_string()))
                .await;
        }
    }

    /// Tear down any attempt and return to `None`.
    ///
    /// Emits `StateChanged(None)` unless the session was already idle and
    /// that had been reported. Waits for room in the event queue, so the
    /// event loop must be running for this to return.
    pub async fn stop(&self) {
        self.stop_attempt().await;
    }

    /// [`Self::stop`], returning the generation that was stopped.
    pub(crate) async fn stop_attempt(&self) -> u64 {
        let mut worker = self.worker.lock().await;

        if let Some(previous) = worker.take() {
            previous.shutdown().await;
        }

        // The worker is gone, so its queued events stay valid and precede this.
        // It may have died before its own None reached the queue.
        let (generation, pending) = self.shared.reset();
        if !pending {
            debug!("Stop requested while idle");
            return generation;
        }

        let link = AttemptLink {
            generation,
            shared: self.shared.clone(),
            event_tx: self.event_tx.clone(),
        };
        link.emit(LinkEvent::StateChanged(ConnectionState::None))
            .await;
        info!("Session stopped");
        generation
    }
}

impl<T: Transport> Drop for TransportSession<T> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.get_mut().take() {
            worker.handle.abort();
        }
    }
}

/// Worker body: obtain a connection, then pump bytes until it fails.
async fn run_attempt<T: Transport>(
    transport: Arc<T>,
    attempt: Attempt,
    link: AttemptLink,
    write_rx: mpsc::Receiver<Vec<u8>>,
    read_buffer_size: usize,
) {
    let result = match &attempt {
        Attempt::Connect(address) => transport.connect(address).await,
        Attempt::Listen => transport.accept().await,
    };

    let Connection { stream, peer_name } = match result {
        Ok(connection) => connection,
        Err(e) => {
            warn!("{}", LinkError::ConnectFailed(e.to_string()));
            link.fail(CONNECT_FAILED_NOTICE).await;
            return;
        }
    };

    if !link.transition(ConnectionState::Connected).await {
        debug!("Connection to {} completed after supersede, closing", peer_name);
        return;
    }
    info!("Connected to {}", peer_name);
    link.emit(LinkEvent::PeerIdentified(peer_name)).await;

    match pump(stream, write_rx, &link, read_buffer_size).await {
        Ok(()) => debug!("Write queue closed, worker exiting"),
        Err(e) => {
            warn!("Connection lost: {}", e);
            link.fail(CONNECTION_LOST_NOTICE).await;
        }
    }
}

/// Read and write loop over an established stream.
async fn pump<S>(
    stream: S,
    mut write_rx: mpsc::Receiver<Vec<u8>>,
    link: &AttemptLink,
    read_buffer_size: usize,
) -> LinkResult<()>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let mut buf = vec![0u8; read_buffer_size];

    loop {
        tokio::select! {
            read = reader.read(&mut buf) => {
                let n = read?;
                if n == 0 {
                    return Err(LinkError::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "peer closed the connection",
                    )));
                }
                debug!("Received {} bytes", n);
                link.emit(LinkEvent::MessageReceived(buf[..n].to_vec())).await;
            }
            outgoing = write_rx.recv() => {
                let Some(bytes) = outgoing else {
                    return Ok(());
                };
                writer.write_all(&bytes).await?;
                writer.flush().await?;
                debug!("Sent {} bytes", bytes.len());
                link.emit(LinkEvent::WriteCompleted(bytes)).await;
            }
        }
    }
}
