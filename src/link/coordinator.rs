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

//! Connection coordinator and event dispatch.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::event::{LinkEvent, TaggedEvent};
use super::session::{SessionEvents, TransportSession};
use super::state::{ConnectionState, PeerAddress};
use crate::config::LinkConfig;
use crate::error::{LinkError, LinkResult};
use crate::transport::Transport;

/// Callbacks into the application layer.
///
/// Called from the event loop, one at a time, in event order.
pub trait LinkHandler: Send {
    /// Connection state changed.
    fn on_connection_status_update(&mut self, state: ConnectionState) {
        debug!("Connectivity changed: {}", state);
    }

    /// Bytes were written to the peer.
    fn on_write_success(&mut self, bytes: &[u8]) {
        debug!("Response message: {}", String::from_utf8_lossy(bytes));
    }

    /// Bytes arrived from the peer.
    fn on_new_message(&mut self, bytes: &[u8]);

    /// The connected peer's name is known.
    fn on_peer_identified(&mut self, name: &str) {
        info!("Connected to {}", name);
    }

    /// Diagnostic for the user. Does not imply a state change.
    fn on_notice(&mut self, text: &str) {
        warn!("Link notice: {}", text);
    }
}

/// Mirror of the session, written only by the event loop (and `stop`).
#[derive(Debug, Default)]
struct LinkState {
    state: RwLock<ConnectionState>,
    peer: RwLock<PeerName>,
}

#[derive(Debug, Default)]
struct PeerName {
    name: Option<String>,
    /// Names from this generation or older belong to a stopped attempt.
    stopped_generation: u64,
}

/// Application-facing handle to the link.
///
/// Cheap to clone; all clones drive the same session.
pub struct Coordinator<T: Transport> {
    session: Arc<TransportSession<T>>,
    link: Arc<LinkState>,
}

impl<T: Transport> Clone for Coordinator<T> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            link: self.link.clone(),
        }
    }
}

impl<T: Transport> Coordinator<T> {
    /// Create a coordinator and the event loop that must be run for it.
    pub fn new(transport: T, config: &LinkConfig) -> (Self, EventLoop) {
        let (session, events) = TransportSession::new(transport, config);
        let link = Arc::new(LinkState::default());

        let coordinator = Self {
            session: Arc::new(session),
            link: link.clone(),
        };

        (coordinator, EventLoop { events, link })
    }

    /// Connect to `address`, replacing any current connection.
    pub async fn request_connect(&self, address: impl Into<PeerAddress>) {
        self.session.connect(address.into()).await;
    }

    /// Wait for a peer to connect to us.
    pub async fn listen(&self) {
        self.session.listen().await;
    }

    /// Send raw bytes to the peer.
    ///
    /// Fails with [`LinkError::NotConnected`] without touching the transport
    /// unless the link is connected. An empty buffer is accepted and ignored.
    pub async fn send(&self, bytes: &[u8]) -> LinkResult<()> {
        if !self.is_connected() {
            debug!("Send of {} bytes refused, not connected", bytes.len());
            return Err(LinkError::NotConnected);
        }

        if bytes.is_empty() {
            return Ok(());
        }

        self.session.write(bytes.to_vec()).await;
        Ok(())
    }

    /// Send a UTF-8 string.
    pub async fn send_text(&self, text: &str) -> LinkResult<()> {
        self.send(text.as_bytes()).await
    }

    /// Drop the connection and forget the peer name.
    pub async fn stop(&self) {
        let generation = self.session.stop_attempt().await;

        let mut peer = self.link.peer.write();
        peer.stopped_generation = peer.stopped_generation.max(generation);
        peer.name = None;
    }

    /// State as last reported through the event loop.
    pub fn current_state(&self) -> ConnectionState {
        *self.link.state.read()
    }

    pub fn is_connected(&self) -> bool {
        self.current_state() == ConnectionState::Connected
    }

    /// Name of the last connected peer, if any.
    pub fn connected_device_name(&self) -> Option<String> {
        self.link.peer.read().name.clone()
    }

    /// Live session state, which may be ahead of [`Self::current_state`].
    pub fn session_state(&self) -> ConnectionState {
        self.session.current_state()
    }
}

/// Single consumer of session events.
pub struct EventLoop {
    events: SessionEvents,
    link: Arc<LinkState>,
}

impl EventLoop {
    /// Dispatch events until the session is dropped, then hand the handler back.
    pub async fn run<H: LinkHandler>(mut self, mut handler: H) -> H {
        info!("Link event loop started");
        while self.next(&mut handler).await {}
        info!("Link event loop stopped");
        handler
    }

    /// Dispatch one event. Returns false once the session is gone.
    pub async fn next<H: LinkHandler>(&mut self, handler: &mut H) -> bool {
        match self.events.recv_tagged().await {
            Some(tagged) => {
                self.dispatch(tagged, handler);
                true
            }
            None => false,
        }
    }

    fn dispatch<H: LinkHandler>(&self, tagged: TaggedEvent, handler: &mut H) {
        let TaggedEvent { generation, event } = tagged;
        match event {
            LinkEvent::StateChanged(next) => {
                let current = *self.link.state.read();
                if !current.can_transition_to(next) {
                    debug!("Ignoring stale state change {:?} -> {:?}", current, next);
                    return;
                }
                *self.link.state.write() = next;
                info!("Connection state: {:?} -> {:?}", current, next);
                handler.on_connection_status_update(next);
            }
            LinkEvent::PeerIdentified(name) => {
                {
                    let mut peer = self.link.peer.write();
                    if generation > peer.stopped_generation {
                        peer.name = Some(name.clone());
                    } else {
                        debug!("Not caching {} from stopped attempt {}", name, generation);
                    }
                }
                handler.on_peer_identified(&name);
            }
            LinkEvent::MessageReceived(bytes) => {
                debug!("Message received: {} bytes", bytes.len());
                handler.on_new_message(&bytes);
            }
            LinkEvent::WriteCompleted(bytes) => {
                handler.on_write_success(&bytes);
            }
            LinkEvent::Notice(text) => {
                handler.on_notice(&text);
            }
        }
    }
}
