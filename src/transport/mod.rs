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

//! Byte-stream transports.
//!
//! A transport knows how to open or accept one connection to a peer. The
//! session owns whatever it returns and closes it by dropping the stream.

#[cfg(feature = "rfcomm")]
mod rfcomm;
mod tcp;

#[cfg(feature = "rfcomm")]
pub use rfcomm::RfcommTransport;
pub use tcp::TcpTransport;

use std::future::Future;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::link::PeerAddress;

/// An established connection to a peer.
#[derive(Debug)]
pub struct Connection<S> {
    /// Bidirectional byte stream.
    pub stream: S,
    /// Human readable name of the peer.
    pub peer_name: String,
}

impl<S> Connection<S> {
    pub fn new(stream: S, peer_name: impl Into<String>) -> Self {
        Self {
            stream,
            peer_name: peer_name.into(),
        }
    }
}

/// Host supplied connection factory.
pub trait Transport: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Open an outbound connection to `address`.
    fn connect(
        &self,
        address: &PeerAddress,
    ) -> impl Future<Output = io::Result<Connection<Self::Stream>>> + Send;

    /// Wait for one inbound connection.
    fn accept(&self) -> impl Future<Output = io::Result<Connection<Self::Stream>>> + Send;
}
