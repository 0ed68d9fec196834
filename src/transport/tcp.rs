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

//! TCP transport, for serial bridges and emulators.

use std::io;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use super::{Connection, Transport};
use crate::link::PeerAddress;

/// Transport over plain TCP sockets.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    listen_addr: String,
}

impl TcpTransport {
    /// Create a transport that accepts on `listen_addr` (e.g. `0.0.0.0:7878`).
    pub fn new(listen_addr: impl Into<String>) -> Self {
        Self {
            listen_addr: listen_addr.into(),
        }
    }

    pub fn listen_addr(&self) -> &str {
        &self.listen_addr
    }
}

impl Transport for TcpTransport {
    type Stream = TcpStream;

    async fn connect(&self, address: &PeerAddress) -> io::Result<Connection<TcpStream>> {
        debug!("TCP connect to {}", address);
        let stream = TcpStream::connect(address.as_str()).await?;
        stream.set_nodelay(true)?;
        let peer_name = stream.peer_addr()?.to_string();
        Ok(Connection::new(stream, peer_name))
    }

    async fn accept(&self) -> io::Result<Connection<TcpStream>> {
        let listener = TcpListener::bind(&self.listen_addr).await?;
        info!("TCP listening on {}", listener.local_addr()?);

        let (stream, remote_addr) = listener.accept().await?;
        info!("Connection from: {}", remote_addr);
        stream.set_nodelay(true)?;
        Ok(Connection::new(stream, remote_addr.to_string()))
    }
}
