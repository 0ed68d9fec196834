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

//! Bluetooth RFCOMM transport.

use anyhow::Result;
use bluer::rfcomm::{Listener, SocketAddr, Stream};
use bluer::{Adapter, Address};
use std::io;
use tracing::{debug, info};

use super::{Connection, Transport};
use crate::link::PeerAddress;

/// Transport over Bluetooth RFCOMM (serial port profile).
pub struct RfcommTransport {
    adapter: Adapter,
    channel: u8,
}

impl RfcommTransport {
    /// Open a BlueZ session on the default adapter.
    pub async fn new(channel: u8) -> Result<Self> {
        info!("Initializing Bluetooth transport...");

        let session = bluer::Session::new().await?;
        let adapter = session.default_adapter().await?;
        info!("Using Bluetooth adapter: {}", adapter.name());

        if !adapter.is_powered().await? {
            info!("Powering on Bluetooth adapter...");
            adapter.set_powered(true).await?;
        }

        Ok(Self { adapter, channel })
    }

    /// RFCOMM channel used for both directions.
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Alias of a known device, or its address.
    async fn device_name(&self, addr: Address) -> String {
        match self.adapter.device(addr) {
            Ok(device) => device.alias().await.unwrap_or_else(|_| addr.to_string()),
            Err(_) => addr.to_string(),
        }
    }
}

fn parse_address(address: &PeerAddress) -> io::Result<Address> {
    address.as_str().parse::<Address>().map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid Bluetooth address {}: {}", address, e),
        )
    })
}

impl Transport for RfcommTransport {
    type Stream = Stream;

    async fn connect(&self, address: &PeerAddress) -> io::Result<Connection<Stream>> {
        let addr = parse_address(address)?;
        debug!("RFCOMM connect to {} channel {}", addr, self.channel);

        let stream = Stream::connect(SocketAddr::new(addr, self.channel)).await?;
        let name = self.device_name(addr).await;
        Ok(Connection::new(stream, name))
    }

    async fn accept(&self) -> io::Result<Connection<Stream>> {
        let listener = Listener::bind(SocketAddr::new(Address::any(), self.channel)).await?;
        info!("RFCOMM server listening on channel {}", self.channel);

        let (stream, remote) = listener.accept().await?;
        info!("Connection from: {}", remote.addr);
        let name = self.device_name(remote.addr).await;
        Ok(Connection::new(stream, name))
    }
}
