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

//! Events emitted by a transport session.

use super::state::ConnectionState;

/// Notice text when an outbound or inbound connection cannot be established.
pub const CONNECT_FAILED_NOTICE: &str = "connection failed";

/// Notice text when an established connection drops.
pub const CONNECTION_LOST_NOTICE: &str = "connection lost";

/// Notice text when a write is requested without a connection.
pub const NOT_CONNECTED_NOTICE: &str = "not connected";

/// Events emitted by a transport session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Session state changed.
    StateChanged(ConnectionState),
    /// Bytes read from the peer.
    MessageReceived(Vec<u8>),
    /// Bytes written to the peer.
    WriteCompleted(Vec<u8>),
    /// Connected peer's name.
    PeerIdentified(String),
    /// Diagnostic text for the user.
    Notice(String),
}

impl LinkEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StateChanged(_) => "STATE_CHANGE",
            Self::MessageReceived(_) => "READ",
            Self::WriteCompleted(_) => "WRITE",
            Self::PeerIdentified(_) => "DEVICE_NAME",
            Self::Notice(_) => "NOTICE",
        }
    }
}

/// An event stamped with the attempt generation that produced it.
#[derive(Debug)]
pub(crate) struct TaggedEvent {
    pub generation: u64,
    pub event: LinkEvent,
}
