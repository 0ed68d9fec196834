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

//! Connection state and peer addressing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection state of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Nothing in progress.
    #[default]
    None,
    /// Waiting for an inbound connection.
    Listening,
    /// Outbound connection attempt in progress.
    Connecting,
    /// Connected to a peer.
    Connected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::None => "Not connected",
            ConnectionState::Listening => "Listening...",
            ConnectionState::Connecting => "Connecting...",
            ConnectionState::Connected => "Connected",
        }
    }

    /// Whether moving from `self` to `next` is a valid edge.
    ///
    /// Any state may return to `None`. Repeating the current state is not a
    /// transition.
    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        match (*self, next) {
            (ConnectionState::None, ConnectionState::Connecting)
            | (ConnectionState::None, ConnectionState::Listening) => true,
            (ConnectionState::Connecting, ConnectionState::Connected)
            | (ConnectionState::Listening, ConnectionState::Connected) => true,
            (from, ConnectionState::None) => from != ConnectionState::None,
            _ => false,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque identifier of the remote endpoint, e.g. a Bluetooth MAC address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerAddress(String);

impl PeerAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerAddress {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for PeerAddress {
    fn from(address: String) -> Self {
        Self(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::ConnectionState::{Connected, Connecting, Listening, None as Idle};

    const ALL: [ConnectionState; 4] = [Idle, Listening, Connecting, Connected];

    #[test]
    fn test_valid_edges() {
        assert!(Idle.can_transition_to(Connecting));
        assert!(Idle.can_transition_to(Listening));
        assert!(Connecting.can_transition_to(Connected));
        assert!(Listening.can_transition_to(Connected));
        assert!(Connected.can_transition_to(Idle));
        assert!(Connecting.can_transition_to(Idle));
        assert!(Listening.can_transition_to(Idle));
    }

    #[test]
    fn test_invalid_edges() {
        assert!(!Idle.can_transition_to(Connected));
        assert!(!Connected.can_transition_to(Connecting));
        assert!(!Connected.can_transition_to(Listening));
        assert!(!Listening.can_transition_to(Connecting));
        assert!(!Connecting.can_transition_to(Listening));
    }

    #[test]
    fn test_same_state_is_not_a_transition() {
        for state in ALL {
            assert!(!state.can_transition_to(state), "{:?}", state);
        }
    }

    #[test]
    fn test_peer_address_display() {
        let addr = PeerAddress::from("AA:BB:CC:DD:EE:FF");
        assert_eq!(addr.to_string(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(addr.as_str(), "AA:BB:CC:DD:EE:FF");
    }
}
