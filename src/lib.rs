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

//! btlink: connection state machine and event dispatch for a single-peer
//! Bluetooth serial link.

pub mod config;
pub mod error;
pub mod link;
pub mod transport;

pub use error::{LinkError, LinkResult};
pub use link::{ConnectionState, Coordinator, EventLoop, LinkEvent, LinkHandler, PeerAddress};
