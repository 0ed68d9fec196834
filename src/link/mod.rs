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

//! Single-peer link.
//!
//! A [`TransportSession`] owns the connection and runs its I/O on a worker
//! task; a [`Coordinator`] mirrors the session state and dispatches events to
//! the application's [`LinkHandler`] from one [`EventLoop`].

mod coordinator;
mod event;
mod session;
mod state;

pub use coordinator::{Coordinator, EventLoop, LinkHandler};
pub use event::{LinkEvent, CONNECTION_LOST_NOTICE, CONNECT_FAILED_NOTICE, NOT_CONNECTED_NOTICE};
pub use session::{SessionEvents, TransportSession};
pub use state::{ConnectionState, PeerAddress};
