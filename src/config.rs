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

//! Configuration module.
//!
//! Handles loading and saving link settings.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default log level when `RUST_LOG` does not say otherwise.
    pub log_level: String,

    /// Event and I/O tuning.
    pub link: LinkConfig,

    /// Which peer to talk to and how.
    pub peer: PeerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Bound of the session to coordinator event queue.
    pub event_queue_capacity: usize,

    /// Bound of the pending write queue.
    pub write_queue_capacity: usize,

    /// Size of a single read from the connection.
    pub read_buffer_size: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            event_queue_capacity: 32,
            write_queue_capacity: 16,
            read_buffer_size: 1024,
        }
    }
}

/// Whether to dial out or wait for the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerMode {
    Connect,
    Listen,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConfig {
    pub mode: PeerMode,

    /// Peer to connect to: a Bluetooth address, or host:port for TCP.
    pub address: Option<String>,

    /// Local address for TCP listen mode.
    pub listen_address: String,

    /// RFCOMM channel for Bluetooth.
    pub rfcomm_channel: u8,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            mode: PeerMode::Connect,
            address: None,
            listen_address: "0.0.0.0:7878".to_string(),
            rfcomm_channel: 1,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            link: LinkConfig::default(),
            peer: PeerConfig::default(),
        }
    }
}

impl Config {
    /// Default location of the config file.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("btlink")
            .join("config.toml")
    }

    /// Load configuration from the default file or create it.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from `path`, writing defaults there if missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }
}
