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

//! btlink console: a terminal for one serial link peer.

use anyhow::{bail, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use btlink::config::{Config, PeerMode};
use btlink::transport::Transport;
use btlink::{ConnectionState, Coordinator, LinkError, LinkHandler};

/// Prints link traffic to the terminal.
struct ConsoleHandler;

impl LinkHandler for ConsoleHandler {
    fn on_connection_status_update(&mut self, state: ConnectionState) {
        println!("-- {}", state);
    }

    fn on_write_success(&mut self, bytes: &[u8]) {
        info!("Sent: {}", String::from_utf8_lossy(bytes).trim_end());
    }

    fn on_new_message(&mut self, bytes: &[u8]) {
        println!("<< {}", String::from_utf8_lossy(bytes).trim_end());
    }

    fn on_peer_identified(&mut self, name: &str) {
        println!("-- Connected to {}", name);
    }

    fn on_notice(&mut self, text: &str) {
        println!("!! {}", text);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("btlink={}", config.log_level).parse()?),
        )
        .init();

    info!("Starting btlink v{}...", env!("CARGO_PKG_VERSION"));

    // A command line address always means connect mode.
    let cli_address = std::env::args().nth(1);
    let mode = if cli_address.is_some() {
        PeerMode::Connect
    } else {
        config.peer.mode
    };
    let address = cli_address.or_else(|| config.peer.address.clone());

    if mode == PeerMode::Connect && address.is_none() {
        bail!("No peer address given; pass one as argument or set peer.address");
    }

    #[cfg(feature = "rfcomm")]
    let transport = btlink::transport::RfcommTransport::new(config.peer.rfcomm_channel).await?;
    #[cfg(not(feature = "rfcomm"))]
    let transport = btlink::transport::TcpTransport::new(config.peer.listen_address.clone());

    run(transport, &config, mode, address).await?;

    info!("btlink stopped");
    Ok(())
}

async fn run<T: Transport>(
    transport: T,
    config: &Config,
    mode: PeerMode,
    address: Option<String>,
) -> Result<()> {
    let (coordinator, event_loop) = Coordinator::new(transport, &config.link);
    let events = tokio::spawn(event_loop.run(ConsoleHandler));

    match (mode, address) {
        (PeerMode::Connect, Some(address)) => coordinator.request_connect(address).await,
        _ => coordinator.listen().await,
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => match coordinator.send_text(&format!("{}\n", line)).await {
                        Ok(()) => {}
                        Err(LinkError::NotConnected) => {
                            println!("!! {}", LinkError::NotConnected);
                        }
                        Err(e) => error!("Send failed: {}", e),
                    },
                    None => {
                        info!("Input closed");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    coordinator.stop().await;
    drop(coordinator);

    if let Err(e) = events.await {
        warn!("Event loop ended abnormally: {}", e);
    }
    Ok(())
}
