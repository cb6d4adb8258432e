//! CLI for rvdash
//!
//! Subcommands:
//! - `server`: run the dashboard backend
//! - `watch`: print every envelope broadcast on `/ws` (useful for smoke tests)

use clap::Parser;
use rvdash::config::{Settings, load_config};
use rvdash::server;
use rvdash::utils::error::ServerError;
use rvdash::utils::logging;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "rvdash", version)]
enum Command {
    /// Start the dashboard backend
    Server,
    /// Connect to a running server and print broadcasts
    Watch {
        /// WebSocket URL to connect to
        #[arg(long, default_value = "ws://127.0.0.1:3000/ws")]
        url: String,
    },
}

#[tokio::main]
async fn main() {
    let cmd = Command::parse();

    match cmd {
        Command::Server => {
            let config = match load_config() {
                Ok(config) => config,
                Err(e) => {
                    logging::init("info");
                    error!("Failed to load configuration: {}", e);
                    return;
                }
            };
            logging::init(&config.log.level);
            if let Err(e) = run_server(config).await {
                error!("Server failed: {}", e);
            }
        }
        Command::Watch { url } => {
            logging::init("info");
            if let Err(e) = run_watch(&url).await {
                error!("Watch failed: {}", e);
            }
        }
    }
}

async fn run_server(config: Settings) -> Result<(), ServerError> {
    let listener = server::bind(&config.server).await?;
    let server = server::prepare(config)?;

    tokio::select! {
        result = server.serve(listener) => {
            if let Err(e) = result {
                error!("HTTP server exited: {}", e);
            } else {
                error!("HTTP server exited unexpectedly.");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    server.shutdown();
    Ok(())
}

async fn run_watch(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    use futures_util::StreamExt;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    let (mut ws_stream, _response) = connect_async(url).await?;
    info!(url, "Connected; waiting for broadcasts");

    while let Some(msg) = ws_stream.next().await {
        match msg? {
            WsMessage::Text(text) => println!("{}", text.as_str()),
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    info!("Connection closed");
    Ok(())
}
