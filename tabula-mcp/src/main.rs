//! Tabula MCP Server
//!
//! Tools:
//! - call: Evaluate one statistics function
//! - help: Get documentation for functions
//! - list_functions: List available functions

mod config;
mod server;

use config::{ServerConfig, DEFAULT_LOG_FILTER};
use server::{Server, PROTOCOL_VERSION, SERVER_VERSION};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Logs go to stderr; stdout carries the protocol
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = ServerConfig::from_env();
    let server = Server::new(&config);

    tracing::info!(
        version = SERVER_VERSION,
        protocol = PROTOCOL_VERSION,
        functions = server.function_count(),
        precision = config.precision,
        "Tabula MCP server started"
    );

    let mut lines = BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::info!("client disconnected (EOF)");
                break;
            }
            Err(e) => {
                tracing::error!(error = %e, "error reading input");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        tracing::debug!(bytes = line.len(), "received");

        if let Some(response) = server.handle_line(line) {
            stdout.write_all(response.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }

    tracing::info!("server shutting down");
    Ok(())
}
