// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use sentinel_config::SentinelConfig;
use sentinel_server::{parse_request_line, response_line, SentinelServer};
use std::path::PathBuf;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sentinel-server", version, about = "MCP Sentinel stdio server")]
struct Args {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug-level logging.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.debug {
        EnvFilter::new("sentinel=debug")
    } else {
        EnvFilter::new("sentinel=info")
    };
    // All diagnostic logging goes to stderr: stdout is the JSON-RPC
    // transport and must carry nothing but response lines.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let (config, warnings) = match &args.config {
        Some(path) => SentinelConfig::load(path).with_context(|| format!("load config {}", path.display()))?,
        None => SentinelConfig::load_default_with_env(),
    };
    for warning in &warnings {
        warn!(%warning, "configuration warning");
    }

    let server = SentinelServer::from_config(&config);

    info!("mcp-sentinel listening for JSON-RPC requests on stdio");
    run_stdio_loop(&server).await
}

async fn run_stdio_loop(server: &SentinelServer) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = BufReader::new(stdin).lines();

    while let Some(line) = lines.next_line().await.context("read stdin")? {
        if line.trim().is_empty() {
            continue;
        }

        let now_ms = Utc::now().timestamp_millis();
        let response = match parse_request_line(&line) {
            Ok(request) => server.dispatch(request, now_ms).await,
            Err(response) => response,
        };

        let mut out = response_line(&response);
        out.push('\n');
        stdout.write_all(out.as_bytes()).await.context("write stdout")?;
        stdout.flush().await.context("flush stdout")?;
    }

    Ok(())
}
