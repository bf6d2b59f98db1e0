//! jvc-relay binary entry point.
//!
//! Usage:
//! ```bash
//! jvc-relay projector.lan
//! jvc-relay --config relay.toml
//! jvc-relay -t 5 -r 2 -w 5 -l info projector.lan
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use jvc_relay::config::Config;
use jvc_relay::server::RelayServer;
use std::path::PathBuf;

/// Handshaking TCP relay for JVC projector control connections.
#[derive(Parser, Debug)]
#[command(name = "jvc-relay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Projector host to relay to
    device_host: Option<String>,

    /// Projector control port
    #[arg(long)]
    device_port: Option<u16>,

    /// Address to listen on for client connections
    #[arg(long)]
    bind: Option<String>,

    /// Timeout for network operations, in seconds
    #[arg(short = 't', long)]
    timeout: Option<u64>,

    /// Connection retries to allow against the projector
    #[arg(short = 'r', long)]
    retries: Option<u32>,

    /// Seconds to wait between connection retries
    #[arg(short = 'w', long)]
    retry_wait: Option<u64>,

    /// Logging level when RUST_LOG is not set
    #[arg(short = 'l', long, default_value = "error")]
    log_level: String,

    /// Optional TOML configuration file; flags override file values
    #[arg(long)]
    config: Option<PathBuf>,
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Merge the configuration file (if any) with command-line overrides.
fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path).context("loading configuration file")?,
        None => Config::for_device(cli.device_host.clone().unwrap_or_default()),
    };

    if let Some(host) = &cli.device_host {
        config.device.host.clone_from(host);
    }
    if let Some(port) = cli.device_port {
        config.device.port = port;
    }
    if let Some(bind) = &cli.bind {
        config.server.bind_address.clone_from(bind);
    }
    if let Some(timeout) = cli.timeout {
        config.session.timeout_secs = timeout;
    }
    if let Some(retries) = cli.retries {
        config.session.retries = retries;
    }
    if let Some(wait) = cli.retry_wait {
        config.session.retry_wait_secs = wait;
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = build_config(&cli)?;
    let server = RelayServer::new(config);

    if server.config().http.enabled {
        let bind = server.config().http.bind_address.clone();
        let metrics = server.metrics();
        tokio::spawn(async move {
            if let Err(e) = jvc_relay::http::serve(&bind, metrics).await {
                tracing::error!("HTTP endpoints failed: {e}");
            }
        });
    }

    server.run().await.context("relay server failed")?;
    Ok(())
}
