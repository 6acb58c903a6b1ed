use anyhow::Result;
use clap::Parser;
use plume::config::{Config, OperatingMode};
use std::path::PathBuf;

/// Development emulator for the Plume thermal-printer companion's HTTP API.
#[derive(Debug, Parser)]
#[command(name = "plume", version, about)]
struct Cli {
    /// Path to a TOML config file (defaults apply when omitted).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bind host (overrides the config file).
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides the config file).
    #[arg(long)]
    port: Option<u16>,

    /// Start in provisioning mode: auth bypassed, setup surface only.
    #[arg(long)]
    provisioning: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("plume=info,tower_http=warn")),
        )
        .init();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.gateway.host = host;
    }
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }

    let mode = if cli.provisioning {
        OperatingMode::Provisioning
    } else {
        OperatingMode::Normal
    };

    plume::gateway::run(mode, config).await
}
