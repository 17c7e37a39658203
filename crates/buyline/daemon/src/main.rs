//! Buyline daemon - media buy workflow service
//!
//! The daemon provides:
//! - REST API for media buy intake, readiness, and creative sync
//! - Approval queue surface for human decisions
//! - Ad server adapter wiring with failure injection for development

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod error;
mod server;

use config::BuylineConfig;
use error::DaemonResult;
use server::Server;

/// Buyline daemon CLI
#[derive(Parser)]
#[command(name = "buylined")]
#[command(about = "Buyline - Media buy workflow daemon", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "BUYLINE_CONFIG")]
    config: Option<String>,

    /// Listen address (overrides the config file)
    #[arg(short, long, env = "BUYLINE_LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level (overrides the config file)
    #[arg(long, env = "BUYLINE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "BUYLINE_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = BuylineConfig::load(cli.config.as_deref())
        .map_err(|e| error::DaemonError::Config(e.to_string()))?;

    // Override with CLI args
    if let Some(listen) = cli.listen.as_deref() {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| error::DaemonError::Config(format!("Invalid listen address: {}", e)))?;
    }

    // Initialize tracing. RUST_LOG wins over both the flag and the file.
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    if cli.json || config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Print startup banner
    println!(
        r#"
  ____  _   _ __   __ _     ___ _   _ _____
 | __ )| | | |\ \ / /| |   |_ _| \ | | ____|
 |  _ \| | | | \ V / | |    | ||  \| |  _|
 | |_) || |_| |  | |  | |___ | || |\  | |___
 |____/  \___/   |_|  |_____|___|_| \_|_____|

  Media buy workflow daemon
  Version: {}
  Listening: {}
"#,
        env!("CARGO_PKG_VERSION"),
        config.server.listen_addr
    );

    // Create and run server
    let server = Server::new(config)?;
    server.run().await
}
