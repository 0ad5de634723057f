//! # Link Gateway
//!
//! Entry point started by the container: one process, one listener.
//!
//! ## Startup Sequence
//!
//! 1. Load `.env` from the working directory, if present
//! 2. Initialize logging
//! 3. Load configuration (defaults → TOML file → environment → flags)
//! 4. Locate the yt-dlp executable
//! 5. Bind the declared port and serve until Ctrl-C / SIGTERM

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use link_gateway::telemetry::{init_logging, TelemetryConfig};
use link_gateway::{GatewayConfig, LinkGatewayService, YtDlpExtractor, VERSION};

/// Link Gateway: resolve direct media links through yt-dlp
#[derive(Parser, Debug)]
#[command(name = "link-gateway", version)]
#[command(about = "HTTP gateway resolving direct media links through yt-dlp")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "LINK_GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address (overrides config)
    #[arg(long, env = "LINK_GATEWAY_HOST")]
    host: Option<IpAddr>,

    /// Bind port (overrides config)
    #[arg(short, long, env = "LINK_GATEWAY_PORT")]
    port: Option<u16>,

    /// yt-dlp executable (overrides config and YT_DLP_PATH)
    #[arg(long)]
    yt_dlp: Option<PathBuf>,
}

/// Load configuration and apply command-line overrides
fn load_config(args: &Args) -> Result<GatewayConfig> {
    let mut config = GatewayConfig::load(args.config.as_deref()).with_context(|| {
        match &args.config {
            Some(path) => format!("Failed to load configuration from {}", path.display()),
            None => "Failed to load configuration".to_string(),
        }
    })?;

    if let Some(host) = args.host {
        config.http.host = host;
    }
    if let Some(port) = args.port {
        config.http.port = port;
    }
    if let Some(binary) = &args.yt_dlp {
        config.extractor.binary = binary.clone();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    let args = Args::parse();

    init_logging(&TelemetryConfig::from_env()).context("Failed to initialize logging")?;

    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded environment file"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "Ignoring unreadable .env file"),
    }

    let config = load_config(&args)?;

    info!("===========================================");
    info!("  Link Gateway v{}", VERSION);
    info!("===========================================");
    if config.auth.api_keys.is_empty() {
        warn!("No API keys configured (ALLOW_API_KEYS); every request will be rejected");
    }

    let extractor = Arc::new(YtDlpExtractor::locate(&config.extractor));
    let service = LinkGatewayService::new(config, extractor)?;

    info!(addr = %service.config().http_addr(), "Starting HTTP server");
    service.start().await.context("Link gateway terminated")?;

    Ok(())
}
