// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! CityPulse Web Workspace
//!
//! Standalone server for the browser workspace.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use citypulse::config::AppConfig;
use citypulse::reasoning::GeminiClient;
use citypulse::session::Workspace;
use citypulse::Result;

#[derive(Parser, Debug)]
#[command(name = "citypulse-web")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "CityPulse Web Workspace Server")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Host to bind to
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Open browser automatically
    #[arg(long)]
    open: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("CityPulse Web Workspace v{}", env!("CARGO_PKG_VERSION"));

    let mut config = AppConfig::load(&args.config)?;
    if let Some(host) = args.host {
        config.web.host = host;
    }
    if let Some(port) = args.port {
        config.web.port = port;
    }

    let client = GeminiClient::new(&config)?;
    info!(
        "Reasoning model: {}, transcription model: {}",
        config.ai_engine.models.reasoning, config.ai_engine.models.transcription
    );
    let workspace = Workspace::new(Arc::new(client), &config);

    if args.open {
        let url = format!("http://{}:{}", config.web.host, config.web.port);
        if let Err(e) = open_browser(&url) {
            error!("Failed to open browser: {}", e);
        }
    }

    citypulse::web::start_server(config, workspace).await
}

fn open_browser(url: &str) -> std::io::Result<()> {
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd").args(["/c", "start", url]).spawn()?;
    }
    Ok(())
}
