// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! CityPulse: urban intelligence workspace
//!
//! Command-line front-end: one-shot analysis and transcription, plus the
//! web workspace server.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use citypulse::config::AppConfig;
use citypulse::ingest::RawSelection;
use citypulse::present::render_text;
use citypulse::reasoning::{AudioClip, GeminiClient};
use citypulse::session::{Action, RunOutcome, TranscribeOutcome, Workspace};
use citypulse::{CityPulseError, Result};

/// CityPulse CLI - urban intelligence from city data and field notes
#[derive(Parser, Debug)]
#[command(name = "citypulse")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Turn city datasets and field notes into structured urban analysis", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the web workspace
    Serve {
        /// Host to bind to (overrides config)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Analyse files and notes in one shot
    Analyze {
        /// Datasets, images and documents to include
        paths: Vec<PathBuf>,

        /// Urban context notes
        #[arg(short = 'n', long)]
        context: Option<String>,

        /// Read context notes from a file
        #[arg(long, conflicts_with = "context")]
        context_file: Option<PathBuf>,
    },

    /// Transcribe a voice memo
    Transcribe {
        /// Audio recording (webm, wav, mp3, ogg, m4a, flac)
        audio: PathBuf,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Show reasoning service status
    Status {
        /// Check specific model availability
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Initialize a new CityPulse project
    Init {
        /// Directory to initialize (default: current)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Write a default configuration file
    Generate {
        /// Output file
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Validate the configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Some(Commands::Serve { host, port }) => run_serve(config, host, port).await,
        Some(Commands::Analyze { paths, context, context_file }) => {
            let context = match context_file {
                Some(path) => Some(std::fs::read_to_string(path)?),
                None => context,
            };
            run_analyze(config, paths, context, &cli.format).await
        }
        Some(Commands::Transcribe { audio }) => run_transcribe(config, &audio, &cli.format).await,
        Some(Commands::Config { action }) => run_config_command(config, action, &cli.config),
        Some(Commands::Status { model }) => run_status(config, model).await,
        Some(Commands::Init { dir, force }) => run_init(dir, force),
        None => run_serve(config, None, None).await,
    }
}

fn workspace(config: &AppConfig) -> Result<Workspace> {
    let client = GeminiClient::new(config)?;
    Ok(Workspace::new(Arc::new(client), config))
}

/// Run the web workspace
async fn run_serve(mut config: AppConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.web.host = host;
    }
    if let Some(port) = port {
        config.web.port = port;
    }

    let workspace = workspace(&config)?;
    info!(
        "CityPulse v{} using {} via {}",
        env!("CARGO_PKG_VERSION"),
        config.ai_engine.models.reasoning,
        workspace.service_name()
    );
    citypulse::web::start_server(config, workspace).await
}

/// Run a single analysis from the command line
async fn run_analyze(
    config: AppConfig,
    paths: Vec<PathBuf>,
    context: Option<String>,
    format: &str,
) -> Result<()> {
    let workspace = workspace(&config)?;

    let selections = paths.iter().map(|p| RawSelection::from_path(p)).collect();
    let report = workspace.add_files(selections).await;
    for failure in &report.failures {
        warn!("Skipped {}: {}", failure.name, failure.reason);
    }
    info!("Loaded {} of {} files", report.files.len(), paths.len());

    if let Some(context) = context {
        workspace.dispatch(Action::SetContext(context)).await;
    }

    let result = match workspace.run_analysis().await? {
        RunOutcome::Completed(result) => result,
        RunOutcome::Busy => return Err(CityPulseError::Analysis("analysis already running".to_string())),
    };

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render_text(&result));
    }

    Ok(())
}

/// Transcribe a recording and print the text
async fn run_transcribe(config: AppConfig, audio: &Path, format: &str) -> Result<()> {
    let workspace = workspace(&config)?;
    let clip = AudioClip::from_path(audio)?;

    let transcript = match workspace.transcribe(clip).await? {
        TranscribeOutcome::Completed(text) => text,
        TranscribeOutcome::Busy => {
            return Err(CityPulseError::Transcription("transcription already running".to_string()))
        }
    };

    if format == "json" {
        println!("{}", serde_json::json!({ "file": audio, "transcript": transcript }));
    } else {
        println!("{}", transcript);
    }

    Ok(())
}

/// Run config subcommand
fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Service: {}", config.ai_engine.url);
            println!("  Reasoning model: {}", config.ai_engine.models.reasoning);
            println!("  Transcription model: {}", config.ai_engine.models.transcription);
            println!("  Timeout: {}s", config.ai_engine.timeout_secs);
            match config.ai_engine.api_key() {
                Ok(_) => println!("  API key: set ({})", config.ai_engine.api_key_env),
                Err(e) => println!("  API key: {}", e),
            }
        }
    }

    Ok(())
}

/// Run status check
async fn run_status(config: AppConfig, model: Option<String>) -> Result<()> {
    println!("CityPulse v{} Status", env!("CARGO_PKG_VERSION"));
    println!("======================");

    let client = match GeminiClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            println!("Reasoning service: {}", e);
            return Ok(());
        }
    };

    match client.health_check().await {
        Ok(()) => println!("Reasoning service: reachable ({})", config.ai_engine.url),
        Err(e) => println!("Reasoning service: Error - {}", e),
    }

    let mut wanted = vec![
        config.ai_engine.models.reasoning.clone(),
        config.ai_engine.models.transcription.clone(),
    ];
    wanted.extend(model);

    println!("\nModels:");
    for name in &wanted {
        match client.model_available(name).await {
            Ok(true) => println!("  ✓ {}", name),
            Ok(false) => println!("  ✗ {} (not offered)", name),
            Err(e) => println!("  ? {} ({})", name, e),
        }
    }

    Ok(())
}

/// Initialize a new project
fn run_init(dir: Option<PathBuf>, force: bool) -> Result<()> {
    let target = dir.unwrap_or_else(|| PathBuf::from("."));
    let config_path = target.join("config.json");

    if config_path.exists() && !force {
        return Err(CityPulseError::Config(
            "config.json already exists. Use --force to overwrite".to_string(),
        ));
    }

    std::fs::create_dir_all(target.join("data"))?;
    AppConfig::default().save(&config_path)?;

    println!("CityPulse initialized in {:?}", target);
    println!("\nCreated:");
    println!("  - config.json");
    println!("  - data/");
    println!("\nNext steps:");
    println!("  1. export {}=<your key>", AppConfig::default().ai_engine.api_key_env);
    println!("  2. citypulse analyze data/*.csv --context \"...\"");
    println!("  3. citypulse serve");

    Ok(())
}
