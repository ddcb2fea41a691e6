// crates/epe-cli/src/main.rs
//
// CLI entrypoint for the Edition Production Environment.
//
// File-based commands (tokenize, align, export, annotate, read) work on local
// witness files; `remote` drives a witness/annotation REST store.

mod commands;
mod config;
mod output;

use clap::{Parser, Subcommand};
use commands::align::AlignCmd;
use commands::annotate::AnnotateCmd;
use commands::export::ExportCmd;
use commands::read::ReadCmd;
use commands::remote::RemoteCmd;
use commands::tokenize::TokenizeCmd;
use commands::Context;
use config::{CliConfig, DEFAULT_CONFIG_PATH};
use output::OutputFormat;

/// Edition Production Environment: compare, annotate and export text witnesses.
#[derive(Parser, Debug)]
#[command(
    name = "epe",
    version = "0.1.0",
    about = "Edition Production Environment: tokenize, align, annotate and export text witnesses"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Base URL of the remote witness store (overrides the config file).
    #[arg(long, global = true)]
    remote: Option<String>,

    /// Print JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Tokenize witness files and list them.
    Tokenize(TokenizeCmd),

    /// Align witness files position by position.
    Align(AlignCmd),

    /// Write edition.xml and/or edition.json.
    Export(ExportCmd),

    /// Edit an annotation sidecar file.
    #[command(subcommand)]
    Annotate(AnnotateCmd),

    /// Reading view of an exported edition.json.
    Read(ReadCmd),

    /// Work with a remote witness store.
    #[command(subcommand)]
    Remote(RemoteCmd),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Configuration is read before the subscriber exists so its log level can
    // seed the filter; the outcome is logged right after.
    let loaded = CliConfig::load(&cli.config);
    let config = match &loaded {
        Ok(cfg) => cfg.clone(),
        Err(_) => CliConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    match &loaded {
        Ok(_) => tracing::debug!("Loaded configuration from {}", cli.config),
        Err(e) => tracing::warn!(
            "Could not load config from {}: {}. Using defaults.",
            cli.config,
            e
        ),
    }

    let ctx = Context {
        remote_url: cli.remote.clone().unwrap_or_else(|| config.remote_url.clone()),
        format: OutputFormat::from_json_flag(cli.json),
        config,
    };

    let result = match &cli.command {
        Commands::Tokenize(cmd) => commands::tokenize::run(cmd, &ctx).await,
        Commands::Align(cmd) => commands::align::run(cmd, &ctx).await,
        Commands::Export(cmd) => commands::export::run(cmd, &ctx).await,
        Commands::Annotate(cmd) => commands::annotate::run(cmd, &ctx).await,
        Commands::Read(cmd) => commands::read::run(cmd, &ctx).await,
        Commands::Remote(cmd) => commands::remote::run(cmd, &ctx).await,
    };

    if let Err(e) = &result {
        tracing::warn!("{}", e);
    }
    result
}
