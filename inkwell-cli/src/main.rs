use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use config::ConfigLoader;

#[derive(Parser)]
#[command(name = "inkwell", about = "Device-synchronized plugin runtime for e-ink displays")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Extra config file, applied over the user and project config
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run plugins in step with the device's refresh cycle
    Run,
    /// List plugins found in the plugin directory
    Plugins,
    /// Render one plugin to a PNG file
    Render(commands::render::RenderArgs),
    /// Show device status and the predicted next refresh
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let raw = ConfigLoader::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run => commands::run::run(raw).await,
        Commands::Plugins => commands::plugins::run(&raw),
        Commands::Render(args) => commands::render::run(args, raw).await,
        Commands::Status => commands::status::run(raw).await,
    }
}
