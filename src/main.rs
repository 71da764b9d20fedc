// ABOUTME: Entry point for the dregs CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, GlobalArgs};
use commands::CleanTarget;
use dregs::config::{self, Config};
use dregs::error::Result;
use dregs::output::Output;
use dregs::prompt;
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // --verbose wins; otherwise RUST_LOG, falling back to warnings only
    let filter = if cli.global.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = cli.global.output;
    if let Err(e) = run(cli).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let cwd = env::current_dir()?;
    let output = Output::new(cli.global.output);

    match cli.command {
        Commands::Init { force } => {
            let path = config::init_config(&cwd, force)?;
            output.success(&format!("Wrote {}", path.display()));
            Ok(())
        }
        Commands::Images { dangling } => {
            let config = load_config(&cli.global, &cwd)?;
            commands::images(&config, dangling, output).await
        }
        Commands::Containers { all } => {
            let config = load_config(&cli.global, &cwd)?;
            commands::containers(&config, all, output).await
        }
        Commands::Info => {
            let config = load_config(&cli.global, &cwd)?;
            commands::info(&config, output).await
        }
        Commands::Clean { all, ids } => {
            let target = CleanTarget::from_args(all, ids)?;
            let config = load_config(&cli.global, &cwd)?;
            let mut prompt = prompt::for_session(cli.global.assume());
            commands::clean(&config, target, prompt.as_mut(), output).await
        }
        Commands::Menu => {
            let config = load_config(&cli.global, &cwd)?;
            let mut prompt = prompt::for_session(cli.global.assume());
            commands::menu(&config, prompt.as_mut(), output).await
        }
    }
}

/// Config file (or defaults) with the command-line host override applied.
fn load_config(global: &GlobalArgs, cwd: &Path) -> Result<Config> {
    let config = Config::resolve(global.config.as_deref(), cwd)?;
    match &global.host {
        Some(host) => config.with_host(host),
        None => Ok(config),
    }
}
