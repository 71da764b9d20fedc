// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use dregs::output::OutputMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dregs")]
#[command(about = "Interactive cleanup console for Docker and Podman images")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Config file (default: dregs.yml in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Remote host as [user@]host[:port]; overrides `server` in the config
    #[arg(short = 'H', long, global = true)]
    pub host: Option<String>,

    /// Answer yes to every confirmation
    #[arg(short, long, global = true, conflicts_with = "no")]
    pub yes: bool,

    /// Answer no to every confirmation
    #[arg(long, global = true)]
    pub no: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputMode::Normal)]
    pub output: OutputMode,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    /// Fixed answer for every confirmation, if one was requested.
    pub fn assume(&self) -> Option<bool> {
        match (self.yes, self.no) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a commented dregs.yml into the current directory
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// List images
    Images {
        /// Only untagged images
        #[arg(short, long)]
        dangling: bool,
    },

    /// List containers
    Containers {
        /// Include stopped containers
        #[arg(short, long)]
        all: bool,
    },

    /// Show engine version and platform
    Info,

    /// Delete images, escalating through container removal and force delete
    Clean {
        /// Every image, not just dangling ones
        #[arg(short, long, conflicts_with = "ids")]
        all: bool,

        /// Image IDs, ID prefixes, or repository:tag references
        ids: Vec<String>,
    },

    /// Interactive menu
    Menu,
}
