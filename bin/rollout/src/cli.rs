use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "rollout")]
#[command(
    author,
    version,
    about = "Deploy smart contracts to named networks, once per change"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, global = true, env = "ROLLOUT_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to the configuration file, or to the directory holding `Rollout.toml`.
    #[arg(short, long, global = true, env = "ROLLOUT_CONFIG", default_value = "Rollout.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy the configured tasks to a network.
    Deploy {
        /// Target network. Defaults to the configured default network.
        #[arg(short, long, env = "ROLLOUT_NETWORK")]
        network: Option<String>,

        /// Only run tasks carrying one of these tags.
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// List the configured networks.
    Networks {
        /// Only list networks carrying this tag.
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// Show the recorded deployments of a network.
    Status {
        /// Network to inspect. Defaults to the configured default network.
        #[arg(short, long, env = "ROLLOUT_NETWORK")]
        network: Option<String>,
    },
}
