//! rollout is a CLI tool to deploy smart contracts to named networks, skipping what is already deployed.

mod cli;
mod signal;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;

use cli::{Cli, Command};
use rollout_deploy::{
    ArtifactStore, DeploymentRunnerBuilder, HttpConnector, ProjectConfig, report,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let config = ProjectConfig::load_from_file(&cli.config)?;

    match cli.command {
        Command::Deploy { network, tags } => {
            let network = network.unwrap_or_else(|| config.default_network.clone());
            deploy(&config, &network, &tags).await
        }
        Command::Networks { tag } => {
            let registry = config.registry()?;
            let networks = match &tag {
                Some(tag) => registry.list_by_tag(tag),
                None => registry.iter().collect(),
            };
            println!("{}", report::networks_table(networks));
            Ok(())
        }
        Command::Status { network } => {
            let network = network.unwrap_or_else(|| config.default_network.clone());
            let registry = config.registry()?;
            let network = registry.resolve(&network)?;
            let artifacts = config
                .artifact_store()
                .list(&network.name)
                .context("Failed to read deployments")?;

            if artifacts.is_empty() {
                tracing::info!(network = %network.name, "No deployments recorded");
            } else {
                println!("{}", report::status_table(&artifacts));
            }
            Ok(())
        }
    }
}

async fn deploy(config: &ProjectConfig, network: &str, tags: &[String]) -> Result<()> {
    let runner = DeploymentRunnerBuilder::from_config(config, HttpConnector::default())?.build()?;

    // Stop starting new tasks on Ctrl-C. A transaction already sent is still awaited,
    // unless Ctrl-C is pressed again.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        signal::watch_interrupts(tokio::signal::ctrl_c, cancel_tx).await;
        std::process::exit(signal::FORCED_EXIT_CODE);
    });

    let report = runner.run(network, tags, &cancel_rx).await?;

    println!("{}", report.summary_table());

    if !report.is_success() {
        let failed = report.tasks.len() - report.artifacts().count();
        anyhow::bail!("{failed} task(s) did not complete on {}", report.network);
    }

    Ok(())
}
