//! Runs the selected deployment tasks against one network.

use std::collections::BTreeSet;

use tokio::sync::watch;

use crate::{
    ArtifactStore, DeployError,
    accounts::{AccountResolver, CredentialProvider, EnvCredentials},
    contract::ContractCatalog,
    executor::{DeploymentExecutor, ExecutionSettings},
    network::NetworkRegistry,
    report::{RunReport, TaskResult},
    rpc::{ChainClient, Connect},
    task::{DeploymentTask, select_tasks},
};

/// Orchestrates a deployment run. Built with [`crate::DeploymentRunnerBuilder`].
pub struct DeploymentRunner<N, S, P = EnvCredentials> {
    pub(crate) registry: NetworkRegistry,
    pub(crate) tasks: Vec<DeploymentTask>,
    pub(crate) catalog: ContractCatalog,
    pub(crate) accounts: AccountResolver<P>,
    pub(crate) store: S,
    pub(crate) connector: N,
    pub(crate) settings: ExecutionSettings,
}

impl<N, S, P> DeploymentRunner<N, S, P>
where
    N: Connect,
    S: ArtifactStore,
    P: CredentialProvider,
{
    pub fn registry(&self) -> &NetworkRegistry {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tasks(&self) -> &[DeploymentTask] {
        &self.tasks
    }

    /// Deploy the tasks selected by `tags` (all when empty) to `network_name`.
    ///
    /// Returns an error only for failures that prevent the run from starting;
    /// task failures are collected in the report. `cancel` is checked between tasks.
    pub async fn run(
        &self,
        network_name: &str,
        tags: &[String],
        cancel: &watch::Receiver<bool>,
    ) -> Result<RunReport, DeployError> {
        let network = self.registry.resolve(network_name)?;
        let selected = select_tasks(&self.tasks, tags);

        tracing::info!(
            network = %network.name,
            live = network.live,
            tasks = selected.len(),
            ?tags,
            "Starting deployment run"
        );

        // Every signer must be available before anything touches the network.
        let roles: BTreeSet<&str> = selected.iter().map(|task| task.from.as_str()).collect();
        for role in roles {
            self.accounts.resolve_signer(network, role)?;
        }

        let client = self.connector.connect(&network.url)?;
        let chain_id = client.chain_id().await?;
        if let Some(expected) = network.chain_id {
            if expected != chain_id {
                return Err(DeployError::ChainIdMismatch {
                    network: network.name.clone(),
                    expected,
                    actual: chain_id,
                });
            }
        }

        if let Some(fork) = network.active_fork() {
            tracing::info!(
                network = %network.name,
                fork_url = ?fork.url.as_ref().map(|url| url.as_str()),
                fork_block = ?fork.block_number,
                "Network is a local fork"
            );
        }

        if network.save_deployments {
            self.store.record_chain_id(&network.name, chain_id)?;
        }

        let executor = DeploymentExecutor::new(
            &client,
            chain_id,
            &self.store,
            &self.catalog,
            &self.accounts,
            &self.settings,
        );

        let mut report = RunReport::new(network.name.clone(), chain_id);

        for task in selected {
            if *cancel.borrow() {
                tracing::warn!(contract = %task.contract, "Run cancelled, task not started");
                report.push(&task.contract, TaskResult::Cancelled);
                continue;
            }

            match executor.execute(task, network).await {
                Ok(outcome) => report.push(&task.contract, TaskResult::Completed(outcome)),
                Err(err) => {
                    tracing::error!(
                        contract = %task.contract,
                        network = %network.name,
                        class = %err.class(),
                        tx_hash = ?err.tx_hash(),
                        err = %err,
                        "Task failed"
                    );
                    report.push(&task.contract, TaskResult::Failed(err));
                }
            }
        }

        tracing::info!(
            network = %report.network,
            success = report.is_success(),
            "Deployment run finished"
        );

        Ok(report)
    }
}
