//! Builder module for creating a [`DeploymentRunner`].
//!
//! The builder collects the network registry, the task list, the account
//! bindings and the stores a runner needs, and checks the task list on build.

use std::collections::BTreeMap;

use crate::{
    ArtifactStore, DeployError,
    accounts::{AccountResolver, CredentialProvider, EnvCredentials},
    config::ProjectConfig,
    contract::ContractCatalog,
    executor::ExecutionSettings,
    network::NetworkRegistry,
    rpc::Connect,
    runner::DeploymentRunner,
    store::FileArtifactStore,
    task::{DeploymentTask, check_unique},
};

/// Default location of compiler output.
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// Builder for a [`DeploymentRunner`].
pub struct DeploymentRunnerBuilder<N, S, P = EnvCredentials> {
    registry: NetworkRegistry,
    connector: N,
    store: S,
    tasks: Vec<DeploymentTask>,
    catalog: ContractCatalog,
    accounts: AccountResolver<P>,
    settings: ExecutionSettings,
}

impl<N: Connect, S: ArtifactStore> DeploymentRunnerBuilder<N, S> {
    /// Start a builder with no tasks, no named accounts and default settings.
    pub fn new(registry: NetworkRegistry, connector: N, store: S) -> Self {
        Self {
            registry,
            connector,
            store,
            tasks: Vec::new(),
            catalog: ContractCatalog::new(DEFAULT_ARTIFACTS_DIR),
            accounts: AccountResolver::new(BTreeMap::new(), EnvCredentials),
            settings: ExecutionSettings::default(),
        }
    }
}

impl<N: Connect> DeploymentRunnerBuilder<N, FileArtifactStore> {
    /// Start a builder from a loaded project configuration.
    pub fn from_config(config: &ProjectConfig, connector: N) -> Result<Self, DeployError> {
        Ok(Self::new(config.registry()?, connector, config.artifact_store())
            .tasks(config.tasks.clone())
            .catalog(config.catalog())
            .accounts(config.account_resolver(EnvCredentials))
            .settings(config.execution.clone()))
    }
}

impl<N: Connect, S: ArtifactStore, P: CredentialProvider> DeploymentRunnerBuilder<N, S, P> {
    pub fn tasks(mut self, tasks: Vec<DeploymentTask>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn catalog(mut self, catalog: ContractCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Use `accounts` to resolve signers, possibly backed by another credential source.
    pub fn accounts<Q: CredentialProvider>(
        self,
        accounts: AccountResolver<Q>,
    ) -> DeploymentRunnerBuilder<N, S, Q> {
        DeploymentRunnerBuilder {
            registry: self.registry,
            connector: self.connector,
            store: self.store,
            tasks: self.tasks,
            catalog: self.catalog,
            accounts,
            settings: self.settings,
        }
    }

    pub fn settings(mut self, settings: ExecutionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build the runner, rejecting task lists that declare a contract twice.
    pub fn build(self) -> Result<DeploymentRunner<N, S, P>, DeployError> {
        check_unique(&self.tasks)?;

        Ok(DeploymentRunner {
            registry: self.registry,
            tasks: self.tasks,
            catalog: self.catalog,
            accounts: self.accounts,
            store: self.store,
            connector: self.connector,
            settings: self.settings,
        })
    }
}
