//! Project configuration (`Rollout.toml`).

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};

use crate::{
    DeployError, NetworkConfig,
    accounts::{AccountResolver, CredentialProvider, NamedAccount},
    builder::DEFAULT_ARTIFACTS_DIR,
    contract::ContractCatalog,
    executor::ExecutionSettings,
    network::NetworkRegistry,
    store::FileArtifactStore,
    task::{DeploymentTask, check_unique},
};

/// Default configuration file name.
pub const CONFIG_FILENAME: &str = "Rollout.toml";

/// Prefix of environment variables overriding configuration values.
pub const ENV_PREFIX: &str = "ROLLOUT_";

/// Network used when none is named.
pub const DEFAULT_NETWORK: &str = "hardhat";

fn default_network() -> String {
    DEFAULT_NETWORK.to_string()
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from(DEFAULT_ARTIFACTS_DIR)
}

fn default_deployments_dir() -> PathBuf {
    PathBuf::from("deployments")
}

/// Everything a deployment run is configured with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_network")]
    pub default_network: String,
    /// Compiler output searched for contract artifacts.
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,
    /// Root of the deployment records.
    #[serde(default = "default_deployments_dir")]
    pub deployments_dir: PathBuf,
    #[serde(default)]
    pub execution: ExecutionSettings,
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkConfig>,
    #[serde(default)]
    pub named_accounts: BTreeMap<String, NamedAccount>,
    #[serde(default)]
    pub tasks: Vec<DeploymentTask>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            default_network: default_network(),
            artifacts_dir: default_artifacts_dir(),
            deployments_dir: default_deployments_dir(),
            execution: ExecutionSettings::default(),
            networks: BTreeMap::new(),
            named_accounts: BTreeMap::new(),
            tasks: Vec::new(),
        }
    }
}

impl ProjectConfig {
    /// Load the configuration from `path`, with `ROLLOUT_` environment variables on top.
    ///
    /// Relative directories are resolved against the directory holding the file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file not found: {}",
                path.display()
            ));
        }

        let config_path = if path.is_dir() {
            path.join(CONFIG_FILENAME)
        } else {
            path.to_path_buf()
        };

        let mut config: Self = Figment::new()
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context(format!("Failed to parse config from {}", config_path.display()))?;

        if let Some(base) = config_path.parent() {
            config.artifacts_dir = base.join(&config.artifacts_dir);
            config.deployments_dir = base.join(&config.deployments_dir);
        }

        config.validate()?;

        tracing::info!(
            path = %config_path.display(),
            networks = config.networks.len(),
            tasks = config.tasks.len(),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Parse a configuration from TOML text, without environment overrides.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = Figment::new()
            .merge(Toml::string(content))
            .extract()
            .context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config to TOML")
    }

    fn validate(&self) -> Result<(), DeployError> {
        check_unique(&self.tasks)
    }

    /// Build the network registry. Fails on the first invalid network.
    pub fn registry(&self) -> Result<NetworkRegistry, DeployError> {
        NetworkRegistry::new(
            self.networks
                .iter()
                .map(|(name, network)| (name.clone(), network.clone())),
        )
    }

    pub fn account_resolver<P: CredentialProvider>(&self, credentials: P) -> AccountResolver<P> {
        AccountResolver::new(self.named_accounts.clone(), credentials)
    }

    pub fn catalog(&self) -> ContractCatalog {
        ContractCatalog::new(&self.artifacts_dir)
    }

    pub fn artifact_store(&self) -> FileArtifactStore {
        FileArtifactStore::new(&self.deployments_dir)
    }
}
