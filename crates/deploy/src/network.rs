//! Named network configurations and the registry that serves them.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::DeployError;

/// Default RPC endpoint for local development nodes.
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// Mnemonic used by local development nodes (Hardhat, Anvil) for their prefunded accounts.
pub const DEV_MNEMONIC: &str = "test test test test test test test test test test test junk";

/// Number of developer accounts derived from the mnemonic by default.
pub const DEFAULT_DEV_ACCOUNT_COUNT: u32 = 20;

/// EVM hardforks a local node can be pinned to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Hardfork {
    Berlin,
    London,
    Shanghai,
    Cancun,
}

impl Hardfork {
    /// Hardfork forced by coverage tooling, which sets a gas price incompatible with EIP-1559.
    pub const COVERAGE: Hardfork = Hardfork::Berlin;
}

/// Local fork of another chain, pinned at a block height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkingConfig {
    /// Whether the fork is active for this run.
    #[serde(default)]
    pub enabled: bool,
    /// RPC endpoint of the chain being forked.
    pub url: Option<Url>,
    /// Block height the fork is taken at. Latest when absent.
    pub block_number: Option<u64>,
}

/// Where a network's account list comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccountsConfig {
    /// Private keys injected through the environment, one variable per account.
    PrivateKeys { private_keys_env: Vec<String> },
    /// Accounts derived from a development mnemonic. Only allowed on non-live networks.
    Mnemonic {
        #[serde(default = "default_mnemonic")]
        mnemonic: String,
        #[serde(default = "default_account_count")]
        count: u32,
    },
}

fn default_mnemonic() -> String {
    DEV_MNEMONIC.to_string()
}

fn default_account_count() -> u32 {
    DEFAULT_DEV_ACCOUNT_COUNT
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self::Mnemonic {
            mnemonic: default_mnemonic(),
            count: default_account_count(),
        }
    }
}

fn default_rpc_url() -> Url {
    Url::parse(DEFAULT_RPC_URL).expect("default RPC URL is valid")
}

fn default_true() -> bool {
    true
}

/// Configuration of a single named network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network name. Filled from the configuration key.
    #[serde(skip)]
    pub name: String,
    /// JSON-RPC endpoint.
    #[serde(default = "default_rpc_url")]
    pub url: Url,
    /// Expected chain id. When absent the node's own chain id is trusted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// Whether the chain carries real value.
    #[serde(default)]
    pub live: bool,
    /// Whether deployments on this network are recorded.
    #[serde(default = "default_true")]
    pub save_deployments: bool,
    /// Labels used to select networks.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forking: Option<ForkingConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardfork: Option<Hardfork>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_gas_limit: Option<u64>,
    /// Gas limit used for every transaction instead of estimating it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<u64>,
    /// Gas price in wei used instead of querying the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<u64>,
    #[serde(default)]
    pub allow_unlimited_contract_size: bool,
    #[serde(default)]
    pub accounts: AccountsConfig,
}

impl NetworkConfig {
    /// Create a non-live network pointing at a local node.
    pub fn local(name: impl Into<String>, chain_id: u64) -> Self {
        Self {
            name: name.into(),
            url: default_rpc_url(),
            chain_id: Some(chain_id),
            live: false,
            save_deployments: true,
            tags: BTreeSet::new(),
            forking: None,
            hardfork: None,
            block_gas_limit: None,
            gas: None,
            gas_price: None,
            allow_unlimited_contract_size: false,
            accounts: AccountsConfig::default(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// The fork descriptor, if forking is enabled for this run.
    pub fn active_fork(&self) -> Option<&ForkingConfig> {
        self.forking.as_ref().filter(|fork| fork.enabled)
    }

    /// Check the invariants a single network must hold.
    pub fn validate(&self) -> Result<(), DeployError> {
        let invalid = |reason: &str| DeployError::InvalidNetwork {
            network: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.live {
            if self.allow_unlimited_contract_size {
                return Err(invalid(
                    "live networks cannot allow unlimited contract size",
                ));
            }
            if self.hardfork == Some(Hardfork::COVERAGE) {
                return Err(invalid(
                    "live networks cannot force the coverage hardfork",
                ));
            }
            if matches!(self.accounts, AccountsConfig::Mnemonic { .. }) {
                return Err(invalid(
                    "live networks must use injected private keys, not a mnemonic",
                ));
            }
            if self.active_fork().is_some() {
                return Err(invalid("live networks cannot be forks"));
            }
        }

        if let Some(fork) = self.active_fork() {
            if fork.url.is_none() {
                return Err(invalid("forking is enabled but no fork url is set"));
            }
        }

        if let AccountsConfig::PrivateKeys { private_keys_env } = &self.accounts {
            if private_keys_env.iter().any(|key| key.trim().is_empty()) {
                return Err(invalid("private key variable names cannot be empty"));
            }
        }

        Ok(())
    }
}

/// Immutable set of named networks, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct NetworkRegistry {
    networks: BTreeMap<String, NetworkConfig>,
}

impl NetworkRegistry {
    /// Build a registry, validating every network and chain id uniqueness.
    pub fn new(
        networks: impl IntoIterator<Item = (String, NetworkConfig)>,
    ) -> Result<Self, DeployError> {
        let mut registry = BTreeMap::new();
        let mut chain_ids: HashMap<u64, String> = HashMap::new();

        for (name, mut network) in networks {
            network.name = name.clone();
            network.validate()?;

            if let Some(chain_id) = network.chain_id {
                if let Some(other) = chain_ids.insert(chain_id, name.clone()) {
                    return Err(DeployError::InvalidNetwork {
                        network: name,
                        reason: format!("chain id {chain_id} is already used by network {other}"),
                    });
                }
            }

            registry.insert(name, network);
        }

        tracing::debug!(networks = ?registry.keys().collect::<Vec<_>>(), "Network registry loaded");

        Ok(Self { networks: registry })
    }

    pub fn resolve(&self, name: &str) -> Result<&NetworkConfig, DeployError> {
        self.networks
            .get(name)
            .ok_or_else(|| DeployError::UnknownNetwork(name.to_string()))
    }

    pub fn list_by_tag(&self, tag: &str) -> Vec<&NetworkConfig> {
        self.networks
            .values()
            .filter(|network| network.has_tag(tag))
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.networks.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkConfig> {
        self.networks.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NETWORKS: &str = r#"
        [localhost]
        live = false
        tags = ["local"]
        allow_unlimited_contract_size = true

        [hardhat]
        chain_id = 31337
        allow_unlimited_contract_size = true
        block_gas_limit = 10000000
        hardfork = "london"
        tags = ["test", "local"]

        [hardhat.forking]
        enabled = false
        url = "https://eth-mainnet.g.alchemy.com/v2/demo"
        block_number = 17428515

        [baobab]
        url = "https://klaytn-baobab.blockpi.network/v1/rpc/public"
        chain_id = 1001
        live = true
        tags = ["staging"]
        accounts = { private_keys_env = ["DEPLOYER_PRIVATE_KEY"] }
    "#;

    fn registry() -> NetworkRegistry {
        let networks: BTreeMap<String, NetworkConfig> =
            toml::from_str(NETWORKS).expect("Failed to parse networks");
        NetworkRegistry::new(networks).expect("Failed to build registry")
    }

    #[test]
    fn test_resolve_known_network() {
        let registry = registry();
        let hardhat = registry.resolve("hardhat").unwrap();

        assert_eq!(hardhat.name, "hardhat");
        assert_eq!(hardhat.chain_id, Some(31337));
        assert!(!hardhat.live);
        assert!(hardhat.save_deployments);
        assert_eq!(hardhat.hardfork, Some(Hardfork::London));
        assert_eq!(hardhat.url.as_str(), "http://127.0.0.1:8545/");
        assert!(hardhat.active_fork().is_none());
        assert_eq!(hardhat.accounts, AccountsConfig::default());

        let baobab = registry.resolve("baobab").unwrap();
        assert!(baobab.live);
        assert_eq!(
            baobab.accounts,
            AccountsConfig::PrivateKeys {
                private_keys_env: vec!["DEPLOYER_PRIVATE_KEY".to_string()]
            }
        );
    }

    #[test]
    fn test_resolve_unknown_network() {
        let err = registry().resolve("mainnet").unwrap_err();
        assert!(matches!(err, DeployError::UnknownNetwork(name) if name == "mainnet"));
    }

    #[test]
    fn test_list_by_tag() {
        let registry = registry();
        let local: Vec<&str> = registry
            .list_by_tag("local")
            .into_iter()
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(local, vec!["hardhat", "localhost"]);

        let staging = registry.list_by_tag("staging");
        assert_eq!(staging.len(), 1);
        assert_eq!(staging[0].name, "baobab");

        assert!(registry.list_by_tag("production").is_empty());
    }

    #[test]
    fn test_duplicate_chain_id_rejected() {
        let networks = vec![
            ("a".to_string(), NetworkConfig::local("a", 31337)),
            ("b".to_string(), NetworkConfig::local("b", 31337)),
        ];
        let err = NetworkRegistry::new(networks).unwrap_err();
        assert!(matches!(err, DeployError::InvalidNetwork { .. }));
    }

    #[test]
    fn test_live_network_rejects_test_overrides() {
        let mut live = NetworkConfig::local("mainnet", 1);
        live.live = true;
        live.accounts = AccountsConfig::PrivateKeys {
            private_keys_env: vec!["KEY".to_string()],
        };
        assert!(live.validate().is_ok());

        let mut unlimited = live.clone();
        unlimited.allow_unlimited_contract_size = true;
        assert!(unlimited.validate().is_err());

        let mut coverage = live.clone();
        coverage.hardfork = Some(Hardfork::COVERAGE);
        assert!(coverage.validate().is_err());

        let mut mnemonic = live.clone();
        mnemonic.accounts = AccountsConfig::default();
        assert!(mnemonic.validate().is_err());
    }

    #[test]
    fn test_enabled_fork_requires_url() {
        let mut network = NetworkConfig::local("hardhat", 31337);
        network.forking = Some(ForkingConfig {
            enabled: true,
            url: None,
            block_number: Some(17428515),
        });
        assert!(network.validate().is_err());

        network.forking = Some(ForkingConfig {
            enabled: false,
            url: None,
            block_number: None,
        });
        assert!(network.validate().is_ok());
    }
}
