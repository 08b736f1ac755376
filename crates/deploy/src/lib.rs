//! rollout-deploy - Multi-network smart contract deployment library.
//!
//! This crate deploys compiled contracts to named EVM networks, records every
//! deployment as an artifact, and skips deployments whose bytecode and
//! constructor arguments have not changed since the last recorded one.

pub mod accounts;
mod artifact;
mod builder;
pub mod config;
pub mod contract;
mod deployment_hash;
pub mod deterministic;
mod error;
pub mod executor;
mod fs;
pub mod network;
pub mod planner;
pub mod report;
pub mod rpc;
mod runner;
pub mod store;
pub mod task;

pub use accounts::{
    AccountBinding, AccountResolver, CredentialProvider, EnvCredentials, NamedAccount, Signer,
    StaticCredentials,
};
pub use artifact::{ArtifactStore, DeploymentArtifact, MemoryArtifactStore};
pub use builder::{DEFAULT_ARTIFACTS_DIR, DeploymentRunnerBuilder};
pub use config::ProjectConfig;
pub use contract::{CompiledContract, ContractCatalog};
pub use deployment_hash::DeploymentContent;
pub use error::{DeployError, ErrorClass};
pub use executor::{DeploymentExecutor, ExecutionSettings, TaskOutcome};
pub use network::{AccountsConfig, ForkingConfig, Hardfork, NetworkConfig, NetworkRegistry};
pub use planner::{Decision, DeploymentPlanner};
pub use report::{RunReport, TaskReport, TaskResult};
pub use rpc::{ChainClient, Connect, HttpConnector, JsonRpcClient, RpcError, TransactionReceipt};
pub use runner::DeploymentRunner;
pub use store::FileArtifactStore;
pub use task::DeploymentTask;
