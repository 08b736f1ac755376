//! Error taxonomy for deployment runs.

use std::{path::PathBuf, time::Duration};

use alloy_core::primitives::{Address, B256};
use thiserror::Error;

/// How far an error propagates through a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorClass {
    /// Aborts the whole run before any transaction is sent.
    Configuration,
    /// Fails the task while its plan is being built. The run continues.
    Planning,
    /// Fails the task around transaction submission. The run continues.
    Execution,
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    #[error("Invalid configuration for network {network}: {reason}")]
    InvalidNetwork { network: String, reason: String },

    #[error("No credential for role '{role}' on network {network}: {reason}")]
    MissingCredential {
        network: String,
        role: String,
        reason: String,
    },

    #[error("Invalid credential for role '{role}' on network {network}: {reason}")]
    InvalidCredential {
        network: String,
        role: String,
        reason: String,
    },

    #[error("Task for contract {0} is declared more than once")]
    DuplicateTask(String),

    #[error("Network {network} expects chain id {expected} but the node reports {actual}")]
    ChainIdMismatch {
        network: String,
        expected: u64,
        actual: u64,
    },

    #[error("Corrupt artifact at {}: {reason}", .path.display())]
    CorruptArtifact { path: PathBuf, reason: String },

    #[error("Compiled contract not found: {0}")]
    UnknownContract(String),

    #[error("Invalid constructor arguments for {contract}: {reason}")]
    InvalidArguments { contract: String, reason: String },

    #[error("Artifact for {contract} on {network} was changed by another writer")]
    ArtifactConflict { contract: String, network: String },

    #[error("Artifact storage failure: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Transaction rejected{}: {reason}", fmt_tx_hash(.tx_hash))]
    TransactionRejected {
        reason: String,
        tx_hash: Option<B256>,
    },

    #[error("Transaction {tx_hash} was not confirmed within {}s", .waited.as_secs())]
    ConfirmationTimeout { tx_hash: B256, waited: Duration },

    #[error(
        "{contract} was deployed on {network} at {address}{} but its artifact was not saved: {source}",
        fmt_tx_hash(.tx_hash)
    )]
    UnrecordedDeployment {
        contract: String,
        network: String,
        address: Address,
        tx_hash: Option<B256>,
        source: Box<DeployError>,
    },

    #[error("Insufficient funds in {address}: {reason}")]
    InsufficientFunds { address: Address, reason: String },

    #[error("Deterministic deployment factory {0} has no code on this network")]
    MissingFactory(Address),

    #[error("RPC failure: {0}")]
    Rpc(#[from] crate::rpc::RpcError),
}

fn fmt_tx_hash(tx_hash: &Option<B256>) -> String {
    tx_hash
        .map(|hash| format!(" (tx {hash})"))
        .unwrap_or_default()
}

impl DeployError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownNetwork(_)
            | Self::InvalidNetwork { .. }
            | Self::MissingCredential { .. }
            | Self::InvalidCredential { .. }
            | Self::DuplicateTask(_)
            | Self::ChainIdMismatch { .. } => ErrorClass::Configuration,
            Self::CorruptArtifact { .. }
            | Self::UnknownContract(_)
            | Self::InvalidArguments { .. }
            | Self::ArtifactConflict { .. }
            | Self::Storage(_) => ErrorClass::Planning,
            Self::TransactionRejected { .. }
            | Self::ConfirmationTimeout { .. }
            | Self::UnrecordedDeployment { .. }
            | Self::InsufficientFunds { .. }
            | Self::MissingFactory(_)
            | Self::Rpc(_) => ErrorClass::Execution,
        }
    }

    /// Configuration errors block the entire run.
    pub fn is_fatal(&self) -> bool {
        self.class() == ErrorClass::Configuration
    }

    /// The hash of the transaction involved, when one was submitted.
    pub fn tx_hash(&self) -> Option<B256> {
        match self {
            Self::TransactionRejected { tx_hash, .. } => *tx_hash,
            Self::ConfirmationTimeout { tx_hash, .. } => Some(*tx_hash),
            Self::UnrecordedDeployment { tx_hash, .. } => *tx_hash,
            _ => None,
        }
    }
}
