//! Deployment records and the stores that keep them.

use std::{collections::HashMap, sync::Mutex};

use alloy_core::{
    json_abi::JsonAbi,
    primitives::{Address, B256, Bytes},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::DeployError;

/// Record of a completed contract deployment on one network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentArtifact {
    pub contract_name: String,
    pub network: String,
    pub address: Address,
    /// Constructor arguments as declared, with references already resolved.
    pub args: Vec<Value>,
    /// ABI-encoded constructor arguments.
    pub encoded_args: Bytes,
    /// Hash over the bytecode and encoded arguments, used for change detection.
    pub content_hash: String,
    /// Account that sent the creation transaction.
    pub deployer: Address,
    /// Creation transaction. Absent when existing code was adopted at a deterministic address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<B256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub deterministic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<B256>,
    pub abi: JsonAbi,
    pub deployed_at: DateTime<Utc>,
    /// Version of the tool that wrote the record.
    pub tool_version: String,
}

/// Durable bookkeeping of deployments, keyed by (contract, network).
///
/// Implementations must never expose a partially written record, and must keep
/// superseded records in a history rather than deleting them.
pub trait ArtifactStore: Send + Sync {
    /// Current artifact for `contract` on `network`.
    fn get(&self, contract: &str, network: &str) -> Result<Option<DeploymentArtifact>, DeployError>;

    /// Replace the current artifact for the artifact's key.
    ///
    /// `expected_hash` is the content hash of the record the caller's decision was
    /// based on (`None` when there was none). If the stored record no longer matches
    /// it, nothing is written and [`DeployError::ArtifactConflict`] is returned.
    fn put(&self, artifact: &DeploymentArtifact, expected_hash: Option<&str>) -> Result<(), DeployError>;

    /// Superseded artifacts for a key, oldest first.
    fn history(&self, contract: &str, network: &str) -> Result<Vec<DeploymentArtifact>, DeployError>;

    /// Current artifacts for every contract on `network`.
    fn list(&self, network: &str) -> Result<Vec<DeploymentArtifact>, DeployError>;

    /// Remember which chain the network's records belong to.
    fn record_chain_id(&self, network: &str, chain_id: u64) -> Result<(), DeployError>;
}

pub(crate) fn check_expected(
    current: Option<&DeploymentArtifact>,
    expected_hash: Option<&str>,
    artifact: &DeploymentArtifact,
) -> Result<(), DeployError> {
    let current_hash = current.map(|current| current.content_hash.as_str());
    if current_hash != expected_hash {
        tracing::warn!(
            contract = %artifact.contract_name,
            network = %artifact.network,
            ?current_hash,
            ?expected_hash,
            "Artifact changed since it was read"
        );
        return Err(DeployError::ArtifactConflict {
            contract: artifact.contract_name.clone(),
            network: artifact.network.clone(),
        });
    }
    Ok(())
}

#[derive(Debug, Default)]
struct MemoryEntry {
    current: Option<DeploymentArtifact>,
    history: Vec<DeploymentArtifact>,
}

/// In-memory store, for embedding and tests. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    entries: Mutex<HashMap<(String, String), MemoryEntry>>,
    chain_ids: Mutex<HashMap<String, u64>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chain_id(&self, network: &str) -> Option<u64> {
        self.chain_ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(network)
            .copied()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn get(&self, contract: &str, network: &str) -> Result<Option<DeploymentArtifact>, DeployError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries
            .get(&(contract.to_string(), network.to_string()))
            .and_then(|entry| entry.current.clone()))
    }

    fn put(&self, artifact: &DeploymentArtifact, expected_hash: Option<&str>) -> Result<(), DeployError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries
            .entry((artifact.contract_name.clone(), artifact.network.clone()))
            .or_default();

        check_expected(entry.current.as_ref(), expected_hash, artifact)?;

        if let Some(previous) = entry.current.replace(artifact.clone()) {
            entry.history.push(previous);
        }
        Ok(())
    }

    fn history(&self, contract: &str, network: &str) -> Result<Vec<DeploymentArtifact>, DeployError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries
            .get(&(contract.to_string(), network.to_string()))
            .map(|entry| entry.history.clone())
            .unwrap_or_default())
    }

    fn list(&self, network: &str) -> Result<Vec<DeploymentArtifact>, DeployError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut artifacts: Vec<_> = entries
            .iter()
            .filter(|((_, entry_network), _)| entry_network == network)
            .filter_map(|(_, entry)| entry.current.clone())
            .collect();
        artifacts.sort_by(|a, b| a.contract_name.cmp(&b.contract_name));
        Ok(artifacts)
    }

    fn record_chain_id(&self, network: &str, chain_id: u64) -> Result<(), DeployError> {
        self.chain_ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(network.to_string(), chain_id);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use alloy_core::primitives::U256;
    use serde_json::json;

    use super::*;

    pub(crate) fn artifact(contract: &str, network: &str, unlock_time: u64) -> DeploymentArtifact {
        let encoded_args = Bytes::from(U256::from(unlock_time).to_be_bytes::<32>().to_vec());
        DeploymentArtifact {
            contract_name: contract.to_string(),
            network: network.to_string(),
            address: Address::repeat_byte(unlock_time as u8),
            args: vec![json!(unlock_time)],
            encoded_args,
            content_hash: format!("{unlock_time:064x}"),
            deployer: Address::repeat_byte(0xf3),
            transaction_hash: Some(B256::repeat_byte(0x42)),
            block_number: Some(1),
            deterministic: false,
            salt: None,
            abi: JsonAbi::default(),
            deployed_at: DateTime::from_timestamp(1_737_316_800, 0).unwrap(),
            tool_version: "0.1.0".to_string(),
        }
    }

    #[test]
    fn test_memory_store_put_and_supersede() {
        let store = MemoryArtifactStore::new();
        assert!(store.get("Lock", "hardhat").unwrap().is_none());

        let first = artifact("Lock", "hardhat", 1);
        store.put(&first, None).unwrap();
        assert_eq!(store.get("Lock", "hardhat").unwrap(), Some(first.clone()));

        let second = artifact("Lock", "hardhat", 2);
        store.put(&second, Some(&first.content_hash)).unwrap();
        assert_eq!(store.get("Lock", "hardhat").unwrap(), Some(second));
        assert_eq!(store.history("Lock", "hardhat").unwrap(), vec![first]);
    }

    #[test]
    fn test_memory_store_rejects_stale_writer() {
        let store = MemoryArtifactStore::new();
        store.put(&artifact("Lock", "hardhat", 1), None).unwrap();

        let err = store.put(&artifact("Lock", "hardhat", 2), None).unwrap_err();
        assert!(matches!(err, DeployError::ArtifactConflict { .. }));
        assert_eq!(store.history("Lock", "hardhat").unwrap().len(), 0);
    }

    #[test]
    fn test_memory_store_keys_by_network() {
        let store = MemoryArtifactStore::new();
        store.put(&artifact("Lock", "hardhat", 1), None).unwrap();
        store.put(&artifact("Lock", "localhost", 1), None).unwrap();

        assert_eq!(store.list("hardhat").unwrap().len(), 1);
        assert!(store.get("Lock", "baobab").unwrap().is_none());

        store.record_chain_id("hardhat", 31337).unwrap();
        assert_eq!(store.chain_id("hardhat"), Some(31337));
    }
}
