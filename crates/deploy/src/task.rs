//! Deployment task declarations.

use std::collections::{BTreeSet, HashSet};

use alloy_core::primitives::B256;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ArtifactStore, DeployError, accounts::DEFAULT_ROLE};

/// Prefix of a constructor argument that refers to another contract's deployed address.
pub const ARTIFACT_REFERENCE_PREFIX: &str = "artifact:";

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

/// A contract to deploy, as declared by the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentTask {
    /// Name of the compiled contract. Also identifies the task.
    pub contract: String,
    /// Ordered constructor arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,
    /// Role of the account sending the creation transaction.
    #[serde(default = "default_role")]
    pub from: String,
    /// Deploy through the CREATE2 proxy so the address is known in advance.
    #[serde(default)]
    pub deterministic: bool,
    /// Salt for deterministic deployments. Zero when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<B256>,
    /// Confirmations to wait for, overriding the run default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u64>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
}

impl DeploymentTask {
    pub fn new(contract: impl Into<String>) -> Self {
        Self {
            contract: contract.into(),
            args: Vec::new(),
            from: default_role(),
            deterministic: false,
            salt: None,
            confirmations: None,
            tags: BTreeSet::new(),
        }
    }

    pub fn args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn deterministic(mut self, salt: Option<B256>) -> Self {
        self.deterministic = true;
        self.salt = salt;
        self
    }

    /// Whether the task is selected by `filter`. An empty filter selects everything.
    pub fn matches_tags(&self, filter: &[String]) -> bool {
        filter.is_empty() || filter.iter().any(|tag| self.tags.contains(tag))
    }

    /// Replace `artifact:<Contract>` arguments with the address recorded on `network`.
    pub fn resolve_args<S: ArtifactStore + ?Sized>(
        &self,
        network: &str,
        store: &S,
    ) -> Result<Vec<Value>, DeployError> {
        self.args
            .iter()
            .map(|arg| self.resolve_value(arg, network, store))
            .collect()
    }

    fn resolve_value<S: ArtifactStore + ?Sized>(
        &self,
        value: &Value,
        network: &str,
        store: &S,
    ) -> Result<Value, DeployError> {
        match value {
            Value::String(s) => match s.strip_prefix(ARTIFACT_REFERENCE_PREFIX) {
                Some(referenced) => {
                    let artifact = store.get(referenced, network)?.ok_or_else(|| {
                        DeployError::InvalidArguments {
                            contract: self.contract.clone(),
                            reason: format!("{referenced} has not been deployed on {network}"),
                        }
                    })?;
                    Ok(Value::String(artifact.address.to_string()))
                }
                None => Ok(value.clone()),
            },
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve_value(item, network, store))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            _ => Ok(value.clone()),
        }
    }
}

/// Reject task lists that declare the same contract twice.
pub fn check_unique(tasks: &[DeploymentTask]) -> Result<(), DeployError> {
    let mut seen = HashSet::new();
    for task in tasks {
        if !seen.insert(task.contract.as_str()) {
            return Err(DeployError::DuplicateTask(task.contract.clone()));
        }
    }
    Ok(())
}

/// Tasks selected by `filter`, in declaration order.
pub fn select_tasks<'a>(tasks: &'a [DeploymentTask], filter: &[String]) -> Vec<&'a DeploymentTask> {
    tasks.iter().filter(|task| task.matches_tags(filter)).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{MemoryArtifactStore, artifact::tests::artifact};

    #[test]
    fn test_task_from_toml() {
        let task: DeploymentTask = toml::from_str(
            r#"
            contract = "Lock"
            args = [17000000000000]
            tags = ["LOCK"]
            "#,
        )
        .unwrap();

        assert_eq!(task.contract, "Lock");
        assert_eq!(task.args, vec![json!(17000000000000u64)]);
        assert_eq!(task.from, "deployer");
        assert!(!task.deterministic);
        assert!(task.tags.contains("LOCK"));
    }

    #[test]
    fn test_tag_selection_keeps_declaration_order() {
        let tasks = vec![
            DeploymentTask::new("Token").tag("core"),
            DeploymentTask::new("Lock").tag("LOCK"),
            DeploymentTask::new("Vault").tag("core").tag("LOCK"),
        ];

        let all: Vec<_> = select_tasks(&tasks, &[]).iter().map(|t| t.contract.as_str()).collect();
        assert_eq!(all, vec!["Token", "Lock", "Vault"]);

        let lock: Vec<_> = select_tasks(&tasks, &["LOCK".to_string()])
            .iter()
            .map(|t| t.contract.as_str())
            .collect();
        assert_eq!(lock, vec!["Lock", "Vault"]);

        assert!(select_tasks(&tasks, &["missing".to_string()]).is_empty());
    }

    #[test]
    fn test_duplicate_contracts_rejected() {
        let tasks = vec![DeploymentTask::new("Lock"), DeploymentTask::new("Token")];
        assert!(check_unique(&tasks).is_ok());

        let tasks = vec![DeploymentTask::new("Lock"), DeploymentTask::new("Lock").args(vec![json!(1)])];
        let err = check_unique(&tasks).unwrap_err();
        assert!(matches!(err, DeployError::DuplicateTask(ref contract) if contract == "Lock"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_resolve_artifact_reference() {
        let store = MemoryArtifactStore::new();
        let token = artifact("Token", "hardhat", 7);
        store.put(&token, None).unwrap();

        let task = DeploymentTask::new("Vault").args(vec![
            json!("artifact:Token"),
            json!(["artifact:Token", "0x0000000000000000000000000000000000000001"]),
            json!(5),
        ]);

        let resolved = task.resolve_args("hardhat", &store).unwrap();
        assert_eq!(resolved[0], json!(token.address.to_string()));
        assert_eq!(resolved[1][0], json!(token.address.to_string()));
        assert_eq!(resolved[2], json!(5));

        let err = task.resolve_args("localhost", &store).unwrap_err();
        assert!(matches!(err, DeployError::InvalidArguments { .. }));
    }
}
