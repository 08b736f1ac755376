//! Decides whether a task needs a new deployment.

use crate::{ArtifactStore, DeployError, DeploymentArtifact, NetworkConfig, task::DeploymentTask};

/// What to do with a task on a network.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// The recorded deployment matches the task. Nothing is sent.
    Skip { artifact: DeploymentArtifact },
    /// A new deployment is needed. `supersedes` is the record it will replace.
    Deploy {
        supersedes: Option<DeploymentArtifact>,
    },
}

impl Decision {
    /// Content hash of the record the decision was based on, for compare-and-swap writes.
    pub fn expected_hash(&self) -> Option<&str> {
        match self {
            Self::Skip { artifact } => Some(&artifact.content_hash),
            Self::Deploy { supersedes } => supersedes.as_ref().map(|a| a.content_hash.as_str()),
        }
    }
}

/// Compares a task's content hash with the recorded deployment.
pub struct DeploymentPlanner<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: ArtifactStore + ?Sized> DeploymentPlanner<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Decide what to do with `task` on `network`.
    ///
    /// `content_hash` is the caller's [`crate::DeploymentContent`] hash of the task's
    /// creation bytecode and encoded constructor arguments, resolved for `network`.
    pub fn decide(
        &self,
        task: &DeploymentTask,
        network: &NetworkConfig,
        content_hash: &str,
    ) -> Result<Decision, DeployError> {
        if !network.save_deployments {
            tracing::debug!(
                contract = %task.contract,
                network = %network.name,
                "Network does not keep deployments, deploying"
            );
            return Ok(Decision::Deploy { supersedes: None });
        }

        let decision = match self.store.get(&task.contract, &network.name)? {
            None => Decision::Deploy { supersedes: None },
            Some(artifact) if artifact.content_hash == content_hash => Decision::Skip { artifact },
            Some(artifact) => {
                tracing::info!(
                    contract = %task.contract,
                    network = %network.name,
                    previous_address = %artifact.address,
                    previous_hash = %artifact.content_hash,
                    new_hash = content_hash,
                    "Deployment content changed, redeploying"
                );
                Decision::Deploy {
                    supersedes: Some(artifact),
                }
            }
        };

        Ok(decision)
    }
}
