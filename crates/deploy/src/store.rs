//! On-disk artifact store.
//!
//! Layout under the store root:
//!
//! ```text
//! <network>/.chainId                  chain id the records belong to
//! <network>/<Contract>.json           current artifact (pretty JSON)
//! <network>/<Contract>.history.jsonl  superseded artifacts, one per line, oldest first
//! <network>/.<Contract>.lock          advisory lock held by writers
//! ```

use std::path::{Path, PathBuf};

use crate::{
    ArtifactStore, DeployError, DeploymentArtifact, artifact::check_expected, fs::FsHandler,
};

/// Name of the file recording a network's chain id.
pub const CHAIN_ID_FILENAME: &str = ".chainId";

const HISTORY_SUFFIX: &str = ".history.jsonl";

/// Artifact store backed by a directory of JSON files.
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    root: PathBuf,
}

impl FileArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn network_dir(&self, network: &str) -> Result<PathBuf, DeployError> {
        check_path_component(network)?;
        Ok(self.root.join(network))
    }

    fn artifact_path(&self, contract: &str, network: &str) -> Result<PathBuf, DeployError> {
        check_path_component(contract)?;
        Ok(self.network_dir(network)?.join(format!("{contract}.json")))
    }

    fn history_path(&self, contract: &str, network: &str) -> Result<PathBuf, DeployError> {
        check_path_component(contract)?;
        Ok(self
            .network_dir(network)?
            .join(format!("{contract}{HISTORY_SUFFIX}")))
    }

    fn lock_path(&self, contract: &str, network: &str) -> Result<PathBuf, DeployError> {
        check_path_component(contract)?;
        Ok(self.network_dir(network)?.join(format!(".{contract}.lock")))
    }

    /// Chain id recorded for `network`, if any.
    pub fn chain_id(&self, network: &str) -> Result<Option<u64>, DeployError> {
        let path = self.network_dir(network)?.join(CHAIN_ID_FILENAME);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)?;
        content
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| DeployError::CorruptArtifact {
                path,
                reason: format!("invalid chain id: {e}"),
            })
    }
}

fn check_path_component(name: &str) -> Result<(), DeployError> {
    if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) {
        return Err(DeployError::Storage(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("'{name}' cannot be used as an artifact path component"),
        )));
    }
    Ok(())
}

fn read_artifact(path: &Path) -> Result<DeploymentArtifact, DeployError> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| DeployError::CorruptArtifact {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

impl ArtifactStore for FileArtifactStore {
    fn get(&self, contract: &str, network: &str) -> Result<Option<DeploymentArtifact>, DeployError> {
        let path = self.artifact_path(contract, network)?;
        if !path.exists() {
            return Ok(None);
        }

        let artifact = read_artifact(&path)?;
        if artifact.contract_name != contract || artifact.network != network {
            return Err(DeployError::CorruptArtifact {
                path,
                reason: format!(
                    "record belongs to {} on {}",
                    artifact.contract_name, artifact.network
                ),
            });
        }

        Ok(Some(artifact))
    }

    fn put(&self, artifact: &DeploymentArtifact, expected_hash: Option<&str>) -> Result<(), DeployError> {
        let contract = artifact.contract_name.as_str();
        let network = artifact.network.as_str();

        let _lock = FsHandler::lock_exclusive(&self.lock_path(contract, network)?)?;

        let current = self.get(contract, network)?;
        check_expected(current.as_ref(), expected_hash, artifact)?;

        if let Some(previous) = current {
            let line = serde_json::to_string(&previous).map_err(std::io::Error::other)?;
            FsHandler::append_line(&self.history_path(contract, network)?, &line)?;
        }

        let path = self.artifact_path(contract, network)?;
        let json = serde_json::to_string_pretty(artifact).map_err(std::io::Error::other)?;
        FsHandler::write_atomic(&path, json.as_bytes())?;

        tracing::debug!(
            contract,
            network,
            address = %artifact.address,
            path = %path.display(),
            "Artifact saved"
        );

        Ok(())
    }

    fn history(&self, contract: &str, network: &str) -> Result<Vec<DeploymentArtifact>, DeployError> {
        let path = self.history_path(contract, network)?;
        if !path.exists() {
            return Ok(Vec::new());
        }

        std::fs::read_to_string(&path)?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| DeployError::CorruptArtifact {
                    path: path.clone(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    /// Records that cannot be read are skipped with a warning.
    fn list(&self, network: &str) -> Result<Vec<DeploymentArtifact>, DeployError> {
        let dir = self.network_dir(network)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut artifacts = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            let Some(file_name) = path.file_name().map(|name| name.to_string_lossy().to_string())
            else {
                continue;
            };
            if file_name.starts_with('.') || !file_name.ends_with(".json") {
                continue;
            }
            match read_artifact(&path) {
                Ok(artifact) => artifacts.push(artifact),
                Err(DeployError::CorruptArtifact { path, reason }) => {
                    tracing::warn!(path = %path.display(), %reason, "Skipping corrupt artifact");
                }
                Err(err) => return Err(err),
            }
        }

        artifacts.sort_by(|a, b| a.contract_name.cmp(&b.contract_name));
        Ok(artifacts)
    }

    fn record_chain_id(&self, network: &str, chain_id: u64) -> Result<(), DeployError> {
        let path = self.network_dir(network)?.join(CHAIN_ID_FILENAME);
        FsHandler::write_atomic(&path, chain_id.to_string().as_bytes())?;
        Ok(())
    }
}
