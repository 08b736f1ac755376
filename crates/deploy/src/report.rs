//! Run reports and the tables shown to operators.

use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};

use crate::{DeployError, DeploymentArtifact, NetworkConfig, executor::TaskOutcome};

/// How a single task ended.
#[derive(Debug)]
pub enum TaskResult {
    Completed(TaskOutcome),
    Failed(DeployError),
    /// Not started because the run was cancelled.
    Cancelled,
}

#[derive(Debug)]
pub struct TaskReport {
    pub contract: String,
    pub result: TaskResult,
}

/// Outcome of every selected task of a run, in execution order.
#[derive(Debug)]
pub struct RunReport {
    pub network: String,
    pub chain_id: u64,
    pub tasks: Vec<TaskReport>,
}

impl RunReport {
    pub fn new(network: impl Into<String>, chain_id: u64) -> Self {
        Self {
            network: network.into(),
            chain_id,
            tasks: Vec::new(),
        }
    }

    pub fn push(&mut self, contract: impl Into<String>, result: TaskResult) {
        self.tasks.push(TaskReport {
            contract: contract.into(),
            result,
        });
    }

    /// Whether every task completed.
    pub fn is_success(&self) -> bool {
        self.tasks
            .iter()
            .all(|task| matches!(task.result, TaskResult::Completed(_)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &DeployError)> {
        self.tasks.iter().filter_map(|task| match &task.result {
            TaskResult::Failed(err) => Some((task.contract.as_str(), err)),
            _ => None,
        })
    }

    pub fn outcome(&self, contract: &str) -> Option<&TaskResult> {
        self.tasks
            .iter()
            .find(|task| task.contract == contract)
            .map(|task| &task.result)
    }

    /// Artifacts of the completed tasks.
    pub fn artifacts(&self) -> impl Iterator<Item = &DeploymentArtifact> {
        self.tasks.iter().filter_map(|task| match &task.result {
            TaskResult::Completed(outcome) => Some(outcome.artifact()),
            _ => None,
        })
    }

    pub fn summary_table(&self) -> Table {
        let mut table = new_table(vec!["Contract", "Result", "Address", "Details"]);

        for task in &self.tasks {
            let row = match &task.result {
                TaskResult::Completed(TaskOutcome::Deployed {
                    artifact,
                    superseded,
                }) => vec![
                    task.contract.clone(),
                    "deployed".to_string(),
                    artifact.address.to_string(),
                    match superseded {
                        Some(previous) => format!("replaces {previous}"),
                        None => tx_details(artifact),
                    },
                ],
                TaskResult::Completed(TaskOutcome::Reused { artifact }) => vec![
                    task.contract.clone(),
                    "unchanged".to_string(),
                    artifact.address.to_string(),
                    String::new(),
                ],
                TaskResult::Failed(err) => vec![
                    task.contract.clone(),
                    format!("failed ({})", err.class()),
                    String::new(),
                    err.to_string(),
                ],
                TaskResult::Cancelled => vec![
                    task.contract.clone(),
                    "cancelled".to_string(),
                    String::new(),
                    String::new(),
                ],
            };
            table.add_row(row);
        }

        table
    }
}

fn tx_details(artifact: &DeploymentArtifact) -> String {
    match (artifact.transaction_hash, artifact.block_number) {
        (Some(tx_hash), Some(block)) => format!("tx {tx_hash} in block {block}"),
        (Some(tx_hash), None) => format!("tx {tx_hash}"),
        _ => "adopted existing code".to_string(),
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// Recorded deployments of a network.
pub fn status_table(artifacts: &[DeploymentArtifact]) -> Table {
    let mut table = new_table(vec!["Contract", "Address", "Deployer", "Block", "Deployed at"]);
    for artifact in artifacts {
        table.add_row(vec![
            artifact.contract_name.clone(),
            artifact.address.to_string(),
            artifact.deployer.to_string(),
            artifact
                .block_number
                .map(|block| block.to_string())
                .unwrap_or_else(|| "-".to_string()),
            artifact.deployed_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ]);
    }
    table
}

/// Configured networks.
pub fn networks_table<'a>(networks: impl IntoIterator<Item = &'a NetworkConfig>) -> Table {
    let mut table = new_table(vec!["Network", "Chain id", "URL", "Live", "Tags"]);
    for network in networks {
        table.add_row(vec![
            network.name.clone(),
            network
                .chain_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
            network.url.to_string(),
            network.live.to_string(),
            network.tags.iter().cloned().collect::<Vec<_>>().join(", "),
        ]);
    }
    table
}
