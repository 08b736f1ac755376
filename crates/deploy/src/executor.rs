//! Executes a single deployment task against a connected chain.

use std::time::Duration;

use alloy_consensus::TxLegacy;
use alloy_core::primitives::{Address, B256, Bytes, TxKind, U256};
use backon::{ConstantBuilder, Retryable};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    ArtifactStore, DeployError, DeploymentArtifact, MemoryArtifactStore, NetworkConfig,
    accounts::{AccountResolver, CredentialProvider, Signer},
    contract::ContractCatalog,
    deployment_hash::DeploymentContent,
    deterministic::DeterministicDeployment,
    planner::{Decision, DeploymentPlanner},
    rpc::{ChainClient, RpcError, TransactionReceipt},
    task::DeploymentTask,
};

/// Version written into every artifact.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

fn default_confirmations() -> u64 {
    1
}

fn default_confirmation_timeout_secs() -> u64 {
    120
}

fn default_poll_interval_ms() -> u64 {
    2000
}

/// Knobs for sending and confirming transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSettings {
    /// Blocks a transaction must be buried under, counting its own.
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
    /// How long to wait for confirmations before giving up on a transaction.
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            confirmations: default_confirmations(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl ExecutionSettings {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Result of a task that completed.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// A new contract was deployed (or existing code adopted at its deterministic address).
    Deployed {
        artifact: DeploymentArtifact,
        /// Address of the deployment this one replaced.
        superseded: Option<Address>,
    },
    /// The recorded deployment already matched.
    Reused { artifact: DeploymentArtifact },
}

impl TaskOutcome {
    pub fn artifact(&self) -> &DeploymentArtifact {
        match self {
            Self::Deployed { artifact, .. } | Self::Reused { artifact } => artifact,
        }
    }
}

/// Where the contract ended up and how it got there.
struct Placement {
    address: Address,
    receipt: Option<TransactionReceipt>,
}

/// Why a receipt poll did not yield a confirmed receipt yet.
#[derive(Debug)]
enum PollError {
    Pending,
    Rpc(RpcError),
}

/// Sends deployments for one network. The sole writer of the artifact store.
///
/// Deployments on networks that do not save them are kept in memory for the
/// executor's lifetime, so later tasks can still reference them.
pub struct DeploymentExecutor<'a, C, S: ?Sized, P> {
    client: &'a C,
    chain_id: u64,
    store: &'a S,
    session: MemoryArtifactStore,
    catalog: &'a ContractCatalog,
    accounts: &'a AccountResolver<P>,
    settings: &'a ExecutionSettings,
}

impl<'a, C, S, P> DeploymentExecutor<'a, C, S, P>
where
    C: ChainClient,
    S: ArtifactStore + ?Sized,
    P: CredentialProvider,
{
    /// `chain_id` must be the id reported by the node behind `client`.
    pub fn new(
        client: &'a C,
        chain_id: u64,
        store: &'a S,
        catalog: &'a ContractCatalog,
        accounts: &'a AccountResolver<P>,
        settings: &'a ExecutionSettings,
    ) -> Self {
        Self {
            client,
            chain_id,
            store,
            session: MemoryArtifactStore::new(),
            catalog,
            accounts,
            settings,
        }
    }

    pub async fn execute(
        &self,
        task: &DeploymentTask,
        network: &NetworkConfig,
    ) -> Result<TaskOutcome, DeployError> {
        let contract = self.catalog.load(&task.contract)?;
        let args = if network.save_deployments {
            task.resolve_args(&network.name, self.store)?
        } else {
            task.resolve_args(&network.name, &self.session)?
        };
        let encoded_args = contract.encode_constructor_args(&args)?;
        let content_hash = DeploymentContent::new(&contract.bytecode, &encoded_args).compute_hash();

        let decision = DeploymentPlanner::new(self.store).decide(task, network, &content_hash)?;
        let expected_hash = decision.expected_hash().map(str::to_string);

        let supersedes = match decision {
            Decision::Skip { artifact } => {
                tracing::info!(
                    contract = %task.contract,
                    network = %network.name,
                    address = %artifact.address,
                    "Reusing existing deployment"
                );
                return Ok(TaskOutcome::Reused { artifact });
            }
            Decision::Deploy { supersedes } => supersedes,
        };

        let signer = self.accounts.resolve_signer(network, &task.from)?;
        let init_code = contract.init_code(&encoded_args);
        let salt = task.deterministic.then(|| task.salt.unwrap_or_default());

        let placement = match salt {
            Some(salt) => {
                let deployment = DeterministicDeployment::new(salt, &init_code);
                self.deploy_deterministic(task, network, &signer, &deployment)
                    .await?
            }
            None => self.deploy_create(task, network, &signer, init_code).await?,
        };

        let artifact = DeploymentArtifact {
            contract_name: task.contract.clone(),
            network: network.name.clone(),
            address: placement.address,
            args,
            encoded_args,
            content_hash,
            deployer: signer.address(),
            transaction_hash: placement.receipt.as_ref().map(|r| r.transaction_hash),
            block_number: placement.receipt.as_ref().map(|r| r.block_number),
            deterministic: task.deterministic,
            salt,
            abi: contract.abi,
            deployed_at: Utc::now(),
            tool_version: TOOL_VERSION.to_string(),
        };

        if network.save_deployments {
            self.record(&artifact, expected_hash.as_deref())?;
        } else {
            let previous = self.session.get(&artifact.contract_name, &artifact.network)?;
            self.session
                .put(&artifact, previous.as_ref().map(|a| a.content_hash.as_str()))?;
        }

        tracing::info!(
            contract = %task.contract,
            network = %network.name,
            address = %artifact.address,
            tx_hash = ?artifact.transaction_hash,
            "Contract deployed"
        );

        Ok(TaskOutcome::Deployed {
            artifact,
            superseded: supersedes.map(|previous| previous.address),
        })
    }

    /// Save the artifact of a deployment that already happened on-chain.
    fn record(&self, artifact: &DeploymentArtifact, expected_hash: Option<&str>) -> Result<(), DeployError> {
        self.store.put(artifact, expected_hash).map_err(|err| {
            tracing::error!(
                contract = %artifact.contract_name,
                network = %artifact.network,
                address = %artifact.address,
                tx_hash = ?artifact.transaction_hash,
                err = %err,
                "Contract deployed but its artifact could not be saved"
            );
            DeployError::UnrecordedDeployment {
                contract: artifact.contract_name.clone(),
                network: artifact.network.clone(),
                address: artifact.address,
                tx_hash: artifact.transaction_hash,
                source: Box::new(err),
            }
        })
    }

    async fn deploy_create(
        &self,
        task: &DeploymentTask,
        network: &NetworkConfig,
        signer: &Signer,
        init_code: Bytes,
    ) -> Result<Placement, DeployError> {
        let receipt = self
            .send_transaction(task, network, signer, TxKind::Create, init_code)
            .await?;

        let address = receipt
            .contract_address
            .ok_or_else(|| DeployError::TransactionRejected {
                reason: "receipt carries no contract address".to_string(),
                tx_hash: Some(receipt.transaction_hash),
            })?;

        Ok(Placement {
            address,
            receipt: Some(receipt),
        })
    }

    async fn deploy_deterministic(
        &self,
        task: &DeploymentTask,
        network: &NetworkConfig,
        signer: &Signer,
        deployment: &DeterministicDeployment,
    ) -> Result<Placement, DeployError> {
        if self.client.code_at(deployment.factory).await?.is_empty() {
            return Err(DeployError::MissingFactory(deployment.factory));
        }

        if !self.client.code_at(deployment.address).await?.is_empty() {
            tracing::info!(
                contract = %task.contract,
                network = %network.name,
                address = %deployment.address,
                "Code already present at deterministic address, adopting it"
            );
            return Ok(Placement {
                address: deployment.address,
                receipt: None,
            });
        }

        let receipt = self
            .send_transaction(
                task,
                network,
                signer,
                TxKind::Call(deployment.factory),
                deployment.calldata.clone(),
            )
            .await?;

        if self.client.code_at(deployment.address).await?.is_empty() {
            return Err(DeployError::TransactionRejected {
                reason: format!("no code at predicted address {}", deployment.address),
                tx_hash: Some(receipt.transaction_hash),
            });
        }

        Ok(Placement {
            address: deployment.address,
            receipt: Some(receipt),
        })
    }

    /// Sign, send and wait for a transaction. Never resubmits.
    async fn send_transaction(
        &self,
        task: &DeploymentTask,
        network: &NetworkConfig,
        signer: &Signer,
        to: TxKind,
        input: Bytes,
    ) -> Result<TransactionReceipt, DeployError> {
        let from = signer.address();

        let nonce = self.client.transaction_count(from).await?;
        let gas_price = match network.gas_price {
            Some(gas_price) => u128::from(gas_price),
            None => self.client.gas_price().await?,
        };
        let gas_limit = match network.gas {
            Some(gas) => gas,
            None => self
                .client
                .estimate_gas(from, to.to().copied(), &input)
                .await
                .map_err(|e| classify_node_error(e, from))?,
        };

        let tx = TxLegacy {
            chain_id: Some(self.chain_id),
            nonce,
            gas_price,
            gas_limit,
            to,
            value: U256::ZERO,
            input,
        };

        let (signed_hash, raw) =
            signer
                .sign_transaction(tx)
                .map_err(|e| DeployError::InvalidCredential {
                    network: network.name.clone(),
                    role: task.from.clone(),
                    reason: format!("failed to sign transaction: {e}"),
                })?;

        let tx_hash = self
            .client
            .send_raw_transaction(&raw)
            .await
            .map_err(|e| classify_node_error(e, from))?;

        if tx_hash != signed_hash {
            tracing::warn!(%tx_hash, %signed_hash, "Node returned an unexpected transaction hash");
        }

        tracing::info!(
            contract = %task.contract,
            network = %network.name,
            %from,
            nonce,
            gas_limit,
            %tx_hash,
            "Transaction sent"
        );

        let confirmations = task.confirmations.unwrap_or(self.settings.confirmations);
        let receipt = self.wait_for_receipt(tx_hash, confirmations).await?;

        if !receipt.succeeded() {
            return Err(DeployError::TransactionRejected {
                reason: "transaction reverted".to_string(),
                tx_hash: Some(tx_hash),
            });
        }

        Ok(receipt)
    }

    /// Poll until the transaction is mined with enough confirmations, or the timeout elapses.
    async fn wait_for_receipt(
        &self,
        tx_hash: B256,
        confirmations: u64,
    ) -> Result<TransactionReceipt, DeployError> {
        let client = self.client;
        let timeout = self.settings.confirmation_timeout();

        let poll = || async move {
            let receipt = client
                .transaction_receipt(tx_hash)
                .await
                .map_err(PollError::Rpc)?
                .ok_or(PollError::Pending)?;

            // A reverted transaction won't change with more blocks.
            if !receipt.succeeded() {
                return Ok(receipt);
            }

            let head = client.block_number().await.map_err(PollError::Rpc)?;
            if is_confirmed(receipt.block_number, head, confirmations) {
                Ok(receipt)
            } else {
                Err(PollError::Pending)
            }
        };

        let backoff = ConstantBuilder::default()
            .with_delay(self.settings.poll_interval())
            .without_max_times();

        let polled = tokio::time::timeout(
            timeout,
            poll.retry(backoff)
                .sleep(tokio::time::sleep)
                .notify(|err: &PollError, _| {
                    if let PollError::Rpc(e) = err {
                        tracing::warn!(%tx_hash, err = %e, "Receipt poll failed, retrying");
                    }
                }),
        )
        .await;

        match polled {
            Ok(Ok(receipt)) => Ok(receipt),
            Ok(Err(PollError::Rpc(e))) => Err(e.into()),
            Ok(Err(PollError::Pending)) | Err(_) => {
                tracing::warn!(%tx_hash, waited = ?timeout, "Transaction not confirmed in time");
                Err(DeployError::ConfirmationTimeout {
                    tx_hash,
                    waited: timeout,
                })
            }
        }
    }
}

/// Whether a transaction mined in `mined_at` has `confirmations` blocks at `head`.
fn is_confirmed(mined_at: u64, head: u64, confirmations: u64) -> bool {
    head.saturating_add(1) >= mined_at.saturating_add(confirmations.max(1))
}

/// Map a node's answer to a transaction into the deployment error taxonomy.
fn classify_node_error(err: RpcError, from: Address) -> DeployError {
    match err.node_message() {
        Some(message) if message.to_lowercase().contains("insufficient funds") => {
            DeployError::InsufficientFunds {
                address: from,
                reason: message.to_string(),
            }
        }
        Some(message) => DeployError::TransactionRejected {
            reason: message.to_string(),
            tx_hash: None,
        },
        None => err.into(),
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::{BTreeMap, HashMap},
        sync::{Arc, Mutex},
    };

    use alloy_core::primitives::keccak256;
    use serde_json::json;
    use tempdir::TempDir;

    use super::*;
    use crate::{
        ErrorClass,
        accounts::{AccountBinding, NamedAccount, StaticCredentials},
        artifact::tests::artifact as stored_artifact,
        contract::tests::lock_artifact,
        deterministic::DETERMINISTIC_DEPLOYER,
    };

    #[test]
    fn test_confirmation_depth() {
        assert!(is_confirmed(10, 10, 1));
        assert!(!is_confirmed(10, 10, 2));
        assert!(is_confirmed(10, 11, 2));
        assert!(is_confirmed(10, 10, 0));
        assert!(!is_confirmed(10, 9, 1));
    }

    #[test]
    fn test_classify_node_errors() {
        let from = Address::repeat_byte(0xf3);
        let node = |message: &str| RpcError::Node {
            method: "eth_sendRawTransaction".to_string(),
            code: -32000,
            message: message.to_string(),
        };

        let err = classify_node_error(node("Insufficient funds for gas * price + value"), from);
        assert!(matches!(err, DeployError::InsufficientFunds { address, .. } if address == from));

        let err = classify_node_error(node("nonce too low"), from);
        assert!(matches!(err, DeployError::TransactionRejected { tx_hash: None, .. }));

        let transport = RpcError::Transport {
            method: "eth_sendRawTransaction".to_string(),
            message: "connection reset".to_string(),
        };
        assert!(matches!(classify_node_error(transport, from), DeployError::Rpc(_)));
    }

    /// Chain where sent transactions are mined immediately.
    #[derive(Clone, Default)]
    struct InstantChain {
        code: Arc<Mutex<HashMap<Address, Bytes>>>,
        sent: Arc<Mutex<Vec<Bytes>>>,
        /// Mine every transaction with a failed status.
        revert: bool,
        /// Refuse every raw transaction with this node message.
        reject_with: Option<String>,
    }

    impl ChainClient for InstantChain {
        async fn chain_id(&self) -> Result<u64, RpcError> {
            Ok(31337)
        }

        async fn block_number(&self) -> Result<u64, RpcError> {
            Ok(self.sent.lock().unwrap().len() as u64)
        }

        async fn transaction_count(&self, _address: Address) -> Result<u64, RpcError> {
            Ok(self.sent.lock().unwrap().len() as u64)
        }

        async fn gas_price(&self) -> Result<u128, RpcError> {
            Ok(1_000_000_000)
        }

        async fn estimate_gas(&self, _: Address, _: Option<Address>, _: &Bytes) -> Result<u64, RpcError> {
            Ok(500_000)
        }

        async fn code_at(&self, address: Address) -> Result<Bytes, RpcError> {
            Ok(self.code.lock().unwrap().get(&address).cloned().unwrap_or_default())
        }

        async fn send_raw_transaction(&self, raw: &Bytes) -> Result<B256, RpcError> {
            if let Some(message) = &self.reject_with {
                return Err(RpcError::Node {
                    method: "eth_sendRawTransaction".to_string(),
                    code: -32000,
                    message: message.clone(),
                });
            }
            self.sent.lock().unwrap().push(raw.clone());
            Ok(keccak256(raw))
        }

        async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TransactionReceipt>, RpcError> {
            let block_number = self.sent.lock().unwrap().len() as u64;
            Ok(Some(TransactionReceipt {
                transaction_hash: tx_hash,
                block_number,
                status: if self.revert { 0 } else { 1 },
                contract_address: Some(Address::from_slice(&tx_hash[12..])),
                gas_used: 100_000,
            }))
        }
    }

    /// Store where another writer records `rival` right before every write.
    struct RacingStore {
        inner: MemoryArtifactStore,
        rival: DeploymentArtifact,
    }

    impl ArtifactStore for RacingStore {
        fn get(&self, contract: &str, network: &str) -> Result<Option<DeploymentArtifact>, DeployError> {
            self.inner.get(contract, network)
        }

        fn put(&self, artifact: &DeploymentArtifact, expected_hash: Option<&str>) -> Result<(), DeployError> {
            let current = self.inner.get(&self.rival.contract_name, &self.rival.network)?;
            self.inner
                .put(&self.rival, current.as_ref().map(|a| a.content_hash.as_str()))?;
            self.inner.put(artifact, expected_hash)
        }

        fn history(&self, contract: &str, network: &str) -> Result<Vec<DeploymentArtifact>, DeployError> {
            self.inner.history(contract, network)
        }

        fn list(&self, network: &str) -> Result<Vec<DeploymentArtifact>, DeployError> {
            self.inner.list(network)
        }

        fn record_chain_id(&self, network: &str, chain_id: u64) -> Result<(), DeployError> {
            self.inner.record_chain_id(network, chain_id)
        }
    }

    struct Fixture {
        _artifacts: TempDir,
        catalog: ContractCatalog,
        accounts: AccountResolver<StaticCredentials>,
        settings: ExecutionSettings,
        store: MemoryArtifactStore,
        network: NetworkConfig,
    }

    fn fixture() -> Fixture {
        let artifacts = TempDir::new("rollout-test").expect("Failed to create temp dir");
        std::fs::write(artifacts.path().join("Lock.json"), lock_artifact().to_string()).unwrap();

        let mut vault = lock_artifact();
        vault["contractName"] = json!("Vault");
        vault["abi"][0]["inputs"] = json!([{ "name": "_token", "type": "address" }]);
        std::fs::write(artifacts.path().join("Vault.json"), vault.to_string()).unwrap();

        let named = BTreeMap::from([(
            "deployer".to_string(),
            NamedAccount {
                default: Some(AccountBinding::Index(0)),
                networks: BTreeMap::new(),
            },
        )]);

        Fixture {
            catalog: ContractCatalog::new(artifacts.path()),
            _artifacts: artifacts,
            accounts: AccountResolver::new(named, StaticCredentials::default()),
            settings: ExecutionSettings {
                confirmations: 1,
                confirmation_timeout_secs: 5,
                poll_interval_ms: 10,
            },
            store: MemoryArtifactStore::new(),
            network: NetworkConfig::local("hardhat", 31337),
        }
    }

    #[tokio::test]
    async fn test_deterministic_without_factory_fails() {
        let f = fixture();
        let chain = InstantChain::default();
        let executor = DeploymentExecutor::new(&chain, 31337, &f.store, &f.catalog, &f.accounts, &f.settings);

        let task = DeploymentTask::new("Lock")
            .args(vec![json!(1)])
            .deterministic(None);
        let err = executor.execute(&task, &f.network).await.unwrap_err();

        assert!(matches!(err, DeployError::MissingFactory(factory) if factory == DETERMINISTIC_DEPLOYER));
        assert!(chain.sent.lock().unwrap().is_empty());
        assert!(f.store.get("Lock", "hardhat").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deterministic_adopts_existing_code() {
        let f = fixture();
        let chain = InstantChain::default();

        let task = DeploymentTask::new("Lock")
            .args(vec![json!(1)])
            .deterministic(Some(B256::repeat_byte(0x01)));

        let contract = f.catalog.load("Lock").unwrap();
        let encoded = contract.encode_constructor_args(&task.args).unwrap();
        let predicted =
            DeterministicDeployment::new(B256::repeat_byte(0x01), &contract.init_code(&encoded));

        {
            let mut code = chain.code.lock().unwrap();
            code.insert(DETERMINISTIC_DEPLOYER, Bytes::from_static(&[0x60, 0x00]));
            code.insert(predicted.address, Bytes::from_static(&[0x60, 0x01]));
        }

        let executor = DeploymentExecutor::new(&chain, 31337, &f.store, &f.catalog, &f.accounts, &f.settings);
        let outcome = executor.execute(&task, &f.network).await.unwrap();

        let artifact = outcome.artifact();
        assert_eq!(artifact.address, predicted.address);
        assert!(artifact.deterministic);
        assert_eq!(artifact.salt, Some(B256::repeat_byte(0x01)));
        assert!(artifact.transaction_hash.is_none());
        assert!(chain.sent.lock().unwrap().is_empty());
        assert_eq!(f.store.get("Lock", "hardhat").unwrap().as_ref(), Some(artifact));
    }

    #[tokio::test]
    async fn test_non_persistent_network_leaves_store_untouched() {
        let mut f = fixture();
        f.network.save_deployments = false;
        let chain = InstantChain::default();
        let executor = DeploymentExecutor::new(&chain, 31337, &f.store, &f.catalog, &f.accounts, &f.settings);

        let task = DeploymentTask::new("Lock").args(vec![json!(1)]);
        let first = executor.execute(&task, &f.network).await.unwrap();
        let second = executor.execute(&task, &f.network).await.unwrap();

        assert!(matches!(first, TaskOutcome::Deployed { .. }));
        assert!(matches!(second, TaskOutcome::Deployed { .. }));
        assert_eq!(chain.sent.lock().unwrap().len(), 2);
        assert!(f.store.get("Lock", "hardhat").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reverted_transaction_is_not_recorded() {
        let f = fixture();
        let chain = InstantChain {
            revert: true,
            ..Default::default()
        };
        let executor = DeploymentExecutor::new(&chain, 31337, &f.store, &f.catalog, &f.accounts, &f.settings);

        let task = DeploymentTask::new("Lock").args(vec![json!(1)]);
        let err = executor.execute(&task, &f.network).await.unwrap_err();

        let sent = keccak256(&chain.sent.lock().unwrap()[0]);
        assert!(matches!(err, DeployError::TransactionRejected { tx_hash: Some(hash), .. } if hash == sent));
        assert_eq!(err.tx_hash(), Some(sent));
        assert_eq!(err.class(), ErrorClass::Execution);
        assert!(f.store.get("Lock", "hardhat").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insufficient_funds_is_reported_for_deployer() {
        let f = fixture();
        let chain = InstantChain {
            reject_with: Some("insufficient funds for gas * price + value".to_string()),
            ..Default::default()
        };
        let executor = DeploymentExecutor::new(&chain, 31337, &f.store, &f.catalog, &f.accounts, &f.settings);
        let deployer = f.accounts.resolve_signer(&f.network, "deployer").unwrap().address();

        let task = DeploymentTask::new("Lock").args(vec![json!(1)]);
        let err = executor.execute(&task, &f.network).await.unwrap_err();

        assert!(matches!(err, DeployError::InsufficientFunds { address, .. } if address == deployer));
        assert_eq!(err.tx_hash(), None);
        assert!(chain.sent.lock().unwrap().is_empty());
        assert!(f.store.get("Lock", "hardhat").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lost_store_race_reports_deployed_address() {
        let f = fixture();
        let chain = InstantChain::default();
        let rival = stored_artifact("Lock", "hardhat", 99);
        let store = RacingStore {
            inner: MemoryArtifactStore::new(),
            rival: rival.clone(),
        };
        let executor = DeploymentExecutor::new(&chain, 31337, &store, &f.catalog, &f.accounts, &f.settings);

        let task = DeploymentTask::new("Lock").args(vec![json!(1)]);
        let err = executor.execute(&task, &f.network).await.unwrap_err();

        let sent = keccak256(&chain.sent.lock().unwrap()[0]);
        let deployed = Address::from_slice(&sent[12..]);
        match &err {
            DeployError::UnrecordedDeployment {
                address, source, ..
            } => {
                assert_eq!(*address, deployed);
                assert!(matches!(**source, DeployError::ArtifactConflict { .. }));
            }
            other => panic!("expected an unrecorded deployment, got {other:?}"),
        }
        assert_eq!(err.tx_hash(), Some(sent));
        assert_eq!(err.class(), ErrorClass::Execution);
        assert!(err.to_string().contains(&deployed.to_string()));
        assert_eq!(store.get("Lock", "hardhat").unwrap(), Some(rival));
    }

    #[tokio::test]
    async fn test_non_persistent_network_resolves_references_from_session() {
        let mut f = fixture();
        f.network.save_deployments = false;
        let chain = InstantChain::default();
        let executor = DeploymentExecutor::new(&chain, 31337, &f.store, &f.catalog, &f.accounts, &f.settings);

        let lock = executor
            .execute(&DeploymentTask::new("Lock").args(vec![json!(1)]), &f.network)
            .await
            .unwrap();
        let vault = executor
            .execute(
                &DeploymentTask::new("Vault").args(vec![json!("artifact:Lock")]),
                &f.network,
            )
            .await
            .unwrap();

        assert_eq!(
            vault.artifact().args,
            vec![json!(lock.artifact().address.to_string())]
        );
        assert!(f.store.list("hardhat").unwrap().is_empty());
    }
}
