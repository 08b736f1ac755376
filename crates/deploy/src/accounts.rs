//! Resolution of named account roles to signers.

use std::collections::{BTreeMap, HashMap};

use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_core::primitives::{Address, B256, Bytes};
use alloy_eips::eip2718::Encodable2718;
use alloy_signer::SignerSync;
use alloy_signer_local::{MnemonicBuilder, PrivateKeySigner, coins_bip39::English};
use k256::ecdsa::SigningKey;
use serde::{Deserialize, Serialize};

use crate::{AccountsConfig, DeployError, NetworkConfig};

/// Role used by tasks that don't name one.
pub const DEFAULT_ROLE: &str = "deployer";

/// Source of injected secrets such as private keys.
pub trait CredentialProvider: Send + Sync {
    /// Look up the secret stored under `key`. `None` when it is not provided.
    fn secret(&self, key: &str) -> Option<String>;
}

/// Reads secrets from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialProvider for EnvCredentials {
    fn secret(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|value| !value.trim().is_empty())
    }
}

/// Secrets held in memory, for embedding and tests.
#[derive(Clone, Default)]
pub struct StaticCredentials(HashMap<String, String>);

impl StaticCredentials {
    pub fn with(mut self, key: impl Into<String>, secret: impl Into<String>) -> Self {
        self.0.insert(key.into(), secret.into());
        self
    }
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

impl CredentialProvider for StaticCredentials {
    fn secret(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

/// How a role maps to an account on a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccountBinding {
    /// Index into the network's account list.
    Index(usize),
    /// Private key injected under the given variable name.
    Credential { private_key_env: String },
}

/// Bindings of one role: a default plus per-network overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedAccount {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<AccountBinding>,
    #[serde(flatten)]
    pub networks: BTreeMap<String, AccountBinding>,
}

impl NamedAccount {
    pub fn binding_for(&self, network: &str) -> Option<&AccountBinding> {
        self.networks.get(network).or(self.default.as_ref())
    }
}

/// An account able to sign transactions. Never exposes its key.
#[derive(Clone)]
pub struct Signer {
    inner: PrivateKeySigner,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("address", &self.inner.address())
            .finish_non_exhaustive()
    }
}

impl Signer {
    pub fn address(&self) -> Address {
        self.inner.address()
    }

    /// Sign a legacy transaction, returning its hash and the raw EIP-2718 encoding.
    pub fn sign_transaction(&self, tx: TxLegacy) -> Result<(B256, Bytes), alloy_signer::Error> {
        let signature = self.inner.sign_hash_sync(&tx.signature_hash())?;
        let signed = tx.into_signed(signature);
        let tx_hash = *signed.hash();
        let envelope = TxEnvelope::from(signed);

        Ok((tx_hash, envelope.encoded_2718().into()))
    }

    fn from_private_key(private_key_hex: &str) -> Result<Self, String> {
        let private_key_hex = private_key_hex.trim();
        let private_key_hex = private_key_hex
            .strip_prefix("0x")
            .unwrap_or(private_key_hex);

        let private_key_bytes: [u8; 32] = hex::decode(private_key_hex)
            .map_err(|_| "private key is not valid hex".to_string())?
            .try_into()
            .map_err(|_| "private key must be exactly 32 bytes".to_string())?;

        let signing_key = SigningKey::from_bytes(&private_key_bytes.into())
            .map_err(|_| "not a valid secp256k1 private key".to_string())?;

        Ok(Self {
            inner: PrivateKeySigner::from_signing_key(signing_key),
        })
    }

    fn from_mnemonic(mnemonic: &str, index: u32) -> Result<Self, String> {
        let inner = MnemonicBuilder::<English>::default()
            .phrase(mnemonic)
            .index(index)
            .and_then(|builder| builder.build())
            .map_err(|e| format!("failed to derive account {index} from mnemonic: {e}"))?;

        Ok(Self { inner })
    }
}

/// Maps role names to signers for a given network.
pub struct AccountResolver<P = EnvCredentials> {
    named_accounts: BTreeMap<String, NamedAccount>,
    credentials: P,
}

impl<P: CredentialProvider> AccountResolver<P> {
    pub fn new(named_accounts: BTreeMap<String, NamedAccount>, credentials: P) -> Self {
        Self {
            named_accounts,
            credentials,
        }
    }

    /// Resolve the signer bound to `role` on `network`.
    pub fn resolve_signer(&self, network: &NetworkConfig, role: &str) -> Result<Signer, DeployError> {
        let missing = |reason: String| DeployError::MissingCredential {
            network: network.name.clone(),
            role: role.to_string(),
            reason,
        };
        let invalid = |reason: String| DeployError::InvalidCredential {
            network: network.name.clone(),
            role: role.to_string(),
            reason,
        };

        let binding = self
            .named_accounts
            .get(role)
            .and_then(|account| account.binding_for(&network.name))
            .ok_or_else(|| missing("role has no account binding".to_string()))?;

        let signer = match binding {
            AccountBinding::Credential { private_key_env } => {
                let secret = self
                    .credentials
                    .secret(private_key_env)
                    .ok_or_else(|| missing(format!("{private_key_env} is not provided")))?;
                Signer::from_private_key(&secret).map_err(invalid)?
            }
            AccountBinding::Index(index) => match &network.accounts {
                AccountsConfig::Mnemonic { mnemonic, count } => {
                    if network.live {
                        return Err(invalid(
                            "live networks cannot use mnemonic accounts".to_string(),
                        ));
                    }
                    let index = u32::try_from(*index)
                        .ok()
                        .filter(|index| index < count)
                        .ok_or_else(|| {
                            invalid(format!("account index {index} is out of range ({count} accounts)"))
                        })?;
                    Signer::from_mnemonic(mnemonic, index).map_err(invalid)?
                }
                AccountsConfig::PrivateKeys { private_keys_env } => {
                    let key = private_keys_env.get(*index).ok_or_else(|| {
                        invalid(format!(
                            "account index {index} is out of range ({} accounts)",
                            private_keys_env.len()
                        ))
                    })?;
                    let secret = self
                        .credentials
                        .secret(key)
                        .ok_or_else(|| missing(format!("{key} is not provided")))?;
                    Signer::from_private_key(&secret).map_err(invalid)?
                }
            },
        };

        tracing::debug!(
            network = %network.name,
            role,
            address = %signer.address(),
            "Resolved signer"
        );

        Ok(signer)
    }
}
