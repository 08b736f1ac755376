//! Compiled contract artifacts produced by the Solidity toolchain.

use std::path::{Path, PathBuf};

use alloy_core::{
    dyn_abi::{DynSolValue, Specifier},
    json_abi::JsonAbi,
    primitives::Bytes,
};
use serde::Deserialize;
use serde_json::Value;

use crate::DeployError;

/// A compiled contract, read from a Hardhat-style artifact file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledContract {
    pub contract_name: String,
    pub abi: JsonAbi,
    /// Creation bytecode.
    pub bytecode: Bytes,
}

impl CompiledContract {
    /// ABI-encode constructor arguments against the constructor's declared inputs.
    ///
    /// Arguments are JSON scalars or arrays; numbers may be given as strings to
    /// avoid precision loss.
    pub fn encode_constructor_args(&self, args: &[Value]) -> Result<Bytes, DeployError> {
        let invalid = |reason: String| DeployError::InvalidArguments {
            contract: self.contract_name.clone(),
            reason,
        };

        let inputs = self
            .abi
            .constructor
            .as_ref()
            .map(|constructor| constructor.inputs.as_slice())
            .unwrap_or_default();

        if inputs.len() != args.len() {
            return Err(invalid(format!(
                "constructor takes {} argument(s), {} given",
                inputs.len(),
                args.len()
            )));
        }

        if inputs.is_empty() {
            return Ok(Bytes::new());
        }

        let values = inputs
            .iter()
            .zip(args)
            .map(|(param, arg)| {
                let ty = param
                    .resolve()
                    .map_err(|e| invalid(format!("unsupported type for '{}': {e}", param.name)))?;
                let literal = sol_literal(arg).map_err(&invalid)?;
                ty.coerce_str(&literal).map_err(|e| {
                    invalid(format!("'{literal}' is not a valid {} for '{}': {e}", param.ty, param.name))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DynSolValue::Tuple(values).abi_encode_params().into())
    }

    /// Init code sent in a creation transaction.
    pub fn init_code(&self, encoded_args: &Bytes) -> Bytes {
        [self.bytecode.as_ref(), encoded_args.as_ref()].concat().into()
    }
}

/// Render a JSON argument as a Solidity literal understood by the ABI coercer.
fn sol_literal(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Array(items) => {
            let items = items.iter().map(sol_literal).collect::<Result<Vec<_>, _>>()?;
            Ok(format!("[{}]", items.join(",")))
        }
        Value::Null | Value::Object(_) => Err(format!("unsupported argument value: {value}")),
    }
}

/// Looks up compiled contracts under a toolchain artifacts directory.
#[derive(Debug, Clone)]
pub struct ContractCatalog {
    root: PathBuf,
}

impl ContractCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load the compiled contract named `name`.
    pub fn load(&self, name: &str) -> Result<CompiledContract, DeployError> {
        let path = find_artifact(&self.root, &format!("{name}.json"))?
            .ok_or_else(|| DeployError::UnknownContract(name.to_string()))?;

        let content = std::fs::read_to_string(&path)?;
        let contract: CompiledContract =
            serde_json::from_str(&content).map_err(|e| DeployError::InvalidArguments {
                contract: name.to_string(),
                reason: format!("unreadable compiler artifact {}: {e}", path.display()),
            })?;

        if contract.bytecode.is_empty() {
            return Err(DeployError::InvalidArguments {
                contract: name.to_string(),
                reason: "contract has no creation bytecode (abstract or interface?)".to_string(),
            });
        }

        tracing::trace!(contract = name, path = %path.display(), "Loaded compiled contract");

        Ok(contract)
    }
}

/// Depth-first search for `file_name`, skipping build-info and debug files.
fn find_artifact(dir: &Path, file_name: &str) -> std::io::Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let mut entries = std::fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            if entry.file_name() == "build-info" {
                continue;
            }
            if let Some(found) = find_artifact(&path, file_name)? {
                return Ok(Some(found));
            }
        } else if entry.file_name() == file_name {
            return Ok(Some(path));
        }
    }

    Ok(None)
}
