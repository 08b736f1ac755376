use alloy_core::primitives::Bytes;
use sha2::{Digest, Sha256};

/// The parts of a deployment that, when changed, require a new contract instance.
///
/// Only the creation bytecode and the ABI-encoded constructor arguments are covered.
/// Which account sends the transaction, gas settings and confirmation depth are not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentContent<'a> {
    /// Creation bytecode as emitted by the compiler.
    pub bytecode: &'a Bytes,
    /// ABI-encoded constructor arguments.
    pub constructor_args: &'a Bytes,
}

impl<'a> DeploymentContent<'a> {
    pub fn new(bytecode: &'a Bytes, constructor_args: &'a Bytes) -> Self {
        Self {
            bytecode,
            constructor_args,
        }
    }

    /// Compute a SHA-256 hash of the init code (bytecode followed by arguments).
    ///
    /// The bytecode length is mixed in first so that moving bytes between the
    /// bytecode and the arguments always changes the hash.
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.bytecode.len() as u64).to_be_bytes());
        hasher.update(self.bytecode);
        hasher.update(self.constructor_args);
        hex::encode(hasher.finalize())
    }
}
