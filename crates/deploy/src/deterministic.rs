//! Deterministic (CREATE2) deployments through the canonical deployment proxy.

use alloy_core::primitives::{Address, B256, Bytes, address};

/// The deterministic deployment proxy present on most EVM chains.
///
/// It takes `salt ++ init_code` as calldata and deploys with CREATE2.
pub const DETERMINISTIC_DEPLOYER: Address = address!("0x4e59b44847b379578588920ca78fbf26c0b4956c");

/// Target of a deterministic deployment, known before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterministicDeployment {
    pub factory: Address,
    pub salt: B256,
    /// Address the contract will live at.
    pub address: Address,
    /// Calldata for the factory call.
    pub calldata: Bytes,
}

impl DeterministicDeployment {
    pub fn new(salt: B256, init_code: &Bytes) -> Self {
        Self::with_factory(DETERMINISTIC_DEPLOYER, salt, init_code)
    }

    pub fn with_factory(factory: Address, salt: B256, init_code: &Bytes) -> Self {
        let address = factory.create2_from_code(salt, init_code);
        let calldata = [salt.as_slice(), init_code.as_ref()].concat().into();

        Self {
            factory,
            salt,
            address,
            calldata,
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_core::primitives::{b256, bytes};

    use super::*;

    #[test]
    fn test_create2_address_matches_eip1014_example() {
        // EIP-1014 example 5: deployer 0x00..00deadbeef, salt 0xcafebabe, init code 0xdeadbeef.
        let factory = address!("0x00000000000000000000000000000000deadbeef");
        let salt = b256!("0x00000000000000000000000000000000000000000000000000000000cafebabe");
        let init_code = bytes!("deadbeef");

        let deployment = DeterministicDeployment::with_factory(factory, salt, &init_code);

        assert_eq!(
            deployment.address,
            address!("0x60f3f640a8508fC6a86d45DF051962668E1e8AC7")
        );
    }

    #[test]
    fn test_calldata_is_salt_then_init_code() {
        let init_code = bytes!("6080604052");
        let deployment = DeterministicDeployment::new(B256::ZERO, &init_code);

        assert_eq!(deployment.factory, DETERMINISTIC_DEPLOYER);
        assert_eq!(deployment.calldata.len(), 32 + init_code.len());
        assert_eq!(&deployment.calldata[32..], init_code.as_ref());
    }

    #[test]
    fn test_salt_changes_address() {
        let init_code = bytes!("6080604052");
        let a = DeterministicDeployment::new(B256::ZERO, &init_code);
        let b = DeterministicDeployment::new(B256::with_last_byte(1), &init_code);
        assert_ne!(a.address, b.address);
    }
}
