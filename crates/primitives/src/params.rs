//! Protocol parameters for a bridge deployment.
//!
//! These identify the chain pair and the bridge contracts; unlike the
//! operational configuration they are fixed per deployment and shared by
//! everyone bridging against it.

use std::time::Duration;

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};

/// The address of the message passer predeploy, identical on every rollup
/// derived from the reference stack.
pub const DEFAULT_MESSAGE_PASSER: Address =
    address!("4200000000000000000000000000000000000016");

/// The protocol parameters of one bridge deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParams {
    /// The chain id of the settlement chain.
    pub l1_chain_id: u64,

    /// The chain id of the rollup.
    pub l2_chain_id: u64,

    /// The dispute window a proven withdrawal must wait out before it can be
    /// finalized. Days in production deployments, seconds in test ones.
    pub challenge_period: Duration,

    /// The L2 gas limit attached to deposit transactions.
    pub deposit_gas_limit: u64,

    /// The L1 gas limit forwarded with withdrawal initiations.
    pub withdrawal_gas_limit: u64,

    /// The bridge contract addresses.
    pub contracts: ContractAddresses,
}

/// The bridge contracts the orchestrator interacts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    /// The portal on the L1: deposits enter and withdrawals exit through it.
    pub optimism_portal: Address,

    /// The output oracle on the L1 the rollup posts its output roots to.
    pub l2_output_oracle: Address,

    /// The message passer predeploy on the L2.
    #[serde(default = "default_message_passer")]
    pub l2_to_l1_message_passer: Address,
}

fn default_message_passer() -> Address {
    DEFAULT_MESSAGE_PASSER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_deserialize_from_toml_shape() {
        // The shape a deployment params file takes.
        let json = serde_json::json!({
            "l1_chain_id": 11155111u64,
            "l2_chain_id": 84532u64,
            "challenge_period": { "secs": 12, "nanos": 0 },
            "deposit_gas_limit": 100000u64,
            "withdrawal_gas_limit": 100000u64,
            "contracts": {
                "optimism_portal": "0x49f53e41452c74589e85ca1677426ba426459e85",
                "l2_output_oracle": "0x84457ca9d0163fbc4bbfe4dfbb20ba46e48df254",
            },
        });

        let params: ProtocolParams = serde_json::from_value(json).unwrap();
        assert_eq!(params.challenge_period, Duration::from_secs(12));
        assert_eq!(
            params.contracts.l2_to_l1_message_passer,
            DEFAULT_MESSAGE_PASSER,
            "message passer must default to the predeploy address"
        );
    }
}
