//! The bridge contract events the orchestrator consumes.
//!
//! Only event *types* live here; fetching the receipts that carry them is the
//! chain endpoint's job.

use alloy_sol_types::sol;

sol! {
    /// Emitted by the portal on the L1 for every L1→L2 deposit.
    ///
    /// `opaqueData` packs `(mint, value, gasLimit, isCreation, data)` the way
    /// the portal's `depositTransaction` assembled it.
    event TransactionDeposited(
        address indexed from,
        address indexed to,
        uint256 indexed version,
        bytes opaqueData
    );

    /// Emitted by the message passer predeploy on the L2 when a withdrawal is
    /// initiated.
    event MessagePassed(
        uint256 indexed nonce,
        address indexed sender,
        address indexed target,
        uint256 value,
        uint256 gasLimit,
        bytes data,
        bytes32 withdrawalHash
    );
}

#[cfg(test)]
mod tests {
    use alloy_sol_types::SolEvent;

    use super::*;

    // Selectors pinned against the deployed contracts.
    #[test]
    fn test_event_selectors() {
        assert_eq!(
            TransactionDeposited::SIGNATURE_HASH.to_string(),
            "0xb3813568d9991fc951961fcb4c784893574240a28925604d09fc577c55bb7c32",
        );
        assert_eq!(
            MessagePassed::SIGNATURE_HASH.to_string(),
            "0x02a52367d10742d8032712c1bb8e0144ff1ec5ffda1ed7d70bb05a2744955054",
        );
    }
}
