//! The Deposit State Machine (DSM).
//!
//! Drives one L1→L2 deposit: submit the portal deposit on the settlement
//! chain, wait for its receipt, derive the hash of the rollup transaction the
//! sequencer will include for it, and wait for that transaction to confirm.
//! The derivation itself is pure and lives in
//! [`portal_bridge_primitives::deposit`]; the machine only sequences it.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use tracing::info;

use portal_bridge_primitives::types::{ChainKind, TransactionRecord, TxReceipt};

use crate::{errors::TransitionErr, state_machine::StateMachine};

/// Static configuration of one deposit operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositCfg {
    /// The amount of ETH bridged to the rollup, in wei.
    pub amount: U256,

    /// The rollup address credited with the deposit.
    pub recipient: Address,
}

/// The state of a deposit operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepositState {
    /// Nothing has been submitted yet.
    Init,

    /// The portal deposit is in flight on the settlement chain.
    Submitted {
        /// The settlement-chain deposit transaction.
        l1: TransactionRecord,
    },

    /// The portal deposit is confirmed; the rollup-side hash has not been
    /// derived yet.
    SourceConfirmed {
        /// The settlement-chain deposit transaction.
        l1: TransactionRecord,
    },

    /// The rollup transaction hash is known; waiting for it to confirm.
    DestinationDerived {
        /// The settlement-chain deposit transaction.
        l1: TransactionRecord,

        /// The derived hash of the rollup deposit transaction.
        l2_txid: B256,
    },

    /// Both legs are confirmed; the deposit is done.
    Complete {
        /// The settlement-chain deposit transaction.
        l1: TransactionRecord,

        /// The rollup deposit transaction.
        l2: TransactionRecord,
    },
}

impl DepositState {
    /// A short label of the state, for logs and persistence rows.
    pub const fn step(&self) -> &'static str {
        match self {
            DepositState::Init => "init",
            DepositState::Submitted { .. } => "submitted",
            DepositState::SourceConfirmed { .. } => "source_confirmed",
            DepositState::DestinationDerived { .. } => "destination_derived",
            DepositState::Complete { .. } => "complete",
        }
    }
}

/// Events a deposit machine transitions on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositEvent {
    /// The RPC accepted the portal deposit and assigned it a hash.
    SubmissionAcked {
        /// The hash of the submitted transaction.
        txid: B256,
    },

    /// The portal deposit confirmed on the settlement chain.
    SourceConfirmed {
        /// The confirmation receipt.
        receipt: TxReceipt,
    },

    /// The rollup transaction hash was derived from the confirmed receipt.
    DestinationHashDerived {
        /// The derived hash.
        l2_txid: B256,
    },

    /// The derived rollup transaction confirmed.
    DestinationConfirmed {
        /// The confirmation receipt.
        receipt: TxReceipt,
    },
}

/// Duties a deposit machine asks the executor to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositDuty {
    /// Submit the portal deposit on the settlement chain.
    SubmitDeposit {
        /// The deposited amount in wei.
        amount: U256,

        /// The rollup address to credit.
        recipient: Address,
    },

    /// Await the receipt of the submitted portal deposit.
    AwaitSourceReceipt {
        /// The hash being awaited.
        txid: B256,
    },

    /// Derive the rollup transaction hash from the confirmed receipt.
    DeriveDestinationHash {
        /// The confirmed settlement-chain receipt.
        receipt: TxReceipt,
    },

    /// Await the receipt of the derived rollup transaction.
    AwaitDestinationReceipt {
        /// The hash being awaited.
        txid: B256,
    },
}

/// The state machine tracking one deposit operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositSM {
    /// Static configuration of the operation.
    pub cfg: DepositCfg,

    /// The current state.
    pub state: DepositState,
}

impl DepositSM {
    /// Creates a machine for a deposit that has not been submitted yet.
    pub const fn new(cfg: DepositCfg) -> Self {
        Self {
            cfg,
            state: DepositState::Init,
        }
    }

    fn process_submission_acked(&mut self, txid: B256) -> Result<(), TransitionErr> {
        match &self.state {
            DepositState::Init => {
                info!(%txid, "deposit submitted on the settlement chain");
                self.state = DepositState::Submitted {
                    l1: TransactionRecord::new(txid, ChainKind::L1),
                };
                Ok(())
            }
            state => Err(TransitionErr(format!(
                "unexpected SubmissionAcked in state {}",
                state.step()
            ))),
        }
    }

    fn process_source_confirmed(&mut self, receipt: TxReceipt) -> Result<(), TransitionErr> {
        match &self.state {
            DepositState::Submitted { l1 } => {
                if receipt.tx_hash != l1.hash {
                    return Err(TransitionErr(format!(
                        "receipt {} does not match submitted deposit {}",
                        receipt.tx_hash, l1.hash
                    )));
                }
                if !receipt.success {
                    return Err(TransitionErr(format!(
                        "deposit transaction {} reverted",
                        receipt.tx_hash
                    )));
                }

                let mut l1 = l1.clone();
                l1.confirm(receipt);
                info!(txid = %l1.hash, "deposit confirmed on the settlement chain");
                self.state = DepositState::SourceConfirmed { l1 };
                Ok(())
            }
            state => Err(TransitionErr(format!(
                "unexpected SourceConfirmed in state {}",
                state.step()
            ))),
        }
    }

    fn process_destination_derived(&mut self, l2_txid: B256) -> Result<(), TransitionErr> {
        match &self.state {
            DepositState::SourceConfirmed { l1 } => {
                info!(%l2_txid, "derived rollup transaction hash for deposit");
                self.state = DepositState::DestinationDerived {
                    l1: l1.clone(),
                    l2_txid,
                };
                Ok(())
            }
            state => Err(TransitionErr(format!(
                "unexpected DestinationHashDerived in state {}",
                state.step()
            ))),
        }
    }

    fn process_destination_confirmed(&mut self, receipt: TxReceipt) -> Result<(), TransitionErr> {
        match &self.state {
            DepositState::DestinationDerived { l1, l2_txid } => {
                if receipt.tx_hash != *l2_txid {
                    return Err(TransitionErr(format!(
                        "receipt {} does not match derived rollup transaction {}",
                        receipt.tx_hash, l2_txid
                    )));
                }

                let mut l2 = TransactionRecord::new(*l2_txid, ChainKind::L2);
                l2.confirm(receipt);
                info!(txid = %l2.hash, "deposit confirmed on the rollup");
                self.state = DepositState::Complete {
                    l1: l1.clone(),
                    l2,
                };
                Ok(())
            }
            state => Err(TransitionErr(format!(
                "unexpected DestinationConfirmed in state {}",
                state.step()
            ))),
        }
    }
}

impl StateMachine for DepositSM {
    type Event = DepositEvent;
    type Duty = DepositDuty;
    type Error = TransitionErr;

    fn process_event(&mut self, event: Self::Event) -> Result<(), Self::Error> {
        match event {
            DepositEvent::SubmissionAcked { txid } => self.process_submission_acked(txid),
            DepositEvent::SourceConfirmed { receipt } => self.process_source_confirmed(receipt),
            DepositEvent::DestinationHashDerived { l2_txid } => {
                self.process_destination_derived(l2_txid)
            }
            DepositEvent::DestinationConfirmed { receipt } => {
                self.process_destination_confirmed(receipt)
            }
        }
    }

    fn pending_duty(&self) -> Option<Self::Duty> {
        match &self.state {
            DepositState::Init => Some(DepositDuty::SubmitDeposit {
                amount: self.cfg.amount,
                recipient: self.cfg.recipient,
            }),
            // an in-flight submission is only ever awaited, never redone
            DepositState::Submitted { l1 } => Some(DepositDuty::AwaitSourceReceipt {
                txid: l1.hash,
            }),
            DepositState::SourceConfirmed { l1 } => {
                l1.receipt().cloned().map(|receipt| DepositDuty::DeriveDestinationHash { receipt })
            }
            DepositState::DestinationDerived { l2_txid, .. } => {
                Some(DepositDuty::AwaitDestinationReceipt { txid: *l2_txid })
            }
            DepositState::Complete { .. } => None,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self.state, DepositState::Complete { .. })
    }

    fn step(&self) -> &'static str {
        self.state.step()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> DepositCfg {
        DepositCfg {
            amount: U256::from(1_000_000_000_000_000_000u128),
            recipient: Address::repeat_byte(0x11),
        }
    }

    fn receipt_for(txid: B256) -> TxReceipt {
        TxReceipt {
            tx_hash: txid,
            block_hash: B256::repeat_byte(0xbb),
            block_number: 100,
            success: true,
            logs: vec![],
        }
    }

    #[test]
    fn test_full_walkthrough() {
        let l1_txid = B256::repeat_byte(0x01);
        let l2_txid = B256::repeat_byte(0x02);
        let mut sm = DepositSM::new(cfg());

        assert!(matches!(
            sm.pending_duty(),
            Some(DepositDuty::SubmitDeposit { .. })
        ));

        sm.process_event(DepositEvent::SubmissionAcked { txid: l1_txid })
            .unwrap();
        assert!(matches!(
            sm.pending_duty(),
            Some(DepositDuty::AwaitSourceReceipt { txid }) if txid == l1_txid
        ));

        sm.process_event(DepositEvent::SourceConfirmed {
            receipt: receipt_for(l1_txid),
        })
        .unwrap();
        assert!(matches!(
            sm.pending_duty(),
            Some(DepositDuty::DeriveDestinationHash { .. })
        ));

        sm.process_event(DepositEvent::DestinationHashDerived { l2_txid })
            .unwrap();
        assert!(matches!(
            sm.pending_duty(),
            Some(DepositDuty::AwaitDestinationReceipt { txid }) if txid == l2_txid
        ));

        sm.process_event(DepositEvent::DestinationConfirmed {
            receipt: receipt_for(l2_txid),
        })
        .unwrap();
        assert!(sm.is_terminal());
        assert!(sm.pending_duty().is_none());
    }

    #[test]
    fn test_resumed_machine_never_resubmits() {
        let l1_txid = B256::repeat_byte(0x01);
        let mut sm = DepositSM::new(cfg());
        sm.process_event(DepositEvent::SubmissionAcked { txid: l1_txid })
            .unwrap();

        // a machine restored mid-flight must re-emit the await, not a submit
        let restored: DepositSM =
            serde_json::from_str(&serde_json::to_string(&sm).unwrap()).unwrap();
        assert!(matches!(
            restored.pending_duty(),
            Some(DepositDuty::AwaitSourceReceipt { txid }) if txid == l1_txid
        ));
    }

    #[test]
    fn test_stale_event_is_rejected() {
        let l1_txid = B256::repeat_byte(0x01);
        let mut sm = DepositSM::new(cfg());
        sm.process_event(DepositEvent::SubmissionAcked { txid: l1_txid })
            .unwrap();
        sm.process_event(DepositEvent::SourceConfirmed {
            receipt: receipt_for(l1_txid),
        })
        .unwrap();

        let before = sm.clone();
        let err = sm
            .process_event(DepositEvent::SubmissionAcked { txid: l1_txid })
            .unwrap_err();
        assert!(err.0.contains("SubmissionAcked"));
        assert_eq!(sm, before, "rejected events must not mutate the machine");
    }

    #[test]
    fn test_mismatched_receipt_is_rejected() {
        let mut sm = DepositSM::new(cfg());
        sm.process_event(DepositEvent::SubmissionAcked {
            txid: B256::repeat_byte(0x01),
        })
        .unwrap();

        assert!(sm
            .process_event(DepositEvent::SourceConfirmed {
                receipt: receipt_for(B256::repeat_byte(0x99)),
            })
            .is_err());
    }

    #[test]
    fn test_reverted_deposit_is_rejected() {
        let l1_txid = B256::repeat_byte(0x01);
        let mut sm = DepositSM::new(cfg());
        sm.process_event(DepositEvent::SubmissionAcked { txid: l1_txid })
            .unwrap();

        let mut receipt = receipt_for(l1_txid);
        receipt.success = false;
        assert!(sm
            .process_event(DepositEvent::SourceConfirmed { receipt })
            .is_err());
    }

    #[test]
    fn test_duty_is_stable_between_events() {
        let mut sm = DepositSM::new(cfg());
        sm.process_event(DepositEvent::SubmissionAcked {
            txid: B256::repeat_byte(0x01),
        })
        .unwrap();
        assert_eq!(sm.pending_duty(), sm.pending_duty());
    }
}
