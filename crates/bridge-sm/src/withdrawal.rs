//! The Withdrawal State Machine (WSM).
//!
//! Drives one L2→L1 withdrawal through the full exit pipeline: initiate on
//! the rollup, wait for the initiation receipt and extract the withdrawal
//! message from it, wait for an output root covering the initiation block,
//! prove the withdrawal against that output on the settlement chain, sit out
//! the challenge period, and finalize. Submissions and their confirmations
//! are separate transitions, so a crash between the two resumes into an
//! await, never a second submission.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use tracing::info;

use portal_bridge_primitives::{
    types::{ChainKind, OutputData, TransactionRecord, TxReceipt},
    withdrawal::WithdrawalMessage,
};

use crate::{errors::TransitionErr, state_machine::StateMachine};

/// Static configuration of one withdrawal operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalCfg {
    /// The amount of ETH withdrawn to the settlement chain, in wei.
    pub amount: U256,

    /// The settlement-chain address the funds are released to.
    pub recipient: Address,
}

/// The state of a withdrawal operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawalState {
    /// Nothing has been submitted yet.
    Init,

    /// The initiation is in flight on the rollup.
    Submitted {
        /// The rollup initiation transaction.
        l2: TransactionRecord,
    },

    /// The initiation is confirmed and its withdrawal message extracted;
    /// waiting for an output root covering the initiation block.
    InitiationConfirmed {
        /// The rollup initiation transaction.
        l2: TransactionRecord,

        /// The withdrawal message recorded by the message passer.
        message: WithdrawalMessage,
    },

    /// An output covering the initiation is published; the prove call can be
    /// constructed and submitted.
    ProofReady {
        /// The rollup initiation transaction.
        l2: TransactionRecord,

        /// The withdrawal message recorded by the message passer.
        message: WithdrawalMessage,

        /// The published output the proof will target.
        output: OutputData,
    },

    /// The prove call is in flight on the settlement chain.
    ProveSubmitted {
        /// The rollup initiation transaction.
        l2: TransactionRecord,

        /// The withdrawal message recorded by the message passer.
        message: WithdrawalMessage,

        /// The settlement-chain prove transaction.
        prove: TransactionRecord,
    },

    /// The withdrawal is proven; the challenge period is running.
    Proven {
        /// The rollup initiation transaction.
        l2: TransactionRecord,

        /// The withdrawal message recorded by the message passer.
        message: WithdrawalMessage,

        /// The settlement-chain prove transaction.
        prove: TransactionRecord,
    },

    /// The challenge period has elapsed; the finalize call can be submitted.
    FinalizeReady {
        /// The rollup initiation transaction.
        l2: TransactionRecord,

        /// The withdrawal message recorded by the message passer.
        message: WithdrawalMessage,

        /// The settlement-chain prove transaction.
        prove: TransactionRecord,
    },

    /// The finalize call is in flight on the settlement chain.
    FinalizeSubmitted {
        /// The rollup initiation transaction.
        l2: TransactionRecord,

        /// The withdrawal message recorded by the message passer.
        message: WithdrawalMessage,

        /// The settlement-chain prove transaction.
        prove: TransactionRecord,

        /// The settlement-chain finalize transaction.
        finalize: TransactionRecord,
    },

    /// The withdrawal is finalized and the funds released.
    Finalized {
        /// The rollup initiation transaction.
        l2: TransactionRecord,

        /// The settlement-chain prove transaction.
        prove: TransactionRecord,

        /// The settlement-chain finalize transaction.
        finalize: TransactionRecord,
    },
}

impl WithdrawalState {
    /// A short label of the state, for logs and persistence rows.
    pub const fn step(&self) -> &'static str {
        match self {
            WithdrawalState::Init => "init",
            WithdrawalState::Submitted { .. } => "submitted",
            WithdrawalState::InitiationConfirmed { .. } => "initiation_confirmed",
            WithdrawalState::ProofReady { .. } => "proof_ready",
            WithdrawalState::ProveSubmitted { .. } => "prove_submitted",
            WithdrawalState::Proven { .. } => "proven",
            WithdrawalState::FinalizeReady { .. } => "finalize_ready",
            WithdrawalState::FinalizeSubmitted { .. } => "finalize_submitted",
            WithdrawalState::Finalized { .. } => "finalized",
        }
    }
}

/// Events a withdrawal machine transitions on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawalEvent {
    /// The rollup RPC accepted the initiation and assigned it a hash.
    SubmissionAcked {
        /// The hash of the submitted transaction.
        txid: B256,
    },

    /// The initiation confirmed and its withdrawal message was extracted.
    InitiationConfirmed {
        /// The confirmation receipt.
        receipt: TxReceipt,

        /// The message extracted from the receipt.
        message: WithdrawalMessage,
    },

    /// An output covering the initiation block was published.
    OutputPublished {
        /// The published output.
        output: OutputData,
    },

    /// The settlement RPC accepted the prove call.
    ProveSubmissionAcked {
        /// The hash of the submitted transaction.
        txid: B256,
    },

    /// The prove call confirmed.
    ProveConfirmed {
        /// The confirmation receipt.
        receipt: TxReceipt,
    },

    /// The challenge period has fully elapsed since the prove confirmed.
    ChallengePeriodElapsed,

    /// The settlement RPC accepted the finalize call.
    FinalizeSubmissionAcked {
        /// The hash of the submitted transaction.
        txid: B256,
    },

    /// The finalize call confirmed.
    FinalizeConfirmed {
        /// The confirmation receipt.
        receipt: TxReceipt,
    },
}

/// Duties a withdrawal machine asks the executor to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawalDuty {
    /// Submit the initiation on the rollup.
    SubmitWithdrawal {
        /// The withdrawn amount in wei.
        amount: U256,

        /// The settlement-chain address to release to.
        recipient: Address,
    },

    /// Await the receipt of the submitted initiation and extract the
    /// withdrawal message from it.
    AwaitInitiationReceipt {
        /// The hash being awaited.
        txid: B256,
    },

    /// Await an output root covering the initiation block.
    AwaitOutputRoot {
        /// The rollup block the output must cover.
        l2_block_number: u64,
    },

    /// Construct the proof bundle and submit the prove call.
    SubmitProve {
        /// The withdrawal message being proven.
        message: WithdrawalMessage,

        /// The output the proof targets.
        output: OutputData,
    },

    /// Await the receipt of the submitted prove call.
    AwaitProveReceipt {
        /// The hash being awaited.
        txid: B256,
    },

    /// Wait until the challenge period since the prove has elapsed.
    AwaitChallengePeriod {
        /// The settlement block the prove confirmed in.
        proven_block: u64,
    },

    /// Submit the finalize call.
    SubmitFinalize {
        /// The withdrawal message being finalized.
        message: WithdrawalMessage,
    },

    /// Await the receipt of the submitted finalize call.
    AwaitFinalizeReceipt {
        /// The hash being awaited.
        txid: B256,
    },
}

/// The state machine tracking one withdrawal operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalSM {
    /// Static configuration of the operation.
    pub cfg: WithdrawalCfg,

    /// The current state.
    pub state: WithdrawalState,
}

impl WithdrawalSM {
    /// Creates a machine for a withdrawal that has not been initiated yet.
    pub const fn new(cfg: WithdrawalCfg) -> Self {
        Self {
            cfg,
            state: WithdrawalState::Init,
        }
    }

    /// Creates a machine for a withdrawal whose initiation was already
    /// submitted in some previous life, identified by its rollup transaction
    /// hash. The machine starts awaiting the initiation receipt; it will not
    /// submit anything until the prove step.
    pub fn with_known_initiation(cfg: WithdrawalCfg, txid: B256) -> Self {
        Self {
            cfg,
            state: WithdrawalState::Submitted {
                l2: TransactionRecord::resumed(txid, ChainKind::L2),
            },
        }
    }

    fn check_receipt(
        receipt: &TxReceipt,
        expected: B256,
        leg: &str,
    ) -> Result<(), TransitionErr> {
        if receipt.tx_hash != expected {
            return Err(TransitionErr(format!(
                "receipt {} does not match submitted {leg} transaction {expected}",
                receipt.tx_hash
            )));
        }
        if !receipt.success {
            return Err(TransitionErr(format!(
                "{leg} transaction {} reverted",
                receipt.tx_hash
            )));
        }
        Ok(())
    }

    fn process_submission_acked(&mut self, txid: B256) -> Result<(), TransitionErr> {
        match &self.state {
            WithdrawalState::Init => {
                info!(%txid, "withdrawal initiated on the rollup");
                self.state = WithdrawalState::Submitted {
                    l2: TransactionRecord::new(txid, ChainKind::L2),
                };
                Ok(())
            }
            state => Err(TransitionErr(format!(
                "unexpected SubmissionAcked in state {}",
                state.step()
            ))),
        }
    }

    fn process_initiation_confirmed(
        &mut self,
        receipt: TxReceipt,
        message: WithdrawalMessage,
    ) -> Result<(), TransitionErr> {
        match &self.state {
            WithdrawalState::Submitted { l2 } => {
                Self::check_receipt(&receipt, l2.hash, "initiation")?;

                let mut l2 = l2.clone();
                l2.confirm(receipt);
                info!(txid = %l2.hash, withdrawal_hash = %message.withdrawal_hash(),
                    "withdrawal initiation confirmed");
                self.state = WithdrawalState::InitiationConfirmed { l2, message };
                Ok(())
            }
            state => Err(TransitionErr(format!(
                "unexpected InitiationConfirmed in state {}",
                state.step()
            ))),
        }
    }

    fn process_output_published(&mut self, output: OutputData) -> Result<(), TransitionErr> {
        match &self.state {
            WithdrawalState::InitiationConfirmed { l2, message } => {
                let initiated_at = l2
                    .receipt()
                    .map(|r| r.block_number)
                    .unwrap_or_default();
                if output.l2_block_number < initiated_at {
                    return Err(TransitionErr(format!(
                        "output for block {} does not cover initiation block {initiated_at}",
                        output.l2_block_number
                    )));
                }

                info!(
                    l2_output_index = output.l2_output_index,
                    l2_block_number = output.l2_block_number,
                    "output root covering the initiation is published"
                );
                self.state = WithdrawalState::ProofReady {
                    l2: l2.clone(),
                    message: message.clone(),
                    output,
                };
                Ok(())
            }
            state => Err(TransitionErr(format!(
                "unexpected OutputPublished in state {}",
                state.step()
            ))),
        }
    }

    fn process_prove_submission_acked(&mut self, txid: B256) -> Result<(), TransitionErr> {
        match &self.state {
            WithdrawalState::ProofReady { l2, message, .. } => {
                info!(%txid, "withdrawal prove submitted on the settlement chain");
                self.state = WithdrawalState::ProveSubmitted {
                    l2: l2.clone(),
                    message: message.clone(),
                    prove: TransactionRecord::new(txid, ChainKind::L1),
                };
                Ok(())
            }
            state => Err(TransitionErr(format!(
                "unexpected ProveSubmissionAcked in state {}",
                state.step()
            ))),
        }
    }

    fn process_prove_confirmed(&mut self, receipt: TxReceipt) -> Result<(), TransitionErr> {
        match &self.state {
            WithdrawalState::ProveSubmitted { l2, message, prove } => {
                Self::check_receipt(&receipt, prove.hash, "prove")?;

                let mut prove = prove.clone();
                prove.confirm(receipt);
                info!(txid = %prove.hash, "withdrawal proven, challenge period starts");
                self.state = WithdrawalState::Proven {
                    l2: l2.clone(),
                    message: message.clone(),
                    prove,
                };
                Ok(())
            }
            state => Err(TransitionErr(format!(
                "unexpected ProveConfirmed in state {}",
                state.step()
            ))),
        }
    }

    fn process_challenge_elapsed(&mut self) -> Result<(), TransitionErr> {
        match &self.state {
            WithdrawalState::Proven { l2, message, prove } => {
                info!("challenge period elapsed, withdrawal can be finalized");
                self.state = WithdrawalState::FinalizeReady {
                    l2: l2.clone(),
                    message: message.clone(),
                    prove: prove.clone(),
                };
                Ok(())
            }
            state => Err(TransitionErr(format!(
                "unexpected ChallengePeriodElapsed in state {}",
                state.step()
            ))),
        }
    }

    fn process_finalize_submission_acked(&mut self, txid: B256) -> Result<(), TransitionErr> {
        match &self.state {
            WithdrawalState::FinalizeReady { l2, message, prove } => {
                info!(%txid, "withdrawal finalize submitted on the settlement chain");
                self.state = WithdrawalState::FinalizeSubmitted {
                    l2: l2.clone(),
                    message: message.clone(),
                    prove: prove.clone(),
                    finalize: TransactionRecord::new(txid, ChainKind::L1),
                };
                Ok(())
            }
            state => Err(TransitionErr(format!(
                "unexpected FinalizeSubmissionAcked in state {}",
                state.step()
            ))),
        }
    }

    fn process_finalize_confirmed(&mut self, receipt: TxReceipt) -> Result<(), TransitionErr> {
        match &self.state {
            WithdrawalState::FinalizeSubmitted {
                l2,
                prove,
                finalize,
                ..
            } => {
                Self::check_receipt(&receipt, finalize.hash, "finalize")?;

                let mut finalize = finalize.clone();
                finalize.confirm(receipt);
                info!(txid = %finalize.hash, "withdrawal finalized, funds released");
                self.state = WithdrawalState::Finalized {
                    l2: l2.clone(),
                    prove: prove.clone(),
                    finalize,
                };
                Ok(())
            }
            state => Err(TransitionErr(format!(
                "unexpected FinalizeConfirmed in state {}",
                state.step()
            ))),
        }
    }
}

impl StateMachine for WithdrawalSM {
    type Event = WithdrawalEvent;
    type Duty = WithdrawalDuty;
    type Error = TransitionErr;

    fn process_event(&mut self, event: Self::Event) -> Result<(), Self::Error> {
        match event {
            WithdrawalEvent::SubmissionAcked { txid } => self.process_submission_acked(txid),
            WithdrawalEvent::InitiationConfirmed { receipt, message } => {
                self.process_initiation_confirmed(receipt, message)
            }
            WithdrawalEvent::OutputPublished { output } => self.process_output_published(output),
            WithdrawalEvent::ProveSubmissionAcked { txid } => {
                self.process_prove_submission_acked(txid)
            }
            WithdrawalEvent::ProveConfirmed { receipt } => self.process_prove_confirmed(receipt),
            WithdrawalEvent::ChallengePeriodElapsed => self.process_challenge_elapsed(),
            WithdrawalEvent::FinalizeSubmissionAcked { txid } => {
                self.process_finalize_submission_acked(txid)
            }
            WithdrawalEvent::FinalizeConfirmed { receipt } => {
                self.process_finalize_confirmed(receipt)
            }
        }
    }

    fn pending_duty(&self) -> Option<Self::Duty> {
        match &self.state {
            WithdrawalState::Init => Some(WithdrawalDuty::SubmitWithdrawal {
                amount: self.cfg.amount,
                recipient: self.cfg.recipient,
            }),
            // in-flight submissions are only ever awaited, never redone
            WithdrawalState::Submitted { l2 } => {
                Some(WithdrawalDuty::AwaitInitiationReceipt { txid: l2.hash })
            }
            WithdrawalState::InitiationConfirmed { l2, .. } => {
                l2.receipt().map(|r| WithdrawalDuty::AwaitOutputRoot {
                    l2_block_number: r.block_number,
                })
            }
            WithdrawalState::ProofReady {
                message, output, ..
            } => Some(WithdrawalDuty::SubmitProve {
                message: message.clone(),
                output: output.clone(),
            }),
            WithdrawalState::ProveSubmitted { prove, .. } => {
                Some(WithdrawalDuty::AwaitProveReceipt { txid: prove.hash })
            }
            WithdrawalState::Proven { prove, .. } => {
                prove.receipt().map(|r| WithdrawalDuty::AwaitChallengePeriod {
                    proven_block: r.block_number,
                })
            }
            WithdrawalState::FinalizeReady { message, .. } => {
                Some(WithdrawalDuty::SubmitFinalize {
                    message: message.clone(),
                })
            }
            WithdrawalState::FinalizeSubmitted { finalize, .. } => {
                Some(WithdrawalDuty::AwaitFinalizeReceipt {
                    txid: finalize.hash,
                })
            }
            WithdrawalState::Finalized { .. } => None,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self.state, WithdrawalState::Finalized { .. })
    }

    fn step(&self) -> &'static str {
        self.state.step()
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::Bytes;

    use super::*;

    fn cfg() -> WithdrawalCfg {
        WithdrawalCfg {
            amount: U256::from(500_000_000_000_000_000u128),
            recipient: Address::repeat_byte(0x22),
        }
    }

    fn message() -> WithdrawalMessage {
        WithdrawalMessage {
            nonce: U256::from(1),
            sender: Address::repeat_byte(0x33),
            target: Address::repeat_byte(0x22),
            value: U256::from(500_000_000_000_000_000u128),
            gas_limit: U256::from(100_000),
            data: Bytes::new(),
        }
    }

    fn receipt_for(txid: B256, block_number: u64) -> TxReceipt {
        TxReceipt {
            tx_hash: txid,
            block_hash: B256::repeat_byte(0xbb),
            block_number,
            success: true,
            logs: vec![],
        }
    }

    fn output_at(l2_block_number: u64) -> OutputData {
        OutputData {
            output_root: B256::repeat_byte(0xcd),
            timestamp: 1_000,
            l2_block_number,
            l2_output_index: 4,
        }
    }

    fn machine_at_proof_ready() -> WithdrawalSM {
        let mut sm = WithdrawalSM::new(cfg());
        sm.process_event(WithdrawalEvent::SubmissionAcked {
            txid: B256::repeat_byte(0x01),
        })
        .unwrap();
        sm.process_event(WithdrawalEvent::InitiationConfirmed {
            receipt: receipt_for(B256::repeat_byte(0x01), 500),
            message: message(),
        })
        .unwrap();
        sm.process_event(WithdrawalEvent::OutputPublished {
            output: output_at(510),
        })
        .unwrap();
        sm
    }

    #[test]
    fn test_full_walkthrough() {
        let mut sm = machine_at_proof_ready();
        assert!(matches!(
            sm.pending_duty(),
            Some(WithdrawalDuty::SubmitProve { .. })
        ));

        sm.process_event(WithdrawalEvent::ProveSubmissionAcked {
            txid: B256::repeat_byte(0x02),
        })
        .unwrap();
        sm.process_event(WithdrawalEvent::ProveConfirmed {
            receipt: receipt_for(B256::repeat_byte(0x02), 9_000),
        })
        .unwrap();
        assert!(matches!(
            sm.pending_duty(),
            Some(WithdrawalDuty::AwaitChallengePeriod { proven_block: 9_000 })
        ));

        sm.process_event(WithdrawalEvent::ChallengePeriodElapsed)
            .unwrap();
        sm.process_event(WithdrawalEvent::FinalizeSubmissionAcked {
            txid: B256::repeat_byte(0x03),
        })
        .unwrap();
        sm.process_event(WithdrawalEvent::FinalizeConfirmed {
            receipt: receipt_for(B256::repeat_byte(0x03), 9_100),
        })
        .unwrap();

        assert!(sm.is_terminal());
        assert!(sm.pending_duty().is_none());
    }

    #[test]
    fn test_resume_at_proof_ready_emits_prove_not_initiation() {
        let sm = machine_at_proof_ready();
        let restored: WithdrawalSM =
            serde_json::from_str(&serde_json::to_string(&sm).unwrap()).unwrap();

        assert_eq!(restored.step(), "proof_ready");
        assert!(matches!(
            restored.pending_duty(),
            Some(WithdrawalDuty::SubmitProve { .. })
        ));
    }

    #[test]
    fn test_known_initiation_resume_awaits_receipt() {
        let txid = B256::repeat_byte(0x77);
        let sm = WithdrawalSM::with_known_initiation(cfg(), txid);

        assert!(matches!(
            sm.pending_duty(),
            Some(WithdrawalDuty::AwaitInitiationReceipt { txid: t }) if t == txid
        ));
    }

    #[test]
    fn test_output_below_initiation_block_is_rejected() {
        let mut sm = WithdrawalSM::new(cfg());
        sm.process_event(WithdrawalEvent::SubmissionAcked {
            txid: B256::repeat_byte(0x01),
        })
        .unwrap();
        sm.process_event(WithdrawalEvent::InitiationConfirmed {
            receipt: receipt_for(B256::repeat_byte(0x01), 500),
            message: message(),
        })
        .unwrap();

        assert!(sm
            .process_event(WithdrawalEvent::OutputPublished {
                output: output_at(499),
            })
            .is_err());
    }

    #[test]
    fn test_stale_event_is_rejected() {
        let mut sm = machine_at_proof_ready();
        let before = sm.clone();

        assert!(sm
            .process_event(WithdrawalEvent::SubmissionAcked {
                txid: B256::repeat_byte(0x09),
            })
            .is_err());
        assert_eq!(sm, before, "rejected events must not mutate the machine");
    }

    #[test]
    fn test_finalize_before_challenge_elapsed_is_rejected() {
        let mut sm = machine_at_proof_ready();
        sm.process_event(WithdrawalEvent::ProveSubmissionAcked {
            txid: B256::repeat_byte(0x02),
        })
        .unwrap();
        sm.process_event(WithdrawalEvent::ProveConfirmed {
            receipt: receipt_for(B256::repeat_byte(0x02), 9_000),
        })
        .unwrap();

        assert!(sm
            .process_event(WithdrawalEvent::FinalizeSubmissionAcked {
                txid: B256::repeat_byte(0x03),
            })
            .is_err());
    }
}
