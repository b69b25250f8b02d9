//! A direction-erased wrapper around the two protocol machines.
//!
//! The persister and the resume path deal in operations without caring which
//! direction they run in; this enum is what they store and restore.

use serde::{Deserialize, Serialize};

use portal_bridge_primitives::types::Direction;

use crate::{deposit::DepositSM, state_machine::StateMachine, withdrawal::WithdrawalSM};

/// A bridge operation machine of either direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationSM {
    /// An L1→L2 deposit.
    Deposit(DepositSM),

    /// An L2→L1 withdrawal.
    Withdrawal(WithdrawalSM),
}

impl OperationSM {
    /// The direction this operation runs in.
    pub const fn direction(&self) -> Direction {
        match self {
            OperationSM::Deposit(_) => Direction::Deposit,
            OperationSM::Withdrawal(_) => Direction::Withdraw,
        }
    }

    /// A short label of the current state.
    pub fn step(&self) -> &'static str {
        match self {
            OperationSM::Deposit(sm) => sm.step(),
            OperationSM::Withdrawal(sm) => sm.step(),
        }
    }

    /// Whether the operation has run to completion.
    pub fn is_terminal(&self) -> bool {
        match self {
            OperationSM::Deposit(sm) => sm.is_terminal(),
            OperationSM::Withdrawal(sm) => sm.is_terminal(),
        }
    }
}

impl From<DepositSM> for OperationSM {
    fn from(sm: DepositSM) -> Self {
        OperationSM::Deposit(sm)
    }
}

impl From<WithdrawalSM> for OperationSM {
    fn from(sm: WithdrawalSM) -> Self {
        OperationSM::Withdrawal(sm)
    }
}
