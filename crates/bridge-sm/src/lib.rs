//! Protocol state machines for bridge operations.
//!
//! Each operation (a deposit or a withdrawal) is tracked by a small state
//! machine that is pure: it consumes events describing things that already
//! happened on chain and emits duties describing the single next action the
//! executor must take. Everything effectful, from transaction submission to
//! receipt polling, lives outside this crate. That split is what makes
//! persistence and crash recovery trivial: a machine restored from its
//! serialized state re-emits the duty for where it stopped, never a
//! resubmission of something already on chain.

pub mod deposit;
pub mod errors;
pub mod operation;
pub mod state_machine;
pub mod withdrawal;

pub use deposit::{DepositCfg, DepositDuty, DepositEvent, DepositSM, DepositState};
pub use errors::TransitionErr;
pub use operation::OperationSM;
pub use state_machine::StateMachine;
pub use withdrawal::{
    WithdrawalCfg, WithdrawalDuty, WithdrawalEvent, WithdrawalSM, WithdrawalState,
};
