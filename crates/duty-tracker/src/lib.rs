//! Drives bridge operations to completion.
//!
//! The state machines in `portal-bridge-sm` decide what has to happen next;
//! this crate makes it happen. The [`executor`](crate::executor) turns duties
//! into chain interactions and chain interactions into events, the
//! [`persister`](crate::persister) checkpoints every transition to sqlite,
//! and the [`orchestrator`](crate::orchestrator) runs the loop that ties the
//! two together, including crash recovery from persisted state.

pub mod config;
pub mod errors;
pub mod executor;
pub mod orchestrator;
pub mod persister;

#[cfg(test)]
pub(crate) mod testing;

pub use config::WaitPolicy;
pub use errors::{OrchestratorErr, PersistErr, ProofConstructionErr};
pub use orchestrator::Orchestrator;
pub use persister::OperationPersister;
