//! Operational configuration of the bridge CLI.

use std::path::PathBuf;

use portal_bridge_duty_tracker::WaitPolicy;
use serde::{Deserialize, Serialize};

/// The configuration values that dictate how the orchestrator runs.
///
/// These are operator-local settings. Everything protocol-level (chain ids,
/// contract addresses, the challenge period) lives in the params file
/// instead, which is fixed per deployment and shared by everyone bridging
/// against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Config {
    /// The HTTP JSON-RPC endpoint of the settlement chain.
    pub l1_rpc_url: String,

    /// The HTTP JSON-RPC endpoint of the rollup.
    pub l2_rpc_url: String,

    /// The directory to store all the data in.
    pub datadir: PathBuf,

    /// The number of tokio worker threads; defaults when unset.
    pub num_threads: Option<u8>,

    /// Polling and timeout policy for the orchestrator's waits.
    #[serde(default)]
    pub wait: WaitPolicy,
}
