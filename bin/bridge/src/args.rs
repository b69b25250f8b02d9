//! Parses command-line arguments for the bridge CLI.

use std::path::PathBuf;

use clap::{crate_version, Parser, Subcommand};

#[derive(Debug, Parser)]
#[clap(
    name = "portal-bridge",
    about = "Orchestrates ETH deposits and withdrawals across a rollup bridge",
    version = crate_version!()
)]
pub(crate) struct Cli {
    #[clap(subcommand)]
    pub command: Command,

    #[clap(
        long,
        short = 'p',
        help = "The file containing the protocol params of the bridge deployment",
        default_value = "params.toml"
    )]
    pub params: PathBuf,

    #[clap(
        long,
        short = 'c',
        help = "The file containing the operational configuration",
        default_value = "config.toml"
    )]
    pub config: PathBuf,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Bridge ETH from the settlement chain to the rollup.
    Deposit {
        /// The amount to deposit, in ETH.
        amount: String,

        /// The rollup address to credit; defaults to the signer address.
        #[clap(long)]
        recipient: Option<String>,

        /// The id the operation is persisted under; generated when omitted.
        #[clap(long)]
        operation_id: Option<String>,
    },

    /// Withdraw ETH from the rollup to the settlement chain.
    Withdraw {
        /// The amount to withdraw, in ETH.
        amount: String,

        /// The settlement-chain address to release to; defaults to the
        /// signer address.
        #[clap(long)]
        recipient: Option<String>,

        /// The id the operation is persisted under; generated when omitted.
        #[clap(long)]
        operation_id: Option<String>,

        /// Adopt a withdrawal whose initiation was already submitted, given
        /// its rollup transaction hash. The initiation is not resubmitted.
        #[clap(long)]
        initiation_txid: Option<String>,
    },

    /// Resume a persisted operation from wherever it stopped.
    Resume {
        /// The id the operation was persisted under.
        operation_id: String,
    },

    /// List every persisted operation and where it stands.
    List,

    /// Print the signer balances on both chains.
    Balance,
}
