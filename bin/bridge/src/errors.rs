//! Configuration errors of the bridge CLI.
//!
//! Everything here is raised before any network access, so a misconfigured
//! run fails fast with the offending field named instead of surfacing as an
//! rpc error mid-operation.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum ConfigErr {
    /// The signer private key environment variable is not set.
    #[error("missing required environment variable {0} (the signer private key)")]
    MissingPrivateKey(&'static str),

    /// The signer private key environment variable holds garbage.
    #[error("environment variable {0} does not hold a valid private key: {1}")]
    InvalidPrivateKey(&'static str, String),

    /// A config or params file could not be read.
    #[error("failed to read {0}: {1}")]
    UnreadableFile(PathBuf, std::io::Error),

    /// A config or params file did not parse.
    #[error("failed to parse {0}: {1}")]
    MalformedFile(PathBuf, toml::de::Error),

    /// A recipient address on the command line did not parse.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// An ETH amount on the command line did not parse.
    #[error("invalid ETH amount {0}: {1}")]
    InvalidAmount(String, String),

    /// A transaction hash on the command line did not parse.
    #[error("invalid transaction hash: {0}")]
    InvalidTxid(String),
}
