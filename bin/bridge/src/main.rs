//! Command-line orchestrator for moving ETH across a rollup bridge.

use std::{fs, path::Path};

use alloy::{
    primitives::{
        utils::{format_ether, parse_ether},
        Address, B256, U256,
    },
    signers::local::PrivateKeySigner,
};
use args::{Cli, Command};
use clap::Parser;
use config::Config;
use errors::ConfigErr;
use portal_bridge_chain::{EvmL1Endpoint, EvmL2Endpoint};
use portal_bridge_common::{logging, logging::LoggerConfig};
use portal_bridge_duty_tracker::{OperationPersister, Orchestrator};
use portal_bridge_primitives::{
    params::ProtocolParams,
    types::{Direction, OperationRequest},
};
use serde::de::DeserializeOwned;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use tokio::runtime;
use tracing::{debug, info};

mod args;
mod config;
mod errors;

/// The environment variable holding the hex-encoded signer private key.
const PRIVATE_KEY_ENVVAR: &str = "PORTAL_BRIDGE_PRIVATE_KEY";

const DEFAULT_THREAD_COUNT: u8 = 2;

fn main() -> anyhow::Result<()> {
    logging::init(LoggerConfig::with_base_name("portal-bridge"));

    let cli = Cli::parse();
    let config = parse_toml::<Config>(&cli.config)?;
    let params = parse_toml::<ProtocolParams>(&cli.params)?;

    let runtime = runtime::Builder::new_multi_thread()
        .worker_threads(config.num_threads.unwrap_or(DEFAULT_THREAD_COUNT).into())
        .enable_all()
        .build()
        .expect("must be able to create runtime");

    runtime.block_on(run(cli, config, params))
}

async fn run(cli: Cli, config: Config, params: ProtocolParams) -> anyhow::Result<()> {
    // the key is checked before anything touches the network
    dotenvy::dotenv().ok();
    let signer = load_signer()?;

    let l1 = EvmL1Endpoint::new(
        &config.l1_rpc_url,
        signer.clone(),
        params.contracts.l2_output_oracle,
    )?;
    let l2 = EvmL2Endpoint::new(&config.l2_rpc_url, signer)?;

    fs::create_dir_all(&config.datadir)?;
    let db_path = config.datadir.join("operations.db");
    let pool = SqlitePool::connect_with(
        SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true),
    )
    .await?;
    debug!(?db_path, "opened operations database");

    let persister = OperationPersister::new(pool).await?;
    let orchestrator = Orchestrator::new(l1, l2, params, config.wait, persister);

    match cli.command {
        Command::Deposit {
            amount,
            recipient,
            operation_id,
        } => {
            let request = OperationRequest {
                direction: Direction::Deposit,
                amount: parse_amount(&amount)?,
                recipient: resolve_recipient(recipient.as_deref(), &orchestrator)?,
            };
            let id = operation_id.unwrap_or_else(|| new_operation_id(request.direction));
            let done = orchestrator.start(&id, &request).await?;
            info!(%id, step = done.step(), "deposit finished");
        }

        Command::Withdraw {
            amount,
            recipient,
            operation_id,
            initiation_txid,
        } => {
            let request = OperationRequest {
                direction: Direction::Withdraw,
                amount: parse_amount(&amount)?,
                recipient: resolve_recipient(recipient.as_deref(), &orchestrator)?,
            };
            let id = operation_id.unwrap_or_else(|| new_operation_id(request.direction));

            let done = match initiation_txid {
                Some(raw) => {
                    let txid = raw
                        .parse::<B256>()
                        .map_err(|_| ConfigErr::InvalidTxid(raw))?;
                    orchestrator.adopt_withdrawal(&id, &request, txid).await?
                }
                None => orchestrator.start(&id, &request).await?,
            };
            info!(%id, step = done.step(), "withdrawal finished");
        }

        Command::Resume { operation_id } => {
            let done = orchestrator.resume(&operation_id).await?;
            info!(id = %operation_id, step = done.step(), "operation finished");
        }

        Command::List => {
            for (id, sm) in orchestrator.persister().load_all().await? {
                let status = if sm.is_terminal() { "done" } else { "resumable" };
                println!("{id}\t{}\t{}\t{status}", sm.direction(), sm.step());
            }
        }

        Command::Balance => {
            let (l1_balance, l2_balance) = orchestrator.signer_balances().await?;
            println!("L1 balance: {} ETH", format_ether(l1_balance));
            println!("L2 balance: {} ETH", format_ether(l2_balance));
        }
    }

    Ok(())
}

/// Loads the signer key from the environment, named errors only.
fn load_signer() -> Result<PrivateKeySigner, ConfigErr> {
    let raw = std::env::var(PRIVATE_KEY_ENVVAR)
        .map_err(|_| ConfigErr::MissingPrivateKey(PRIVATE_KEY_ENVVAR))?;
    raw.parse()
        .map_err(|e| ConfigErr::InvalidPrivateKey(PRIVATE_KEY_ENVVAR, format!("{e}")))
}

fn resolve_recipient<L1, L2>(
    raw: Option<&str>,
    orchestrator: &Orchestrator<L1, L2>,
) -> Result<Address, ConfigErr>
where
    L1: portal_bridge_chain::SettlementEndpoint,
    L2: portal_bridge_chain::RollupEndpoint,
{
    match raw {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigErr::InvalidAddress(raw.to_string())),
        None => Ok(orchestrator.l1().signer_address()),
    }
}

fn parse_amount(raw: &str) -> Result<U256, ConfigErr> {
    parse_ether(raw).map_err(|e| ConfigErr::InvalidAmount(raw.to_string(), e.to_string()))
}

fn new_operation_id(direction: Direction) -> String {
    format!("{direction}-{}", chrono::Utc::now().timestamp_millis())
}

/// Reads and parses a TOML file from the given path into the given type `T`.
fn parse_toml<T>(path: &Path) -> Result<T, ConfigErr>
where
    T: std::fmt::Debug + DeserializeOwned,
{
    let raw = fs::read_to_string(path)
        .map_err(|e| ConfigErr::UnreadableFile(path.to_path_buf(), e))?;
    let parsed = toml::from_str::<T>(&raw)
        .map_err(|e| ConfigErr::MalformedFile(path.to_path_buf(), e))?;
    debug!(?parsed, "parsed TOML file");
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_private_key_is_a_config_error() {
        std::env::remove_var(PRIVATE_KEY_ENVVAR);
        assert!(matches!(
            load_signer(),
            Err(ConfigErr::MissingPrivateKey(PRIVATE_KEY_ENVVAR))
        ));
    }

    #[test]
    fn test_amounts_parse_as_ether() {
        assert_eq!(
            parse_amount("1").unwrap(),
            U256::from(1_000_000_000_000_000_000u128)
        );
        assert_eq!(
            parse_amount("2.5").unwrap(),
            U256::from(2_500_000_000_000_000_000u128)
        );
        assert!(parse_amount("one").is_err());
    }
}
