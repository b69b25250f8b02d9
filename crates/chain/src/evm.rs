//! Alloy-backed endpoint implementations over HTTP JSON-RPC.

use alloy::{
    network::{Ethereum, EthereumWallet},
    primitives::{Address, TxKind, B256, U256},
    providers::{
        fillers::{
            BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller,
            WalletFiller,
        },
        Identity, Provider, ProviderBuilder, RootProvider, WalletProvider,
    },
    rpc::types::{BlockNumberOrTag, TransactionInput, TransactionReceipt, TransactionRequest},
    signers::local::PrivateKeySigner,
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use portal_bridge_primitives::types::{ChainKind, OutputData, ReceiptLog, TxReceipt};
use tracing::debug;

use crate::{
    contracts::IL2OutputOracle,
    endpoint::{
        BlockInfo, ChainEndpoint, EndpointErr, RollupEndpoint, SettlementEndpoint,
        StorageProofData, TxPayload,
    },
};

// alloy moment 💀
type HttpProvider = FillProvider<
    JoinFill<
        JoinFill<
            Identity,
            JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
        >,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider<Http<Client>>,
    Http<Client>,
    Ethereum,
>;

/// The provider plus the handful of queries both sides of the bridge share.
#[derive(Debug, Clone)]
struct EvmCore {
    kind: ChainKind,
    provider: HttpProvider,
}

impl EvmCore {
    fn new(kind: ChainKind, rpc_url: &str, signer: PrivateKeySigner) -> Result<Self, EndpointErr> {
        let url = rpc_url
            .parse()
            .map_err(|_| EndpointErr::Transport(format!("invalid rpc url: {rpc_url}")))?;
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(signer))
            .on_http(url);

        Ok(Self { kind, provider })
    }

    fn signer_address(&self) -> Address {
        self.provider.default_signer_address()
    }

    async fn get_balance(&self, address: Address) -> Result<U256, EndpointErr> {
        self.provider
            .get_balance(address)
            .await
            .map_err(|e| EndpointErr::Transport(e.to_string()))
    }

    async fn submit_transaction(&self, payload: TxPayload) -> Result<B256, EndpointErr> {
        let request = TransactionRequest {
            to: Some(TxKind::Call(payload.to)),
            value: Some(payload.value),
            input: TransactionInput::new(payload.input),
            ..Default::default()
        };

        let pending = self
            .provider
            .send_transaction(request)
            .await
            .map_err(|e| EndpointErr::Submission(e.to_string()))?;

        let txid = *pending.tx_hash();
        debug!(chain = %self.kind, %txid, "transaction accepted by the rpc");
        Ok(txid)
    }

    async fn get_receipt(&self, txid: B256) -> Result<Option<TxReceipt>, EndpointErr> {
        let receipt = self
            .provider
            .get_transaction_receipt(txid)
            .await
            .map_err(|e| EndpointErr::Transport(e.to_string()))?;

        receipt.map(convert_receipt).transpose()
    }

    async fn block_info(&self, tag: BlockNumberOrTag) -> Result<BlockInfo, EndpointErr> {
        let block = self
            .provider
            .get_block_by_number(tag, false)
            .await
            .map_err(|e| EndpointErr::Transport(e.to_string()))?
            .ok_or(EndpointErr::MissingBlock(tag.as_number().unwrap_or_default()))?;

        Ok(BlockInfo {
            hash: block.header.hash,
            state_root: block.header.state_root,
            timestamp: block.header.timestamp,
        })
    }
}

fn convert_receipt(receipt: TransactionReceipt) -> Result<TxReceipt, EndpointErr> {
    let block_hash = receipt
        .block_hash
        .ok_or(EndpointErr::PendingReceipt(receipt.transaction_hash))?;
    let block_number = receipt
        .block_number
        .ok_or(EndpointErr::PendingReceipt(receipt.transaction_hash))?;

    let logs = receipt
        .inner
        .logs()
        .iter()
        .map(|log| ReceiptLog {
            address: log.inner.address,
            topics: log.inner.data.topics().to_vec(),
            data: log.inner.data.data.clone(),
            index: log.log_index.unwrap_or_default(),
        })
        .collect();

    Ok(TxReceipt {
        tx_hash: receipt.transaction_hash,
        block_hash,
        block_number,
        success: receipt.status(),
        logs,
    })
}

/// The settlement-chain endpoint: balance and submission plus the output
/// oracle queries the withdrawal flow needs.
#[derive(Debug, Clone)]
pub struct EvmL1Endpoint {
    core: EvmCore,
    oracle: Address,
}

impl EvmL1Endpoint {
    /// Connects to the settlement chain at `rpc_url`, signing with `signer`
    /// and reading outputs from the oracle at `oracle`.
    pub fn new(
        rpc_url: &str,
        signer: PrivateKeySigner,
        oracle: Address,
    ) -> Result<Self, EndpointErr> {
        Ok(Self {
            core: EvmCore::new(ChainKind::L1, rpc_url, signer)?,
            oracle,
        })
    }
}

#[async_trait]
impl ChainEndpoint for EvmL1Endpoint {
    fn kind(&self) -> ChainKind {
        self.core.kind
    }

    fn signer_address(&self) -> Address {
        self.core.signer_address()
    }

    async fn get_balance(&self, address: Address) -> Result<U256, EndpointErr> {
        self.core.get_balance(address).await
    }

    async fn submit_transaction(&self, payload: TxPayload) -> Result<B256, EndpointErr> {
        self.core.submit_transaction(payload).await
    }

    async fn get_receipt(&self, txid: B256) -> Result<Option<TxReceipt>, EndpointErr> {
        self.core.get_receipt(txid).await
    }
}

#[async_trait]
impl SettlementEndpoint for EvmL1Endpoint {
    async fn output_for_block(
        &self,
        l2_block_number: u64,
    ) -> Result<Option<OutputData>, EndpointErr> {
        let transport = |e: alloy::contract::Error| EndpointErr::Transport(e.to_string());
        let oracle = IL2OutputOracle::new(self.oracle, &self.core.provider);

        // getL2OutputIndexAfter reverts while the block is uncovered, so
        // check the oracle head first and report "not yet" cleanly.
        let latest = oracle
            .latestBlockNumber()
            .call()
            .await
            .map_err(transport)?
            ._0;
        if latest < U256::from(l2_block_number) {
            return Ok(None);
        }

        let index = oracle
            .getL2OutputIndexAfter(U256::from(l2_block_number))
            .call()
            .await
            .map_err(transport)?
            ._0;
        let proposal = oracle.getL2Output(index).call().await.map_err(transport)?._0;

        let oob = |what: &str| EndpointErr::Transport(format!("oracle {what} overflows u64"));
        Ok(Some(OutputData {
            output_root: proposal.outputRoot,
            timestamp: u64::try_from(proposal.timestamp).map_err(|_| oob("timestamp"))?,
            l2_block_number: u64::try_from(proposal.l2BlockNumber)
                .map_err(|_| oob("block number"))?,
            l2_output_index: u64::try_from(index).map_err(|_| oob("output index"))?,
        }))
    }

    async fn latest_timestamp(&self) -> Result<u64, EndpointErr> {
        Ok(self.core.block_info(BlockNumberOrTag::Latest).await?.timestamp)
    }

    async fn block_timestamp(&self, block_number: u64) -> Result<u64, EndpointErr> {
        Ok(self
            .core
            .block_info(BlockNumberOrTag::Number(block_number))
            .await?
            .timestamp)
    }
}

/// The rollup endpoint: balance and submission plus the block and storage
/// queries proof construction needs.
#[derive(Debug, Clone)]
pub struct EvmL2Endpoint {
    core: EvmCore,
}

impl EvmL2Endpoint {
    /// Connects to the rollup at `rpc_url`, signing with `signer`.
    pub fn new(rpc_url: &str, signer: PrivateKeySigner) -> Result<Self, EndpointErr> {
        Ok(Self {
            core: EvmCore::new(ChainKind::L2, rpc_url, signer)?,
        })
    }
}

#[async_trait]
impl ChainEndpoint for EvmL2Endpoint {
    fn kind(&self) -> ChainKind {
        self.core.kind
    }

    fn signer_address(&self) -> Address {
        self.core.signer_address()
    }

    async fn get_balance(&self, address: Address) -> Result<U256, EndpointErr> {
        self.core.get_balance(address).await
    }

    async fn submit_transaction(&self, payload: TxPayload) -> Result<B256, EndpointErr> {
        self.core.submit_transaction(payload).await
    }

    async fn get_receipt(&self, txid: B256) -> Result<Option<TxReceipt>, EndpointErr> {
        self.core.get_receipt(txid).await
    }
}

#[async_trait]
impl RollupEndpoint for EvmL2Endpoint {
    async fn block_info(&self, block_number: u64) -> Result<BlockInfo, EndpointErr> {
        self.core
            .block_info(BlockNumberOrTag::Number(block_number))
            .await
    }

    async fn storage_proof(
        &self,
        address: Address,
        slot: B256,
        block_number: u64,
    ) -> Result<StorageProofData, EndpointErr> {
        let response = self
            .core
            .provider
            .get_proof(address, vec![slot])
            .number(block_number)
            .await
            .map_err(|e| EndpointErr::Transport(e.to_string()))?;

        let proof = response
            .storage_proof
            .into_iter()
            .next()
            .ok_or_else(|| {
                EndpointErr::Transport(format!("rpc returned no storage proof for slot {slot}"))
            })?
            .proof;

        Ok(StorageProofData {
            storage_root: response.storage_hash,
            proof,
        })
    }
}
