use alloy::{
    eips::BlockId,
    primitives::{Address, Bytes},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::{BlockNumberOrTag, TransactionRequest},
    transports::http::{Client, Http},
};
use url::Url;

use crate::adapters::traits::AdapterError;

/// Thin wrapper over an HTTP provider for one chain. Every contract read is
/// pinned to an explicit block number.
#[derive(Debug, Clone)]
pub struct EthereumClient {
    provider: RootProvider<Http<Client>>,
    rpc_url: String,
    chain: String,
}

impl EthereumClient {
    /// Create a client for `chain` talking to `rpc_url`. No request is made.
    pub fn new(chain: &str, rpc_url: &str) -> Result<Self, AdapterError> {
        let url = rpc_url
            .parse::<Url>()
            .map_err(|e| AdapterError::Config(format!("Invalid RPC URL for {}: {}", chain, e)))?;

        Ok(Self {
            provider: ProviderBuilder::new().on_http(url),
            rpc_url: rpc_url.to_string(),
            chain: chain.to_string(),
        })
    }

    pub fn chain(&self) -> &str {
        &self.chain
    }

    /// Test the RPC connection by getting the latest block number
    pub async fn test_connection(&self) -> Result<u64, AdapterError> {
        let block_number = self.get_block_number().await?;
        tracing::info!(
            chain = %self.chain,
            rpc_url = %self.rpc_url,
            block_number = %block_number,
            "RPC connection established"
        );
        Ok(block_number)
    }

    /// Get the current block number
    pub async fn get_block_number(&self) -> Result<u64, AdapterError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| AdapterError::Rpc(format!("Failed to get block number on {}: {}", self.chain, e)))
    }

    /// Timestamp of block `number`, or `None` if the node does not have it
    pub async fn get_block_timestamp(&self, number: u64) -> Result<Option<u64>, AdapterError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(number), false)
            .await
            .map_err(|e| {
                AdapterError::Rpc(format!("Failed to get block {} on {}: {}", number, self.chain, e))
            })?;

        Ok(block.map(|b| b.header.timestamp))
    }

    /// `eth_call` against `target` at `block`
    pub async fn call_at(&self, block: u64, target: Address, calldata: Bytes) -> Result<Bytes, AdapterError> {
        let tx = TransactionRequest::default().to(target).input(calldata.into());

        self.provider
            .call(&tx)
            .block(BlockId::number(block))
            .await
            .map_err(|e| AdapterError::Contract {
                target,
                message: e.to_string(),
            })
    }
}
