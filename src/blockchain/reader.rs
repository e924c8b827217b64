use alloy::primitives::Address;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, TryStreamExt};
use std::collections::HashMap;
use tracing::debug;

use crate::adapters::traits::AdapterError;
use crate::blockchain::abi::{self, BatchOutput, CallOutput, ContractCall};
use crate::blockchain::block_resolver::BlockRef;
use crate::blockchain::contracts::IMulticall3;
use crate::blockchain::ethereum_client::EthereumClient;

/// Typed read access to contract state at a historical block.
#[async_trait]
pub trait ContractReader: Send + Sync {
    /// Single view call at `block`.
    async fn read_one(&self, block: &BlockRef, call: ContractCall) -> Result<CallOutput, AdapterError>;

    /// Many view calls at `block`. Results are tagged with their target and
    /// may come back in any order. The whole batch fails if any call fails.
    async fn read_batch(
        &self,
        block: &BlockRef,
        calls: Vec<ContractCall>,
    ) -> Result<Vec<BatchOutput>, AdapterError> {
        concurrent_batch(self, block, calls).await
    }
}

/// Issue every call at once and collect them as they complete.
pub async fn concurrent_batch<R>(
    reader: &R,
    block: &BlockRef,
    calls: Vec<ContractCall>,
) -> Result<Vec<BatchOutput>, AdapterError>
where
    R: ContractReader + ?Sized,
{
    calls
        .into_iter()
        .map(|call| async move {
            let target = call.target;
            let output = reader.read_one(block, call).await?;
            Ok::<_, AdapterError>(BatchOutput { target, output })
        })
        .collect::<FuturesUnordered<_>>()
        .try_collect()
        .await
}

/// Per-chain RPC endpoint plus its optional Multicall3 deployment.
#[derive(Debug, Clone)]
pub struct ChainClient {
    pub client: EthereumClient,
    pub multicall: Option<Address>,
}

/// [`ContractReader`] backed by JSON-RPC `eth_call`s.
#[derive(Debug, Clone, Default)]
pub struct RpcContractReader {
    chains: HashMap<String, ChainClient>,
}

impl RpcContractReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chain(mut self, client: EthereumClient, multicall: Option<Address>) -> Self {
        self.chains
            .insert(client.chain().to_string(), ChainClient { client, multicall });
        self
    }

    pub fn chains(&self) -> impl Iterator<Item = &str> {
        self.chains.keys().map(String::as_str)
    }

    fn chain(&self, name: &str) -> Result<&ChainClient, AdapterError> {
        self.chains
            .get(name)
            .ok_or_else(|| AdapterError::UnsupportedChain(name.to_string()))
    }

    async fn aggregate3(
        &self,
        chain: &ChainClient,
        multicall: Address,
        block: &BlockRef,
        calls: Vec<ContractCall>,
    ) -> Result<Vec<BatchOutput>, AdapterError> {
        let encoded = IMulticall3::aggregate3Call {
            calls: calls
                .iter()
                .map(|call| IMulticall3::Call3 {
                    target: call.target,
                    allowFailure: false,
                    callData: abi::encode(&call.method),
                })
                .collect(),
        }
        .abi_encode();

        let raw = chain.client.call_at(block.number, multicall, encoded.into()).await?;
        decode_aggregate3(multicall, calls, &raw)
    }
}

/// Pair each `aggregate3` result with the call it answers, in call order.
fn decode_aggregate3(
    multicall: Address,
    calls: Vec<ContractCall>,
    raw: &[u8],
) -> Result<Vec<BatchOutput>, AdapterError> {
    let results = IMulticall3::aggregate3Call::abi_decode_returns(raw, true)
        .map_err(|e| AdapterError::Contract {
            target: multicall,
            message: format!("failed to decode aggregate3 output: {}", e),
        })?
        .returnData;

    if results.len() != calls.len() {
        return Err(AdapterError::InvalidData(format!(
            "multicall returned {} results for {} calls",
            results.len(),
            calls.len()
        )));
    }

    calls
        .into_iter()
        .zip(results)
        .map(|(call, result)| {
            if !result.success {
                return Err(AdapterError::Contract {
                    target: call.target,
                    message: format!("{} reverted inside multicall", call.method),
                });
            }
            let output = abi::decode(call.target, &call.method, &result.returnData)?;
            Ok(BatchOutput {
                target: call.target,
                output,
            })
        })
        .collect()
}

#[async_trait]
impl ContractReader for RpcContractReader {
    async fn read_one(&self, block: &BlockRef, call: ContractCall) -> Result<CallOutput, AdapterError> {
        let chain = self.chain(&block.chain)?;
        debug!(
            chain = %block.chain,
            block = block.number,
            target = %call.target,
            method = %call.method,
            "eth_call"
        );

        let raw = chain
            .client
            .call_at(block.number, call.target, abi::encode(&call.method))
            .await?;
        abi::decode(call.target, &call.method, &raw)
    }

    async fn read_batch(
        &self,
        block: &BlockRef,
        calls: Vec<ContractCall>,
    ) -> Result<Vec<BatchOutput>, AdapterError> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        let chain = self.chain(&block.chain)?;
        match chain.multicall {
            Some(multicall) => {
                debug!(
                    chain = %block.chain,
                    block = block.number,
                    calls = calls.len(),
                    "aggregate3 batch"
                );
                self.aggregate3(chain, multicall, block, calls).await
            }
            None => concurrent_batch(self, block, calls).await,
        }
    }
}
