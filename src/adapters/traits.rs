use alloy::primitives::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::adapters::lp::LpUnwrapper;
use crate::blockchain::{BlockResolver, ContractReader};
use crate::models::Balances;

/// Common error type for all TVL adapters and their chain collaborators
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Contract call to {target} failed: {message}")]
    Contract { target: Address, message: String },

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Block resolution failed: {0}")]
    BlockResolution(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Chain not supported: {0}")]
    UnsupportedChain(String),
}

/// Inputs handed to `tvl`/`borrowed` by the consuming registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TvlRequest {
    /// Unix timestamp (seconds) the figures are requested for
    pub timestamp: u64,

    /// Ethereum mainnet block matching `timestamp`, when the caller already knows it
    pub eth_block: Option<u64>,

    /// Known blocks per chain name; takes precedence over timestamp lookup
    #[serde(default)]
    pub chain_blocks: HashMap<String, u64>,
}

impl TvlRequest {
    pub fn at(timestamp: u64) -> Self {
        Self {
            timestamp,
            ..Default::default()
        }
    }

    pub fn with_chain_block(mut self, chain: impl Into<String>, block: u64) -> Self {
        let chain = chain.into();
        if chain == "ethereum" {
            self.eth_block = Some(block);
        }
        self.chain_blocks.insert(chain, block);
        self
    }

    /// Caller-known blocks per chain. `eth_block` fills in for `"ethereum"`
    /// when `chain_blocks` has no entry for it.
    pub fn known_blocks(&self) -> HashMap<String, u64> {
        let mut blocks = self.chain_blocks.clone();
        if let Some(block) = self.eth_block {
            blocks.entry("ethereum".to_string()).or_insert(block);
        }
        blocks
    }
}

/// Read-side collaborators a pipeline needs for one chain.
#[derive(Clone)]
pub struct ChainAccess {
    pub reader: Arc<dyn ContractReader>,
    pub blocks: Arc<dyn BlockResolver>,
    pub unwrapper: Arc<dyn LpUnwrapper>,
}

impl ChainAccess {
    pub fn new(
        reader: Arc<dyn ContractReader>,
        blocks: Arc<dyn BlockResolver>,
        unwrapper: Arc<dyn LpUnwrapper>,
    ) -> Self {
        Self {
            reader,
            blocks,
            unwrapper,
        }
    }
}

/// Common interface for every chain export: the `tvl` and `borrowed`
/// accessors a TVL registry calls.
#[async_trait]
pub trait TvlAdapter: Send + Sync {
    /// Chain this export reads from
    fn chain(&self) -> &str;

    /// Assets currently supplied and not lent out
    async fn tvl(&self, request: &TvlRequest) -> Result<Balances, AdapterError>;

    /// Assets currently lent out to borrowers
    async fn borrowed(&self, request: &TvlRequest) -> Result<Balances, AdapterError>;
}
