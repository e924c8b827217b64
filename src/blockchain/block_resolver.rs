use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use tracing::{debug, info};

use crate::adapters::traits::AdapterError;
use crate::blockchain::ethereum_client::EthereumClient;

/// A block on a specific chain, usable for archival reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRef {
    pub chain: String,
    pub number: u64,
}

impl BlockRef {
    pub fn new(chain: impl Into<String>, number: u64) -> Self {
        Self {
            chain: chain.into(),
            number,
        }
    }
}

/// Maps a point in time to a block on a given chain.
#[async_trait]
pub trait BlockResolver: Send + Sync {
    /// `chain_blocks` entries win over timestamp lookup. With `must_exist`, a
    /// timestamp past the chain head is an error instead of clamping to it.
    async fn resolve(
        &self,
        timestamp: u64,
        chain: &str,
        chain_blocks: &HashMap<String, u64>,
        must_exist: bool,
    ) -> Result<BlockRef, AdapterError>;
}

/// Resolves blocks by binary search over RPC block timestamps.
#[derive(Debug, Clone, Default)]
pub struct RpcBlockResolver {
    clients: HashMap<String, EthereumClient>,
}

impl RpcBlockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chain(mut self, client: EthereumClient) -> Self {
        self.clients.insert(client.chain().to_string(), client);
        self
    }
}

#[async_trait]
impl BlockResolver for RpcBlockResolver {
    async fn resolve(
        &self,
        timestamp: u64,
        chain: &str,
        chain_blocks: &HashMap<String, u64>,
        must_exist: bool,
    ) -> Result<BlockRef, AdapterError> {
        if let Some(number) = chain_blocks.get(chain) {
            debug!(chain = %chain, block = number, "Using caller-provided block");
            return Ok(BlockRef::new(chain, *number));
        }

        let client = self
            .clients
            .get(chain)
            .ok_or_else(|| AdapterError::UnsupportedChain(chain.to_string()))?;

        let head = client.get_block_number().await?;
        let number = find_block_at(head, timestamp, must_exist, |number| async move {
            client.get_block_timestamp(number).await?.ok_or_else(|| {
                AdapterError::BlockResolution(format!("block {} missing on {}", number, chain))
            })
        })
        .await?;

        info!(chain = %chain, timestamp, block = number, "Resolved historical block");
        Ok(BlockRef::new(chain, number))
    }
}

/// Last block whose timestamp is `<= timestamp`, searching `0..=head`.
pub async fn find_block_at<F, Fut>(
    head: u64,
    timestamp: u64,
    must_exist: bool,
    block_timestamp: F,
) -> Result<u64, AdapterError>
where
    F: Fn(u64) -> Fut,
    Fut: Future<Output = Result<u64, AdapterError>>,
{
    let head_ts = block_timestamp(head).await?;
    if timestamp >= head_ts {
        if must_exist && timestamp > head_ts {
            return Err(AdapterError::BlockResolution(format!(
                "timestamp {} is after the chain head ({} at block {})",
                timestamp, head_ts, head
            )));
        }
        return Ok(head);
    }

    let genesis_ts = block_timestamp(0).await?;
    if timestamp < genesis_ts {
        return Err(AdapterError::BlockResolution(format!(
            "timestamp {} is before genesis ({})",
            timestamp, genesis_ts
        )));
    }

    // invariant: ts(low) <= timestamp < ts(high)
    let (mut low, mut high) = (0u64, head);
    while high - low > 1 {
        let mid = low + (high - low) / 2;
        if block_timestamp(mid).await? <= timestamp {
            low = mid;
        } else {
            high = mid;
        }
    }
    Ok(low)
}
