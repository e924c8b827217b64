#![allow(dead_code)]

use alloy::primitives::{address, Address, U256};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use compound_tvl::adapters::compound_v2::{CompoundDeployment, TransformFactory};
use compound_tvl::adapters::{AdapterError, ChainAccess, LpPosition, LpUnwrapper};
use compound_tvl::blockchain::{
    BatchOutput, BlockRef, CallOutput, ContractCall, ContractReader, InMemoryChain,
};
use compound_tvl::models::{AddressTransform, Balances};

pub const COMPTROLLER: Address = address!("3d9819210A31b4961b30EF54bE2aeD79B9c9Cd3B");

pub const CDAI: Address = address!("5d3a536E4D6DbD6114cc1Ead35777bAB948E3643");
pub const DAI: Address = address!("6B175474E89094C44Da98b954EedeAC495271d0F");
pub const CUSDC: Address = address!("39AA39c021dfbaE8faC545936693aC917d5E7563");
pub const USDC: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
pub const VBNB: Address = address!("A07c5b74C9B40447a954e1466938b865b6BBea36");
pub const WBNB: Address = address!("bb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c");
pub const CLP: Address = address!("1b8cE6dB22bD1dC10f3E5BdDEFc6c8b07a1E0d2A");
pub const CAKE_LP: Address = address!("0eD7e52944161450477ee417DE9Cd3a859b14fD0");

pub fn pow10(n: u64) -> U256 {
    U256::from(10u64).pow(U256::from(n))
}

/// Venus-like deployment on bsc: two plain markets, the native market and
/// one market holding a PancakeSwap LP token.
pub fn chain() -> InMemoryChain {
    InMemoryChain::new()
        .at_block(30_000_000)
        .with_markets(COMPTROLLER, vec![CDAI, CUSDC, VBNB, CLP])
        .with_market(CDAI, DAI, U256::from(1_000u64), U256::from(400u64))
        .with_market(CUSDC, USDC, U256::from(2_000u64), U256::from(900u64))
        .with_market_balances(VBNB, U256::from(50u64), U256::from(10u64))
        .with_market(CLP, CAKE_LP, U256::from(7u64), U256::ZERO)
        .with_token(DAI, "DAI", 18)
        .with_token(USDC, "USDC", 6)
        .with_token(WBNB, "WBNB", 18)
        .with_token(CAKE_LP, "Cake-LP", 18)
}

pub fn deployment() -> CompoundDeployment {
    CompoundDeployment::new("venus", "bsc", COMPTROLLER).with_native(VBNB, WBNB)
}

pub fn access(chain: Arc<InMemoryChain>, unwrapper: Arc<dyn LpUnwrapper>) -> ChainAccess {
    ChainAccess::new(chain.clone(), chain, unwrapper)
}

/// Records every unwrap request and credits a fixed `1` of DAI per LP unit.
#[derive(Default)]
pub struct RecordingUnwrapper {
    pub requests: Mutex<Vec<(Vec<LpPosition>, BlockRef)>>,
}

impl RecordingUnwrapper {
    pub fn requests(&self) -> Vec<(Vec<LpPosition>, BlockRef)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LpUnwrapper for RecordingUnwrapper {
    async fn unwrap_lps(
        &self,
        balances: &mut Balances,
        positions: &[LpPosition],
        block: &BlockRef,
        transform: &AddressTransform,
    ) -> Result<(), AdapterError> {
        self.requests.lock().unwrap().push((positions.to_vec(), block.clone()));
        for position in positions {
            balances.sum_single_balance(transform.apply(DAI), position.balance);
        }
        Ok(())
    }
}

/// Counts how often a transform was requested.
#[derive(Default)]
pub struct CountingFactory {
    pub calls: AtomicUsize,
}

impl CountingFactory {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransformFactory for CountingFactory {
    async fn transform(&self, chain: &str) -> Result<AddressTransform, AdapterError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let chain = chain.to_string();
        Ok(AddressTransform::new(move |address| format!("{}-{}:{:#x}", chain, n, address)))
    }
}

/// Hands batch results back in a caller-chosen order.
pub struct PermutedReader {
    pub inner: InMemoryChain,
    pub rotation: usize,
    pub reverse: bool,
}

#[async_trait]
impl ContractReader for PermutedReader {
    async fn read_one(&self, block: &BlockRef, call: ContractCall) -> Result<CallOutput, AdapterError> {
        self.inner.read_one(block, call).await
    }

    async fn read_batch(
        &self,
        block: &BlockRef,
        calls: Vec<ContractCall>,
    ) -> Result<Vec<BatchOutput>, AdapterError> {
        let mut results = self.inner.read_batch(block, calls).await?;
        if !results.is_empty() {
            let by = self.rotation % results.len();
            results.rotate_left(by);
        }
        if self.reverse {
            results.reverse();
        }
        Ok(results)
    }
}
