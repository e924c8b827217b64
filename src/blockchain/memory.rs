//! In-memory chain state for tests. Only built with the `test-util` feature.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::adapters::traits::AdapterError;
use crate::blockchain::abi::{BatchOutput, CallOutput, ContractCall, ViewMethod};
use crate::blockchain::block_resolver::{BlockRef, BlockResolver};
use crate::blockchain::reader::{concurrent_batch, ContractReader};

/// Fixed view-call answers keyed by `(target, method)`.
///
/// Unknown calls revert. Every call is recorded so tests can assert which
/// reads were, or were not, issued.
#[derive(Debug, Default)]
pub struct InMemoryChain {
    responses: HashMap<(Address, ViewMethod), CallOutput>,
    failing: HashSet<Address>,
    default_block: u64,
    reverse_batches: bool,
    calls: Mutex<Vec<ContractCall>>,
}

impl InMemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, target: Address, method: ViewMethod, output: CallOutput) -> Self {
        self.responses.insert((target, method), output);
        self
    }

    pub fn with_markets(self, comptroller: Address, markets: Vec<Address>) -> Self {
        self.with_response(comptroller, ViewMethod::GetAllMarkets, CallOutput::Addresses(markets))
    }

    /// A cToken market with its underlying, cash and total borrows.
    pub fn with_market(self, market: Address, underlying: Address, cash: U256, borrows: U256) -> Self {
        self.with_response(market, ViewMethod::Underlying, CallOutput::Address(underlying))
            .with_market_balances(market, cash, borrows)
    }

    pub fn with_market_balances(self, market: Address, cash: U256, borrows: U256) -> Self {
        self.with_response(market, ViewMethod::GetCash, CallOutput::Uint(cash))
            .with_response(market, ViewMethod::TotalBorrows, CallOutput::Uint(borrows))
    }

    pub fn with_token(self, token: Address, symbol: &str, decimals: u8) -> Self {
        self.with_response(token, ViewMethod::Symbol, CallOutput::Text(symbol.to_string()))
            .with_response(token, ViewMethod::Decimals, CallOutput::Uint(U256::from(decimals)))
    }

    pub fn with_pair(
        self,
        pair: Address,
        token0: Address,
        token1: Address,
        reserves: (U256, U256),
        total_supply: U256,
    ) -> Self {
        self.with_response(pair, ViewMethod::Token0, CallOutput::Address(token0))
            .with_response(pair, ViewMethod::Token1, CallOutput::Address(token1))
            .with_response(
                pair,
                ViewMethod::GetReserves,
                CallOutput::Reserves {
                    reserve0: reserves.0,
                    reserve1: reserves.1,
                },
            )
            .with_response(pair, ViewMethod::TotalSupply, CallOutput::Uint(total_supply))
    }

    /// Every call against `target` reverts.
    pub fn failing(mut self, target: Address) -> Self {
        self.failing.insert(target);
        self
    }

    /// Block returned when the caller supplies none for the chain.
    pub fn at_block(mut self, number: u64) -> Self {
        self.default_block = number;
        self
    }

    /// Return batch results in reverse input order.
    pub fn reversed_batches(mut self) -> Self {
        self.reverse_batches = true;
        self
    }

    pub fn calls(&self) -> Vec<ContractCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn calls_to(&self, target: Address, method: &ViewMethod) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.target == target && &call.method == method)
            .count()
    }
}

#[async_trait]
impl ContractReader for InMemoryChain {
    async fn read_one(&self, _block: &BlockRef, call: ContractCall) -> Result<CallOutput, AdapterError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call.clone());
        }

        if self.failing.contains(&call.target) {
            return Err(AdapterError::Contract {
                target: call.target,
                message: format!("{} reverted", call.method),
            });
        }

        self.responses
            .get(&(call.target, call.method.clone()))
            .cloned()
            .ok_or_else(|| AdapterError::Contract {
                target: call.target,
                message: format!("execution reverted: no code for {}", call.method),
            })
    }

    async fn read_batch(
        &self,
        block: &BlockRef,
        calls: Vec<ContractCall>,
    ) -> Result<Vec<BatchOutput>, AdapterError> {
        let mut results = concurrent_batch(self, block, calls).await?;
        // results arrive in completion order; pin them down so tests are deterministic
        results.sort_by_key(|r| r.target);
        if self.reverse_batches {
            results.reverse();
        }
        Ok(results)
    }
}

#[async_trait]
impl BlockResolver for InMemoryChain {
    async fn resolve(
        &self,
        _timestamp: u64,
        chain: &str,
        chain_blocks: &HashMap<String, u64>,
        _must_exist: bool,
    ) -> Result<BlockRef, AdapterError> {
        let number = chain_blocks.get(chain).copied().unwrap_or(self.default_block);
        Ok(BlockRef::new(chain, number))
    }
}
