//! Liquidity-pool tokens held as market underlyings.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::adapters::traits::AdapterError;
use crate::blockchain::{BlockRef, CallOutput, ContractCall, ContractReader, ViewMethod};
use crate::models::{AddressTransform, Balances};

/// Raw quantity of an LP token, to be split into its constituents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LpPosition {
    pub token: Address,
    pub balance: U256,
}

/// Decides from a token symbol whether the token is an LP share.
#[derive(Clone)]
pub struct LpClassifier {
    description: String,
    inner: Arc<dyn Fn(&str) -> bool + Send + Sync>,
}

impl LpClassifier {
    pub fn new(description: impl Into<String>, f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            description: description.into(),
            inner: Arc::new(f),
        }
    }

    /// Classifier matching symbols against a regular expression, e.g. `"-LP$"`.
    pub fn from_pattern(pattern: &str) -> Result<Self, AdapterError> {
        let regex = Regex::new(pattern)
            .map_err(|e| AdapterError::Config(format!("invalid LP symbol pattern `{}`: {}", pattern, e)))?;
        Ok(Self::new(pattern, move |symbol| regex.is_match(symbol)))
    }

    pub fn matches(&self, symbol: &str) -> bool {
        (self.inner)(symbol)
    }
}

impl fmt::Debug for LpClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LpClassifier").field(&self.description).finish()
    }
}

/// Adds the constituent assets of LP positions to a balance map.
#[async_trait]
pub trait LpUnwrapper: Send + Sync {
    async fn unwrap_lps(
        &self,
        balances: &mut Balances,
        positions: &[LpPosition],
        block: &BlockRef,
        transform: &AddressTransform,
    ) -> Result<(), AdapterError>;
}

/// Unwraps constant-product pair shares pro rata to the pool reserves.
#[derive(Clone)]
pub struct UniswapV2Unwrapper {
    reader: Arc<dyn ContractReader>,
}

impl UniswapV2Unwrapper {
    pub fn new(reader: Arc<dyn ContractReader>) -> Self {
        Self { reader }
    }

    async fn read(&self, block: &BlockRef, pair: Address, method: ViewMethod) -> Result<CallOutput, AdapterError> {
        self.reader.read_one(block, ContractCall::new(pair, method)).await
    }
}

/// `reserve * balance / total_supply`, floored.
fn pro_rata(reserve: U256, balance: U256, total_supply: U256, pair: Address) -> Result<U256, AdapterError> {
    reserve
        .checked_mul(balance)
        .map(|product| product / total_supply)
        .ok_or_else(|| AdapterError::InvalidData(format!("LP share of {} overflows uint256", pair)))
}

#[async_trait]
impl LpUnwrapper for UniswapV2Unwrapper {
    async fn unwrap_lps(
        &self,
        balances: &mut Balances,
        positions: &[LpPosition],
        block: &BlockRef,
        transform: &AddressTransform,
    ) -> Result<(), AdapterError> {
        for position in positions {
            let pair = position.token;
            let (token0, token1, reserves, total_supply) = futures::try_join!(
                self.read(block, pair, ViewMethod::Token0),
                self.read(block, pair, ViewMethod::Token1),
                self.read(block, pair, ViewMethod::GetReserves),
                self.read(block, pair, ViewMethod::TotalSupply),
            )?;
            let (token0, token1) = (token0.into_address()?, token1.into_address()?);
            let (reserve0, reserve1) = reserves.into_reserves()?;
            let total_supply = total_supply.into_uint()?;

            if total_supply.is_zero() {
                warn!(pair = %pair, "LP token has zero supply, skipping");
                continue;
            }

            let amount0 = pro_rata(reserve0, position.balance, total_supply, pair)?;
            let amount1 = pro_rata(reserve1, position.balance, total_supply, pair)?;
            debug!(
                pair = %pair,
                token0 = %token0,
                amount0 = %amount0,
                token1 = %token1,
                amount1 = %amount1,
                "Unwrapped LP position"
            );

            balances.sum_single_balance(transform.apply(token0), amount0);
            balances.sum_single_balance(transform.apply(token1), amount1);
        }
        Ok(())
    }
}
