use alloy::primitives::U256;
use bigdecimal::{BigDecimal, RoundingMode};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::utils::math::u256_to_decimal;

/// Ethereum USDT, the asset USD-denominated results are expressed in.
pub const USDT_ASSET_KEY: &str = "0xdac17f958d2ee523a2206206994597c13d831ec7";

/// Decimals of [`USDT_ASSET_KEY`].
pub const USDT_DECIMALS: u32 = 6;

/// Raw token amounts keyed by chain-qualified asset identifier.
///
/// Amounts are only ever added, never subtracted, so every value stays
/// non-negative for the lifetime of the map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balances(HashMap<String, BigDecimal>);

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw on-chain quantity under `key`, summing on collision.
    pub fn sum_single_balance(&mut self, key: impl Into<String>, amount: U256) {
        self.add(key.into(), u256_to_decimal(amount));
    }

    fn add(&mut self, key: String, amount: BigDecimal) {
        let entry = self.0.entry(key).or_insert_with(BigDecimal::zero);
        *entry += amount;
    }

    pub fn get(&self, key: &str) -> Option<&BigDecimal> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Sum of every amount in the map, regardless of asset.
    pub fn total(&self) -> BigDecimal {
        self.0.values().fold(BigDecimal::zero(), |acc, v| acc + v)
    }
}

/// Wrap a USD figure into the single-asset balance shape, expressed as raw
/// USDT units (6 decimals, rounded half-up to an integer).
pub fn to_usdt_balances(usd: &BigDecimal) -> Balances {
    let scale = BigDecimal::from(10u64.pow(USDT_DECIMALS));
    let raw = (usd * scale).with_scale_round(0, RoundingMode::HalfUp);

    let mut balances = Balances::new();
    balances.add(USDT_ASSET_KEY.to_string(), raw);
    balances
}
