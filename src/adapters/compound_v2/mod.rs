//! Compound-V2-style lending markets (Compound, Venus, Cream and forks).
//!
//! Figures are read from the comptroller's market list at a historical block
//! and reported either as raw underlying balances or as one USD amount.

pub mod balances;
pub mod config;
pub mod exports;
pub mod markets;
pub mod usd;

pub use balances::{aggregate, fetch_balances, fetch_symbols, get_compound_v2_tvl};
pub use config::{BalanceKind, CompoundDeployment, CompoundV2Config, NativeMarket, UsdPricing};
pub use exports::{
    compound_exports, compound_exports_with_async_transform, full_compound_exports, usd_compound_exports,
    AsyncTransformAdapter, ChainExports, CompoundV2Adapter, ProtocolExports, TransformFactory,
};
pub use markets::{build_market_set, list_markets, resolve_underlying, Market};
pub use usd::{compute_usd_locked, CompoundUsdAdapter};
