//! Market discovery: comptroller market list and cToken underlyings.

use alloy::primitives::{address, Address};
use futures::stream::{FuturesUnordered, TryStreamExt};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::adapters::compound_v2::config::NativeMarket;
use crate::adapters::traits::AdapterError;
use crate::blockchain::{BlockRef, ContractCall, ContractReader, ViewMethod};

/// Compound's cETH, which has no `underlying()` on any chain it was forked to.
const CETH: Address = address!("4Ddc2D193948926D02f9B1fE9e1daa0718270ED5");
const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");

/// Native AVAX market of a fork that did not expose `underlying()`.
const AVAX_NATIVE_MARKET: Address = address!("5C0401e81Bc07Ca70fAD469b451682c0d747Ef1c");
const WAVAX: Address = address!("B31f66AA3C1e785363F0875A1B74E27b85FD66c7");

/// A lending market and the token it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Market {
    pub underlying: Address,
    pub market: Address,
    /// Underlying came from configuration or a known exception, not from
    /// `underlying()`. Such markets hold native assets, never LP shares.
    #[serde(skip)]
    pub hardcoded: bool,
}

impl Market {
    pub fn new(underlying: Address, market: Address) -> Self {
        Self {
            underlying,
            market,
            hardcoded: false,
        }
    }

    pub fn hardcoded(underlying: Address, market: Address) -> Self {
        Self {
            underlying,
            market,
            hardcoded: true,
        }
    }
}

/// Known markets whose underlying is hardcoded instead of read.
fn known_underlying(chain: &str, market: Address) -> Option<Address> {
    if market == CETH {
        return Some(WETH);
    }
    if chain == "avax" && market == AVAX_NATIVE_MARKET {
        return Some(WAVAX);
    }
    None
}

/// Underlying of `market` when it needs no chain read.
fn hardcoded_underlying(chain: &str, market: Address, native: Option<NativeMarket>) -> Option<Address> {
    match native {
        Some(native) if native.market == market => Some(native.equivalent),
        _ => known_underlying(chain, market),
    }
}

/// Every market registered with `comptroller`, in on-chain order.
pub async fn list_markets(
    reader: &dyn ContractReader,
    comptroller: Address,
    block: &BlockRef,
) -> Result<Vec<Address>, AdapterError> {
    let markets = reader
        .read_one(block, ContractCall::new(comptroller, ViewMethod::GetAllMarkets))
        .await?
        .into_addresses()?;

    debug!(
        chain = %block.chain,
        block = block.number,
        comptroller = %comptroller,
        markets = markets.len(),
        "Listed comptroller markets"
    );
    Ok(markets)
}

/// Token held by `market`.
///
/// The native market and the hardcoded exceptions are answered without a
/// chain read.
pub async fn resolve_underlying(
    reader: &dyn ContractReader,
    block: &BlockRef,
    market: Address,
    native: Option<NativeMarket>,
) -> Result<Address, AdapterError> {
    if let Some(underlying) = hardcoded_underlying(&block.chain, market, native) {
        return Ok(underlying);
    }

    let result = reader
        .read_one(block, ContractCall::new(market, ViewMethod::Underlying))
        .await
        .and_then(|output| output.into_address());

    result.map_err(|e| {
        error!(
            chain = %block.chain,
            market = %market,
            error = %e,
            "market rugged, is that the native market?"
        );
        e
    })
}

/// All markets of `comptroller` with their underlyings, in the order the
/// underlying lookups complete.
pub async fn build_market_set(
    reader: &dyn ContractReader,
    comptroller: Address,
    block: &BlockRef,
    native: Option<NativeMarket>,
) -> Result<Vec<Market>, AdapterError> {
    let addresses = list_markets(reader, comptroller, block).await?;

    let markets: Vec<Market> = addresses
        .into_iter()
        .map(|market| async move {
            if let Some(underlying) = hardcoded_underlying(&block.chain, market, native) {
                return Ok(Market::hardcoded(underlying, market));
            }
            let underlying = resolve_underlying(reader, block, market, native).await?;
            Ok::<_, AdapterError>(Market::new(underlying, market))
        })
        .collect::<FuturesUnordered<_>>()
        .try_collect()
        .await?;

    info!(
        chain = %block.chain,
        comptroller = %comptroller,
        markets = markets.len(),
        "Built market set"
    );
    Ok(markets)
}
