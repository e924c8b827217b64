//! Raw token balance pipeline: cash or borrows per market, keyed by underlying.

use alloy::primitives::{Address, U256};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

use crate::adapters::compound_v2::config::{BalanceKind, CompoundV2Config};
use crate::adapters::compound_v2::markets::{build_market_set, Market};
use crate::adapters::lp::{LpClassifier, LpPosition};
use crate::adapters::traits::{AdapterError, ChainAccess, TvlRequest};
use crate::blockchain::{BatchOutput, BlockRef, ContractCall, ContractReader, ViewMethod};
use crate::models::{AddressTransform, Balances};

/// One batched `getCash()` or `totalBorrows()` read per market.
pub async fn fetch_balances(
    reader: &dyn ContractReader,
    markets: &[Market],
    block: &BlockRef,
    kind: BalanceKind,
) -> Result<Vec<BatchOutput>, AdapterError> {
    let calls = markets
        .iter()
        .map(|m| ContractCall::new(m.market, kind.method()))
        .collect();
    reader.read_batch(block, calls).await
}

/// Symbols of the distinct underlyings of `markets`. Hardcoded markets are
/// skipped; their underlying may not exist on this chain.
pub async fn fetch_symbols(
    reader: &dyn ContractReader,
    markets: &[Market],
    block: &BlockRef,
) -> Result<HashMap<Address, String>, AdapterError> {
    let tokens: BTreeSet<Address> = markets
        .iter()
        .filter(|m| !m.hardcoded)
        .map(|m| m.underlying)
        .collect();
    if tokens.is_empty() {
        return Ok(HashMap::new());
    }

    let calls = tokens
        .into_iter()
        .map(|token| ContractCall::new(token, ViewMethod::Symbol))
        .collect();

    reader
        .read_batch(block, calls)
        .await?
        .into_iter()
        .map(|BatchOutput { target, output }| output.into_text().map(|symbol| (target, symbol)))
        .collect()
}

/// Fold raw market balances into `balances` under the transformed
/// underlying key. Markets whose underlying symbol matches the classifier
/// are returned as LP positions instead of being added. Hardcoded markets
/// are always plain assets.
pub fn aggregate(
    markets: &[Market],
    raw_balances: &[BatchOutput],
    symbols: &HashMap<Address, String>,
    lp_classifier: Option<&LpClassifier>,
    transform: &AddressTransform,
    balances: &mut Balances,
) -> Result<Vec<LpPosition>, AdapterError> {
    let mut by_market: HashMap<Address, U256> = HashMap::with_capacity(raw_balances.len());
    for result in raw_balances {
        by_market.insert(result.target, result.output.clone().into_uint()?);
    }

    let mut lp_positions = Vec::new();
    for market in markets {
        let raw = by_market.get(&market.market).copied().ok_or_else(|| {
            AdapterError::InvalidData(format!("no balance returned for market {}", market.market))
        })?;

        if let Some(classifier) = lp_classifier.filter(|_| !market.hardcoded) {
            let symbol = symbols.get(&market.underlying).ok_or_else(|| {
                AdapterError::InvalidData(format!("no symbol returned for token {}", market.underlying))
            })?;
            if classifier.matches(symbol) {
                debug!(market = %market.market, token = %market.underlying, symbol = %symbol, "LP underlying");
                lp_positions.push(LpPosition {
                    token: market.underlying,
                    balance: raw,
                });
                continue;
            }
        }

        balances.sum_single_balance(transform.apply(market.underlying), raw);
    }

    Ok(lp_positions)
}

/// Balance figure of one deployment at the block matching `request`.
pub async fn get_compound_v2_tvl(
    config: &CompoundV2Config,
    access: &ChainAccess,
    request: &TvlRequest,
) -> Result<Balances, AdapterError> {
    let reader = access.reader.as_ref();
    let block = access
        .blocks
        .resolve(request.timestamp, &config.chain, &request.known_blocks(), true)
        .await?;

    info!(
        chain = %config.chain,
        comptroller = %config.comptroller,
        block = block.number,
        kind = ?config.kind,
        "Computing Compound V2 balances"
    );

    let markets = build_market_set(reader, config.comptroller, &block, config.native).await?;
    let raw_balances = fetch_balances(reader, &markets, &block, config.kind).await?;
    let symbols = match config.lp_classifier {
        Some(_) => fetch_symbols(reader, &markets, &block).await?,
        None => HashMap::new(),
    };

    let mut balances = Balances::new();
    let lp_positions = aggregate(
        &markets,
        &raw_balances,
        &symbols,
        config.lp_classifier.as_ref(),
        &config.transform,
        &mut balances,
    )?;

    if !lp_positions.is_empty() {
        debug!(chain = %config.chain, positions = lp_positions.len(), "Unwrapping LP positions");
        access
            .unwrapper
            .unwrap_lps(&mut balances, &lp_positions, &block, &config.transform)
            .await?;
    }

    info!(
        chain = %config.chain,
        comptroller = %config.comptroller,
        assets = balances.len(),
        "Compound V2 balances computed"
    );
    Ok(balances)
}
