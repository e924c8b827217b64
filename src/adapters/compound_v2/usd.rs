//! USD-denominated figures priced through the deployment's own oracle.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use futures::stream::{FuturesUnordered, TryStreamExt};
use num_traits::Zero;
use tracing::{debug, error, info};

use crate::adapters::compound_v2::config::{BalanceKind, CompoundDeployment, UsdPricing};
use crate::adapters::compound_v2::markets::{list_markets, resolve_underlying};
use crate::adapters::traits::{AdapterError, ChainAccess, TvlAdapter, TvlRequest};
use crate::blockchain::{BlockRef, ContractCall, ContractReader, ViewMethod};
use crate::models::{to_usdt_balances, Balances};
use crate::utils::math::locked_usd;

/// Decimals every native market is accounted with.
const NATIVE_DECIMALS: u8 = 18;

/// Decimals of the token held by `market`. Failures are logged against the
/// market and returned unchanged.
async fn underlying_decimals(
    reader: &dyn ContractReader,
    block: &BlockRef,
    market: Address,
    native_market: Option<Address>,
) -> Result<u8, AdapterError> {
    if native_market == Some(market) {
        return Ok(NATIVE_DECIMALS);
    }

    let underlying = resolve_underlying(reader, block, market, None).await?;
    let result = reader
        .read_one(block, ContractCall::new(underlying, ViewMethod::Decimals))
        .await
        .and_then(|output| output.into_decimals());

    result.map_err(|e| {
        error!(
            chain = %block.chain,
            market = %market,
            token = %underlying,
            error = %e,
            "market rugged, is that the native market?"
        );
        e
    })
}

/// USD value of one market: balance, decimals and oracle price read together.
async fn market_value(
    reader: &dyn ContractReader,
    block: &BlockRef,
    market: Address,
    oracle: Address,
    deployment: &CompoundDeployment,
    pricing: &UsdPricing,
    kind: BalanceKind,
) -> Result<BigDecimal, AdapterError> {
    let balance = async {
        reader
            .read_one(block, ContractCall::new(market, kind.method()))
            .await?
            .into_uint()
    };
    let price = async {
        let method = ViewMethod::PriceOf {
            signature: pricing.price_method.clone(),
            asset: market,
        };
        reader.read_one(block, ContractCall::new(oracle, method)).await?.into_uint()
    };
    let decimals = underlying_decimals(reader, block, market, deployment.native_market);

    let (balance, decimals, price): (U256, u8, U256) = futures::try_join!(balance, decimals, price)?;
    let value = locked_usd(balance, decimals, price);

    debug!(
        market = %market,
        balance = %balance,
        decimals,
        price = %price,
        usd = %value,
        "Priced market"
    );
    Ok(value)
}

/// Total USD value of `kind` across every market of the deployment.
///
/// The sum is exact; rounding happens only when the result is expressed in
/// USDT units.
pub async fn compute_usd_locked(
    reader: &dyn ContractReader,
    deployment: &CompoundDeployment,
    block: &BlockRef,
    kind: BalanceKind,
) -> Result<BigDecimal, AdapterError> {
    let pricing = deployment.usd_pricing.clone().unwrap_or_default();

    let markets = list_markets(reader, deployment.comptroller, block).await?;
    let oracle = reader
        .read_one(
            block,
            ContractCall::new(
                deployment.comptroller,
                ViewMethod::AddressGetter(pricing.oracle_method.clone()),
            ),
        )
        .await?
        .into_address()?;
    debug!(chain = %block.chain, oracle = %oracle, "Resolved price oracle");

    let values: Vec<BigDecimal> = markets
        .iter()
        .map(|&market| market_value(reader, block, market, oracle, deployment, &pricing, kind))
        .collect::<FuturesUnordered<_>>()
        .try_collect()
        .await?;

    Ok(values.into_iter().fold(BigDecimal::zero(), |total, value| total + value))
}

/// Export that reports a single USDT-denominated balance.
#[derive(Clone)]
pub struct CompoundUsdAdapter {
    deployment: CompoundDeployment,
    access: ChainAccess,
}

impl CompoundUsdAdapter {
    pub fn new(deployment: CompoundDeployment, access: ChainAccess) -> Result<Self, AdapterError> {
        deployment.validate()?;
        Ok(Self { deployment, access })
    }

    async fn usd_balances(&self, request: &TvlRequest, kind: BalanceKind) -> Result<Balances, AdapterError> {
        let block = self
            .access
            .blocks
            .resolve(request.timestamp, &self.deployment.chain, &request.known_blocks(), true)
            .await?;

        let usd = compute_usd_locked(self.access.reader.as_ref(), &self.deployment, &block, kind).await?;
        info!(
            protocol = %self.deployment.name,
            chain = %self.deployment.chain,
            block = block.number,
            kind = ?kind,
            usd = %usd,
            "Computed USD value"
        );
        Ok(to_usdt_balances(&usd))
    }
}

#[async_trait]
impl TvlAdapter for CompoundUsdAdapter {
    fn chain(&self) -> &str {
        &self.deployment.chain
    }

    async fn tvl(&self, request: &TvlRequest) -> Result<Balances, AdapterError> {
        self.usd_balances(request, BalanceKind::Cash).await
    }

    async fn borrowed(&self, request: &TvlRequest) -> Result<Balances, AdapterError> {
        self.usd_balances(request, BalanceKind::Borrowed).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{CallOutput, InMemoryChain};
    use alloy::primitives::address;
    use std::str::FromStr;

    const COMPTROLLER: Address = address!("3d9819210A31b4961b30EF54bE2aeD79B9c9Cd3B");
    const ORACLE: Address = address!("50ce56A3239671Ab62f185704Caedf626352741e");
    const CETH: Address = address!("4Ddc2D193948926D02f9B1fE9e1daa0718270ED5");
    const CUSDC: Address = address!("39AA39c021dfbaE8faC545936693aC917d5E7563");
    const USDC: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");

    fn pow10(n: u64) -> U256 {
        U256::from(10u64).pow(U256::from(n))
    }

    fn price(market: Address, value: U256) -> (ViewMethod, CallOutput) {
        (
            ViewMethod::PriceOf {
                signature: "getUnderlyingPrice(address)".to_string(),
                asset: market,
            },
            CallOutput::Uint(value),
        )
    }

    fn deployment() -> CompoundDeployment {
        let mut deployment =
            CompoundDeployment::new("compound", "ethereum", COMPTROLLER).with_usd_pricing(UsdPricing::default());
        deployment.native_market = Some(CETH);
        deployment
    }

    fn chain() -> InMemoryChain {
        let (eth_method, eth_price) = price(CETH, U256::from(2_000u64) * pow10(18));
        let (usdc_method, usdc_price) = price(CUSDC, pow10(30));
        InMemoryChain::new()
            .with_markets(COMPTROLLER, vec![CETH, CUSDC])
            .with_response(COMPTROLLER, ViewMethod::AddressGetter("oracle()".to_string()), CallOutput::Address(ORACLE))
            .with_market_balances(CETH, U256::from(3u64) * pow10(18), pow10(18))
            .with_market(CUSDC, USDC, U256::from(1_500_000_000u64), U256::from(500_000u64))
            .with_token(USDC, "USDC", 6)
            .with_response(ORACLE, eth_method, eth_price)
            .with_response(ORACLE, usdc_method, usdc_price)
    }

    #[tokio::test]
    async fn test_usd_sum_is_exact() {
        let chain = chain();
        let block = BlockRef::new("ethereum", 17_000_000);

        // 3 ETH at $2000 + 1500 USDC at $1
        let tvl = compute_usd_locked(&chain, &deployment(), &block, BalanceKind::Cash).await.unwrap();
        assert_eq!(tvl, BigDecimal::from(7_500));

        // 1 ETH at $2000 + 0.5 USDC
        let borrowed = compute_usd_locked(&chain, &deployment(), &block, BalanceKind::Borrowed)
            .await
            .unwrap();
        assert_eq!(borrowed, BigDecimal::from_str("2000.5").unwrap());
    }

    #[tokio::test]
    async fn test_native_market_decimals_need_no_reads() {
        let chain = chain();
        let block = BlockRef::new("ethereum", 17_000_000);
        compute_usd_locked(&chain, &deployment(), &block, BalanceKind::Cash).await.unwrap();

        assert_eq!(chain.calls_to(CETH, &ViewMethod::Underlying), 0);
        assert_eq!(chain.calls_to(CUSDC, &ViewMethod::Underlying), 1);
        assert_eq!(chain.calls_to(COMPTROLLER, &ViewMethod::GetAllMarkets), 1);
    }

    #[tokio::test]
    async fn test_missing_decimals_fails() {
        let chain = chain().failing(USDC);
        let block = BlockRef::new("ethereum", 17_000_000);
        let err = compute_usd_locked(&chain, &deployment(), &block, BalanceKind::Cash)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Contract { target, .. } if target == USDC));
    }
}
