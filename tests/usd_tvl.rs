mod common;

use alloy::primitives::{address, Address, U256};
use bigdecimal::BigDecimal;
use std::sync::Arc;

use common::*;
use compound_tvl::adapters::compound_v2::{usd_compound_exports, CompoundDeployment, UsdPricing};
use compound_tvl::adapters::{AdapterError, TvlAdapter, TvlRequest};
use compound_tvl::blockchain::{CallOutput, InMemoryChain, ViewMethod};
use compound_tvl::models::USDT_ASSET_KEY;

const ORACLE: Address = address!("d8B6dA2bfEC71D684D3E2a2FC9492dDad5C3787F");

fn price_of(signature: &str, market: Address) -> ViewMethod {
    ViewMethod::PriceOf {
        signature: signature.to_string(),
        asset: market,
    }
}

fn usd_deployment(pricing: UsdPricing) -> CompoundDeployment {
    let mut deployment = CompoundDeployment::new("venus", "bsc", COMPTROLLER).with_usd_pricing(pricing);
    deployment.native_market = Some(VBNB);
    deployment
}

fn usd_chain(oracle_method: &str, price_method: &str) -> InMemoryChain {
    InMemoryChain::new()
        .with_markets(COMPTROLLER, vec![CDAI, VBNB])
        .with_response(
            COMPTROLLER,
            ViewMethod::AddressGetter(oracle_method.to_string()),
            CallOutput::Address(ORACLE),
        )
        .with_market(CDAI, DAI, pow10(18), pow10(17))
        .with_token(DAI, "DAI", 18)
        .with_response(ORACLE, price_of(price_method, CDAI), CallOutput::Uint(pow10(18)))
        .with_market_balances(VBNB, U256::ZERO, U256::ZERO)
        .with_response(ORACLE, price_of(price_method, VBNB), CallOutput::Uint(U256::from(300u64) * pow10(18)))
}

#[tokio::test]
async fn test_one_token_at_one_dollar_is_one_usdt() {
    let chain = Arc::new(usd_chain("oracle()", "getUnderlyingPrice(address)"));
    let exports = usd_compound_exports(
        &usd_deployment(UsdPricing::default()),
        access(chain, Arc::new(RecordingUnwrapper::default())),
    )
    .unwrap();

    let tvl = exports.tvl(&TvlRequest::at(1_700_000_000)).await.unwrap();

    assert_eq!(tvl.len(), 1);
    assert_eq!(tvl.get(USDT_ASSET_KEY), Some(&BigDecimal::from(1_000_000)));
}

#[tokio::test]
async fn test_borrowed_in_usd() {
    let chain = Arc::new(usd_chain("oracle()", "getUnderlyingPrice(address)"));
    let exports = usd_compound_exports(
        &usd_deployment(UsdPricing::default()),
        access(chain, Arc::new(RecordingUnwrapper::default())),
    )
    .unwrap();

    let borrowed = exports.borrowed(&TvlRequest::at(1_700_000_000)).await.unwrap();
    assert_eq!(borrowed.get(USDT_ASSET_KEY), Some(&BigDecimal::from(100_000)));
}

#[tokio::test]
async fn test_custom_oracle_methods() {
    let pricing = UsdPricing {
        oracle_method: "getOracle()".to_string(),
        price_method: "getPrice(address)".to_string(),
    };
    let chain = Arc::new(usd_chain(&pricing.oracle_method, &pricing.price_method));
    let exports = usd_compound_exports(
        &usd_deployment(pricing),
        access(chain.clone(), Arc::new(RecordingUnwrapper::default())),
    )
    .unwrap();

    let tvl = exports.tvl(&TvlRequest::at(1_700_000_000)).await.unwrap();
    assert_eq!(tvl.get(USDT_ASSET_KEY), Some(&BigDecimal::from(1_000_000)));
    assert_eq!(
        chain.calls_to(COMPTROLLER, &ViewMethod::AddressGetter("getOracle()".to_string())),
        1
    );
}

#[tokio::test]
async fn test_missing_price_fails() {
    let chain = Arc::new(usd_chain("oracle()", "getUnderlyingPrice(address)").failing(ORACLE));
    let exports = usd_compound_exports(
        &usd_deployment(UsdPricing::default()),
        access(chain, Arc::new(RecordingUnwrapper::default())),
    )
    .unwrap();

    let err = exports.tvl(&TvlRequest::at(1_700_000_000)).await.unwrap_err();
    assert!(matches!(err, AdapterError::Contract { target, .. } if target == ORACLE));
}

#[test]
fn test_invalid_price_signature_is_rejected_up_front() {
    let chain = Arc::new(InMemoryChain::new());
    let pricing = UsdPricing {
        oracle_method: "oracle()".to_string(),
        price_method: "getUnderlyingPrice".to_string(),
    };
    let result = usd_compound_exports(
        &usd_deployment(pricing),
        access(chain.clone(), Arc::new(RecordingUnwrapper::default())),
    );

    assert!(matches!(result, Err(AdapterError::Config(_))));
    assert!(chain.calls().is_empty());
}
