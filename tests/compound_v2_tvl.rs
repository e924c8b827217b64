mod common;

use alloy::primitives::{Address, U256};
use bigdecimal::BigDecimal;
use std::sync::Arc;

use common::*;
use compound_tvl::adapters::compound_v2::{compound_exports, CompoundDeployment, CompoundV2Adapter};
use compound_tvl::adapters::{AdapterError, LpPosition, TvlAdapter, TvlRequest, UniswapV2Unwrapper};
use compound_tvl::blockchain::{InMemoryChain, ViewMethod};
use compound_tvl::models::AddressTransform;

fn key(address: Address) -> String {
    AddressTransform::chain_prefixed("bsc").apply(address)
}

#[tokio::test]
async fn test_tvl_sums_cash_by_underlying() {
    let chain = Arc::new(chain());
    let exports = compound_exports(&deployment(), access(chain, Arc::new(RecordingUnwrapper::default()))).unwrap();

    let tvl = exports.tvl(&TvlRequest::at(1_700_000_000)).await.unwrap();

    assert_eq!(tvl.len(), 4);
    assert_eq!(tvl.get(&key(DAI)), Some(&BigDecimal::from(1_000)));
    assert_eq!(tvl.get(&key(USDC)), Some(&BigDecimal::from(2_000)));
    assert_eq!(tvl.get(&key(WBNB)), Some(&BigDecimal::from(50)));
    assert_eq!(tvl.get(&key(CAKE_LP)), Some(&BigDecimal::from(7)));
    assert_eq!(tvl.total(), BigDecimal::from(3_057));
}

#[tokio::test]
async fn test_borrowed_uses_total_borrows() {
    let chain = Arc::new(chain());
    let exports = compound_exports(&deployment(), access(chain.clone(), Arc::new(RecordingUnwrapper::default()))).unwrap();

    let borrowed = exports.borrowed(&TvlRequest::at(1_700_000_000)).await.unwrap();

    assert_eq!(borrowed.get(&key(DAI)), Some(&BigDecimal::from(400)));
    assert_eq!(borrowed.get(&key(USDC)), Some(&BigDecimal::from(900)));
    assert_eq!(borrowed.get(&key(WBNB)), Some(&BigDecimal::from(10)));
    assert_eq!(borrowed.get(&key(CAKE_LP)), Some(&BigDecimal::from(0)));
    assert_eq!(chain.calls_to(CDAI, &ViewMethod::GetCash), 0);
    assert_eq!(chain.calls_to(CDAI, &ViewMethod::TotalBorrows), 1);
}

#[tokio::test]
async fn test_native_market_never_reads_underlying() {
    let chain = Arc::new(chain());
    let exports = compound_exports(&deployment(), access(chain.clone(), Arc::new(RecordingUnwrapper::default()))).unwrap();

    exports.tvl(&TvlRequest::at(1_700_000_000)).await.unwrap();

    assert_eq!(chain.calls_to(VBNB, &ViewMethod::Underlying), 0);
    assert_eq!(chain.calls_to(CDAI, &ViewMethod::Underlying), 1);
}

#[tokio::test]
async fn test_lp_markets_go_through_unwrapper() {
    let chain = Arc::new(chain());
    let unwrapper = Arc::new(RecordingUnwrapper::default());
    let deployment = deployment().with_lp_pattern("-LP$");
    let exports = compound_exports(&deployment, access(chain, unwrapper.clone())).unwrap();

    let request = TvlRequest::at(1_700_000_000).with_chain_block("bsc", 31_000_000);
    let tvl = exports.tvl(&request).await.unwrap();

    assert!(!tvl.contains_key(&key(CAKE_LP)));
    // recording unwrapper credits the LP units to DAI
    assert_eq!(tvl.get(&key(DAI)), Some(&BigDecimal::from(1_007)));

    let requests = unwrapper.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].0,
        vec![LpPosition {
            token: CAKE_LP,
            balance: U256::from(7u64)
        }]
    );
    assert_eq!(requests[0].1.number, 31_000_000);
}

#[tokio::test]
async fn test_unwrapper_not_called_without_lp_markets() {
    let chain = Arc::new(
        InMemoryChain::new()
            .with_markets(COMPTROLLER, vec![CDAI])
            .with_market(CDAI, DAI, U256::from(5u64), U256::ZERO)
            .with_token(DAI, "DAI", 18),
    );
    let unwrapper = Arc::new(RecordingUnwrapper::default());
    let deployment = deployment().with_lp_pattern("-LP$");
    let exports = compound_exports(&deployment, access(chain, unwrapper.clone())).unwrap();

    exports.tvl(&TvlRequest::at(1_700_000_000)).await.unwrap();
    assert!(unwrapper.requests().is_empty());
}

#[tokio::test]
async fn test_uniswap_v2_unwrapper_end_to_end() {
    let chain = Arc::new(chain().with_pair(
        CAKE_LP,
        USDC,
        WBNB,
        (U256::from(1_000u64), U256::from(10u64)),
        U256::from(14u64),
    ));
    let unwrapper = Arc::new(UniswapV2Unwrapper::new(chain.clone()));
    let deployment = deployment().with_lp_pattern("-LP$");
    let exports = compound_exports(&deployment, access(chain, unwrapper)).unwrap();

    let tvl = exports.tvl(&TvlRequest::at(1_700_000_000)).await.unwrap();

    // 7 of 14 LP units: half of each reserve
    assert_eq!(tvl.get(&key(USDC)), Some(&BigDecimal::from(2_500)));
    assert_eq!(tvl.get(&key(WBNB)), Some(&BigDecimal::from(55)));
    assert!(!tvl.contains_key(&key(CAKE_LP)));
}

#[tokio::test]
async fn test_rugged_market_fails_whole_call() {
    let chain = Arc::new(chain().failing(CUSDC));
    let exports = compound_exports(&deployment(), access(chain, Arc::new(RecordingUnwrapper::default()))).unwrap();

    let err = exports.tvl(&TvlRequest::at(1_700_000_000)).await.unwrap_err();
    assert!(matches!(err, AdapterError::Contract { target, .. } if target == CUSDC));
}

#[tokio::test]
async fn test_every_key_goes_through_transform() {
    let chain = Arc::new(chain());
    let unwrapper = Arc::new(RecordingUnwrapper::default());
    let deployment = deployment().with_lp_pattern("-LP$");
    let adapter = CompoundV2Adapter::new(&deployment, access(chain, unwrapper))
        .unwrap()
        .with_transform(AddressTransform::new(|address| format!("custom:{:#x}", address)));

    let tvl = adapter.tvl(&TvlRequest::at(1_700_000_000)).await.unwrap();

    assert!(!tvl.is_empty());
    assert!(tvl.keys().all(|k| k.starts_with("custom:0x")));
}

#[tokio::test]
async fn test_address_overrides() {
    let chain = Arc::new(chain());
    let deployment = deployment().with_override(WBNB, "coingecko:binancecoin");
    let exports = compound_exports(&deployment, access(chain, Arc::new(RecordingUnwrapper::default()))).unwrap();

    let tvl = exports.tvl(&TvlRequest::at(1_700_000_000)).await.unwrap();
    assert_eq!(tvl.get("coingecko:binancecoin"), Some(&BigDecimal::from(50)));
    assert!(!tvl.contains_key(&key(WBNB)));
}

#[tokio::test]
async fn test_repeated_calls_are_identical() {
    let chain = Arc::new(chain());
    let exports = compound_exports(&deployment(), access(chain, Arc::new(RecordingUnwrapper::default()))).unwrap();
    let request = TvlRequest::at(1_700_000_000);

    let first = exports.tvl(&request).await.unwrap();
    let second = exports.tvl(&request).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_native_equivalent_without_code_with_lp_pattern() {
    let chain = Arc::new(
        InMemoryChain::new()
            .with_markets(COMPTROLLER, vec![CDAI, VBNB])
            .with_market(CDAI, DAI, U256::from(1_000u64), U256::ZERO)
            .with_market_balances(VBNB, U256::from(50u64), U256::ZERO)
            .with_token(DAI, "DAI", 18),
    );
    let deployment = CompoundDeployment::new("venus", "bsc", COMPTROLLER)
        .with_native(VBNB, Address::ZERO)
        .with_lp_pattern("-LP$");
    let exports = compound_exports(&deployment, access(chain.clone(), Arc::new(RecordingUnwrapper::default()))).unwrap();

    let tvl = exports.tvl(&TvlRequest::at(1_700_000_000)).await.unwrap();

    assert_eq!(tvl.get(&key(DAI)), Some(&BigDecimal::from(1_000)));
    assert_eq!(tvl.get(&key(Address::ZERO)), Some(&BigDecimal::from(50)));
    assert_eq!(chain.calls_to(Address::ZERO, &ViewMethod::Symbol), 0);
}

#[tokio::test]
async fn test_eth_block_pins_ethereum_deployment() {
    let chain = Arc::new(chain());
    let unwrapper = Arc::new(RecordingUnwrapper::default());
    let deployment = CompoundDeployment::new("venus", "ethereum", COMPTROLLER)
        .with_native(VBNB, WBNB)
        .with_lp_pattern("-LP$");
    let exports = compound_exports(&deployment, access(chain, unwrapper.clone())).unwrap();

    let request = TvlRequest {
        timestamp: 1_700_000_000,
        eth_block: Some(18_000_000),
        ..Default::default()
    };
    exports.tvl(&request).await.unwrap();

    let requests = unwrapper.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].1.number, 18_000_000);
    assert_eq!(requests[0].1.chain, "ethereum");
}
