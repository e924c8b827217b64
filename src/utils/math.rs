use alloy::primitives::U256;
use bigdecimal::num_bigint::{BigInt, Sign};
use bigdecimal::BigDecimal;

/// Total decimal places of a Compound oracle price before the asset's own
/// decimals are taken off.
pub const ORACLE_PRICE_DECIMALS: i64 = 36;

/// Convert an on-chain integer into an exact decimal.
pub fn u256_to_decimal(value: U256) -> BigDecimal {
    BigDecimal::new(u256_to_bigint(value), 0)
}

pub fn u256_to_bigint(value: U256) -> BigInt {
    BigInt::from_bytes_be(Sign::Plus, &value.to_be_bytes::<32>())
}

/// `raw / 10^decimals`, exact.
pub fn shift_decimals(raw: U256, decimals: u8) -> BigDecimal {
    BigDecimal::new(u256_to_bigint(raw), i64::from(decimals))
}

/// Plain USD-per-unit price from a Compound-style oracle answer, which is
/// scaled by `10^(36 - decimals)`.
pub fn normalize_oracle_price(raw_price: U256, decimals: u8) -> BigDecimal {
    BigDecimal::new(
        u256_to_bigint(raw_price),
        ORACLE_PRICE_DECIMALS - i64::from(decimals),
    )
}

/// USD value of a raw market balance given its oracle price.
pub fn locked_usd(raw_balance: U256, decimals: u8, raw_price: U256) -> BigDecimal {
    shift_decimals(raw_balance, decimals) * normalize_oracle_price(raw_price, decimals)
}
