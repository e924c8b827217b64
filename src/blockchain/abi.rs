//! Typed view calls and their decoded outputs.
//!
//! Every read the pipelines issue is described by a [`ViewMethod`]; encoding
//! to calldata and decoding of the returned bytes both happen here, so the
//! rest of the crate only ever sees [`CallOutput`] values.

use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use alloy::sol_types::{SolCall, SolValue};
use std::fmt;

use crate::adapters::traits::AdapterError;
use crate::blockchain::contracts::{ICToken, IComptroller, IERC20Metadata, IUniswapV2Pair};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewMethod {
    GetAllMarkets,
    Underlying,
    GetCash,
    TotalBorrows,
    Symbol,
    Decimals,
    TotalSupply,
    Token0,
    Token1,
    GetReserves,
    /// Zero-argument getter returning an address, e.g. `oracle()`
    AddressGetter(String),
    /// Single-address-argument getter returning a uint, e.g. `getUnderlyingPrice(address)`
    PriceOf { signature: String, asset: Address },
}

impl fmt::Display for ViewMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewMethod::GetAllMarkets => write!(f, "getAllMarkets()"),
            ViewMethod::Underlying => write!(f, "underlying()"),
            ViewMethod::GetCash => write!(f, "getCash()"),
            ViewMethod::TotalBorrows => write!(f, "totalBorrows()"),
            ViewMethod::Symbol => write!(f, "symbol()"),
            ViewMethod::Decimals => write!(f, "decimals()"),
            ViewMethod::TotalSupply => write!(f, "totalSupply()"),
            ViewMethod::Token0 => write!(f, "token0()"),
            ViewMethod::Token1 => write!(f, "token1()"),
            ViewMethod::GetReserves => write!(f, "getReserves()"),
            ViewMethod::AddressGetter(signature) => write!(f, "{}", signature),
            ViewMethod::PriceOf { signature, asset } => write!(f, "{} [{}]", signature, asset),
        }
    }
}

/// One read against one contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContractCall {
    pub target: Address,
    pub method: ViewMethod,
}

impl ContractCall {
    pub fn new(target: Address, method: ViewMethod) -> Self {
        Self { target, method }
    }
}

/// Decoded return value of a [`ContractCall`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutput {
    Address(Address),
    Addresses(Vec<Address>),
    Uint(U256),
    Text(String),
    Reserves { reserve0: U256, reserve1: U256 },
}

impl CallOutput {
    pub fn into_address(self) -> Result<Address, AdapterError> {
        match self {
            CallOutput::Address(address) => Ok(address),
            other => Err(mismatch("address", &other)),
        }
    }

    pub fn into_addresses(self) -> Result<Vec<Address>, AdapterError> {
        match self {
            CallOutput::Addresses(addresses) => Ok(addresses),
            other => Err(mismatch("address[]", &other)),
        }
    }

    pub fn into_uint(self) -> Result<U256, AdapterError> {
        match self {
            CallOutput::Uint(value) => Ok(value),
            other => Err(mismatch("uint256", &other)),
        }
    }

    pub fn into_text(self) -> Result<String, AdapterError> {
        match self {
            CallOutput::Text(text) => Ok(text),
            other => Err(mismatch("string", &other)),
        }
    }

    pub fn into_reserves(self) -> Result<(U256, U256), AdapterError> {
        match self {
            CallOutput::Reserves { reserve0, reserve1 } => Ok((reserve0, reserve1)),
            other => Err(mismatch("reserves", &other)),
        }
    }

    /// Token decimals, rejecting anything that does not fit a `uint8`.
    pub fn into_decimals(self) -> Result<u8, AdapterError> {
        let value = self.into_uint()?;
        u8::try_from(value)
            .map_err(|_| AdapterError::InvalidData(format!("decimals out of range: {}", value)))
    }
}

fn mismatch(expected: &str, got: &CallOutput) -> AdapterError {
    AdapterError::InvalidData(format!("expected {} output, got {:?}", expected, got))
}

/// Batched read result, tagged with the target it was issued against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutput {
    pub target: Address,
    pub output: CallOutput,
}

/// First four bytes of the keccak hash of a Solidity signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Validate a signature used for a dynamically dispatched method.
pub fn check_signature(signature: &str, expected_args: &str) -> Result<(), AdapterError> {
    let valid = signature
        .split_once('(')
        .map(|(name, rest)| {
            !name.is_empty()
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                && rest == format!("{})", expected_args)
        })
        .unwrap_or(false);

    if valid {
        Ok(())
    } else {
        Err(AdapterError::Config(format!(
            "method signature `{}` must look like `name({})`",
            signature, expected_args
        )))
    }
}

pub fn encode(method: &ViewMethod) -> Bytes {
    let data = match method {
        ViewMethod::GetAllMarkets => IComptroller::getAllMarketsCall {}.abi_encode(),
        ViewMethod::Underlying => ICToken::underlyingCall {}.abi_encode(),
        ViewMethod::GetCash => ICToken::getCashCall {}.abi_encode(),
        ViewMethod::TotalBorrows => ICToken::totalBorrowsCall {}.abi_encode(),
        ViewMethod::Symbol => IERC20Metadata::symbolCall {}.abi_encode(),
        ViewMethod::Decimals => IERC20Metadata::decimalsCall {}.abi_encode(),
        ViewMethod::TotalSupply => IERC20Metadata::totalSupplyCall {}.abi_encode(),
        ViewMethod::Token0 => IUniswapV2Pair::token0Call {}.abi_encode(),
        ViewMethod::Token1 => IUniswapV2Pair::token1Call {}.abi_encode(),
        ViewMethod::GetReserves => IUniswapV2Pair::getReservesCall {}.abi_encode(),
        ViewMethod::AddressGetter(signature) => selector(signature).to_vec(),
        ViewMethod::PriceOf { signature, asset } => {
            let mut data = selector(signature).to_vec();
            data.extend_from_slice(&asset.abi_encode());
            data
        }
    };
    Bytes::from(data)
}

pub fn decode(target: Address, method: &ViewMethod, data: &[u8]) -> Result<CallOutput, AdapterError> {
    let fail = |e: alloy::sol_types::Error| AdapterError::Contract {
        target,
        message: format!("failed to decode {} output: {}", method, e),
    };

    let output = match method {
        ViewMethod::GetAllMarkets => CallOutput::Addresses(
            IComptroller::getAllMarketsCall::abi_decode_returns(data, true).map_err(fail)?._0,
        ),
        ViewMethod::Underlying => CallOutput::Address(
            ICToken::underlyingCall::abi_decode_returns(data, true).map_err(fail)?._0,
        ),
        ViewMethod::GetCash => CallOutput::Uint(
            ICToken::getCashCall::abi_decode_returns(data, true).map_err(fail)?._0,
        ),
        ViewMethod::TotalBorrows => CallOutput::Uint(
            ICToken::totalBorrowsCall::abi_decode_returns(data, true).map_err(fail)?._0,
        ),
        ViewMethod::Symbol => CallOutput::Text(decode_symbol(data).map_err(fail)?),
        ViewMethod::Decimals => CallOutput::Uint(U256::from(
            IERC20Metadata::decimalsCall::abi_decode_returns(data, true).map_err(fail)?._0,
        )),
        ViewMethod::TotalSupply => CallOutput::Uint(
            IERC20Metadata::totalSupplyCall::abi_decode_returns(data, true).map_err(fail)?._0,
        ),
        ViewMethod::Token0 => CallOutput::Address(
            IUniswapV2Pair::token0Call::abi_decode_returns(data, true).map_err(fail)?._0,
        ),
        ViewMethod::Token1 => CallOutput::Address(
            IUniswapV2Pair::token1Call::abi_decode_returns(data, true).map_err(fail)?._0,
        ),
        ViewMethod::GetReserves => {
            let reserves = IUniswapV2Pair::getReservesCall::abi_decode_returns(data, true).map_err(fail)?;
            CallOutput::Reserves {
                reserve0: reserves.reserve0,
                reserve1: reserves.reserve1,
            }
        }
        ViewMethod::AddressGetter(_) => {
            CallOutput::Address(Address::abi_decode(data, true).map_err(fail)?)
        }
        ViewMethod::PriceOf { .. } => CallOutput::Uint(U256::abi_decode(data, true).map_err(fail)?),
    };
    Ok(output)
}

// Some older tokens (MKR, SAI) return `bytes32` instead of `string`.
fn decode_symbol(data: &[u8]) -> Result<String, alloy::sol_types::Error> {
    match IERC20Metadata::symbolCall::abi_decode_returns(data, true) {
        Ok(symbol) => Ok(symbol._0),
        Err(e) if data.len() == 32 => {
            let raw = B256::abi_decode(data, true).map_err(|_| e)?;
            let trimmed: Vec<u8> = raw.iter().copied().take_while(|b| *b != 0).collect();
            Ok(String::from_utf8_lossy(&trimmed).into_owned())
        }
        Err(e) => Err(e),
    }
}
