use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::adapters::lp::LpClassifier;
use crate::adapters::traits::AdapterError;
use crate::blockchain::abi::check_signature;
use crate::blockchain::ViewMethod;
use crate::models::AddressTransform;

fn default_true() -> bool {
    true
}

/// One Compound-V2 fork deployed on one chain, as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundDeployment {
    /// Protocol name the deployment is registered under, e.g. `"venus"`
    pub name: String,
    pub chain: String,
    pub comptroller: Address,

    /// cToken holding the chain's native asset, which has no `underlying()`
    #[serde(default)]
    pub native_market: Option<Address>,

    /// Wrapped token used to account for the native market
    #[serde(default)]
    pub native_equivalent: Option<Address>,

    /// Regex over underlying token symbols; matches are unwrapped as LP shares
    #[serde(default)]
    pub lp_symbol_pattern: Option<String>,

    /// Present when the deployment is valued through its own price oracle
    #[serde(default)]
    pub usd_pricing: Option<UsdPricing>,

    /// Fixed balance keys for selected token addresses
    #[serde(default)]
    pub address_overrides: HashMap<Address, String>,

    #[serde(default = "default_true")]
    pub timetravel: bool,

    #[serde(default)]
    pub doublecounted: bool,
}

impl CompoundDeployment {
    pub fn new(name: impl Into<String>, chain: impl Into<String>, comptroller: Address) -> Self {
        Self {
            name: name.into(),
            chain: chain.into(),
            comptroller,
            native_market: None,
            native_equivalent: None,
            lp_symbol_pattern: None,
            usd_pricing: None,
            address_overrides: HashMap::new(),
            timetravel: true,
            doublecounted: false,
        }
    }

    pub fn with_native(mut self, market: Address, equivalent: Address) -> Self {
        self.native_market = Some(market);
        self.native_equivalent = Some(equivalent);
        self
    }

    pub fn with_lp_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.lp_symbol_pattern = Some(pattern.into());
        self
    }

    pub fn with_usd_pricing(mut self, pricing: UsdPricing) -> Self {
        self.usd_pricing = Some(pricing);
        self
    }

    pub fn with_override(mut self, token: Address, key: impl Into<String>) -> Self {
        self.address_overrides.insert(token, key.into());
        self
    }

    /// Resolve the native market pair. A native market without an
    /// equivalent cannot be accounted for and is rejected.
    pub fn native(&self) -> Result<Option<NativeMarket>, AdapterError> {
        match (self.native_market, self.native_equivalent) {
            (Some(market), Some(equivalent)) => Ok(Some(NativeMarket { market, equivalent })),
            (Some(_), None) => Err(AdapterError::Config(
                "You need to define the underlying for native cAsset".to_string(),
            )),
            (None, _) => Ok(None),
        }
    }

    pub fn lp_classifier(&self) -> Result<Option<LpClassifier>, AdapterError> {
        self.lp_symbol_pattern
            .as_deref()
            .map(LpClassifier::from_pattern)
            .transpose()
    }

    pub fn transform(&self) -> AddressTransform {
        AddressTransform::with_overrides(&self.chain, self.address_overrides.clone())
    }

    /// Check everything that can be checked without touching the chain.
    pub fn validate(&self) -> Result<(), AdapterError> {
        if self.name.trim().is_empty() {
            return Err(AdapterError::Config("deployment name must not be empty".to_string()));
        }
        if self.chain.trim().is_empty() {
            return Err(AdapterError::Config(format!("deployment {} has no chain", self.name)));
        }
        if self.comptroller == Address::ZERO {
            return Err(AdapterError::Config(format!(
                "deployment {} on {} has a zero comptroller",
                self.name, self.chain
            )));
        }
        self.lp_classifier()?;
        match &self.usd_pricing {
            Some(pricing) => pricing.validate(),
            // the USD pipeline reads decimals, so only the balance pipeline needs an equivalent
            None => self.native().map(|_| ()),
        }
    }

    /// Balance pipeline configuration for one kind of figure.
    pub fn pipeline(&self, kind: BalanceKind) -> Result<CompoundV2Config, AdapterError> {
        Ok(CompoundV2Config {
            comptroller: self.comptroller,
            chain: self.chain.clone(),
            native: self.native()?,
            kind,
            lp_classifier: self.lp_classifier()?,
            transform: self.transform(),
        })
    }
}

/// Oracle access methods, as Solidity signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsdPricing {
    /// Comptroller getter returning the oracle address
    #[serde(default = "UsdPricing::default_oracle_method")]
    pub oracle_method: String,

    /// Oracle getter taking a market and returning its price
    #[serde(default = "UsdPricing::default_price_method")]
    pub price_method: String,
}

impl UsdPricing {
    fn default_oracle_method() -> String {
        "oracle()".to_string()
    }

    fn default_price_method() -> String {
        "getUnderlyingPrice(address)".to_string()
    }

    pub fn validate(&self) -> Result<(), AdapterError> {
        check_signature(&self.oracle_method, "")?;
        check_signature(&self.price_method, "address")
    }
}

impl Default for UsdPricing {
    fn default() -> Self {
        Self {
            oracle_method: Self::default_oracle_method(),
            price_method: Self::default_price_method(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeMarket {
    pub market: Address,
    pub equivalent: Address,
}

/// Which side of the market a figure measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceKind {
    /// `getCash()`: supplied and not lent out
    Cash,
    /// `totalBorrows()`
    Borrowed,
}

impl BalanceKind {
    pub fn method(self) -> ViewMethod {
        match self {
            BalanceKind::Cash => ViewMethod::GetCash,
            BalanceKind::Borrowed => ViewMethod::TotalBorrows,
        }
    }
}

/// Fully resolved inputs of one balance pipeline run.
#[derive(Debug, Clone)]
pub struct CompoundV2Config {
    pub comptroller: Address,
    pub chain: String,
    pub native: Option<NativeMarket>,
    pub kind: BalanceKind,
    pub lp_classifier: Option<LpClassifier>,
    pub transform: AddressTransform,
}
