use alloy::primitives::Address;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Maps a bare token address to the key it is recorded under in
/// [`Balances`](crate::models::Balances).
///
/// Must be deterministic for the duration of one `tvl`/`borrowed` call.
#[derive(Clone)]
pub struct AddressTransform {
    label: &'static str,
    inner: Arc<dyn Fn(Address) -> String + Send + Sync>,
}

impl AddressTransform {
    pub fn new(f: impl Fn(Address) -> String + Send + Sync + 'static) -> Self {
        Self {
            label: "custom",
            inner: Arc::new(f),
        }
    }

    /// Lower-case hex address with no chain qualifier.
    pub fn identity() -> Self {
        Self {
            label: "identity",
            inner: Arc::new(|address| format!("{:#x}", address)),
        }
    }

    /// `"{chain}:{address}"`, the default key format.
    pub fn chain_prefixed(chain: &str) -> Self {
        let chain = chain.to_string();
        Self {
            label: "chain_prefixed",
            inner: Arc::new(move |address| format!("{}:{:#x}", chain, address)),
        }
    }

    /// Replace selected addresses with fixed keys (typically a bridged token
    /// mapped onto its canonical counterpart); every other address falls back
    /// to [`AddressTransform::chain_prefixed`].
    pub fn with_overrides(chain: &str, overrides: HashMap<Address, String>) -> Self {
        if overrides.is_empty() {
            return Self::chain_prefixed(chain);
        }

        let fallback = Self::chain_prefixed(chain);
        Self {
            label: "overrides",
            inner: Arc::new(move |address| match overrides.get(&address) {
                Some(key) => key.clone(),
                None => fallback.apply(address),
            }),
        }
    }

    pub fn apply(&self, address: Address) -> String {
        (self.inner)(address)
    }
}

impl fmt::Debug for AddressTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressTransform")
            .field("kind", &self.label)
            .finish()
    }
}
