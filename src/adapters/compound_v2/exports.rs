//! Chain and protocol exports built from a deployment record.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::adapters::compound_v2::balances::get_compound_v2_tvl;
use crate::adapters::compound_v2::config::{BalanceKind, CompoundDeployment, CompoundV2Config};
use crate::adapters::compound_v2::usd::CompoundUsdAdapter;
use crate::adapters::traits::{AdapterError, ChainAccess, TvlAdapter, TvlRequest};
use crate::models::{AddressTransform, Balances};

/// `tvl`/`borrowed` accessors for one chain.
pub type ChainExports = Arc<dyn TvlAdapter>;

/// Everything a TVL registry needs to know about one protocol.
#[derive(Clone, Serialize)]
pub struct ProtocolExports {
    /// Historical timestamps can be queried
    pub timetravel: bool,
    /// The figures also count assets reported by another protocol
    pub doublecounted: bool,
    #[serde(serialize_with = "serialize_chain_names")]
    pub chains: BTreeMap<String, ChainExports>,
}

fn serialize_chain_names<S>(chains: &BTreeMap<String, ChainExports>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_seq(chains.keys())
}

impl ProtocolExports {
    pub fn chain(&self, chain: &str) -> Option<&ChainExports> {
        self.chains.get(chain)
    }
}

impl std::fmt::Debug for ProtocolExports {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolExports")
            .field("timetravel", &self.timetravel)
            .field("doublecounted", &self.doublecounted)
            .field("chains", &self.chains.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Raw-balance export with a transform fixed at construction.
#[derive(Clone)]
pub struct CompoundV2Adapter {
    tvl: CompoundV2Config,
    borrowed: CompoundV2Config,
    access: ChainAccess,
}

impl CompoundV2Adapter {
    pub fn new(deployment: &CompoundDeployment, access: ChainAccess) -> Result<Self, AdapterError> {
        deployment.validate()?;
        Ok(Self {
            tvl: deployment.pipeline(BalanceKind::Cash)?,
            borrowed: deployment.pipeline(BalanceKind::Borrowed)?,
            access,
        })
    }

    pub fn with_transform(mut self, transform: AddressTransform) -> Self {
        self.tvl.transform = transform.clone();
        self.borrowed.transform = transform;
        self
    }
}

#[async_trait]
impl TvlAdapter for CompoundV2Adapter {
    fn chain(&self) -> &str {
        &self.tvl.chain
    }

    async fn tvl(&self, request: &TvlRequest) -> Result<Balances, AdapterError> {
        get_compound_v2_tvl(&self.tvl, &self.access, request).await
    }

    async fn borrowed(&self, request: &TvlRequest) -> Result<Balances, AdapterError> {
        get_compound_v2_tvl(&self.borrowed, &self.access, request).await
    }
}

/// Produces the address transform for a chain; may need chain reads of its own.
#[async_trait]
pub trait TransformFactory: Send + Sync {
    async fn transform(&self, chain: &str) -> Result<AddressTransform, AdapterError>;
}

/// Raw-balance export whose transform is rebuilt on every call.
#[derive(Clone)]
pub struct AsyncTransformAdapter {
    inner: CompoundV2Adapter,
    factory: Arc<dyn TransformFactory>,
}

impl AsyncTransformAdapter {
    async fn run(&self, config: &CompoundV2Config, request: &TvlRequest) -> Result<Balances, AdapterError> {
        let transform = self.factory.transform(&config.chain).await?;
        debug!(chain = %config.chain, transform = ?transform, "Built address transform");

        let config = CompoundV2Config {
            transform,
            ..config.clone()
        };
        get_compound_v2_tvl(&config, &self.inner.access, request).await
    }
}

#[async_trait]
impl TvlAdapter for AsyncTransformAdapter {
    fn chain(&self) -> &str {
        self.inner.chain()
    }

    async fn tvl(&self, request: &TvlRequest) -> Result<Balances, AdapterError> {
        self.run(&self.inner.tvl, request).await
    }

    async fn borrowed(&self, request: &TvlRequest) -> Result<Balances, AdapterError> {
        self.run(&self.inner.borrowed, request).await
    }
}

/// Raw-balance exports for one deployment. Configuration errors surface
/// here, before any chain read.
pub fn compound_exports(deployment: &CompoundDeployment, access: ChainAccess) -> Result<ChainExports, AdapterError> {
    Ok(Arc::new(CompoundV2Adapter::new(deployment, access)?))
}

/// Like [`compound_exports`], but `factory` is awaited afresh on each call.
pub fn compound_exports_with_async_transform(
    deployment: &CompoundDeployment,
    access: ChainAccess,
    factory: Arc<dyn TransformFactory>,
) -> Result<ChainExports, AdapterError> {
    Ok(Arc::new(AsyncTransformAdapter {
        inner: CompoundV2Adapter::new(deployment, access)?,
        factory,
    }))
}

/// Protocol-level export of a single chain deployment.
pub fn full_compound_exports(
    deployment: &CompoundDeployment,
    access: ChainAccess,
) -> Result<ProtocolExports, AdapterError> {
    let exports = compound_exports(deployment, access)?;
    Ok(ProtocolExports {
        timetravel: true,
        doublecounted: false,
        chains: BTreeMap::from([(deployment.chain.clone(), exports)]),
    })
}

/// Exports reporting USD value (as USDT units) from the deployment's oracle.
pub fn usd_compound_exports(deployment: &CompoundDeployment, access: ChainAccess) -> Result<ChainExports, AdapterError> {
    Ok(Arc::new(CompoundUsdAdapter::new(deployment.clone(), access)?))
}
