use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::info;

use crate::adapters::compound_v2::{compound_exports, usd_compound_exports, ChainExports, CompoundDeployment, ProtocolExports};
use crate::adapters::traits::{AdapterError, ChainAccess};

/// Listing entry for one registered protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtocolSummary {
    pub name: String,
    pub timetravel: bool,
    pub doublecounted: bool,
    pub chains: Vec<String>,
    pub denomination: Denomination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Denomination {
    /// Raw underlying token balances
    Tokens,
    /// A single USDT-denominated amount
    Usd,
}

/// Protocol exports by name, built from configured deployments.
#[derive(Debug, Default)]
pub struct AdapterRegistry {
    protocols: BTreeMap<String, (ProtocolExports, Denomination)>,
}

impl AdapterRegistry {
    /// Build exports for every deployment. Deployments sharing a name form
    /// one protocol and must agree on its flags and denomination.
    pub fn from_deployments(
        deployments: &[CompoundDeployment],
        access: &HashMap<String, ChainAccess>,
    ) -> Result<Self, AdapterError> {
        let mut protocols: BTreeMap<String, (ProtocolExports, Denomination)> = BTreeMap::new();

        for deployment in deployments {
            let chain_access = access
                .get(&deployment.chain)
                .cloned()
                .ok_or_else(|| AdapterError::UnsupportedChain(deployment.chain.clone()))?;

            let denomination = match deployment.usd_pricing {
                Some(_) => Denomination::Usd,
                None => Denomination::Tokens,
            };
            let exports: ChainExports = match denomination {
                Denomination::Usd => usd_compound_exports(deployment, chain_access)?,
                Denomination::Tokens => compound_exports(deployment, chain_access)?,
            };

            let (protocol, protocol_denomination) =
                protocols.entry(deployment.name.clone()).or_insert_with(|| {
                    (
                        ProtocolExports {
                            timetravel: deployment.timetravel,
                            doublecounted: deployment.doublecounted,
                            chains: BTreeMap::new(),
                        },
                        denomination,
                    )
                });

            if protocol.timetravel != deployment.timetravel
                || protocol.doublecounted != deployment.doublecounted
                || *protocol_denomination != denomination
            {
                return Err(AdapterError::Config(format!(
                    "deployments of {} disagree on timetravel, doublecounted or pricing",
                    deployment.name
                )));
            }
            if protocol.chains.insert(deployment.chain.clone(), exports).is_some() {
                return Err(AdapterError::Config(format!(
                    "{} is deployed twice on {}",
                    deployment.name, deployment.chain
                )));
            }

            info!(
                protocol = %deployment.name,
                chain = %deployment.chain,
                comptroller = %deployment.comptroller,
                denomination = ?denomination,
                "Registered Compound V2 deployment"
            );
        }

        Ok(Self { protocols })
    }

    pub fn get(&self, name: &str) -> Option<&ProtocolExports> {
        self.protocols.get(name).map(|(exports, _)| exports)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.protocols.keys().map(String::as_str)
    }

    pub fn summaries(&self) -> Vec<ProtocolSummary> {
        self.protocols
            .iter()
            .map(|(name, (exports, denomination))| ProtocolSummary {
                name: name.clone(),
                timetravel: exports.timetravel,
                doublecounted: exports.doublecounted,
                chains: exports.chains.keys().cloned().collect(),
                denomination: *denomination,
            })
            .collect()
    }
}
