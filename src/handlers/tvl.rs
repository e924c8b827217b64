use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::adapters::compound_v2::ChainExports;
use crate::adapters::registry::ProtocolSummary;
use crate::adapters::traits::{TvlAdapter, TvlRequest};
use crate::error::AppError;
use crate::handlers::AppState;
use crate::models::Balances;

#[derive(Debug, Default, Deserialize)]
pub struct TvlQuery {
    /// Unix seconds; defaults to now
    pub timestamp: Option<u64>,
    /// Block to read at, skipping timestamp lookup
    pub block: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TvlResponse {
    pub protocol: String,
    pub chain: String,
    pub timestamp: u64,
    pub balances: Balances,
}

#[derive(Debug, Clone, Copy)]
enum Figure {
    Tvl,
    Borrowed,
}

pub async fn list_protocols(State(state): State<AppState>) -> Json<Vec<ProtocolSummary>> {
    Json(state.registry.summaries())
}

pub async fn get_tvl(
    State(state): State<AppState>,
    Path((protocol, chain)): Path<(String, String)>,
    Query(query): Query<TvlQuery>,
) -> Result<Json<TvlResponse>, AppError> {
    compute(&state, protocol, chain, query, Figure::Tvl).await
}

pub async fn get_borrowed(
    State(state): State<AppState>,
    Path((protocol, chain)): Path<(String, String)>,
    Query(query): Query<TvlQuery>,
) -> Result<Json<TvlResponse>, AppError> {
    compute(&state, protocol, chain, query, Figure::Borrowed).await
}

fn lookup(state: &AppState, protocol: &str, chain: &str) -> Result<ChainExports, AppError> {
    let exports = state
        .registry
        .get(protocol)
        .ok_or_else(|| AppError::NotFound(format!("protocol {}", protocol)))?;
    exports
        .chain(chain)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("{} is not deployed on {}", protocol, chain)))
}

async fn compute(
    state: &AppState,
    protocol: String,
    chain: String,
    query: TvlQuery,
    figure: Figure,
) -> Result<Json<TvlResponse>, AppError> {
    let exports = lookup(state, &protocol, &chain)?;

    let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
    let timestamp = query.timestamp.unwrap_or(now);
    if timestamp > now {
        return Err(AppError::ValidationError(format!("timestamp {} is in the future", timestamp)));
    }

    let mut request = TvlRequest::at(timestamp);
    if let Some(block) = query.block {
        request = request.with_chain_block(chain.clone(), block);
    }

    let balances = match figure {
        Figure::Tvl => exports.tvl(&request).await?,
        Figure::Borrowed => exports.borrowed(&request).await?,
    };
    info!(
        protocol = %protocol,
        chain = %chain,
        timestamp,
        figure = ?figure,
        assets = balances.len(),
        "Served figure"
    );

    Ok(Json(TvlResponse {
        protocol,
        chain,
        timestamp,
        balances,
    }))
}
