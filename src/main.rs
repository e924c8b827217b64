use compound_tvl::{
    adapters::{AdapterRegistry, ChainAccess, UniswapV2Unwrapper},
    blockchain::{EthereumClient, RpcBlockResolver, RpcContractReader},
    config::Settings,
    handlers::{create_routes, AppState},
    utils::init_logging,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    let settings = Settings::new()?;
    init_logging(&settings.logging)?;
    info!("Starting compound-tvl");

    let mut reader = RpcContractReader::new();
    let mut resolver = RpcBlockResolver::new();
    for (chain, chain_settings) in &settings.chains {
        let client = EthereumClient::new(chain, &chain_settings.rpc_url)?;
        if let Err(e) = client.test_connection().await {
            warn!(chain = %chain, error = %e, "RPC endpoint not reachable at startup");
        }
        reader = reader.with_chain(client.clone(), chain_settings.multicall);
        resolver = resolver.with_chain(client);
    }

    let reader = Arc::new(reader);
    let access = ChainAccess::new(
        reader.clone(),
        Arc::new(resolver),
        Arc::new(UniswapV2Unwrapper::new(reader.clone())),
    );
    let per_chain: HashMap<String, ChainAccess> = reader
        .chains()
        .map(|chain| (chain.to_string(), access.clone()))
        .collect();

    let registry = AdapterRegistry::from_deployments(&settings.deployments, &per_chain)?;
    let state = AppState {
        registry: Arc::new(registry),
    };

    let host: std::net::IpAddr = settings.server.host.parse()?;
    let addr = SocketAddr::new(host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(address = %addr, "API server listening");
    info!("  GET /health");
    info!("  GET /protocols");
    info!("  GET /protocols/{{name}}/{{chain}}/tvl?timestamp=");
    info!("  GET /protocols/{{name}}/{{chain}}/borrowed?timestamp=");

    axum::serve(listener, create_routes(state)).await?;
    Ok(())
}
