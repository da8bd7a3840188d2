//! shellcache proxy entry point.
//!
//! Loads configuration, installs and activates the interceptor, then serves
//! pages over HTTP/1 until Ctrl-C. Logs go to stderr as JSON.

use std::sync::Arc;

use anyhow::Result;
use shellcache_client::{FetchClient, FetchConfig, origin_url};
use shellcache_core::{AppConfig, CacheDb, Network};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod error;
mod lifecycle;
mod proxy;
mod router;
#[cfg(test)]
mod testing;

use lifecycle::Lifecycle;
use proxy::Proxy;
use router::Router;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let origin = origin_url(&config.origin)?;

    tracing::info!(
        origin = %origin,
        cache_name = %config.cache_name,
        db_path = %config.db_path.display(),
        "starting shellcache"
    );

    let cache = CacheDb::open(&config.db_path).await?;
    let network: Arc<dyn Network> = Arc::new(FetchClient::new(FetchConfig::from(&config))?);

    let lifecycle = Arc::new(Lifecycle::new(cache.clone(), Arc::clone(&network), origin.clone(), &config));
    if let Err(e) = lifecycle.start().await {
        tracing::error!(error = %e, "interceptor not activated; forwarding all requests");
    }

    let router = Arc::new(Router::new(
        config.route_policy(),
        cache.clone(),
        Arc::clone(&network),
        config.cache_name.clone(),
        origin.clone(),
    ));
    let proxy = Arc::new(Proxy::new(origin, lifecycle, router, network, config.max_bytes));

    let listener = TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(listen_addr = %listener.local_addr()?, "proxy listening");

    proxy.serve(listener, shutdown_signal()).await?;
    cache.close().await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
