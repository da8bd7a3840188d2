//! Per-request strategy dispatch.
//!
//! The [`RoutePolicy`] picks a strategy; this module carries it out against
//! the cache bucket and the network. There are no retries: each branch makes
//! at most one network attempt and one fallback lookup.

use std::sync::Arc;

use shellcache_core::{CacheDb, Error, HttpResponse, Network, Request, RoutePolicy, Strategy};
use url::Url;

/// Partial responses are never stored; they do not represent the whole resource.
const PARTIAL_CONTENT: u16 = 206;

pub struct Router {
    policy: RoutePolicy,
    cache: CacheDb,
    network: Arc<dyn Network>,
    cache_name: String,
    root_url: Url,
}

impl Router {
    /// `root_url` is the navigation root served as the offline fallback.
    pub fn new(
        policy: RoutePolicy, cache: CacheDb, network: Arc<dyn Network>, cache_name: impl Into<String>, root_url: Url,
    ) -> Self {
        Self { policy, cache, network, cache_name: cache_name.into(), root_url }
    }

    pub fn strategy_for(&self, request: &Request) -> Strategy {
        self.policy.classify(&request.method, request.path(), request.navigate)
    }

    /// Serve an intercepted request.
    ///
    /// Returns `Ok(None)` when the router declines the request; the caller
    /// then forwards it to the network untouched.
    pub async fn handle(&self, request: &Request) -> Result<Option<HttpResponse>, Error> {
        let strategy = self.strategy_for(request);
        tracing::debug!(method = %request.method, url = %request.url, strategy = strategy.as_str(), "routing request");

        let response = match strategy {
            Strategy::PassThrough => return Ok(None),
            Strategy::CacheFirst | Strategy::CacheThenNetwork => self.cache_first(request).await?,
            Strategy::NetworkFirstWriteThrough => self.network_first_write_through(request).await?,
            Strategy::NetworkFirstOffline => self.network_first_offline(request).await?,
        };

        Ok(Some(response))
    }

    /// Stored copy if present, otherwise the network response. Nothing is written back.
    async fn cache_first(&self, request: &Request) -> Result<HttpResponse, Error> {
        if let Some(hit) = self.cache.match_request(&self.cache_name, request).await? {
            tracing::debug!(url = %request.url, "cache hit");
            return Ok(hit);
        }
        self.network.fetch(request).await
    }

    /// Network response, written to the bucket on the way out; stored copy if the network fails.
    async fn network_first_write_through(&self, request: &Request) -> Result<HttpResponse, Error> {
        match self.network.fetch(request).await {
            Ok(response) => {
                let stored = response.clone();
                if stored.status == PARTIAL_CONTENT {
                    tracing::debug!(url = %request.url, "not storing partial response");
                } else if let Err(e) = self.cache.put(&self.cache_name, request, &stored).await {
                    tracing::warn!(url = %request.url, error = %e, "write-through failed");
                }
                Ok(response)
            }
            Err(err) => {
                tracing::warn!(url = %request.url, error = %err, "network failed, trying stored copy");
                self.cache.match_request(&self.cache_name, request).await?.ok_or(err)
            }
        }
    }

    /// Network response; the stored root page if the network fails.
    async fn network_first_offline(&self, request: &Request) -> Result<HttpResponse, Error> {
        match self.network.fetch(request).await {
            Ok(response) => Ok(response),
            Err(err) => {
                tracing::warn!(url = %request.url, error = %err, "network failed, serving offline root");
                let root = request.with_url(self.root_url.clone());
                self.cache
                    .match_request(&self.cache_name, &root)
                    .await?
                    .ok_or_else(|| Error::CacheMiss(root.url.to_string()))
            }
        }
    }
}
