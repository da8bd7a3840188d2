//! Install and activation of the interceptor.
//!
//! Install populates the cache bucket with the shell manifest as one atomic
//! batch. Activation claims control, after which the proxy routes requests
//! through the [`Router`](crate::router::Router) instead of forwarding them.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::try_join_all;
use shellcache_client::resolve;
use shellcache_core::{AppConfig, CacheDb, Error, Network, Request, StoredEntry};
use url::Url;

/// Lifecycle phase of the interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; this version never takes control.
    Redundant,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Parsed => "parsed",
            Phase::Installing => "installing",
            Phase::Installed => "installed",
            Phase::Activating => "activating",
            Phase::Activated => "activated",
            Phase::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

pub struct Lifecycle {
    cache: CacheDb,
    network: Arc<dyn Network>,
    origin: Url,
    cache_name: String,
    shell_manifest: Vec<String>,
    sweep_stale_caches: bool,
    skip_waiting: AtomicBool,
    phase: Mutex<Phase>,
}

impl Lifecycle {
    pub fn new(cache: CacheDb, network: Arc<dyn Network>, origin: Url, config: &AppConfig) -> Self {
        Self {
            cache,
            network,
            origin,
            cache_name: config.cache_name.clone(),
            shell_manifest: config.shell_manifest.clone(),
            sweep_stale_caches: config.sweep_stale_caches,
            skip_waiting: AtomicBool::new(false),
            phase: Mutex::new(Phase::Parsed),
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether requests are currently routed through the interceptor.
    pub fn is_controlling(&self) -> bool {
        self.phase() == Phase::Activated
    }

    /// Whether install asked to activate without waiting for existing pages.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    fn set_phase(&self, phase: Phase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
        tracing::info!(cache_name = %self.cache_name, %phase, "lifecycle transition");
    }

    /// Install, then activate right away if install requested it.
    pub async fn start(&self) -> Result<(), Error> {
        self.install().await?;
        if self.skip_waiting_requested() {
            self.activate().await?;
        }
        Ok(())
    }

    /// Open the bucket and store every shell manifest resource.
    ///
    /// Each resource must come back with a 2xx status. If any fetch fails,
    /// nothing is written and this version becomes redundant.
    pub async fn install(&self) -> Result<usize, Error> {
        if self.phase() != Phase::Parsed {
            return Err(Error::InvalidInput(format!("cannot install from phase {}", self.phase())));
        }
        self.set_phase(Phase::Installing);

        match self.precache().await {
            Ok(stored) => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                tracing::info!(cache_name = %self.cache_name, stored, "shell manifest cached");
                self.set_phase(Phase::Installed);
                Ok(stored)
            }
            Err(e) => {
                tracing::error!(cache_name = %self.cache_name, error = %e, "install failed");
                self.set_phase(Phase::Redundant);
                Err(e)
            }
        }
    }

    async fn precache(&self) -> Result<usize, Error> {
        self.cache.open_bucket(&self.cache_name).await?;

        let requests = self
            .shell_manifest
            .iter()
            .map(|path| {
                resolve(&self.origin, path)
                    .map(Request::get)
                    .map_err(|e| Error::InvalidUrl(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let entries = try_join_all(requests.iter().map(|request| self.fetch_shell_entry(request))).await?;

        self.cache.put_all(entries).await
    }

    async fn fetch_shell_entry(&self, request: &Request) -> Result<StoredEntry, Error> {
        let install_failed = |reason: String| Error::InstallFailed { url: request.url.to_string(), reason };

        let response = self
            .network
            .fetch(request)
            .await
            .map_err(|e| install_failed(e.to_string()))?;

        if !response.is_ok() {
            return Err(install_failed(format!("status {}", response.status)));
        }

        Ok(StoredEntry::new(&self.cache_name, request, response))
    }

    /// Claim control of requests immediately.
    ///
    /// With `sweep_stale_caches` set, buckets from other versions are deleted
    /// first. A failed sweep is logged and activation still completes.
    pub async fn activate(&self) -> Result<(), Error> {
        if self.phase() != Phase::Installed {
            return Err(Error::InvalidInput(format!("cannot activate from phase {}", self.phase())));
        }
        self.set_phase(Phase::Activating);

        if self.sweep_stale_caches {
            match self.cache.delete_buckets_except(&self.cache_name).await {
                Ok(deleted) => {
                    for name in deleted {
                        tracing::info!(bucket = %name, "deleted stale cache bucket");
                    }
                }
                Err(e) => tracing::warn!(cache_name = %self.cache_name, error = %e, "stale cache sweep failed"),
            }
        }

        self.set_phase(Phase::Activated);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedNetwork, get, origin};
    use bytes::Bytes;

    fn shell_network() -> ScriptedNetwork {
        ScriptedNetwork::new()
            .with_body("/", "<html>shell</html>")
            .with_body("/static/manifest.json", "{}")
            .with_body("/icon-192.png", "png192")
            .with_body("/icon-512.png", "png512")
    }

    fn lifecycle(cache: &CacheDb, network: Arc<ScriptedNetwork>, config: &AppConfig) -> Lifecycle {
        Lifecycle::new(cache.clone(), network, origin(), config)
    }

    #[tokio::test]
    async fn test_install_stores_every_manifest_entry() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let network = Arc::new(shell_network());
        let config = AppConfig::default();
        let lifecycle = lifecycle(&cache, network.clone(), &config);

        assert_eq!(lifecycle.install().await.unwrap(), 4);
        assert_eq!(lifecycle.phase(), Phase::Installed);
        assert!(lifecycle.skip_waiting_requested());
        assert!(!lifecycle.is_controlling());

        let icon = cache.match_request(&config.cache_name, &get("/icon-512.png")).await.unwrap().unwrap();
        assert_eq!(icon.body, Bytes::from_static(b"png512"));
        assert_eq!(cache.entry_count(&config.cache_name).await.unwrap(), 4);
        assert_eq!(network.call_count(), 4);
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let network = Arc::new(shell_network());
        network.fail("/icon-192.png");
        let config = AppConfig::default();
        let lifecycle = lifecycle(&cache, network, &config);

        let result = lifecycle.install().await;
        assert!(matches!(result, Err(Error::InstallFailed { ref url, .. }) if url.ends_with("/icon-192.png")));
        assert_eq!(lifecycle.phase(), Phase::Redundant);
        assert!(!lifecycle.skip_waiting_requested());
        assert_eq!(cache.entry_count(&config.cache_name).await.unwrap(), 0);

        let activated = lifecycle.activate().await;
        assert!(matches!(activated, Err(Error::InvalidInput(_))));
        assert!(!lifecycle.is_controlling());
    }

    #[tokio::test]
    async fn test_install_rejects_error_status() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let network = Arc::new(shell_network().with("/icon-512.png", shellcache_core::HttpResponse::new(500, "")));
        let config = AppConfig::default();
        let lifecycle = lifecycle(&cache, network, &config);

        let result = lifecycle.install().await;
        assert!(matches!(result, Err(Error::InstallFailed { ref reason, .. }) if reason == "status 500"));
        assert_eq!(cache.entry_count(&config.cache_name).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_start_installs_and_claims() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let config = AppConfig::default();
        let lifecycle = lifecycle(&cache, Arc::new(shell_network()), &config);
        assert_eq!(lifecycle.phase(), Phase::Parsed);

        lifecycle.start().await.unwrap();

        assert!(lifecycle.is_controlling());
        assert_eq!(lifecycle.phase(), Phase::Activated);
    }

    #[tokio::test]
    async fn test_install_twice_is_rejected() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let config = AppConfig::default();
        let lifecycle = lifecycle(&cache, Arc::new(shell_network()), &config);

        lifecycle.install().await.unwrap();
        assert!(matches!(lifecycle.install().await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_activation_keeps_old_buckets_by_default() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        cache.open_bucket("shell-cache-v0").await.unwrap();
        let config = AppConfig::default();
        let lifecycle = lifecycle(&cache, Arc::new(shell_network()), &config);

        lifecycle.start().await.unwrap();

        assert!(cache.has_bucket("shell-cache-v0").await.unwrap());
        assert!(cache.has_bucket("shell-cache-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_activation_sweeps_stale_buckets_when_enabled() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        cache
            .put("shell-cache-v0", &get("/"), &shellcache_core::HttpResponse::new(200, "old"))
            .await
            .unwrap();
        let config = AppConfig { sweep_stale_caches: true, ..Default::default() };
        let lifecycle = lifecycle(&cache, Arc::new(shell_network()), &config);

        lifecycle.start().await.unwrap();

        assert_eq!(cache.bucket_names().await.unwrap(), vec!["shell-cache-v1"]);
    }

    #[tokio::test]
    async fn test_empty_manifest_installs() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let config = AppConfig { shell_manifest: Vec::new(), ..Default::default() };
        let lifecycle = lifecycle(&cache, Arc::new(ScriptedNetwork::new()), &config);

        lifecycle.start().await.unwrap();
        assert!(cache.has_bucket("shell-cache-v1").await.unwrap());
        assert!(lifecycle.is_controlling());
    }

    #[tokio::test]
    async fn test_failed_sweep_still_activates() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let config = AppConfig { sweep_stale_caches: true, ..Default::default() };
        let lifecycle = lifecycle(&cache, Arc::new(shell_network()), &config);
        lifecycle.install().await.unwrap();

        cache.clone().close().await.unwrap();
        lifecycle.activate().await.unwrap();

        assert_eq!(lifecycle.phase(), Phase::Activated);
        assert!(lifecycle.is_controlling());
    }
}
