//! Request classification.
//!
//! [`RoutePolicy::classify`] is a pure function of method, path and
//! navigation mode. It holds no mutable state, so it can be tested without a
//! store or a network.

/// Navigation root, also the offline fallback target.
pub const ROOT_PATH: &str = "/";

/// Caching strategy chosen for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Not intercepted. Non-GET requests go straight to the network.
    PassThrough,
    /// Shell or static asset: store first, network on miss, no write-back.
    CacheFirst,
    /// Media response: network first, written through to the store, store on failure.
    NetworkFirstWriteThrough,
    /// Page navigation: network first, stored root page on failure.
    NetworkFirstOffline,
    /// Anything else: store first, network on miss, no write-back.
    CacheThenNetwork,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::PassThrough => "pass_through",
            Strategy::CacheFirst => "cache_first",
            Strategy::NetworkFirstWriteThrough => "network_first_write_through",
            Strategy::NetworkFirstOffline => "network_first_offline",
            Strategy::CacheThenNetwork => "cache_then_network",
        }
    }
}

/// URL shapes that decide the strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePolicy {
    pub shell_manifest: Vec<String>,
    pub static_prefix: String,
    pub media_prefix: String,
}

impl RoutePolicy {
    pub fn new(shell_manifest: Vec<String>, static_prefix: impl Into<String>, media_prefix: impl Into<String>) -> Self {
        Self { shell_manifest, static_prefix: static_prefix.into(), media_prefix: media_prefix.into() }
    }

    /// Pick the strategy for a request. First match wins:
    ///
    /// 1. manifest path or static prefix
    /// 2. media prefix
    /// 3. navigation or root path
    /// 4. everything else
    pub fn classify(&self, method: &str, path: &str, navigate: bool) -> Strategy {
        if !method.eq_ignore_ascii_case("GET") {
            return Strategy::PassThrough;
        }

        if self.is_shell(path) || path.starts_with(&self.static_prefix) {
            Strategy::CacheFirst
        } else if path.starts_with(&self.media_prefix) {
            Strategy::NetworkFirstWriteThrough
        } else if navigate || path == ROOT_PATH {
            Strategy::NetworkFirstOffline
        } else {
            Strategy::CacheThenNetwork
        }
    }

    pub fn is_shell(&self, path: &str) -> bool {
        self.shell_manifest.iter().any(|entry| entry == path)
    }
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self::new(
            vec![
                "/".into(),
                "/static/manifest.json".into(),
                "/icon-192.png".into(),
                "/icon-512.png".into(),
            ],
            "/static/",
            "/responses/",
        )
    }
}
