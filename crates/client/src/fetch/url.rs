//! URL canonicalization for the origin and for intercepted request targets.

use url::Url;

/// Error type for URL handling failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("request target must be origin-relative: {0}")]
    NotOriginRelative(String),
}

/// Canonicalize the configured origin.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to http:// if missing (origins are usually local)
/// 3. Lowercase the host
/// 4. Drop path, query and fragment
pub fn origin_url(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("http://{trimmed}") };

    let mut parsed = Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_path("/");
    parsed.set_query(None);
    parsed.set_fragment(None);

    Ok(parsed)
}

/// Resolve an intercepted request target (`/path?query`) against the origin.
///
/// The query string is kept intact since it is part of the cache key.
/// Absolute targets are rejected so a page cannot steer the proxy elsewhere.
pub fn resolve(origin: &Url, target: &str) -> Result<Url, UrlError> {
    if !target.starts_with('/') || target.starts_with("//") {
        return Err(UrlError::NotOriginRelative(target.to_string()));
    }

    let mut url = origin.join(target).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    url.set_fragment(None);
    Ok(url)
}
