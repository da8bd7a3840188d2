//! Unified error types for shellcache.
//!
//! Every failure the proxy can surface to a page maps onto one of these
//! variants, and each variant maps onto the HTTP status the page observes.

use tokio_rusqlite::rusqlite;

/// Unified error types for the shellcache proxy.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., activating before install).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Fallback lookup found nothing in the store.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Stored headers could not be encoded or decoded.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// The network fetch itself failed (no response was produced).
    #[error("NETWORK_FAILED: {0}")]
    NetworkFailed(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// A shell manifest resource could not be fetched during install.
    #[error("INSTALL_FAILED: {url}: {reason}")]
    InstallFailed { url: String, reason: String },
}

impl Error {
    /// HTTP status code the proxy answers with when a request ends in this error.
    ///
    /// Network failures and cache misses both read as a failed fetch to the page;
    /// they are told apart only by the gateway status.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidInput(_) | Error::InvalidUrl(_) => 400,
            Error::NetworkFailed(_) | Error::FetchTooLarge(_) => 502,
            Error::CacheMiss(_) => 504,
            Error::InstallFailed { .. } => 503,
            Error::Database(_) | Error::MigrationFailed(_) | Error::CorruptEntry(_) => 500,
        }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::CorruptEntry(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::CacheMiss("http://localhost/".to_string());
        assert!(err.to_string().contains("CACHE_MISS"));
        assert!(err.to_string().contains("http://localhost/"));
    }

    #[test]
    fn test_install_failed_display() {
        let err = Error::InstallFailed { url: "http://localhost/icon-192.png".into(), reason: "status 404".into() };
        assert_eq!(err.to_string(), "INSTALL_FAILED: http://localhost/icon-192.png: status 404");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::NetworkFailed("refused".into()).status_code(), 502);
        assert_eq!(Error::CacheMiss("/".into()).status_code(), 504);
        assert_eq!(Error::InvalidUrl("::".into()).status_code(), 400);
        assert_eq!(Error::MigrationFailed("bad".into()).status_code(), 500);
    }
}
