//! Request-keyed cache key generation.

use sha2::{Digest, Sha256};

/// Compute the store key for a request.
///
/// Only the method and the full URL take part, so two requests for the same
/// URL share one entry regardless of their headers.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_stability() {
        let hash1 = compute_request_key("GET", "http://localhost:5000/");
        let hash2 = compute_request_key("GET", "http://localhost:5000/");
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_method_case() {
        assert_eq!(
            compute_request_key("get", "http://localhost:5000/"),
            compute_request_key("GET", "http://localhost:5000/")
        );
    }

    #[test]
    fn test_hash_query_is_significant() {
        let a = compute_request_key("GET", "http://localhost:5000/responses/1.mp3");
        let b = compute_request_key("GET", "http://localhost:5000/responses/1.mp3?v=2");
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_format() {
        let hash = compute_request_key("GET", "http://localhost:5000/");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
