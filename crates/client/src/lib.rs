//! Client code for shellcache.
//!
//! This crate provides the HTTP fetch pipeline the proxy uses to reach the
//! application origin, plus URL helpers shared by the server.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, is_hop_by_hop, origin_url, resolve};
