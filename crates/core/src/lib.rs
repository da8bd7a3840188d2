//! Core types and shared functionality for shellcache.
//!
//! This crate provides:
//! - Cache storage with SQLite backend (named buckets of stored responses)
//! - Request classification
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod route;

pub use cache::{CacheDb, StoredEntry};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{HttpResponse, Network, Request};
pub use route::{RoutePolicy, Strategy};
