//! SQLite-backed cache storage for intercepted responses.
//!
//! This module provides a persistent store of named buckets using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Request-keyed entries using SHA-256 hashing of method and URL
//! - Atomic batch writes for install-time population
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod buckets;
pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::StoredEntry;
