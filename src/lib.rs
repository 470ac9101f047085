//! # Schemavault
//!
//! A registry for versioned OpenAPI, JSON and YAML schema documents, usable
//! both as a standalone binary and as a library.
//!
//! Documents are scoped to an application and an optional service. Every
//! upload to a scope gets the next version number (1, 2, 3, ...), its bytes
//! go to a file tree and its metadata to a SQLite catalog.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! schemavault = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::path::Path;
//! use std::sync::Arc;
//! use schemavault::blob::ContentStore;
//! use schemavault::registry::Registry;
//! use schemavault::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/registry.db")?;
//! store.initialize()?;
//!
//! let registry = Registry::new(
//!     Arc::new(store),
//!     ContentStore::new(Path::new("./data/schemas")),
//! );
//! let receipt = registry.ingest("shop", Some("billing"), "openapi.yaml", bytes).await?;
//! let latest = registry.resolve("shop", Some("billing"), "latest").await?;
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes the CLI module and binary. Disable with `default-features = false`.

pub mod blob;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod registry;
pub mod server;
pub mod store;
pub mod types;
