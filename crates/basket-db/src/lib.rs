//! # basket-db: Persistence Layer for Basket
//!
//! This crate provides the durable key-value stores the cart mirrors into.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Basket Data Flow                                 │
//! │                                                                         │
//! │  SnapshotWriter (basket-state)                                         │
//! │       │  set("@GoMarketPlace:cartProducts", "[...]")                   │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     basket-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ KeyValueStore │    │   Database    │    │  Migrations  │  │   │
//! │  │   │  (store.rs)   │◄───│   (pool.rs)   │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ MemoryStore   │    │ KvRepository  │    │ 001_kv.sql   │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - The `KeyValueStore` seam and the in-memory implementation
//! - [`pool`] - SQLite connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`repository`] - Repository implementations
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use basket_db::{Database, DbConfig, KeyValueStore};
//!
//! let db = Database::new(DbConfig::new("path/to/basket.db")).await?;
//! db.set("@GoMarketPlace:cartProducts", "[]").await?;
//! assert_eq!(db.get("@GoMarketPlace:cartProducts").await?.as_deref(), Some("[]"));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::kv::KvRepository;
pub use store::{KeyValueStore, MemoryStore};
