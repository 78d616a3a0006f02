//! # Repository Module
//!
//! Database repository implementations for Basket.
//!
//! ## Available Repositories
//!
//! - [`kv::KvRepository`] - Key-value reads and upserts

pub mod kv;
