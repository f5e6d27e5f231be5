//! Persistence layer.
//!
//! Handlers and services only see the [`Storage`] trait. Two backends
//! implement it: [`SqlStore`] (sea-orm over SQLite or PostgreSQL) and
//! [`MemoryStore`] (process-local tables, used by tests and demos).

pub mod entities;
pub mod enums;
pub mod memory_store;
pub mod models;
pub mod schema;
pub mod services;
pub mod sql_store;
pub mod storage;

pub use memory_store::MemoryStore;
pub use sql_store::SqlStore;
pub use storage::{Storage, StoreError};
