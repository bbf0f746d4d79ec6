//! Storage layer for catalorm.
//!
//! This module wraps a file-backed SQLite database behind a pooled,
//! synchronous `Store`: parameter-bound statements, materialized rows and
//! explicit transactions.

mod config;
mod engine;
mod pool;
mod row;

pub use config::{
    StoreConfig, DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_BUSY_TIMEOUT, DEFAULT_MAX_CONNECTIONS,
    DEFAULT_STORE_NAME,
};
pub use engine::{execute, query, table_exists, Store};
pub use pool::PooledConnection;
pub use row::Row;
