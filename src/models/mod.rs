//! Data models for the connection lifecycle facade.
//!
//! This module re-exports all model types used throughout the crate.

pub mod connection;
pub mod query;
pub mod script;

// Re-export commonly used types
pub use connection::{ConnectInfo, DatabaseType, PoolConfig};
pub use query::{
    ARRAY, BIND_IN, BIND_INOUT, BIND_OUT, Bind, BindDir, BindType, BindValue, Binds, DATE,
    ExecuteOptions, NUMBER, OBJECT, OutFormat, ResultSet, Rows, STRING,
};
pub use script::{ScriptEntry, Statement};
