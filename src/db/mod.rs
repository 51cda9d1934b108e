//! Connection lifecycle layer.
//!
//! This module provides:
//! - The driver capability traits the facade runs on
//! - Pool management with an ad-hoc connection fallback
//! - Registries of buildup and teardown scripts
//! - The `Database` facade: acquisition, execution, release, one-shot execution
//! - A sqlx-backed driver for PostgreSQL, MySQL and SQLite

#[macro_use]
mod macros;
pub mod connection;
pub mod driver;
pub mod lifecycle;
mod params;
pub mod pool;
pub mod registry;
mod release;
pub mod sqlx_driver;
pub mod types;

pub use connection::Connection;
pub use driver::{Driver, DriverConnection, DriverPool};
pub use lifecycle::{Completion, Database};
pub use pool::{ConnectionSource, PoolManager};
pub use registry::{ScriptPhase, ScriptRegistry};
pub use sqlx_driver::SqlxDriver;
