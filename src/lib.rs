//! Database connection lifecycle facade.
//!
//! Hands out SQL connections, pooled or ad-hoc, with ordered buildup scripts
//! run after acquisition and teardown scripts run before release, plus a
//! one-shot `simple_execute` that acquires, executes and releases.

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use config::{BuildupFailurePolicy, Config, LifecycleOptions, PoolOptions};
pub use db::{Completion, Connection, Database, Driver, DriverConnection, DriverPool, SqlxDriver};
pub use error::{DbError, DbResult};
pub use models::{
    ARRAY, BIND_IN, BIND_INOUT, BIND_OUT, Bind, BindDir, BindType, BindValue, Binds,
    ConnectInfo, DATE, ExecuteOptions, NUMBER, OBJECT, OutFormat, PoolConfig, ResultSet,
    STRING, Statement,
};
