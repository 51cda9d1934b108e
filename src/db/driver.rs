//! Driver capability consumed by the lifecycle facade.
//!
//! The facade never talks to a database directly. It creates pools, opens
//! ad-hoc connections and runs statements only through these traits, so any
//! backend (the bundled sqlx driver, or a recording double in tests) can sit
//! underneath it.

use crate::error::DbResult;
use crate::models::{Binds, ConnectInfo, ExecuteOptions, PoolConfig, ResultSet};
use async_trait::async_trait;
use std::sync::Arc;

/// Entry point of a database driver.
#[async_trait]
pub trait Driver: Send + Sync {
    fn name(&self) -> &str;

    /// Create a connection pool.
    async fn create_pool(&self, config: &PoolConfig) -> DbResult<Arc<dyn DriverPool>>;

    /// Open a standalone connection outside any pool.
    async fn open_connection(&self, info: &ConnectInfo) -> DbResult<Box<dyn DriverConnection>>;
}

/// A pool created by a driver.
#[async_trait]
pub trait DriverPool: Send + Sync + std::fmt::Debug {
    async fn acquire(&self) -> DbResult<Box<dyn DriverConnection>>;

    /// Close the pool and every connection it holds.
    async fn terminate(&self) -> DbResult<()>;
}

/// A live connection, pooled or standalone.
#[async_trait]
pub trait DriverConnection: Send {
    async fn execute(
        &mut self,
        sql: &str,
        binds: &Binds,
        options: &ExecuteOptions,
    ) -> DbResult<ResultSet>;

    async fn commit(&mut self) -> DbResult<()>;

    async fn rollback(&mut self) -> DbResult<()>;

    /// Return the connection to its pool, or close it if standalone.
    async fn release(self: Box<Self>) -> DbResult<()>;
}
