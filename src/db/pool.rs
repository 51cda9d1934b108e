//! Pool management.
//!
//! Owns the single pool handle and the connect info used when no pool exists.
//! Both are shared state behind synchronous locks; no lock is held across an
//! await point.

use crate::db::driver::{Driver, DriverConnection, DriverPool};
use crate::error::{DbError, DbResult};
use crate::models::{ConnectInfo, PoolConfig};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Where an acquired connection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionSource {
    Pool,
    AdHoc,
}

impl std::fmt::Display for ConnectionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pool => write!(f, "pool"),
            Self::AdHoc => write!(f, "ad-hoc"),
        }
    }
}

#[derive(Clone)]
pub struct PoolManager {
    driver: Arc<dyn Driver>,
    pool: Arc<RwLock<Option<Arc<dyn DriverPool>>>>,
    connect_info: Arc<RwLock<Option<ConnectInfo>>>,
}

impl std::fmt::Debug for PoolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolManager")
            .field("driver", &self.driver.name())
            .field("has_pool", &self.get_pool().is_some())
            .field("connect_info", &self.connect_info())
            .finish()
    }
}

impl PoolManager {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self {
            driver,
            pool: Arc::new(RwLock::new(None)),
            connect_info: Arc::new(RwLock::new(None)),
        }
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// Store a copy of `info` for ad-hoc connections, replacing any previous value.
    pub fn set_connect_info(&self, info: &ConnectInfo) {
        let mut slot = self
            .connect_info
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(info.clone());
        debug!(connect_string = %info.masked_connect_string(), "Connect info updated");
    }

    /// Get a copy of the stored connect info.
    pub fn connect_info(&self) -> Option<ConnectInfo> {
        self.connect_info
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Get the current pool handle, if one has been created.
    pub fn get_pool(&self) -> Option<Arc<dyn DriverPool>> {
        self.pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Create a pool through the driver and make it the current one.
    ///
    /// A previous pool handle is replaced without being terminated.
    pub async fn create_pool(&self, config: &PoolConfig) -> DbResult<Arc<dyn DriverPool>> {
        info!(
            driver = self.driver.name(),
            connect_string = %config.connect.masked_connect_string(),
            "Creating connection pool"
        );

        let pool = self.driver.create_pool(config).await?;

        let previous = self
            .pool
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::clone(&pool));
        if previous.is_some() {
            warn!("Replaced an existing connection pool without terminating it");
        }

        info!("Connection pool created");
        Ok(pool)
    }

    /// Terminate the current pool, if any, and clear the handle on success.
    pub async fn terminate_pool(&self) -> DbResult<()> {
        let Some(pool) = self.get_pool() else {
            debug!("No connection pool to terminate");
            return Ok(());
        };

        info!("Terminating connection pool");
        pool.terminate().await?;

        // Clear only if nobody replaced the pool while we were terminating it
        let mut slot = self.pool.write().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, &pool)) {
            *slot = None;
        }
        drop(slot);

        info!("Connection pool terminated");
        Ok(())
    }

    /// Get a raw connection from the pool, or open an ad-hoc one when no pool exists.
    pub async fn acquire(&self) -> DbResult<(Box<dyn DriverConnection>, ConnectionSource)> {
        if let Some(pool) = self.get_pool() {
            let conn = pool.acquire().await?;
            return Ok((conn, ConnectionSource::Pool));
        }

        let info = self.connect_info().ok_or(DbError::NotConfigured)?;
        let conn = self.driver.open_connection(&info).await?;
        Ok((conn, ConnectionSource::AdHoc))
    }
}
