//! Connection lifecycle facade.
//!
//! `Database` ties the pool manager and the script registry together:
//! - acquisition runs every buildup script, in order, before the caller sees the connection
//! - release runs every teardown script, in order, then returns or closes the connection
//! - `simple_execute` does acquire, execute and a deferred release in one call
//!
//! Every asynchronous operation has a `*_with` variant taking an optional
//! completion observer. The observer runs exactly once, before the returned
//! future resolves, with the same outcome the future resolves to.

use crate::config::{BuildupFailurePolicy, LifecycleOptions};
use crate::db::connection::Connection;
use crate::db::driver::{Driver, DriverPool};
use crate::db::pool::PoolManager;
use crate::db::registry::{ScriptPhase, ScriptRegistry};
use crate::db::release::{self, ReleaseTracker};
use crate::error::{DbError, DbResult};
use crate::models::{Binds, ConnectInfo, ExecuteOptions, PoolConfig, ResultSet, Statement};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

/// Completion observer for an asynchronous operation.
pub type Completion<T> = Box<dyn FnOnce(Result<&T, &DbError>) + Send>;

/// Hand `result` to the observer, if any, then give it back.
fn deliver<T>(result: DbResult<T>, on_complete: Option<Completion<T>>) -> DbResult<T> {
    if let Some(callback) = on_complete {
        callback(result.as_ref());
    }
    result
}

/// Process-scoped entry point: one pool, one set of lifecycle scripts.
///
/// Cloning is cheap and every clone shares the same state.
#[derive(Debug, Clone)]
pub struct Database {
    pools: PoolManager,
    scripts: ScriptRegistry,
    options: LifecycleOptions,
    releases: ReleaseTracker,
}

impl Database {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self::with_options(driver, LifecycleOptions::default())
    }

    pub fn with_options(driver: Arc<dyn Driver>, options: LifecycleOptions) -> Self {
        Self {
            pools: PoolManager::new(driver),
            scripts: ScriptRegistry::new(),
            options,
            releases: ReleaseTracker::default(),
        }
    }

    pub fn options(&self) -> LifecycleOptions {
        self.options
    }

    pub fn scripts(&self) -> &ScriptRegistry {
        &self.scripts
    }

    // -------------------------------------------------------------------------
    // Pool management
    // -------------------------------------------------------------------------

    /// Store a copy of the credentials used when no pool exists.
    pub fn set_connect_info(&self, info: &ConnectInfo) {
        self.pools.set_connect_info(info);
    }

    pub async fn create_pool(&self, config: &PoolConfig) -> DbResult<Arc<dyn DriverPool>> {
        self.create_pool_with(config, None).await
    }

    pub async fn create_pool_with(
        &self,
        config: &PoolConfig,
        on_complete: Option<Completion<Arc<dyn DriverPool>>>,
    ) -> DbResult<Arc<dyn DriverPool>> {
        let result = self.pools.create_pool(config).await;
        deliver(result, on_complete)
    }

    /// Terminate the pool once every deferred release has finished.
    ///
    /// Succeeds without touching the driver when no pool exists. The pool
    /// handle is cleared only when termination succeeds.
    pub async fn terminate_pool(&self) -> DbResult<()> {
        self.terminate_pool_with(None).await
    }

    pub async fn terminate_pool_with(&self, on_complete: Option<Completion<()>>) -> DbResult<()> {
        self.releases.wait_idle().await;
        let result = self.pools.terminate_pool().await;
        deliver(result, on_complete)
    }

    pub fn get_pool(&self) -> Option<Arc<dyn DriverPool>> {
        self.pools.get_pool()
    }

    // -------------------------------------------------------------------------
    // Lifecycle scripts
    // -------------------------------------------------------------------------

    pub fn add_buildup_sql(&self, statement: impl Into<Statement>) {
        self.scripts.add_buildup(statement);
    }

    pub fn add_teardown_sql(&self, statement: impl Into<Statement>) {
        self.scripts.add_teardown(statement);
    }

    // -------------------------------------------------------------------------
    // Acquisition, execution, release
    // -------------------------------------------------------------------------

    /// Acquire a connection and run every buildup script against it.
    ///
    /// Uses the pool when one exists, an ad-hoc connection otherwise. A
    /// failing buildup script aborts acquisition with that script's error;
    /// see [`BuildupFailurePolicy`] for what happens to the connection.
    pub async fn get_connection(&self) -> DbResult<Connection> {
        self.get_connection_with(None).await
    }

    pub async fn get_connection_with(
        &self,
        on_complete: Option<Completion<Connection>>,
    ) -> DbResult<Connection> {
        let result = self.acquire().await;
        deliver(result, on_complete)
    }

    async fn acquire(&self) -> DbResult<Connection> {
        let (raw, source) = self.pools.acquire().await?;
        let mut conn = Connection::new(raw, source);
        debug!(connection_id = %conn.id(), source = %source, "Connection acquired");

        let buildup = self.scripts.scripts(ScriptPhase::Buildup);
        if let Err(e) = conn.run_scripts(ScriptPhase::Buildup, &buildup).await {
            let connection_id = conn.id();
            match self.options.on_buildup_failure {
                BuildupFailurePolicy::Release => {
                    warn!(
                        connection_id = %connection_id,
                        error = %e,
                        "Buildup script failed, releasing connection"
                    );
                    if let Err(release_err) = conn.close().await {
                        error!(
                            connection_id = %connection_id,
                            error = %release_err,
                            "Failed to release connection after buildup failure"
                        );
                    }
                }
                BuildupFailurePolicy::Retain => {
                    warn!(
                        connection_id = %connection_id,
                        error = %e,
                        "Buildup script failed, connection not released"
                    );
                    drop(conn);
                }
            }
            return Err(e);
        }

        Ok(conn)
    }

    /// Run one statement on an acquired connection. Driver errors pass through unchanged.
    pub async fn execute(
        &self,
        sql: &str,
        binds: &Binds,
        options: &ExecuteOptions,
        conn: &mut Connection,
    ) -> DbResult<ResultSet> {
        self.execute_with(sql, binds, options, conn, None).await
    }

    pub async fn execute_with(
        &self,
        sql: &str,
        binds: &Binds,
        options: &ExecuteOptions,
        conn: &mut Connection,
        on_complete: Option<Completion<ResultSet>>,
    ) -> DbResult<ResultSet> {
        let start = Instant::now();
        debug!(
            connection_id = %conn.id(),
            sql = %sql,
            binds = binds.len(),
            "Executing statement"
        );

        let result = conn.run(sql, binds, options).await;
        match &result {
            Ok(rs) => debug!(
                connection_id = %conn.id(),
                rows = rs.row_count(),
                rows_affected = ?rs.rows_affected,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Statement executed"
            ),
            Err(e) => debug!(connection_id = %conn.id(), error = %e, "Statement failed"),
        }
        deliver(result, on_complete)
    }

    /// Run every teardown script, then return the connection to the pool or close it.
    ///
    /// Failures are logged, never returned. A failing teardown script stops
    /// the remaining ones, but the physical release still happens.
    pub async fn release_connection(&self, conn: Connection) {
        let teardown = self.scripts.scripts(ScriptPhase::Teardown);
        release::release(conn, &teardown).await;
    }

    /// Schedule [`release_connection`](Self::release_connection) as a background task.
    ///
    /// On a current-thread runtime the task cannot start until the calling
    /// task yields, so the caller's continuation runs before any teardown.
    /// On a multi-thread runtime another worker may pick the task up at once:
    /// teardown can then overlap the caller, and may finish before the
    /// caller's future resolves.
    pub fn defer_release(&self, conn: Connection) {
        let ticket = self.releases.start();
        let db = self.clone();
        tokio::spawn(async move {
            let _ticket = ticket;
            db.release_connection(conn).await;
        });
    }

    /// Resolve once every deferred release has finished.
    pub async fn wait_for_releases(&self) {
        self.releases.wait_idle().await;
    }

    // -------------------------------------------------------------------------
    // One-shot execution
    // -------------------------------------------------------------------------

    /// Acquire, execute and release in one call.
    ///
    /// `autoCommit` and `isAutoCommit` each default to true when unset. The
    /// release is scheduled on every path that acquired a connection.
    ///
    /// The completion observer always runs before the release is scheduled.
    /// A caller that only awaits the future sees the outcome before teardown
    /// starts only on a current-thread runtime; see
    /// [`defer_release`](Self::defer_release).
    pub async fn simple_execute(
        &self,
        sql: &str,
        binds: &Binds,
        options: ExecuteOptions,
    ) -> DbResult<ResultSet> {
        self.simple_execute_with(sql, binds, options, None).await
    }

    pub async fn simple_execute_with(
        &self,
        sql: &str,
        binds: &Binds,
        mut options: ExecuteOptions,
        on_complete: Option<Completion<ResultSet>>,
    ) -> DbResult<ResultSet> {
        options.apply_simple_defaults();

        let mut conn = match self.acquire().await {
            Ok(conn) => conn,
            Err(e) => return deliver(Err(e), on_complete),
        };

        let result = self.execute(sql, binds, &options, &mut conn).await;
        let result = deliver(result, on_complete);
        self.defer_release(conn);
        result
    }
}
