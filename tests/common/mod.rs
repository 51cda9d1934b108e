//! Recording driver double shared by the integration tests.
//!
//! Every driver call is appended to a trace so tests can assert on the exact
//! order of acquisition, script execution and release.

#![allow(dead_code)]

use async_trait::async_trait;
use db_lifecycle::db::{Driver, DriverConnection, DriverPool};
use db_lifecycle::models::{Binds, ConnectInfo, ExecuteOptions, PoolConfig, ResultSet};
use db_lifecycle::{Database, DbError, DbResult, LifecycleOptions};
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MockState {
    trace: Mutex<Vec<String>>,
    executed: Mutex<Vec<(String, ExecuteOptions)>>,
    failing_sql: Mutex<HashSet<String>>,
    fail_create_pool: AtomicBool,
    fail_terminate: AtomicBool,
    fail_release: AtomicBool,
    driver_calls: AtomicUsize,
}

impl MockState {
    fn record(&self, event: impl Into<String>) {
        self.trace.lock().unwrap().push(event.into());
    }
}

/// Driver that records calls instead of talking to a database.
#[derive(Clone, Default)]
pub struct MockDriver {
    state: Arc<MockState>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A `Database` on top of this driver.
    pub fn database(&self) -> Database {
        Database::new(Arc::new(self.clone()))
    }

    pub fn database_with(&self, options: LifecycleOptions) -> Database {
        Database::with_options(Arc::new(self.clone()), options)
    }

    pub fn trace(&self) -> Vec<String> {
        self.state.trace.lock().unwrap().clone()
    }

    pub fn clear_trace(&self) {
        self.state.trace.lock().unwrap().clear();
    }

    /// Append a marker to the trace, e.g. from a completion callback.
    pub fn mark(&self, event: &str) {
        self.state.record(event);
    }

    /// Number of trace events equal to `event`.
    pub fn count(&self, event: &str) -> usize {
        self.trace().iter().filter(|e| *e == event).count()
    }

    /// Options the statement `sql` was last executed with.
    pub fn options_for(&self, sql: &str) -> Option<ExecuteOptions> {
        self.state
            .executed
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(s, _)| s == sql)
            .map(|(_, options)| options.clone())
    }

    pub fn fail_on(&self, sql: &str) {
        self.state.failing_sql.lock().unwrap().insert(sql.to_string());
    }

    pub fn fail_create_pool(&self) {
        self.state.fail_create_pool.store(true, Ordering::SeqCst);
    }

    pub fn fail_terminate(&self) {
        self.state.fail_terminate.store(true, Ordering::SeqCst);
    }

    pub fn fail_release(&self) {
        self.state.fail_release.store(true, Ordering::SeqCst);
    }

    /// Calls made on the driver itself (pool creation and ad-hoc opens).
    pub fn driver_calls(&self) -> usize {
        self.state.driver_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Driver for MockDriver {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_pool(&self, _config: &PoolConfig) -> DbResult<Arc<dyn DriverPool>> {
        self.state.driver_calls.fetch_add(1, Ordering::SeqCst);
        self.state.record("create_pool");
        if self.state.fail_create_pool.load(Ordering::SeqCst) {
            return Err(DbError::connection("listener refused", "start the listener"));
        }
        Ok(Arc::new(MockPool {
            state: Arc::clone(&self.state),
        }))
    }

    async fn open_connection(&self, info: &ConnectInfo) -> DbResult<Box<dyn DriverConnection>> {
        self.state.driver_calls.fetch_add(1, Ordering::SeqCst);
        self.state.record("open");
        if info.connect_string.is_empty() {
            return Err(DbError::connection("empty connect string", "set a connect string"));
        }
        Ok(Box::new(MockConnection {
            state: Arc::clone(&self.state),
        }))
    }
}

#[derive(Debug)]
struct MockPool {
    state: Arc<MockState>,
}

impl std::fmt::Debug for MockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MockState")
    }
}

#[async_trait]
impl DriverPool for MockPool {
    async fn acquire(&self) -> DbResult<Box<dyn DriverConnection>> {
        self.state.record("acquire");
        Ok(Box::new(MockConnection {
            state: Arc::clone(&self.state),
        }))
    }

    async fn terminate(&self) -> DbResult<()> {
        self.state.record("terminate");
        if self.state.fail_terminate.load(Ordering::SeqCst) {
            return Err(DbError::connection("pool busy", "release connections first"));
        }
        Ok(())
    }
}

struct MockConnection {
    state: Arc<MockState>,
}

#[async_trait]
impl DriverConnection for MockConnection {
    async fn execute(
        &mut self,
        sql: &str,
        _binds: &Binds,
        options: &ExecuteOptions,
    ) -> DbResult<ResultSet> {
        self.state.record(format!("exec:{}", sql));
        self.state
            .executed
            .lock()
            .unwrap()
            .push((sql.to_string(), options.clone()));

        if self.state.failing_sql.lock().unwrap().contains(sql) {
            return Err(DbError::database(
                format!("mock failure: {}", sql),
                Some("MOCK1".to_string()),
                "check the mock setup",
            ));
        }

        let format = options.out_format_or_default();
        if sql.trim_start().to_uppercase().starts_with("SELECT") {
            Ok(ResultSet::from_values(
                vec!["1".to_string()],
                vec![vec![json!(1)]],
                format,
                None,
            ))
        } else {
            Ok(ResultSet::write_result(0, format))
        }
    }

    async fn commit(&mut self) -> DbResult<()> {
        self.state.record("commit");
        Ok(())
    }

    async fn rollback(&mut self) -> DbResult<()> {
        self.state.record("rollback");
        Ok(())
    }

    async fn release(self: Box<Self>) -> DbResult<()> {
        self.state.record("release");
        if self.state.fail_release.load(Ordering::SeqCst) {
            return Err(DbError::connection("socket closed", "reconnect"));
        }
        Ok(())
    }
}

/// Connect info that the mock accepts.
pub fn connect_info() -> ConnectInfo {
    ConnectInfo::new("mock://localhost/app").with_credentials("scott", "tiger")
}

/// Pool config that the mock accepts.
pub fn pool_config() -> PoolConfig {
    PoolConfig::new(connect_info())
}
