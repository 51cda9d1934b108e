//! Connection handle returned to callers of the facade.

use crate::db::driver::DriverConnection;
use crate::db::pool::ConnectionSource;
use crate::db::registry::ScriptPhase;
use crate::error::{DbError, DbResult};
use crate::models::{Binds, ExecuteOptions, ResultSet, ScriptEntry};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// An acquired connection.
///
/// Owned exclusively by the caller between acquisition and release. Release
/// consumes the handle, so the same connection cannot be released twice.
pub struct Connection {
    id: Uuid,
    source: ConnectionSource,
    inner: Box<dyn DriverConnection>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl Connection {
    pub(crate) fn new(inner: Box<dyn DriverConnection>, source: ConnectionSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            inner,
        }
    }

    /// Identifier used in log output.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source(&self) -> ConnectionSource {
        self.source
    }

    pub async fn commit(&mut self) -> DbResult<()> {
        self.inner.commit().await
    }

    pub async fn rollback(&mut self) -> DbResult<()> {
        self.inner.rollback().await
    }

    pub(crate) async fn run(
        &mut self,
        sql: &str,
        binds: &Binds,
        options: &ExecuteOptions,
    ) -> DbResult<ResultSet> {
        self.inner.execute(sql, binds, options).await
    }

    /// Run lifecycle scripts one at a time, in order, stopping at the first failure.
    pub(crate) async fn run_scripts(
        &mut self,
        phase: ScriptPhase,
        scripts: &[Arc<ScriptEntry>],
    ) -> DbResult<()> {
        for (position, script) in scripts.iter().enumerate() {
            debug!(
                connection_id = %self.id,
                phase = %phase,
                position,
                sql = %script.sql,
                "Running lifecycle script"
            );
            if let Err(e) = self.run(&script.sql, &script.binds, &script.options).await {
                return Err(match phase {
                    ScriptPhase::Buildup => DbError::buildup_script(position, &script.sql, e),
                    ScriptPhase::Teardown => DbError::teardown_script(position, &script.sql, e),
                });
            }
        }
        Ok(())
    }

    /// Physically release: back to the pool, or closed if ad-hoc.
    pub(crate) async fn close(self) -> DbResult<()> {
        self.inner.release().await
    }
}
