//! Lifecycle script registry.
//!
//! Two append-only lists of statements: buildup scripts run right after a
//! connection is acquired, teardown scripts right before it is released.
//! Registration order is execution order. Entries are never removed or
//! reordered; readers take a snapshot so acquisitions in flight are not
//! affected by later registrations.

use crate::models::{ScriptEntry, Statement};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Which end of the connection lifecycle a script belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptPhase {
    Buildup,
    Teardown,
}

impl std::fmt::Display for ScriptPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buildup => write!(f, "buildup"),
            Self::Teardown => write!(f, "teardown"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScriptRegistry {
    buildup: Arc<RwLock<Vec<Arc<ScriptEntry>>>>,
    teardown: Arc<RwLock<Vec<Arc<ScriptEntry>>>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a statement to run after every acquisition.
    pub fn add_buildup(&self, statement: impl Into<Statement>) {
        self.append(ScriptPhase::Buildup, statement.into());
    }

    /// Append a statement to run before every release.
    pub fn add_teardown(&self, statement: impl Into<Statement>) {
        self.append(ScriptPhase::Teardown, statement.into());
    }

    /// Snapshot of the scripts for `phase`, in registration order.
    pub fn scripts(&self, phase: ScriptPhase) -> Vec<Arc<ScriptEntry>> {
        self.list(phase)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self, phase: ScriptPhase) -> usize {
        self.list(phase)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn append(&self, phase: ScriptPhase, statement: Statement) {
        let entry = Arc::new(ScriptEntry::from(statement));
        let mut list = self
            .list(phase)
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        debug!(phase = %phase, position = list.len(), sql = %entry.sql, "Registered lifecycle script");
        list.push(entry);
    }

    fn list(&self, phase: ScriptPhase) -> &RwLock<Vec<Arc<ScriptEntry>>> {
        match phase {
            ScriptPhase::Buildup => &*self.buildup,
            ScriptPhase::Teardown => &*self.teardown,
        }
    }
}
