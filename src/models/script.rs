//! Lifecycle script models.

use crate::models::{Binds, ExecuteOptions};
use serde::{Deserialize, Serialize};

/// A statement as supplied for registration; binds and options are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub sql: String,
    #[serde(default)]
    pub binds: Option<Binds>,
    #[serde(default)]
    pub options: Option<ExecuteOptions>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            binds: None,
            options: None,
        }
    }

    pub fn with_binds(mut self, binds: Binds) -> Self {
        self.binds = Some(binds);
        self
    }

    pub fn with_options(mut self, options: ExecuteOptions) -> Self {
        self.options = Some(options);
        self
    }
}

impl From<&str> for Statement {
    fn from(sql: &str) -> Self {
        Self::new(sql)
    }
}

impl From<String> for Statement {
    fn from(sql: String) -> Self {
        Self::new(sql)
    }
}

/// A registered buildup or teardown statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptEntry {
    pub sql: String,
    pub binds: Binds,
    pub options: ExecuteOptions,
}

impl From<Statement> for ScriptEntry {
    /// Missing binds and options become empty ones.
    fn from(statement: Statement) -> Self {
        Self {
            sql: statement.sql,
            binds: statement.binds.unwrap_or_default(),
            options: statement.options.unwrap_or_default(),
        }
    }
}
