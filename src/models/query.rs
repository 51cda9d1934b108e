//! Statement-related data models.
//!
//! This module defines bind parameters, per-statement execution options and
//! the result set shape, plus the driver constants callers use to describe them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// A bind value for parameterized statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BindValue {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
    /// Timestamp value (RFC 3339 in JSON)
    Date(DateTime<Utc>),
    /// Structured JSON value (arrays and objects)
    Json(JsonValue),
}

impl BindValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this value for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Date(_) => "date",
            Self::Json(_) => "json",
        }
    }
}

impl From<bool> for BindValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for BindValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for BindValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for BindValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for BindValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for BindValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<DateTime<Utc>> for BindValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Date(v)
    }
}

/// Declared type of a bind parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BindType {
    String,
    Number,
    Date,
}

pub const STRING: BindType = BindType::String;
pub const NUMBER: BindType = BindType::Number;
pub const DATE: BindType = BindType::Date;

/// Direction of a bind parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BindDir {
    #[default]
    #[serde(rename = "BIND_IN")]
    In,
    #[serde(rename = "BIND_OUT")]
    Out,
    #[serde(rename = "BIND_INOUT")]
    InOut,
}

pub const BIND_IN: BindDir = BindDir::In;
pub const BIND_OUT: BindDir = BindDir::Out;
pub const BIND_INOUT: BindDir = BindDir::InOut;

/// A bind parameter: value, direction and optional declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bind {
    #[serde(rename = "val", default = "null_value")]
    pub value: BindValue,
    #[serde(default)]
    pub dir: BindDir,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub bind_type: Option<BindType>,
}

fn null_value() -> BindValue {
    BindValue::Null
}

impl Bind {
    /// An IN bind of the given value.
    pub fn new(value: impl Into<BindValue>) -> Self {
        Self {
            value: value.into(),
            dir: BindDir::In,
            bind_type: None,
        }
    }

    /// An OUT bind of the given type.
    pub fn out(bind_type: BindType) -> Self {
        Self {
            value: BindValue::Null,
            dir: BindDir::Out,
            bind_type: Some(bind_type),
        }
    }

    pub fn with_type(mut self, bind_type: BindType) -> Self {
        self.bind_type = Some(bind_type);
        self
    }

    pub fn with_dir(mut self, dir: BindDir) -> Self {
        self.dir = dir;
        self
    }
}

impl From<BindValue> for Bind {
    fn from(value: BindValue) -> Self {
        Self::new(value)
    }
}

macro_rules! impl_bind_from {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for Bind {
                fn from(value: $ty) -> Self {
                    Self::new(value)
                }
            }
        )+
    };
}

impl_bind_from!(bool, i32, i64, f64, &str, String, DateTime<Utc>);

/// Bind parameters for one statement, by position or by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Binds {
    Positional(Vec<Bind>),
    Named(BTreeMap<String, Bind>),
}

impl Default for Binds {
    fn default() -> Self {
        Self::Named(BTreeMap::new())
    }
}

impl Binds {
    /// Positional binds from any iterator of values.
    pub fn positional<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Bind>,
    {
        Self::Positional(values.into_iter().map(Into::into).collect())
    }

    /// Add a named bind. Converts empty positional binds to named ones.
    pub fn with(mut self, name: impl Into<String>, bind: impl Into<Bind>) -> Self {
        if let Self::Positional(values) = &self {
            if values.is_empty() {
                self = Self::default();
            }
        }
        match &mut self {
            Self::Named(map) => {
                map.insert(name.into(), bind.into());
            }
            Self::Positional(values) => values.push(bind.into()),
        }
        self
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Positional(values) => values.len(),
            Self::Named(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Row shape of query results.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutFormat {
    /// Each row is an array of column values
    #[default]
    Array,
    /// Each row is an object keyed by column name
    Object,
}

pub const ARRAY: OutFormat = OutFormat::Array;
pub const OBJECT: OutFormat = OutFormat::Object;

/// Per-statement execution options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_commit: Option<bool>,
    /// Deprecated spelling of `auto_commit`, still honored when `auto_commit` is unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_auto_commit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_format: Option<OutFormat>,
    /// Default: unlimited
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rows: Option<u32>,
}

impl ExecuteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auto_commit(mut self, auto_commit: bool) -> Self {
        self.auto_commit = Some(auto_commit);
        self
    }

    pub fn with_out_format(mut self, out_format: OutFormat) -> Self {
        self.out_format = Some(out_format);
        self
    }

    pub fn with_max_rows(mut self, max_rows: u32) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    /// Default both commit flags to true, each only if unset.
    pub fn apply_simple_defaults(&mut self) {
        if self.auto_commit.is_none() {
            self.auto_commit = Some(true);
        }
        if self.is_auto_commit.is_none() {
            self.is_auto_commit = Some(true);
        }
    }

    /// Requested commit behavior; `None` leaves it to the driver.
    pub fn effective_auto_commit(&self) -> Option<bool> {
        self.auto_commit.or(self.is_auto_commit)
    }

    pub fn out_format_or_default(&self) -> OutFormat {
        self.out_format.unwrap_or_default()
    }
}

/// Rows of a result set in the requested shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Rows {
    Array(Vec<Vec<JsonValue>>),
    Object(Vec<serde_json::Map<String, JsonValue>>),
}

impl Rows {
    pub fn len(&self) -> usize {
        match self {
            Self::Array(rows) => rows.len(),
            Self::Object(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Rows,
    /// Present for statements that returned no rows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_affected: Option<u64>,
}

impl ResultSet {
    /// Shape decoded row values according to `format`.
    pub fn from_values(
        columns: Vec<String>,
        values: Vec<Vec<JsonValue>>,
        format: OutFormat,
        rows_affected: Option<u64>,
    ) -> Self {
        let rows = match format {
            OutFormat::Array => Rows::Array(values),
            OutFormat::Object => Rows::Object(
                values
                    .into_iter()
                    .map(|row| columns.iter().cloned().zip(row).collect())
                    .collect(),
            ),
        };
        Self {
            columns,
            rows,
            rows_affected,
        }
    }

    /// Create a result for statements that return no rows.
    pub fn write_result(rows_affected: u64, format: OutFormat) -> Self {
        Self::from_values(Vec::new(), Vec::new(), format, Some(rows_affected))
    }

    /// Get the number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Value at `row` for `column`, whatever the row shape.
    pub fn get(&self, row: usize, column: &str) -> Option<&JsonValue> {
        match &self.rows {
            Rows::Array(rows) => {
                let idx = self.columns.iter().position(|c| c == column)?;
                rows.get(row)?.get(idx)
            }
            Rows::Object(rows) => rows.get(row)?.get(column),
        }
    }
}
