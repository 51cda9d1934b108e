//! Row decoding into JSON values.
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies column types into logical categories
//! 2. Database-specific decoders handle the actual value extraction
//!
//! Values that fail to decode become `null` and are logged; a single odd
//! column never fails the whole statement.

use crate::models::DatabaseType;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row, Type, TypeInfo};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Temporal,
    Binary,
    Json,
    Uuid,
    Unknown,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // Decimal/Numeric - check first as it overlaps with "numeric" in float checks
    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite's NUMERIC is actually a float
        if db == DatabaseType::SQLite && lower == "numeric" {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }

    // Date and time types
    if lower.contains("timestamp")
        || lower.contains("datetime")
        || lower == "date"
        || lower == "time"
        || lower == "timetz"
    {
        return TypeCategory::Temporal;
    }

    if (lower.contains("int") && lower != "interval")
        || lower.contains("serial")
        || lower.contains("tiny")
    {
        return TypeCategory::Integer;
    }

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    if lower.contains("float")
        || lower.contains("double")
        || lower == "real"
        || lower == "float4"
        || lower == "float8"
    {
        return TypeCategory::Float;
    }

    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }

    if lower == "uuid" {
        return TypeCategory::Uuid;
    }

    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }

    // Everything else (varchar, text, char, enum, ...) is read as text
    TypeCategory::Unknown
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Raw DECIMAL/NUMERIC value, kept as the database's exact text.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        <String as Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("numeric") || name.contains("decimal")
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::Postgres>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Shared Value Helpers
// =============================================================================

/// Binary data is always returned base64-encoded.
pub fn encode_binary(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    JsonValue::String(STANDARD.encode(bytes))
}

fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

fn utc_value(v: DateTime<Utc>) -> JsonValue {
    JsonValue::String(v.to_rfc3339())
}

fn naive_datetime_value(v: NaiveDateTime) -> JsonValue {
    JsonValue::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}

fn naive_value<T: ToString>(v: T) -> JsonValue {
    JsonValue::String(v.to_string())
}

fn column_names<R: Row>(row: &R) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

// =============================================================================
// Row to JSON Trait
// =============================================================================

/// Conversion of a database row into column names and JSON values.
pub trait RowToJson {
    fn column_names(&self) -> Vec<String>;
    fn to_json_values(&self) -> Vec<JsonValue>;
}

impl RowToJson for MySqlRow {
    fn column_names(&self) -> Vec<String> {
        column_names(self)
    }

    fn to_json_values(&self) -> Vec<JsonValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, DatabaseType::MySQL);
                mysql::decode_column(self, idx, type_name, category)
            })
            .collect()
    }
}

impl RowToJson for PgRow {
    fn column_names(&self) -> Vec<String> {
        column_names(self)
    }

    fn to_json_values(&self) -> Vec<JsonValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, DatabaseType::PostgreSQL);
                postgres::decode_column(self, idx, category)
            })
            .collect()
    }
}

impl RowToJson for SqliteRow {
    fn column_names(&self) -> Vec<String> {
        column_names(self)
    }

    fn to_json_values(&self) -> Vec<JsonValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, DatabaseType::SQLite);
                sqlite::decode_column(self, idx, type_name, category)
            })
            .collect()
    }
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;

    pub fn decode_column(
        row: &MySqlRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
    ) -> JsonValue {
        match category {
            TypeCategory::Decimal => decode_decimal(row, idx),
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => decode_boolean(row, idx),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Temporal => decode_temporal(row, idx, type_name),
            TypeCategory::Binary => decode_binary(row, idx),
            TypeCategory::Json => decode_json(row, idx),
            _ => decode_text(row, idx, type_name),
        }
    }

    fn decode_decimal(row: &MySqlRow, idx: usize) -> JsonValue {
        match row.try_get::<Option<RawDecimal>, _>(idx) {
            Ok(Some(v)) => JsonValue::String(v.0),
            Ok(None) => JsonValue::Null,
            Err(e) => {
                tracing::error!("Failed to decode DECIMAL: {:?}", e);
                JsonValue::Null
            }
        }
    }

    fn decode_integer(row: &MySqlRow, idx: usize) -> JsonValue {
        if let Ok(None) = row.try_get::<Option<i64>, _>(idx) {
            return JsonValue::Null;
        }
        if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i32>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i16>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i8>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        // Unsigned columns
        if let Ok(Some(v)) = row.try_get::<Option<u64>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<u32>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<u16>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<u8>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        JsonValue::Null
    }

    fn decode_boolean(row: &MySqlRow, idx: usize) -> JsonValue {
        row.try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(JsonValue::Bool)
            .unwrap_or(JsonValue::Null)
    }

    fn decode_float(row: &MySqlRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
            return v.map(float_value).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
            return v.map(|v| float_value(v as f64)).unwrap_or(JsonValue::Null);
        }
        JsonValue::Null
    }

    fn decode_temporal(row: &MySqlRow, idx: usize, type_name: &str) -> JsonValue {
        if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(idx) {
            return v.map(utc_value).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
            return v.map(naive_datetime_value).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(idx) {
            return v.map(naive_value).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<NaiveTime>, _>(idx) {
            return v.map(naive_value).unwrap_or(JsonValue::Null);
        }
        decode_text(row, idx, type_name)
    }

    fn decode_binary(row: &MySqlRow, idx: usize) -> JsonValue {
        row.try_get::<Option<Vec<u8>>, _>(idx)
            .ok()
            .flatten()
            .map(|v| encode_binary(&v))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_json(row: &MySqlRow, idx: usize) -> JsonValue {
        row.try_get::<Option<JsonValue>, _>(idx)
            .ok()
            .flatten()
            .unwrap_or(JsonValue::Null)
    }

    fn decode_text(row: &MySqlRow, idx: usize, type_name: &str) -> JsonValue {
        match row.try_get::<Option<String>, _>(idx) {
            Ok(Some(v)) => JsonValue::String(v),
            Ok(None) => JsonValue::Null,
            Err(e) => {
                tracing::warn!(column = idx, type_name, error = %e, "Undecodable column value");
                JsonValue::Null
            }
        }
    }
}

mod postgres {
    use super::*;

    pub fn decode_column(row: &PgRow, idx: usize, category: TypeCategory) -> JsonValue {
        match category {
            TypeCategory::Decimal => decode_decimal(row, idx),
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => decode_boolean(row, idx),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Temporal => decode_temporal(row, idx),
            TypeCategory::Binary => decode_binary(row, idx),
            TypeCategory::Json => decode_json(row, idx),
            TypeCategory::Uuid => decode_uuid(row, idx),
            _ => decode_text(row, idx),
        }
    }

    fn decode_decimal(row: &PgRow, idx: usize) -> JsonValue {
        match row.try_get::<Option<RawDecimal>, _>(idx) {
            Ok(Some(v)) => JsonValue::String(v.0),
            Ok(None) => JsonValue::Null,
            Err(e) => {
                tracing::error!("Failed to decode NUMERIC: {:?}", e);
                JsonValue::Null
            }
        }
    }

    fn decode_integer(row: &PgRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
            return v.map(|v| JsonValue::Number(v.into())).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
            return v.map(|v| JsonValue::Number(v.into())).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
            return v.map(|v| JsonValue::Number(v.into())).unwrap_or(JsonValue::Null);
        }
        JsonValue::Null
    }

    fn decode_boolean(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(JsonValue::Bool)
            .unwrap_or(JsonValue::Null)
    }

    fn decode_float(row: &PgRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
            return v.map(float_value).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
            return v.map(|v| float_value(v as f64)).unwrap_or(JsonValue::Null);
        }
        JsonValue::Null
    }

    fn decode_temporal(row: &PgRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(idx) {
            return v.map(utc_value).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
            return v.map(naive_datetime_value).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(idx) {
            return v.map(naive_value).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<NaiveTime>, _>(idx) {
            return v.map(naive_value).unwrap_or(JsonValue::Null);
        }
        decode_text(row, idx)
    }

    fn decode_binary(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get::<Option<Vec<u8>>, _>(idx)
            .ok()
            .flatten()
            .map(|v| encode_binary(&v))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_json(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get::<Option<JsonValue>, _>(idx)
            .ok()
            .flatten()
            .unwrap_or(JsonValue::Null)
    }

    fn decode_uuid(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get::<Option<uuid::Uuid>, _>(idx)
            .ok()
            .flatten()
            .map(|v| JsonValue::String(v.to_string()))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_text(row: &PgRow, idx: usize) -> JsonValue {
        match row.try_get::<Option<String>, _>(idx) {
            Ok(Some(v)) => JsonValue::String(v),
            Ok(None) => JsonValue::Null,
            Err(e) => {
                tracing::warn!(column = idx, error = %e, "Undecodable column value");
                JsonValue::Null
            }
        }
    }
}

mod sqlite {
    use super::*;
    use sqlx::ValueRef;

    /// Decode by the value's runtime storage class.
    ///
    /// SQLite columns carry an affinity, not a type: a NUMERIC column may hold
    /// integers or reals, and expression columns have no declared type at all.
    /// The declared category only decides booleans and JSON text.
    pub fn decode_column(
        row: &SqliteRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
    ) -> JsonValue {
        let storage = match row.try_get_raw(idx) {
            Ok(value) if value.is_null() => return JsonValue::Null,
            Ok(value) => value.type_info().name().to_ascii_uppercase(),
            Err(e) => {
                tracing::warn!(column = idx, error = %e, "Undecodable column value");
                return JsonValue::Null;
            }
        };

        let decoded = match storage.as_str() {
            "INTEGER" if category == TypeCategory::Boolean => {
                get::<bool>(row, idx).map(JsonValue::Bool)
            }
            "INTEGER" => get::<i64>(row, idx).map(|v| JsonValue::Number(v.into())),
            "REAL" => get::<f64>(row, idx).map(float_value),
            "TEXT" => get::<String>(row, idx).map(|v| decode_text(v, type_name)),
            "BLOB" => get::<Vec<u8>>(row, idx).map(|v| encode_binary(&v)),
            _ => None,
        };
        decoded.unwrap_or_else(|| decode_any(row, idx))
    }

    /// Read a value without the declared-type compatibility check.
    fn get<'r, T>(row: &'r SqliteRow, idx: usize) -> Option<T>
    where
        T: Decode<'r, sqlx::Sqlite>,
    {
        row.try_get_unchecked::<T, _>(idx).ok()
    }

    fn decode_text(v: String, type_name: &str) -> JsonValue {
        if type_name.to_lowercase().contains("json") {
            if let Ok(json) = serde_json::from_str::<JsonValue>(&v) {
                return json;
            }
        }
        JsonValue::String(v)
    }

    fn decode_any(row: &SqliteRow, idx: usize) -> JsonValue {
        if let Some(v) = get::<i64>(row, idx) {
            return JsonValue::Number(v.into());
        }
        if let Some(v) = get::<f64>(row, idx) {
            return float_value(v);
        }
        if let Some(v) = get::<String>(row, idx) {
            return JsonValue::String(v);
        }
        if let Some(v) = get::<Vec<u8>>(row, idx) {
            return encode_binary(&v);
        }
        tracing::warn!(column = idx, "Undecodable column value");
        JsonValue::Null
    }
}
