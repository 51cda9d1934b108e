//! Parameter binding utilities.
//!
//! Turns a statement and its `Binds` into driver-ready SQL plus an ordered
//! list of values, then binds those values to database-specific query objects.
//!
//! Named placeholders (`:name`) are rewritten to the backend's positional
//! form: `$n` for PostgreSQL, `?` for MySQL and SQLite. Text inside quotes
//! and comments is left alone, as are `::` casts. MySQL string literals honor
//! backslash escapes; PostgreSQL dollar-quoted bodies are skipped.

use crate::error::{DbError, DbResult};
use crate::models::{Bind, BindDir, BindType, BindValue, Binds, DatabaseType};
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlArguments;
use sqlx::postgres::PgArguments;
use sqlx::sqlite::SqliteArguments;
use sqlx::types::Json;
use sqlx::{MySql, Postgres, Sqlite};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

/// SQL ready for the driver plus the values to bind, in placeholder order.
#[derive(Debug)]
pub(crate) struct Prepared<'a> {
    pub sql: Cow<'a, str>,
    pub values: Vec<&'a Bind>,
}

/// Resolve `binds` against `sql` for the given backend.
pub(crate) fn prepare<'a>(
    sql: &'a str,
    binds: &'a Binds,
    db: DatabaseType,
) -> DbResult<Prepared<'a>> {
    match binds {
        Binds::Positional(values) => {
            for (position, bind) in values.iter().enumerate() {
                check_direction(bind, || format!("#{}", position))?;
            }
            Ok(Prepared {
                sql: Cow::Borrowed(sql),
                values: values.iter().collect(),
            })
        }
        Binds::Named(named) if named.is_empty() => Ok(Prepared {
            sql: Cow::Borrowed(sql),
            values: Vec::new(),
        }),
        Binds::Named(named) => {
            for (name, bind) in named {
                check_direction(bind, || format!(":{}", name))?;
            }
            let (sql, values) = rewrite_named(sql, named, db)?;
            Ok(Prepared {
                sql: Cow::Owned(sql),
                values,
            })
        }
    }
}

fn check_direction(bind: &Bind, label: impl FnOnce() -> String) -> DbResult<()> {
    if bind.dir == BindDir::In {
        return Ok(());
    }
    Err(DbError::invalid_input(format!(
        "Bind {} is {:?}; only IN binds are supported",
        label(),
        bind.dir
    )))
}

/// Length of a PostgreSQL dollar-quote opener (`$$` or `$tag$`) at the start of `chars`.
fn dollar_tag_len(chars: &[char]) -> Option<usize> {
    if chars.first() != Some(&'$') {
        return None;
    }
    let mut end = 1;
    while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_') {
        end += 1;
    }
    // `$1` is a positional parameter, not a tag
    if chars.get(end) != Some(&'$') || chars.get(1).is_some_and(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(end + 1)
}

fn rewrite_named<'a>(
    sql: &str,
    named: &'a BTreeMap<String, Bind>,
    db: DatabaseType,
) -> DbResult<(String, Vec<&'a Bind>)> {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len() + 8);
    let mut values: Vec<&'a Bind> = Vec::new();
    let mut pg_slots: HashMap<String, usize> = HashMap::new();
    let backslash_escapes = db == DatabaseType::MySQL;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match c {
            '\'' | '"' | '`' => {
                out.push(c);
                i += 1;
                while i < chars.len() {
                    let ch = chars[i];
                    out.push(ch);
                    i += 1;
                    // MySQL strings take backslash escapes
                    if ch == '\\' && backslash_escapes && c != '`' {
                        if let Some(&escaped) = chars.get(i) {
                            out.push(escaped);
                            i += 1;
                        }
                        continue;
                    }
                    if ch == c {
                        break;
                    }
                }
            }
            '$' if db == DatabaseType::PostgreSQL => match dollar_tag_len(&chars[i..]) {
                Some(len) => {
                    let tag = &chars[i..i + len];
                    out.extend(tag);
                    i += len;
                    while i < chars.len() {
                        if chars[i..].starts_with(tag) {
                            out.extend(tag);
                            i += len;
                            break;
                        }
                        out.push(chars[i]);
                        i += 1;
                    }
                }
                None => {
                    out.push('$');
                    i += 1;
                }
            },
            '-' if next == Some('-') => {
                while i < chars.len() && chars[i] != '\n' {
                    out.push(chars[i]);
                    i += 1;
                }
            }
            '/' if next == Some('*') => {
                out.push_str("/*");
                i += 2;
                while i < chars.len() {
                    if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                        out.push_str("*/");
                        i += 2;
                        break;
                    }
                    out.push(chars[i]);
                    i += 1;
                }
            }
            ':' if next == Some(':') => {
                out.push_str("::");
                i += 2;
            }
            ':' if next.is_some_and(|n| n.is_ascii_alphabetic() || n == '_') => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_')
                {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();
                let bind = named.get(&name).ok_or_else(|| {
                    DbError::invalid_input(format!("No bind value supplied for :{}", name))
                })?;

                match db {
                    DatabaseType::PostgreSQL => {
                        let slot = match pg_slots.get(&name) {
                            Some(slot) => *slot,
                            None => {
                                values.push(bind);
                                pg_slots.insert(name, values.len());
                                values.len()
                            }
                        };
                        out.push('$');
                        out.push_str(&slot.to_string());
                    }
                    DatabaseType::MySQL | DatabaseType::SQLite => {
                        values.push(bind);
                        out.push('?');
                    }
                }
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    Ok((out, values))
}

/// Bind a parameter to a MySQL query.
pub(crate) fn bind_mysql_param<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    bind: &'q Bind,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match &bind.value {
        BindValue::Null => match bind.bind_type {
            Some(BindType::Number) => query.bind(None::<f64>),
            Some(BindType::Date) => query.bind(None::<DateTime<Utc>>),
            _ => query.bind(None::<String>),
        },
        BindValue::Bool(v) => query.bind(*v),
        BindValue::Int(v) => query.bind(*v),
        BindValue::Float(v) => query.bind(*v),
        BindValue::String(v) => query.bind(v.as_str()),
        BindValue::Date(v) => query.bind(*v),
        BindValue::Json(v) => query.bind(Json(v)),
    }
}

/// Bind a parameter to a PostgreSQL query.
pub(crate) fn bind_postgres_param<'q>(
    query: sqlx::query::Query<'q, Postgres, PgArguments>,
    bind: &'q Bind,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match &bind.value {
        BindValue::Null => match bind.bind_type {
            Some(BindType::Number) => query.bind(None::<f64>),
            Some(BindType::Date) => query.bind(None::<DateTime<Utc>>),
            _ => query.bind(None::<String>),
        },
        BindValue::Bool(v) => query.bind(*v),
        BindValue::Int(v) => query.bind(*v),
        BindValue::Float(v) => query.bind(*v),
        BindValue::String(v) => query.bind(v.as_str()),
        BindValue::Date(v) => query.bind(*v),
        BindValue::Json(v) => query.bind(Json(v)),
    }
}

/// Bind a parameter to a SQLite query.
pub(crate) fn bind_sqlite_param<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    bind: &'q Bind,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match &bind.value {
        BindValue::Null => match bind.bind_type {
            Some(BindType::Number) => query.bind(None::<f64>),
            Some(BindType::Date) => query.bind(None::<DateTime<Utc>>),
            _ => query.bind(None::<String>),
        },
        BindValue::Bool(v) => query.bind(*v),
        BindValue::Int(v) => query.bind(*v),
        BindValue::Float(v) => query.bind(*v),
        BindValue::String(v) => query.bind(v.as_str()),
        BindValue::Date(v) => query.bind(*v),
        // SQLite has no JSON column type, store as text
        BindValue::Json(v) => query.bind(v.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(pairs: &[(&str, i64)]) -> Binds {
        pairs
            .iter()
            .fold(Binds::default(), |binds, (name, value)| binds.with(*name, *value))
    }

    #[test]
    fn test_positional_binds_pass_through() {
        let binds = Binds::positional([1i64, 2]);
        let prepared = prepare("SELECT ?, ?", &binds, DatabaseType::MySQL).unwrap();
        assert!(matches!(prepared.sql, Cow::Borrowed("SELECT ?, ?")));
        assert_eq!(prepared.values.len(), 2);
        assert_eq!(prepared.values[1].value, BindValue::Int(2));
    }

    #[test]
    fn test_empty_named_binds_leave_sql_untouched() {
        let binds = Binds::default();
        let prepared = prepare("SELECT :not_a_bind", &binds, DatabaseType::SQLite).unwrap();
        assert_eq!(prepared.sql, "SELECT :not_a_bind");
        assert!(prepared.values.is_empty());
    }

    #[test]
    fn test_named_binds_postgres_reuse_slot() {
        let binds = named(&[("id", 7), ("limit", 10)]);
        let prepared = prepare(
            "SELECT * FROM t WHERE id = :id OR parent = :id LIMIT :limit",
            &binds,
            DatabaseType::PostgreSQL,
        )
        .unwrap();
        assert_eq!(
            prepared.sql,
            "SELECT * FROM t WHERE id = $1 OR parent = $1 LIMIT $2"
        );
        assert_eq!(prepared.values.len(), 2);
        assert_eq!(prepared.values[0].value, BindValue::Int(7));
        assert_eq!(prepared.values[1].value, BindValue::Int(10));
    }

    #[test]
    fn test_named_binds_question_marks_repeat_values() {
        let binds = named(&[("id", 7)]);
        let prepared = prepare(
            "SELECT * FROM t WHERE id = :id OR parent = :id",
            &binds,
            DatabaseType::MySQL,
        )
        .unwrap();
        assert_eq!(prepared.sql, "SELECT * FROM t WHERE id = ? OR parent = ?");
        assert_eq!(prepared.values.len(), 2);
    }

    #[test]
    fn test_rewrite_skips_quotes_comments_and_casts() {
        let binds = named(&[("id", 1)]);
        let sql = "SELECT ':id', \":id\", x::text -- :id\nFROM t /* :id */ WHERE id = :id";
        let prepared = prepare(sql, &binds, DatabaseType::PostgreSQL).unwrap();
        assert_eq!(
            prepared.sql,
            "SELECT ':id', \":id\", x::text -- :id\nFROM t /* :id */ WHERE id = $1"
        );
        assert_eq!(prepared.values.len(), 1);
    }

    #[test]
    fn test_rewrite_handles_doubled_quotes() {
        let binds = named(&[("v", 1)]);
        let prepared = prepare(
            "SELECT 'it''s :v', :v",
            &binds,
            DatabaseType::SQLite,
        )
        .unwrap();
        assert_eq!(prepared.sql, "SELECT 'it''s :v', ?");
    }

    #[test]
    fn test_rewrite_honors_mysql_backslash_escapes() {
        let binds = named(&[("y", 1)]);
        let prepared = prepare(
            r"SELECT 'it\'s :x', :y",
            &binds,
            DatabaseType::MySQL,
        )
        .unwrap();
        assert_eq!(prepared.sql, r"SELECT 'it\'s :x', ?");
        assert_eq!(prepared.values.len(), 1);
    }

    #[test]
    fn test_rewrite_skips_postgres_dollar_quotes() {
        let binds = named(&[("y", 1)]);
        let sql = "SELECT $$ :x $$, $body$ it's :x $body$, :y";
        let prepared = prepare(sql, &binds, DatabaseType::PostgreSQL).unwrap();
        assert_eq!(
            prepared.sql,
            "SELECT $$ :x $$, $body$ it's :x $body$, $1"
        );
        assert_eq!(prepared.values.len(), 1);
    }

    #[test]
    fn test_dollar_tag_len() {
        let chars = |s: &str| s.chars().collect::<Vec<_>>();
        assert_eq!(dollar_tag_len(&chars("$$ x")), Some(2));
        assert_eq!(dollar_tag_len(&chars("$fn$ x")), Some(4));
        assert_eq!(dollar_tag_len(&chars("$1 ")), None);
        assert_eq!(dollar_tag_len(&chars("$ x")), None);
    }

    #[test]
    fn test_missing_named_bind_is_invalid_input() {
        let binds = named(&[("id", 1)]);
        let err = prepare("SELECT :other", &binds, DatabaseType::MySQL).unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));
        assert!(err.to_string().contains(":other"));
    }

    #[test]
    fn test_out_binds_rejected() {
        let binds = Binds::default().with("result", Bind::out(BindType::Number));
        let err = prepare("BEGIN :result := 1; END;", &binds, DatabaseType::MySQL).unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));

        let binds = Binds::Positional(vec![Bind::new(1i64).with_dir(BindDir::InOut)]);
        assert!(prepare("SELECT ?", &binds, DatabaseType::SQLite).is_err());
    }
}
