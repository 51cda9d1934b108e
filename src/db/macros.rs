//! Database dispatch macros for reducing code duplication.
//!
//! Pools and connections of the sqlx driver are enums with one variant per
//! backend (`MySql`, `Postgres`, `SQLite`). These macros expand to the match
//! over those variants at compile time.

/// Match on a per-backend enum with a distinct arm per variant.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(DbConnection, &mut self.conn, {
///     MySql(c) => mysql::run(c, sql).await,
///     Postgres(c) => postgres::run(c, sql).await,
///     SQLite(c) => sqlite::run(c, sql).await,
/// });
/// ```
macro_rules! impl_db_dispatch {
    ($enum:ident, $value:expr, { $($variant:ident($p:ident) => $body:expr),+ $(,)? }) => {
        match $value {
            $(
                $enum::$variant($p) => $body,
            )+
        }
    };
}

/// Match on a per-backend enum, running the same body for every variant.
///
/// The body is type-checked once per variant, so it may call methods that
/// only share a name across the backend types.
macro_rules! with_each_db {
    ($enum:ident, $value:expr, |$p:ident| $body:expr) => {
        match $value {
            $enum::MySql($p) => $body,
            $enum::Postgres($p) => $body,
            $enum::SQLite($p) => $body,
        }
    };
}
