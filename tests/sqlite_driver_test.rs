//! End-to-end tests for the sqlx driver against a SQLite file.
//!
//! Tests verify that:
//! - Buildup and teardown scripts really run against the database
//! - Named and positional binds reach the statement
//! - Result rows come back in both out formats
//! - Uncommitted work is rolled back when the connection is released
//! - Values decode by their stored type, whatever the declared column type

use db_lifecycle::models::{Bind, BindType, Binds, ExecuteOptions, OutFormat, ResultSet, Rows};
use db_lifecycle::{
    BindValue, ConnectInfo, Database, DbError, PoolConfig, PoolOptions, SqlxDriver, Statement,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::{NamedTempFile, TempPath};

/// Create an empty SQLite file and return its path guard and URL.
fn temp_db() -> (TempPath, String) {
    let path = NamedTempFile::new().unwrap().into_temp_path();
    let url = format!("sqlite:{}", path.display());
    (path, url)
}

fn database(url: &str) -> Database {
    let db = Database::new(Arc::new(SqlxDriver::new()));
    db.set_connect_info(&ConnectInfo::new(url));
    db
}

/// Run `sql` through a script-free database and wait for its release.
async fn run(url: &str, sql: &str) -> ResultSet {
    let db = database(url);
    let rs = db
        .simple_execute(sql, &Binds::default(), ExecuteOptions::default())
        .await
        .unwrap();
    db.wait_for_releases().await;
    rs
}

/// First column of the first row as an integer, whatever JSON shape it came in.
fn scalar(rs: &ResultSet) -> i64 {
    let value = match &rs.rows {
        Rows::Array(rows) => rows[0][0].clone(),
        Rows::Object(rows) => rows[0].values().next().cloned().unwrap_or(Value::Null),
    };
    match value {
        Value::Number(n) => n.as_i64().unwrap(),
        Value::String(s) => s.parse().unwrap(),
        other => panic!("not a count: {other:?}"),
    }
}

async fn count(url: &str, sql: &str) -> i64 {
    scalar(&run(url, sql).await)
}

async fn create_audit_schema(url: &str) {
    run(url, "CREATE TABLE audit (event TEXT NOT NULL)").await;
    run(url, "CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT, price REAL)").await;
}

#[tokio::test]
async fn test_scripts_run_around_each_simple_execute() {
    let (_path, url) = temp_db();
    create_audit_schema(&url).await;

    let db = database(&url);
    db.add_buildup_sql("INSERT INTO audit (event) VALUES ('buildup')");
    db.add_teardown_sql("INSERT INTO audit (event) VALUES ('teardown')");

    for _ in 0..2 {
        let rs = db
            .simple_execute("SELECT 1 AS one", &Binds::default(), ExecuteOptions::default())
            .await
            .unwrap();
        assert_eq!(rs.columns, vec!["one".to_string()]);
        assert_eq!(rs.rows, Rows::Array(vec![vec![json!(1)]]));
    }
    db.wait_for_releases().await;

    assert_eq!(
        count(&url, "SELECT COUNT(*) FROM audit WHERE event = 'buildup'").await,
        2
    );
    assert_eq!(
        count(&url, "SELECT COUNT(*) FROM audit WHERE event = 'teardown'").await,
        2
    );
}

#[tokio::test]
async fn test_buildup_sees_connection_before_statement() {
    let (_path, url) = temp_db();
    let db = database(&url);
    db.add_buildup_sql("CREATE TEMP TABLE session_marker (v TEXT)");
    db.add_buildup_sql(
        Statement::new("INSERT INTO session_marker (v) VALUES (:v)")
            .with_binds(Binds::default().with("v", "ready")),
    );

    let rs = db
        .simple_execute(
            "SELECT v FROM session_marker",
            &Binds::default(),
            ExecuteOptions::default().with_out_format(OutFormat::Object),
        )
        .await
        .unwrap();
    db.wait_for_releases().await;

    assert_eq!(rs.get(0, "v"), Some(&json!("ready")));
}

#[tokio::test]
async fn test_buildup_failure_surfaces_wrapped_error() {
    let (_path, url) = temp_db();
    let db = database(&url);
    db.add_buildup_sql("SELECT * FROM no_such_table");

    let err = db
        .simple_execute("SELECT 1", &Binds::default(), ExecuteOptions::default())
        .await
        .unwrap_err();
    match err {
        DbError::BuildupScript { position, source, .. } => {
            assert_eq!(position, 0);
            assert!(matches!(*source, DbError::Database { .. }));
        }
        other => panic!("expected buildup error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_pooled_execution_with_named_binds() {
    let (_path, url) = temp_db();
    create_audit_schema(&url).await;

    let db = Database::new(Arc::new(SqlxDriver::new()));
    let options = PoolOptions {
        max_connections: Some(1),
        ..PoolOptions::default()
    };
    db.create_pool(&PoolConfig::new(ConnectInfo::new(&url)).with_options(options))
        .await
        .unwrap();

    for (id, name, price) in [(1i64, "apple", 1.25), (2, "pear", 2.5)] {
        let binds = Binds::default()
            .with("id", id)
            .with("name", name)
            .with("price", price);
        let rs = db
            .simple_execute(
                "INSERT INTO items (id, name, price) VALUES (:id, :name, :price)",
                &binds,
                ExecuteOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(rs.rows_affected, Some(1));
    }

    let rs = db
        .simple_execute(
            "SELECT id, name, price FROM items WHERE price > :min ORDER BY id",
            &Binds::default().with("min", 1.0),
            ExecuteOptions::default().with_out_format(OutFormat::Object),
        )
        .await
        .unwrap();
    assert_eq!(rs.row_count(), 2);
    assert_eq!(rs.get(1, "name"), Some(&json!("pear")));
    assert_eq!(rs.get(1, "price"), Some(&json!(2.5)));
    assert_eq!(rs.rows_affected, None);

    db.terminate_pool().await.unwrap();
    assert!(db.get_pool().is_none());
}

#[tokio::test]
async fn test_positional_binds_and_typed_null() {
    let (_path, url) = temp_db();
    create_audit_schema(&url).await;

    let db = database(&url);
    let binds = Binds::Positional(vec![
        Bind::new(7i64),
        Bind::new("no price"),
        Bind::new(BindValue::Null).with_type(BindType::Number),
    ]);
    db.simple_execute(
        "INSERT INTO items (id, name, price) VALUES (?, ?, ?)",
        &binds,
        ExecuteOptions::default(),
    )
    .await
    .unwrap();

    let rs = db
        .simple_execute(
            "SELECT name, price FROM items WHERE id = ?",
            &Binds::positional([7i64]),
            ExecuteOptions::default(),
        )
        .await
        .unwrap();
    db.wait_for_releases().await;

    assert_eq!(rs.rows, Rows::Array(vec![vec![json!("no price"), Value::Null]]));
}

#[tokio::test]
async fn test_max_rows_limits_result() {
    let (_path, url) = temp_db();
    create_audit_schema(&url).await;
    for i in 0..5 {
        run(&url, &format!("INSERT INTO audit (event) VALUES ('e{}')", i)).await;
    }

    let db = database(&url);
    let rs = db
        .simple_execute(
            "SELECT event FROM audit",
            &Binds::default(),
            ExecuteOptions::default().with_max_rows(2),
        )
        .await
        .unwrap();
    db.wait_for_releases().await;

    assert_eq!(rs.row_count(), 2);
}

#[tokio::test]
async fn test_auto_commit_off_is_rolled_back_on_release() {
    let (_path, url) = temp_db();
    create_audit_schema(&url).await;

    let db = database(&url);
    db.simple_execute(
        "INSERT INTO audit (event) VALUES ('uncommitted')",
        &Binds::default(),
        ExecuteOptions::default().with_auto_commit(false),
    )
    .await
    .unwrap();
    db.wait_for_releases().await;
    assert_eq!(count(&url, "SELECT COUNT(*) FROM audit").await, 0);

    db.simple_execute(
        "INSERT INTO audit (event) VALUES ('committed')",
        &Binds::default(),
        ExecuteOptions::default(),
    )
    .await
    .unwrap();
    db.wait_for_releases().await;
    assert_eq!(count(&url, "SELECT COUNT(*) FROM audit").await, 1);
}

#[tokio::test]
async fn test_explicit_commit_on_acquired_connection() {
    let (_path, url) = temp_db();
    create_audit_schema(&url).await;

    let db = database(&url);
    let mut conn = db.get_connection().await.unwrap();
    let manual = ExecuteOptions::default().with_auto_commit(false);
    for event in ["a", "b"] {
        db.execute(
            "INSERT INTO audit (event) VALUES (:event)",
            &Binds::default().with("event", event),
            &manual,
            &mut conn,
        )
        .await
        .unwrap();
    }
    conn.commit().await.unwrap();
    db.release_connection(conn).await;

    assert_eq!(count(&url, "SELECT COUNT(*) FROM audit").await, 2);
}

#[tokio::test]
async fn test_missing_named_bind_is_rejected() {
    let (_path, url) = temp_db();
    let db = database(&url);

    let err = db
        .simple_execute(
            "SELECT :missing",
            &Binds::default().with("other", 1i64),
            ExecuteOptions::default(),
        )
        .await
        .unwrap_err();
    db.wait_for_releases().await;

    assert!(matches!(err, DbError::InvalidInput { .. }));
}

#[tokio::test]
async fn test_numeric_columns_and_float_expressions_decode() {
    let (_path, url) = temp_db();
    run(
        &url,
        "CREATE TABLE measures (a NUMERIC, b DECIMAL(10,2), c NUMERIC, d BOOLEAN, e REAL)",
    )
    .await;
    run(&url, "INSERT INTO measures VALUES (12.5, 3.25, 7, 1, 1.5)").await;

    let rs = run(&url, "SELECT a, b, c, d, e FROM measures").await;
    assert_eq!(
        rs.rows,
        Rows::Array(vec![vec![
            json!(12.5),
            json!(3.25),
            json!(7),
            json!(true),
            json!(1.5)
        ]])
    );

    let rs = run(
        &url,
        "SELECT CAST(12.5 AS NUMERIC) AS x, 2.5 AS y, AVG(c) AS z, 'txt' AS t, NULL AS n FROM measures",
    )
    .await;
    assert_eq!(
        rs.rows,
        Rows::Array(vec![vec![
            json!(12.5),
            json!(2.5),
            json!(7.0),
            json!("txt"),
            Value::Null
        ]])
    );
}

#[tokio::test]
async fn test_empty_query_keeps_columns() {
    let (_path, url) = temp_db();
    create_audit_schema(&url).await;

    let rs = run(&url, "SELECT 1 AS a WHERE 0").await;
    assert_eq!(rs.columns, vec!["a".to_string()]);
    assert_eq!(rs.row_count(), 0);
    assert_eq!(rs.rows_affected, None);

    let rs = run(&url, "SELECT event FROM audit WHERE event = 'none'").await;
    assert_eq!(rs.columns, vec!["event".to_string()]);
    assert_eq!(rs.rows_affected, None);

    let rs = run(&url, "DELETE FROM audit").await;
    assert!(rs.columns.is_empty());
    assert_eq!(rs.rows_affected, Some(0));
}

#[tokio::test]
async fn test_pool_acquire_timeout_reports_configured_seconds() {
    let (_path, url) = temp_db();
    let db = Database::new(Arc::new(SqlxDriver::new()));
    let options = PoolOptions {
        max_connections: Some(1),
        acquire_timeout_secs: Some(1),
        ..PoolOptions::default()
    };
    db.create_pool(&PoolConfig::new(ConnectInfo::new(&url)).with_options(options))
        .await
        .unwrap();

    let held = db.get_connection().await.unwrap();
    let err = db.get_connection().await.unwrap_err();
    assert!(
        matches!(err, DbError::Timeout { elapsed_secs: 1, .. }),
        "{err:?}"
    );

    db.release_connection(held).await;
    db.terminate_pool().await.unwrap();
}

#[tokio::test]
async fn test_postgres_round_trip() {
    let Ok(url) = std::env::var("TEST_PG_URL") else {
        eprintln!("TEST_PG_URL not set, skipping");
        return;
    };

    let db = database(&url);
    db.add_buildup_sql("SET application_name = 'db-lifecycle-test'");
    db.add_teardown_sql("RESET application_name");

    let rs = db
        .simple_execute(
            "SELECT current_setting('application_name') AS app, :n::int AS n",
            &Binds::default().with("n", 5i64),
            ExecuteOptions::default().with_out_format(OutFormat::Object),
        )
        .await
        .unwrap();
    db.wait_for_releases().await;

    assert_eq!(rs.get(0, "app"), Some(&json!("db-lifecycle-test")));
    assert_eq!(rs.get(0, "n"), Some(&json!(5)));
}

#[tokio::test]
async fn test_mysql_round_trip() {
    let Ok(url) = std::env::var("TEST_MYSQL_URL") else {
        eprintln!("TEST_MYSQL_URL not set, skipping");
        return;
    };

    let db = database(&url);
    db.add_buildup_sql("SET @lifecycle = 'buildup'");

    let rs = db
        .simple_execute(
            "SELECT @lifecycle AS marker, ? + 1 AS n",
            &Binds::positional([41i64]),
            ExecuteOptions::default().with_out_format(OutFormat::Object),
        )
        .await
        .unwrap();
    db.wait_for_releases().await;

    assert_eq!(rs.get(0, "marker"), Some(&json!("buildup")));
    assert_eq!(rs.row_count(), 1);
}
