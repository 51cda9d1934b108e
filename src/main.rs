//! db-lifecycle - Main entry point.
//!
//! Runs one SQL statement through the lifecycle facade: buildup scripts after
//! acquisition, the statement, then teardown scripts before release. The
//! result set is printed to stdout as JSON.

use clap::Parser;
use db_lifecycle::config::Config;
use db_lifecycle::models::{Binds, ExecuteOptions, PoolConfig};
use db_lifecycle::{Database, SqlxDriver};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so stdout carries only the result
    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

// Single-threaded, so the deferred release never overtakes the result
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    init_tracing(&config);

    info!(
        on_buildup_failure = %config.on_buildup_failure,
        pool = config.pool,
        "Starting db-lifecycle v{}",
        env!("CARGO_PKG_VERSION")
    );

    let driver = Arc::new(SqlxDriver::with_statement_timeout(config.statement_timeout));
    let db = Database::with_options(driver, config.lifecycle_options());

    let connect_info = config.connect_info();
    db.set_connect_info(&connect_info);
    if config.pool {
        let pool_config = PoolConfig::new(connect_info).with_options(config.pool_options());
        db.create_pool(&pool_config).await?;
    }

    for sql in &config.buildup {
        db.add_buildup_sql(sql.as_str());
    }
    for sql in &config.teardown {
        db.add_teardown_sql(sql.as_str());
    }

    let binds = Binds::positional(config.binds.iter().cloned());
    let mut options = ExecuteOptions::new().with_out_format(config.out_format);
    if config.no_auto_commit {
        options = options.with_auto_commit(false);
        options.is_auto_commit = Some(false);
    }

    let result = db.simple_execute(&config.sql, &binds, options).await;

    // Releases are deferred; let them finish before the runtime goes away
    db.wait_for_releases().await;
    if let Err(e) = db.terminate_pool().await {
        error!(error = %e, "Failed to terminate connection pool");
    }

    match result {
        Ok(rs) => {
            println!("{}", serde_json::to_string_pretty(&rs)?);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Statement failed");
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            Err(e.into())
        }
    }
}
