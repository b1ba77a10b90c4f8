use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{ConnectOptions, SqlitePool};
use std::str::FromStr;
use std::time::Duration;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS invoice (
    id            INTEGER PRIMARY KEY,
    delivery_code TEXT UNIQUE,
    receipt_blob  BLOB NOT NULL,
    print_status  TEXT
)
"#;

/// Opens the ledger. Called once at process start.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let mut connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    // slow statement threshold: 5s
    connect_options = connect_options.log_slow_statements(
        tracing::log::LevelFilter::Warn,
        Duration::from_secs(5),
    );

    // every in-memory connection is its own database, keep exactly one alive
    let in_memory = database_url.contains(":memory:");
    let options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(10))
    };

    options.connect_with(connect_options).await
}

/// Creates the `invoice` table if it does not exist.
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(SCHEMA).execute(pool).await?;
    Ok(())
}
