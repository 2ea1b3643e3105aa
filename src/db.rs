//! SQLite pool setup and migration runner (spec §4.13 persistence note).

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

/// Opens the SQLite pool backing the database, creating the file if absent,
/// and applies any pending migrations from `migrations/`.
///
/// # Errors
///
/// Returns an error if the connection cannot be established or a migration
/// fails to apply.
pub async fn connect(path: &std::path::Path, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
