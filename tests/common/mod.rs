//! Shared test pool setup: a fresh in-memory SQLite database with every
//! migration applied, matching what `db::connect` gives `serve` at startup.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool should connect");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrations should apply");
    pool
}
