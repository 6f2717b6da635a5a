//! Database pool setup.
//!
//! All SQL elsewhere in the crate is runtime-checked (`sqlx::query`, not the
//! compile-time macros) so builds don't need a live `DATABASE_URL`.

use std::str::FromStr as _;

use anyhow::{Context as _, Result};
use sqlx::sqlite::SqliteConnectOptions;

/// The main database connection pool type.
pub type Db = sqlx::SqlitePool;

/// Open the database (creating the file if missing) and apply pending
/// migrations.
pub async fn establish(url: &str) -> Result<Db> {
    let opts = SqliteConnectOptions::from_str(url)
        .context("failed to parse database options")?
        .create_if_missing(true);

    let db = sqlx::SqlitePool::connect_with(opts)
        .await
        .context("failed to open database")?;

    sqlx::migrate!()
        .run(&db)
        .await
        .context("failed to apply migrations")?;

    Ok(db)
}
