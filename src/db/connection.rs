use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::db::migration::run_migrations;

pub async fn establish_connection(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    // In-memory databases live per connection, so they get exactly one.
    let in_memory = database_url.contains(":memory:");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let options = if in_memory {
        options
    } else {
        options.journal_mode(SqliteJournalMode::Wal)
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(if in_memory { 1 } else { 5 })
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}
