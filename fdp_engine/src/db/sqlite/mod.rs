pub mod db;
mod errors;

pub mod orders;
pub mod participants;
pub mod payments;

use std::{env, str::FromStr};

pub use db::SqliteDatabase;
pub use errors::SqliteDatabaseError;
use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

const SQLITE_DB_URL: &str = "sqlite://data/fdp_orders.db";

pub fn db_url() -> String {
    let result = env::var("FDP_DATABASE_URL").unwrap_or_else(|_| {
        info!("FDP_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqliteDatabaseError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

/// An in-memory database lives exactly as long as its single connection, so that connection must never be recycled.
pub async fn new_memory_pool() -> Result<SqlitePool, SqliteDatabaseError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    Ok(pool)
}
