pub mod measurement_store;
pub mod trigger_rule_repository;

pub use measurement_store::SqliteMeasurementStore;
pub use trigger_rule_repository::SqliteTriggerRuleRepository;

use anyhow::Result;
use sqlx::{Pool, Sqlite, sqlite::SqlitePoolOptions};

/// Open the daemon's SQLite database
pub async fn connect(connection_string: &str) -> Result<Pool<Sqlite>> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1) // SQLite is single-writer
        .connect(connection_string)
        .await?;
    Ok(pool)
}
