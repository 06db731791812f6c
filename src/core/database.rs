use crate::core::config::DatabaseConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .connect(&config.url)
        .await
}

/// Maps a unique-constraint violation to `Conflict`, everything else to `Database`
pub fn map_unique_violation(e: sqlx::Error, message: &str) -> crate::core::error::AppError {
    use crate::core::error::AppError;

    match e.as_database_error() {
        Some(db) if db.is_unique_violation() => AppError::Conflict(message.to_string()),
        _ => {
            tracing::error!("Database write failed: {:?}", e);
            AppError::Database(e)
        }
    }
}
