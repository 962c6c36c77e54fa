//! # Database Persistence Layer
//!
//! Optional Postgres write-through via SQLx. When `DATABASE_URL` is set,
//! departments, users, courses, arrangements and sections are stored as JSONB
//! documents and every workflow transition appends to a hash-chained audit
//! log. When absent, the API runs in-memory only.
//!
//! Notifications and chat are not persisted.

pub mod arrangements;
pub mod audit;
pub mod courses;
pub mod departments;
pub mod sections;
pub mod users;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Connect and run migrations. Returns `None` when no URL is configured.
pub async fn init_pool(database_url: Option<&str>) -> Result<Option<PgPool>, sqlx::Error> {
    let url = match database_url {
        Some(url) => url,
        None => {
            tracing::warn!(
                "DATABASE_URL not set, running in-memory only. State will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

/// Serialize a document for a JSONB column.
pub(crate) fn to_document<T: serde::Serialize>(
    value: &T,
) -> Result<serde_json::Value, sqlx::Error> {
    serde_json::to_value(value).map_err(|e| {
        tracing::error!(error = %e, "failed to serialize document");
        sqlx::Error::Encode(Box::new(e))
    })
}

/// Deserialize a JSONB document read back from the database.
pub(crate) fn from_document<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
) -> Result<T, sqlx::Error> {
    serde_json::from_value(value).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}
