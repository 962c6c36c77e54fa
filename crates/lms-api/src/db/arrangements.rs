//! Content arrangement persistence. One row per course.

use lms_state::ContentArrangement;
use sqlx::PgPool;

use super::{from_document, to_document};

/// Insert or replace the arrangement for its course.
pub async fn upsert(pool: &PgPool, arrangement: &ContentArrangement) -> Result<(), sqlx::Error> {
    let document = to_document(arrangement)?;
    let version = i32::try_from(arrangement.version)
        .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    sqlx::query(
        "INSERT INTO arrangements (course_id, state, version, document, updated_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (course_id) DO UPDATE
         SET state = EXCLUDED.state, version = EXCLUDED.version,
             document = EXCLUDED.document, updated_at = EXCLUDED.updated_at",
    )
    .bind(arrangement.course_id.as_uuid())
    .bind(arrangement.state.as_str())
    .bind(version)
    .bind(&document)
    .bind(arrangement.updated_at.as_datetime())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all arrangements on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<ContentArrangement>, sqlx::Error> {
    let rows: Vec<(serde_json::Value,)> = sqlx::query_as("SELECT document FROM arrangements")
        .fetch_all(pool)
        .await?;

    rows.into_iter()
        .map(|(document,)| from_document(document))
        .collect()
}
