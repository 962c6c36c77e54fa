//! Section persistence. The roster lives in the JSONB document.

use sqlx::PgPool;

use super::{from_document, to_document};
use crate::state::SectionRecord;

/// Insert or replace a section.
pub async fn upsert(pool: &PgPool, section: &SectionRecord) -> Result<(), sqlx::Error> {
    let document = to_document(section)?;

    sqlx::query(
        "INSERT INTO sections (id, course_id, document, created_at, updated_at)
         VALUES ($1, $2, $3, $4, NOW())
         ON CONFLICT (id) DO UPDATE
         SET document = EXCLUDED.document, updated_at = NOW()",
    )
    .bind(section.id.as_uuid())
    .bind(section.course_id.as_uuid())
    .bind(&document)
    .bind(section.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all sections on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<SectionRecord>, sqlx::Error> {
    let rows: Vec<(serde_json::Value,)> =
        sqlx::query_as("SELECT document FROM sections ORDER BY created_at")
            .fetch_all(pool)
            .await?;

    rows.into_iter()
        .map(|(document,)| from_document(document))
        .collect()
}
