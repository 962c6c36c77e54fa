//! Course persistence.
//!
//! Lifecycle rules are enforced by `lms_state::Course`; this module only
//! stores the result.

use lms_state::Course;
use sqlx::PgPool;

use super::{from_document, to_document};

/// Insert or replace a course.
pub async fn upsert(pool: &PgPool, course: &Course) -> Result<(), sqlx::Error> {
    let document = to_document(course)?;

    sqlx::query(
        "INSERT INTO courses (id, code, department_id, state, document, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, NOW())
         ON CONFLICT (id) DO UPDATE
         SET code = EXCLUDED.code, state = EXCLUDED.state,
             document = EXCLUDED.document, updated_at = NOW()",
    )
    .bind(course.id.as_uuid())
    .bind(&course.code)
    .bind(course.department_id.as_uuid())
    .bind(course.state.as_str())
    .bind(&document)
    .bind(course.created_at.as_datetime())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all courses on startup.
///
/// A row whose document fails to decode aborts hydration rather than
/// silently dropping a course.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Course>, sqlx::Error> {
    let rows: Vec<(serde_json::Value,)> =
        sqlx::query_as("SELECT document FROM courses ORDER BY created_at")
            .fetch_all(pool)
            .await?;

    rows.into_iter()
        .map(|(document,)| from_document(document))
        .collect()
}
