//! Department persistence.

use sqlx::PgPool;

use super::{from_document, to_document};
use crate::state::DepartmentRecord;

/// Insert or replace a department.
pub async fn upsert(pool: &PgPool, department: &DepartmentRecord) -> Result<(), sqlx::Error> {
    let document = to_document(department)?;

    sqlx::query(
        "INSERT INTO departments (id, name, document, created_at, updated_at)
         VALUES ($1, $2, $3, $4, NOW())
         ON CONFLICT (id) DO UPDATE
         SET name = EXCLUDED.name, document = EXCLUDED.document, updated_at = NOW()",
    )
    .bind(department.id.as_uuid())
    .bind(&department.name)
    .bind(&document)
    .bind(department.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all departments on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<DepartmentRecord>, sqlx::Error> {
    let rows: Vec<(serde_json::Value,)> =
        sqlx::query_as("SELECT document FROM departments ORDER BY created_at")
            .fetch_all(pool)
            .await?;

    rows.into_iter()
        .map(|(document,)| from_document(document))
        .collect()
}
