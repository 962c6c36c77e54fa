//! User persistence. Emails are unique, matching the in-memory check.

use sqlx::PgPool;

use super::{from_document, to_document};
use crate::state::UserRecord;

/// Insert or replace a user.
pub async fn upsert(pool: &PgPool, user: &UserRecord) -> Result<(), sqlx::Error> {
    let document = to_document(user)?;

    sqlx::query(
        "INSERT INTO users (id, email, role, department_id, document, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, NOW())
         ON CONFLICT (id) DO UPDATE
         SET email = EXCLUDED.email, role = EXCLUDED.role,
             department_id = EXCLUDED.department_id,
             document = EXCLUDED.document, updated_at = NOW()",
    )
    .bind(user.id.as_uuid())
    .bind(&user.email)
    .bind(user.role.as_str())
    .bind(user.department_id.map(|d| *d.as_uuid()))
    .bind(&document)
    .bind(user.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all users on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<UserRecord>, sqlx::Error> {
    let rows: Vec<(serde_json::Value,)> =
        sqlx::query_as("SELECT document FROM users ORDER BY created_at")
            .fetch_all(pool)
            .await?;

    rows.into_iter()
        .map(|(document,)| from_document(document))
        .collect()
}
