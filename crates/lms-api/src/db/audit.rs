//! Audit event persistence: an append-only, hash-chained log.
//!
//! Every workflow transition appends an event whose hash chains to the
//! previous event's hash, forming a tamper-evident log. Chain order is the
//! `seq` column assigned at insert, never wall-clock time.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

/// Hash that starts the chain.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

const ROW_COLUMNS: &str = "seq, id, event_type, actor, resource_type, resource_id,
     action, metadata, previous_hash, event_hash, created_at";

/// An audit event to be persisted.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Dotted event name, e.g. `arrangement.submitted`.
    pub event_type: String,
    /// Acting user (`user:<uuid>`) or `service`.
    pub actor: Option<String>,
    pub resource_type: String,
    pub resource_id: Uuid,
    pub action: String,
    pub metadata: serde_json::Value,
}

/// Append an event to the log, chaining to the most recent hash.
pub async fn append(pool: &PgPool, event: AuditEvent) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    let mut tx = pool.begin().await?;

    // Serialize appenders so two events never chain to the same predecessor.
    sqlx::query("LOCK TABLE audit_events IN SHARE ROW EXCLUSIVE MODE")
        .execute(&mut *tx)
        .await?;

    let previous_hash: Option<String> =
        sqlx::query_scalar("SELECT event_hash FROM audit_events ORDER BY seq DESC LIMIT 1")
            .fetch_optional(&mut *tx)
            .await?;
    let prev = previous_hash.as_deref().unwrap_or(GENESIS_HASH);
    let event_hash = chain_hash(prev, &event);

    sqlx::query(
        "INSERT INTO audit_events (id, event_type, actor, resource_type, resource_id,
         action, metadata, previous_hash, event_hash, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, clock_timestamp())",
    )
    .bind(id)
    .bind(&event.event_type)
    .bind(&event.actor)
    .bind(&event.resource_type)
    .bind(event.resource_id)
    .bind(&event.action)
    .bind(&event.metadata)
    .bind(prev)
    .bind(&event_hash)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(id)
}

/// Query audit events for a specific resource, oldest first.
pub async fn events_for_resource(
    pool: &PgPool,
    resource_type: &str,
    resource_id: Uuid,
) -> Result<Vec<AuditEventRow>, sqlx::Error> {
    sqlx::query_as::<_, AuditEventRow>(&format!(
        "SELECT {ROW_COLUMNS} FROM audit_events
         WHERE resource_type = $1 AND resource_id = $2
         ORDER BY seq ASC"
    ))
    .bind(resource_type)
    .bind(resource_id)
    .fetch_all(pool)
    .await
}

/// Verify the first `limit` events of the chain.
pub async fn verify_chain_integrity(
    pool: &PgPool,
    limit: i64,
) -> Result<ChainIntegrityResult, sqlx::Error> {
    let events = sqlx::query_as::<_, AuditEventRow>(&format!(
        "SELECT {ROW_COLUMNS} FROM audit_events ORDER BY seq ASC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(verify_links(&events))
}

/// Check a chain segment that starts at the genesis event.
///
/// A link is broken when an event's `previous_hash` is not the hash of the
/// event before it. An event is tampered when its stored hash does not match
/// the hash recomputed from its own fields.
pub fn verify_links(events: &[AuditEventRow]) -> ChainIntegrityResult {
    let mut broken_links = 0;
    let mut tampered_events = 0;
    let mut last_hash = GENESIS_HASH;

    for row in events {
        let prev = row.previous_hash.as_deref().unwrap_or(GENESIS_HASH);
        if prev != last_hash {
            broken_links += 1;
        }
        if chain_hash(prev, &row.event()) != row.event_hash {
            tampered_events += 1;
        }
        last_hash = row.event_hash.as_str();
    }

    ChainIntegrityResult {
        total_events: events.len(),
        broken_links,
        tampered_events,
        chain_valid: broken_links == 0 && tampered_events == 0,
    }
}

/// Result of chain integrity verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ChainIntegrityResult {
    pub total_events: usize,
    pub broken_links: usize,
    pub tampered_events: usize,
    pub chain_valid: bool,
}

/// Database row for audit events.
#[derive(Debug, Clone, Serialize, ToSchema, sqlx::FromRow)]
pub struct AuditEventRow {
    pub seq: i64,
    pub id: Uuid,
    pub event_type: String,
    pub actor: Option<String>,
    pub resource_type: String,
    pub resource_id: Uuid,
    pub action: String,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub previous_hash: Option<String>,
    pub event_hash: String,
    pub created_at: DateTime<Utc>,
}

impl AuditEventRow {
    fn event(&self) -> AuditEvent {
        AuditEvent {
            event_type: self.event_type.clone(),
            actor: self.actor.clone(),
            resource_type: self.resource_type.clone(),
            resource_id: self.resource_id,
            action: self.action.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// SHA-256 over the previous hash and the event's identifying fields, hex encoded.
pub fn chain_hash(previous_hash: &str, event: &AuditEvent) -> String {
    let mut hasher = Sha256::new();
    hasher.update(previous_hash.as_bytes());
    hasher.update(event.event_type.as_bytes());
    hasher.update(event.resource_type.as_bytes());
    hasher.update(event.resource_id.as_bytes());
    hasher.update(event.action.as_bytes());
    hasher.update(event.metadata.to_string().as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
