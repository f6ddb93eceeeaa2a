//! PostgreSQL implementation of the outbox repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;

use crate::domain::entities::{EventPayload, EventStatus, NewOutgoingEvent, OutgoingEvent};
use crate::domain::repositories::OutgoingEventRepository;
use crate::error::AppError;

#[derive(sqlx::FromRow)]
struct OutgoingEventRow {
    id: i64,
    topic: String,
    status: String,
    retry_count: i32,
    last_error: Option<String>,
    correlation_id: String,
    trace_id: String,
    span_id: String,
    payload: Json<EventPayload>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OutgoingEventRow> for OutgoingEvent {
    fn from(row: OutgoingEventRow) -> Self {
        Self {
            id: row.id,
            topic: row.topic,
            status: EventStatus::parse(&row.status),
            retry_count: row.retry_count,
            last_error: row.last_error,
            correlation_id: row.correlation_id,
            trace_id: row.trace_id,
            span_id: row.span_id,
            payload: row.payload.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Inserts a Pending outbox row on an existing connection.
///
/// Shared with the short URL repository so the outbox insert can join the
/// caller's transaction instead of opening its own.
pub(crate) async fn insert_event(
    conn: &mut PgConnection,
    event: &NewOutgoingEvent,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO outgoing_events \
         (id, topic, status, correlation_id, trace_id, span_id, payload) \
         VALUES ($1, $2, 'PENDING', $3, $4, $5, $6)",
    )
    .bind(event.id)
    .bind(&event.topic)
    .bind(&event.correlation_id)
    .bind(&event.trace_id)
    .bind(&event.span_id)
    .bind(Json(&event.payload))
    .execute(conn)
    .await?;

    Ok(())
}

/// PostgreSQL repository for outbox rows.
///
/// Only the producer loop mutates rows through this repository, and each
/// update touches exactly the columns its method names plus `updated_at` -
/// PUBLISHED and FAILED are terminal and never written back to PENDING.
pub struct PgOutgoingEventRepository {
    pool: Arc<PgPool>,
}

impl PgOutgoingEventRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutgoingEventRepository for PgOutgoingEventRepository {
    async fn pending_batch(&self, limit: i64) -> Result<Vec<OutgoingEvent>, AppError> {
        let rows = sqlx::query_as::<_, OutgoingEventRow>(
            "SELECT id, topic, status, retry_count, last_error, correlation_id, \
                    trace_id, span_id, payload, created_at, updated_at \
             FROM outgoing_events \
             WHERE status = $1 \
             ORDER BY id ASC \
             LIMIT $2",
        )
        .bind(EventStatus::Pending.as_str())
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(OutgoingEvent::from).collect())
    }

    async fn mark_published(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("UPDATE outgoing_events SET status = 'PUBLISHED', updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn mark_retry(
        &self,
        id: i64,
        retry_count: i32,
        last_error: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE outgoing_events \
             SET retry_count = $2, last_error = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(retry_count)
        .bind(last_error)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn mark_failed(&self, id: i64, last_error: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE outgoing_events \
             SET status = 'FAILED', last_error = $2, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(last_error)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }
}
