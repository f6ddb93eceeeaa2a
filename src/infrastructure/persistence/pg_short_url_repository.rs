//! PostgreSQL implementation of the short URL repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use std::sync::Arc;

use crate::domain::entities::{NewOutgoingEvent, NewShortUrl, ShortUrl, UrlMetadata, UrlStatus};
use crate::domain::repositories::ShortUrlRepository;
use crate::error::{AppError, is_code_collision};
use crate::infrastructure::persistence::pg_outgoing_event_repository::insert_event;
use crate::infrastructure::persistence::tx::{TxRetryPolicy, in_tx};

const SELECT_COLUMNS: &str =
    "short_code, original_url, status, metadata, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ShortUrlRow {
    short_code: String,
    original_url: String,
    status: String,
    metadata: Option<Json<UrlMetadata>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ShortUrlRow> for ShortUrl {
    fn from(row: ShortUrlRow) -> Self {
        Self {
            short_code: row.short_code,
            original_url: row.original_url,
            status: UrlStatus::parse(&row.status),
            metadata: row.metadata.map(|m| m.0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PostgreSQL repository for short URL rows.
///
/// The write operations pair the domain mutation with its outbox insert in
/// one transaction via [`in_tx`], which also owns the transient-failure
/// retry policy.
pub struct PgShortUrlRepository {
    pool: Arc<PgPool>,
    retry: TxRetryPolicy,
}

impl PgShortUrlRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            pool,
            retry: TxRetryPolicy::default(),
        }
    }
}

#[async_trait]
impl ShortUrlRepository for PgShortUrlRepository {
    async fn find_by_code(&self, short_code: &str) -> Result<Option<ShortUrl>, AppError> {
        let row = sqlx::query_as::<_, ShortUrlRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM short_urls WHERE short_code = $1"
        ))
        .bind(short_code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(ShortUrl::from))
    }

    async fn find_by_original_url(
        &self,
        original_url: &str,
    ) -> Result<Option<ShortUrl>, AppError> {
        let row = sqlx::query_as::<_, ShortUrlRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM short_urls WHERE original_url = $1 LIMIT 1"
        ))
        .bind(original_url)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(ShortUrl::from))
    }

    async fn insert_with_event(
        &self,
        new_url: NewShortUrl,
        event: NewOutgoingEvent,
    ) -> Result<ShortUrl, AppError> {
        let attempted_code = new_url.short_code.clone();

        let result = in_tx(&self.pool, &self.retry, move |conn| {
            let new_url = new_url.clone();
            let event = event.clone();
            Box::pin(async move {
                let row = sqlx::query_as::<_, ShortUrlRow>(&format!(
                    "INSERT INTO short_urls (short_code, original_url, status) \
                     VALUES ($1, $2, 'ACTIVE') \
                     RETURNING {SELECT_COLUMNS}"
                ))
                .bind(&new_url.short_code)
                .bind(&new_url.original_url)
                .fetch_one(&mut *conn)
                .await?;

                insert_event(conn, &event).await?;

                Ok(ShortUrl::from(row))
            })
        })
        .await;

        match result {
            Err(AppError::Database(e)) if is_code_collision(&e) => Err(AppError::CodeCollision {
                short_code: attempted_code,
            }),
            other => other,
        }
    }

    async fn set_metadata_with_event(
        &self,
        short_code: &str,
        metadata: UrlMetadata,
        event: NewOutgoingEvent,
    ) -> Result<ShortUrl, AppError> {
        let short_code = short_code.to_string();

        in_tx(&self.pool, &self.retry, move |conn| {
            let short_code = short_code.clone();
            let metadata = metadata.clone();
            let event = event.clone();
            Box::pin(async move {
                let row = sqlx::query_as::<_, ShortUrlRow>(&format!(
                    "UPDATE short_urls SET metadata = $2, updated_at = NOW() \
                     WHERE short_code = $1 \
                     RETURNING {SELECT_COLUMNS}"
                ))
                .bind(&short_code)
                .bind(Json(&metadata))
                .fetch_optional(&mut *conn)
                .await?
                .ok_or(AppError::UrlNotFound { short_code })?;

                insert_event(conn, &event).await?;

                Ok(ShortUrl::from(row))
            })
        })
        .await
    }
}
