//! Repository trait for the transactional outbox.

use crate::domain::entities::OutgoingEvent;
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for outbox rows.
///
/// Updates are explicit field-set operations rather than a generic patch:
/// each method names exactly the columns it touches (plus `updated_at`),
/// which keeps the terminal-state rules auditable in one place.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgOutgoingEventRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OutgoingEventRepository: Send + Sync {
    /// Returns up to `limit` PENDING events ordered by ascending `id`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Database`] on database errors.
    async fn pending_batch(&self, limit: i64) -> Result<Vec<OutgoingEvent>, AppError>;

    /// Marks an event PUBLISHED. Terminal: the row is never polled again.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Database`] on database errors.
    async fn mark_published(&self, id: i64) -> Result<(), AppError>;

    /// Records a failed publish attempt while keeping the row PENDING, so the
    /// next poll re-enumerates it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Database`] on database errors.
    async fn mark_retry(&self, id: i64, retry_count: i32, last_error: &str)
    -> Result<(), AppError>;

    /// Marks an event FAILED with its final error. Terminal.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Database`] on database errors.
    async fn mark_failed(&self, id: i64, last_error: &str) -> Result<(), AppError>;
}
