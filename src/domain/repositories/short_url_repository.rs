//! Repository trait for short URL data access.

use crate::domain::entities::{NewOutgoingEvent, NewShortUrl, ShortUrl, UrlMetadata};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for short URL rows.
///
/// The two write operations are transaction-composite on purpose: a domain
/// mutation and its outbox event either both commit or neither is visible.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgShortUrlRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShortUrlRepository: Send + Sync {
    /// Finds a short URL by its code.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Database`] on database errors.
    async fn find_by_code(&self, short_code: &str) -> Result<Option<ShortUrl>, AppError>;

    /// Finds a short URL by its original URL.
    ///
    /// Used to make shorten idempotent on the input URL.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Database`] on database errors.
    async fn find_by_original_url(&self, original_url: &str)
    -> Result<Option<ShortUrl>, AppError>;

    /// Inserts a new ACTIVE short URL together with a Pending outbox event
    /// in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::CodeCollision`] when the code is already taken,
    /// [`AppError::Database`] on any other database error.
    async fn insert_with_event(
        &self,
        new_url: NewShortUrl,
        event: NewOutgoingEvent,
    ) -> Result<ShortUrl, AppError>;

    /// Replaces the `metadata` field of an existing row and inserts a Pending
    /// outbox event in a single transaction. Touches no other column besides
    /// `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::UrlNotFound`] when no row matches `short_code`,
    /// [`AppError::Database`] on database errors.
    async fn set_metadata_with_event(
        &self,
        short_code: &str,
        metadata: UrlMetadata,
        event: NewOutgoingEvent,
    ) -> Result<ShortUrl, AppError>;
}
