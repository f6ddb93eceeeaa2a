mod common;

use sqlx::PgPool;
use std::sync::Arc;
use urlshortener::domain::entities::{NewShortUrl, UrlMetadata, UrlStatus};
use urlshortener::domain::repositories::ShortUrlRepository;
use urlshortener::error::AppError;
use urlshortener::infrastructure::persistence::PgShortUrlRepository;

fn new_url(code: &str, url: &str) -> NewShortUrl {
    NewShortUrl {
        short_code: code.to_string(),
        original_url: url.to_string(),
    }
}

#[sqlx::test]
async fn test_insert_with_event_writes_both_rows(pool: PgPool) {
    let repo = PgShortUrlRepository::new(Arc::new(pool.clone()));

    let result = repo
        .insert_with_event(
            new_url("abc1234", "https://example.com/page"),
            common::test_event(11, "abc1234"),
        )
        .await;

    let record = result.unwrap();
    assert_eq!(record.short_code, "abc1234");
    assert_eq!(record.original_url, "https://example.com/page");
    assert_eq!(record.status, UrlStatus::Active);
    assert!(record.metadata.is_none());

    assert_eq!(
        common::event_status(&pool, 11).await.as_deref(),
        Some("PENDING")
    );
}

#[sqlx::test]
async fn test_insert_collision_leaves_no_event_row(pool: PgPool) {
    common::insert_short_url(&pool, "taken12", "https://example.com/first").await;
    let repo = PgShortUrlRepository::new(Arc::new(pool.clone()));

    let result = repo
        .insert_with_event(
            new_url("taken12", "https://example.com/second"),
            common::test_event(22, "taken12"),
        )
        .await;

    assert!(matches!(
        result,
        Err(AppError::CodeCollision { short_code }) if short_code == "taken12"
    ));
    assert_eq!(common::event_status(&pool, 22).await, None);
}

#[sqlx::test]
async fn test_failed_event_insert_rolls_back_the_url_row(pool: PgPool) {
    let repo = PgShortUrlRepository::new(Arc::new(pool.clone()));

    // Occupy the event id so the outbox insert violates its primary key
    // after the URL insert has already succeeded inside the transaction.
    repo.insert_with_event(
        new_url("first12", "https://example.com/first"),
        common::test_event(33, "first12"),
    )
    .await
    .unwrap();

    let result = repo
        .insert_with_event(
            new_url("fresh12", "https://example.com/fresh"),
            common::test_event(33, "fresh12"),
        )
        .await;

    assert!(matches!(result, Err(AppError::Database(_))));
    assert!(!common::short_url_exists(&pool, "fresh12").await);
}

#[sqlx::test]
async fn test_set_metadata_with_event_updates_atomically(pool: PgPool) {
    common::insert_short_url(&pool, "meta123", "https://example.com/article").await;
    let repo = PgShortUrlRepository::new(Arc::new(pool.clone()));

    let metadata = UrlMetadata {
        final_url: "https://example.com/article".to_string(),
        title: "An Article".to_string(),
        description: "About things".to_string(),
        image: String::new(),
        favicon: "https://example.com/favicon.ico".to_string(),
    };

    let record = repo
        .set_metadata_with_event("meta123", metadata, common::test_event(44, "meta123"))
        .await
        .unwrap();

    assert_eq!(record.metadata.unwrap().title, "An Article");
    assert_eq!(
        common::event_status(&pool, 44).await.as_deref(),
        Some("PENDING")
    );
}

#[sqlx::test]
async fn test_set_metadata_unknown_code_writes_nothing(pool: PgPool) {
    let repo = PgShortUrlRepository::new(Arc::new(pool.clone()));

    let result = repo
        .set_metadata_with_event(
            "missing1",
            UrlMetadata::default(),
            common::test_event(55, "missing1"),
        )
        .await;

    assert!(matches!(
        result,
        Err(AppError::UrlNotFound { short_code }) if short_code == "missing1"
    ));
    assert_eq!(common::event_status(&pool, 55).await, None);
}

#[sqlx::test]
async fn test_find_by_original_url_returns_existing(pool: PgPool) {
    common::insert_short_url(&pool, "known12", "https://example.com/known").await;
    let repo = PgShortUrlRepository::new(Arc::new(pool));

    let found = repo
        .find_by_original_url("https://example.com/known")
        .await
        .unwrap();
    assert_eq!(found.unwrap().short_code, "known12");

    let missing = repo
        .find_by_original_url("https://example.com/other")
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[sqlx::test]
async fn test_find_by_code_not_found(pool: PgPool) {
    let repo = PgShortUrlRepository::new(Arc::new(pool));

    let found = repo.find_by_code("nothere").await.unwrap();
    assert!(found.is_none());
}
