mod common;

use sqlx::{PgConnection, PgPool};
use std::sync::Arc;
use urlshortener::domain::repositories::OutgoingEventRepository;
use urlshortener::infrastructure::persistence::PgOutgoingEventRepository;

async fn seed_pending(conn: &mut PgConnection, ids: &[i64]) {
    for id in ids {
        sqlx::query(
            "INSERT INTO outgoing_events (id, topic, status, correlation_id, trace_id, span_id, payload) \
             VALUES ($1, $2, 'PENDING', $3, '', '', $4)",
        )
        .bind(id)
        .bind("urlshortener.metadata.requested.v1")
        .bind(format!("corr-{id}"))
        .bind(sqlx::types::Json(serde_json::json!({
            "event_id": id,
            "correlation_id": format!("corr-{id}"),
            "trace_id": "",
            "span_id": "",
            "occurred_at": "2026-01-01T00:00:00Z",
            "data": {}
        })))
        .execute(&mut *conn)
        .await
        .unwrap();
    }
}

#[sqlx::test]
async fn test_pending_batch_orders_by_id_ascending(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    seed_pending(&mut conn, &[5, 1, 3]).await;
    drop(conn);

    let repo = PgOutgoingEventRepository::new(Arc::new(pool));

    let batch = repo.pending_batch(10).await.unwrap();
    let ids: Vec<i64> = batch.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![1, 3, 5]);

    let limited = repo.pending_batch(2).await.unwrap();
    let ids: Vec<i64> = limited.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![1, 3]);
}

#[sqlx::test]
async fn test_published_rows_leave_the_pending_set(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    seed_pending(&mut conn, &[1, 2]).await;
    drop(conn);

    let repo = PgOutgoingEventRepository::new(Arc::new(pool.clone()));
    repo.mark_published(1).await.unwrap();

    let batch = repo.pending_batch(10).await.unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].id, 2);
    assert_eq!(
        common::event_status(&pool, 1).await.as_deref(),
        Some("PUBLISHED")
    );
}

#[sqlx::test]
async fn test_mark_retry_keeps_the_row_pending(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    seed_pending(&mut conn, &[7]).await;
    drop(conn);

    let repo = PgOutgoingEventRepository::new(Arc::new(pool));
    repo.mark_retry(7, 2, "broker down").await.unwrap();

    let batch = repo.pending_batch(10).await.unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].retry_count, 2);
    assert_eq!(batch[0].last_error.as_deref(), Some("broker down"));
}

#[sqlx::test]
async fn test_mark_failed_is_terminal(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    seed_pending(&mut conn, &[9]).await;
    drop(conn);

    let repo = PgOutgoingEventRepository::new(Arc::new(pool.clone()));
    repo.mark_failed(9, "retries exhausted").await.unwrap();

    assert!(repo.pending_batch(10).await.unwrap().is_empty());
    assert_eq!(
        common::event_status(&pool, 9).await.as_deref(),
        Some("FAILED")
    );
}
