#![allow(dead_code)]

use std::collections::BTreeMap;

use sqlx::PgPool;
use urlshortener::domain::RequestScope;
use urlshortener::domain::entities::{NewOutgoingEvent, TOPIC_METADATA_REQUESTED};

pub fn test_event(id: i64, short_code: &str) -> NewOutgoingEvent {
    let scope = RequestScope::for_consumer(format!("corr-{id}"));
    let mut data = BTreeMap::new();
    data.insert("short_code".to_string(), short_code.to_string());
    data.insert(
        "original_url".to_string(),
        "https://example.com/".to_string(),
    );
    NewOutgoingEvent::from_scope(id, TOPIC_METADATA_REQUESTED, &scope, data)
}

pub async fn event_status(pool: &PgPool, id: i64) -> Option<String> {
    sqlx::query_scalar::<_, String>("SELECT status FROM outgoing_events WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .unwrap()
}

pub async fn short_url_exists(pool: &PgPool, short_code: &str) -> bool {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM short_urls WHERE short_code = $1")
        .bind(short_code)
        .fetch_one(pool)
        .await
        .unwrap()
        > 0
}

pub async fn insert_short_url(pool: &PgPool, short_code: &str, original_url: &str) {
    sqlx::query("INSERT INTO short_urls (short_code, original_url, status) VALUES ($1, $2, 'ACTIVE')")
        .bind(short_code)
        .bind(original_url)
        .execute(pool)
        .await
        .unwrap();
}
