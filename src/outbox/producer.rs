//! Outbox producer loop: polls PENDING events and publishes them.

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::ProducerConfig;
use crate::domain::entities::{EventPayload, OutgoingEvent};
use crate::domain::repositories::OutgoingEventRepository;
use crate::infrastructure::broker::EventPublisher;
use crate::telemetry;

/// Single-instance producer draining the outbox.
///
/// Batches never overlap: `run` fully processes one batch, sleeps the
/// polling interval, and polls again. Within a batch, events are published
/// serially when `max_concurrency <= 1` (preserving outbox order) or with
/// bounded concurrency otherwise.
///
/// Delivery is at-least-once. A publish that succeeds but whose
/// `mark_published` update fails is re-published on the next poll, which is
/// why `event_id` doubles as the consumer idempotency key.
pub struct OutboxProducer {
    repository: Arc<dyn OutgoingEventRepository>,
    publisher: Arc<dyn EventPublisher>,
    config: ProducerConfig,
}

impl OutboxProducer {
    pub fn new(
        repository: Arc<dyn OutgoingEventRepository>,
        publisher: Arc<dyn EventPublisher>,
        config: ProducerConfig,
    ) -> Self {
        Self {
            repository,
            publisher,
            config,
        }
    }

    /// Runs the poll loop until `shutdown` is cancelled. The batch in flight
    /// finishes before the loop exits.
    pub async fn run(&self, shutdown: CancellationToken) {
        tracing::info!(
            polling_interval_ms = self.config.polling_interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            max_retry = self.config.max_retry,
            max_concurrency = self.config.max_concurrency,
            "outbox producer started"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            self.process_batch(&shutdown).await;

            tokio::select! {
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(self.config.polling_interval) => {}
            }
        }

        tracing::info!("outbox producer stopped");
    }

    /// Processes one poll: fetch up to `batch_size` PENDING events and
    /// publish them. Errors are absorbed here; the loop never dies.
    pub async fn process_batch(&self, shutdown: &CancellationToken) {
        let batch = match self.repository.pending_batch(self.config.batch_size).await {
            Ok(batch) => batch,
            Err(e) => {
                tracing::error!(error = %e, "failed to fetch pending events");
                return;
            }
        };

        if batch.is_empty() {
            tracing::debug!("no pending events");
            return;
        }

        tracing::debug!(count = batch.len(), "processing pending events");

        if self.config.max_concurrency <= 1 {
            for event in batch {
                if shutdown.is_cancelled() {
                    break;
                }
                self.publish_event(event).await;
            }
        } else {
            futures::stream::iter(batch)
                .for_each_concurrent(self.config.max_concurrency, |event| async {
                    if shutdown.is_cancelled() {
                        return;
                    }
                    self.publish_event(event).await;
                })
                .await;
        }
    }

    /// Publishes one event and records the outcome on its row.
    ///
    /// On failure the attempt count `retry_count + 1` is compared against
    /// `max_retry`: within budget the row stays PENDING with a bumped
    /// `retry_count`, beyond it the row goes FAILED. Terminal either way
    /// for this poll; the next poll re-enumerates only PENDING rows.
    async fn publish_event(&self, event: OutgoingEvent) {
        let span = tracing::info_span!(
            "publish_message",
            otel.name = %format!("Producer.PublishMessage | Topic: {}", event.topic),
            topic = %event.topic,
            event_id = event.id,
            correlation_id = %event.correlation_id,
        );
        telemetry::adopt_remote_parent(&span, &event.trace_id, &event.span_id);

        async {
            match self.try_publish(&event).await {
                Ok(()) => {
                    tracing::info!("event published");
                    if let Err(e) = self.repository.mark_published(event.id).await {
                        tracing::error!(error = %e, "failed to mark event published");
                    }
                }
                Err(reason) => {
                    let attempts = event.retry_count + 1;
                    if attempts > self.config.max_retry {
                        tracing::error!(
                            error = %reason,
                            attempts,
                            "event exhausted its retry budget"
                        );
                        if let Err(e) = self.repository.mark_failed(event.id, &reason).await {
                            tracing::error!(error = %e, "failed to mark event failed");
                        }
                    } else {
                        tracing::warn!(error = %reason, attempts, "publish failed, will retry");
                        if let Err(e) = self
                            .repository
                            .mark_retry(event.id, attempts, &reason)
                            .await
                        {
                            tracing::error!(error = %e, "failed to record retry");
                        }
                    }
                }
            }
        }
        .instrument(span)
        .await;
    }

    async fn try_publish(&self, event: &OutgoingEvent) -> Result<(), String> {
        // The wire payload carries the row's tracing fields so consumers can
        // rehydrate the producing span without broker headers.
        let payload = EventPayload {
            trace_id: event.trace_id.clone(),
            span_id: event.span_id.clone(),
            correlation_id: event.correlation_id.clone(),
            ..event.payload.clone()
        };

        let bytes = serde_json::to_vec(&payload).map_err(|e| e.to_string())?;
        let key = payload.data.get("short_code").map(String::as_str);

        self.publisher
            .publish(&event.topic, key, &bytes)
            .await
            .map_err(|e| e.to_string())
    }
}

/// Convenience for wiring: spawns the producer on the runtime.
pub fn spawn(producer: OutboxProducer, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move { producer.run(shutdown).await })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::EventStatus;
    use crate::domain::repositories::MockOutgoingEventRepository;
    use crate::infrastructure::broker::{MockEventPublisher, PublishError};
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::time::Duration;

    fn test_event(id: i64, retry_count: i32) -> OutgoingEvent {
        let mut data = BTreeMap::new();
        data.insert("short_code".to_string(), format!("code{id}"));
        OutgoingEvent {
            id,
            topic: "urlshortener.metadata.requested.v1".to_string(),
            status: EventStatus::Pending,
            retry_count,
            last_error: None,
            correlation_id: format!("corr-{id}"),
            trace_id: "0af7651916cd43dd8448eb211c80319c".to_string(),
            span_id: "b7ad6b7169203331".to_string(),
            payload: EventPayload {
                event_id: id,
                correlation_id: format!("corr-{id}"),
                trace_id: "0af7651916cd43dd8448eb211c80319c".to_string(),
                span_id: "b7ad6b7169203331".to_string(),
                occurred_at: Utc::now(),
                data,
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn config(max_concurrency: usize, max_retry: i32) -> ProducerConfig {
        ProducerConfig {
            polling_interval: Duration::from_millis(10),
            batch_size: 10,
            max_retry,
            max_concurrency,
        }
    }

    fn producer(
        repo: MockOutgoingEventRepository,
        publisher: MockEventPublisher,
        cfg: ProducerConfig,
    ) -> OutboxProducer {
        OutboxProducer::new(Arc::new(repo), Arc::new(publisher), cfg)
    }

    #[tokio::test]
    async fn test_serial_batch_preserves_outbox_order() {
        let mut repo = MockOutgoingEventRepository::new();
        repo.expect_pending_batch()
            .returning(|_| Ok(vec![test_event(1, 0), test_event(2, 0), test_event(3, 0)]));
        repo.expect_mark_published().times(3).returning(|_| Ok(()));

        let published = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&published);

        let mut publisher = MockEventPublisher::new();
        publisher.expect_publish().returning(move |_, key, _| {
            seen.lock().unwrap().push(key.unwrap().to_string());
            Ok(())
        });

        producer(repo, publisher, config(1, 3))
            .process_batch(&CancellationToken::new())
            .await;

        assert_eq!(
            *published.lock().unwrap(),
            vec!["code1", "code2", "code3"]
        );
    }

    #[tokio::test]
    async fn test_published_payload_carries_row_tracing_fields() {
        let mut repo = MockOutgoingEventRepository::new();
        repo.expect_pending_batch()
            .returning(|_| Ok(vec![test_event(7, 0)]));
        repo.expect_mark_published()
            .with(mockall::predicate::eq(7))
            .returning(|_| Ok(()));

        let mut publisher = MockEventPublisher::new();
        publisher
            .expect_publish()
            .withf(|topic, key, bytes| {
                let payload: EventPayload = serde_json::from_slice(bytes).unwrap();
                topic == "urlshortener.metadata.requested.v1"
                    && *key == Some("code7")
                    && payload.event_id == 7
                    && payload.trace_id == "0af7651916cd43dd8448eb211c80319c"
                    && payload.span_id == "b7ad6b7169203331"
                    && payload.correlation_id == "corr-7"
            })
            .returning(|_, _, _| Ok(()));

        producer(repo, publisher, config(1, 3))
            .process_batch(&CancellationToken::new())
            .await;
    }

    #[tokio::test]
    async fn test_failed_publish_within_budget_stays_pending() {
        let mut repo = MockOutgoingEventRepository::new();
        repo.expect_pending_batch()
            .returning(|_| Ok(vec![test_event(5, 1)]));
        repo.expect_mark_published().never();
        repo.expect_mark_failed().never();
        repo.expect_mark_retry()
            .withf(|id, retry_count, last_error| {
                *id == 5 && *retry_count == 2 && last_error.contains("broker down")
            })
            .returning(|_, _, _| Ok(()));

        let mut publisher = MockEventPublisher::new();
        publisher
            .expect_publish()
            .returning(|_, _, _| Err(PublishError::Broker("broker down".to_string())));

        producer(repo, publisher, config(1, 3))
            .process_batch(&CancellationToken::new())
            .await;
    }

    #[tokio::test]
    async fn test_retry_budget_exhaustion_is_terminal() {
        let mut repo = MockOutgoingEventRepository::new();
        // retry_count 3 with max_retry 3: this attempt is number 4.
        repo.expect_pending_batch()
            .returning(|_| Ok(vec![test_event(9, 3)]));
        repo.expect_mark_retry().never();
        repo.expect_mark_failed()
            .withf(|id, last_error| *id == 9 && last_error.contains("still down"))
            .returning(|_, _| Ok(()));

        let mut publisher = MockEventPublisher::new();
        publisher
            .expect_publish()
            .returning(|_, _, _| Err(PublishError::Broker("still down".to_string())));

        producer(repo, publisher, config(1, 3))
            .process_batch(&CancellationToken::new())
            .await;
    }

    #[tokio::test]
    async fn test_empty_batch_publishes_nothing() {
        let mut repo = MockOutgoingEventRepository::new();
        repo.expect_pending_batch().returning(|_| Ok(Vec::new()));

        let mut publisher = MockEventPublisher::new();
        publisher.expect_publish().never();

        producer(repo, publisher, config(20, 3))
            .process_batch(&CancellationToken::new())
            .await;
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_concurrent_publishes() {
        let mut repo = MockOutgoingEventRepository::new();
        repo.expect_pending_batch()
            .returning(|_| Ok((1..=8).map(|id| test_event(id, 0)).collect()));
        repo.expect_mark_published().never();
        repo.expect_mark_retry().never();
        repo.expect_mark_failed().never();

        let mut publisher = MockEventPublisher::new();
        publisher.expect_publish().never();

        let shutdown = CancellationToken::new();
        shutdown.cancel();

        producer(repo, publisher, config(4, 3))
            .process_batch(&shutdown)
            .await;
    }

    #[tokio::test]
    async fn test_concurrent_batch_marks_every_event() {
        let mut repo = MockOutgoingEventRepository::new();
        repo.expect_pending_batch()
            .returning(|_| Ok((1..=8).map(|id| test_event(id, 0)).collect()));
        repo.expect_mark_published().times(8).returning(|_| Ok(()));

        let mut publisher = MockEventPublisher::new();
        publisher.expect_publish().times(8).returning(|_, _, _| Ok(()));

        producer(repo, publisher, config(4, 3))
            .process_batch(&CancellationToken::new())
            .await;
    }
}
