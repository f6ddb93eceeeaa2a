//! Handler for `metadata.crawled`: downstream notification hook.

use async_trait::async_trait;

use super::EventHandler;
use crate::domain::RequestScope;
use crate::domain::entities::{EventPayload, TOPIC_METADATA_CRAWLED};
use crate::error::AppError;

/// Terminal consumer of the pipeline. Nothing downstream is wired in yet,
/// so this handler only acknowledges the event; keeping the group consuming
/// means the topic's lag stays observable and a future notifier can start
/// from the committed offset.
pub struct MetadataCrawledHandler;

impl MetadataCrawledHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MetadataCrawledHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventHandler for MetadataCrawledHandler {
    fn topic(&self) -> &'static str {
        TOPIC_METADATA_CRAWLED
    }

    async fn handle(&self, scope: RequestScope, payload: EventPayload) -> Result<(), AppError> {
        tracing::info!(
            event_id = payload.event_id,
            short_code = payload.data.get("short_code").map(String::as_str).unwrap_or_default(),
            correlation_id = %scope.correlation_id,
            "metadata crawl completed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_crawled_handler_always_acknowledges() {
        let handler = MetadataCrawledHandler::new();
        let payload = EventPayload {
            event_id: 3,
            correlation_id: "corr-3".to_string(),
            trace_id: String::new(),
            span_id: String::new(),
            occurred_at: chrono::Utc::now(),
            data: BTreeMap::new(),
        };

        let result = handler
            .handle(RequestScope::for_consumer("corr-3".to_string()), payload)
            .await;

        assert!(result.is_ok());
    }
}
