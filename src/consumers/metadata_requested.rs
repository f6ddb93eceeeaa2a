//! Handler for `metadata.requested`: crawl and persist.

use std::sync::Arc;

use async_trait::async_trait;

use super::EventHandler;
use crate::application::services::MetadataService;
use crate::domain::RequestScope;
use crate::domain::entities::{EventPayload, TOPIC_METADATA_REQUESTED};
use crate::error::AppError;

pub struct MetadataRequestedHandler {
    service: Arc<MetadataService>,
}

impl MetadataRequestedHandler {
    pub fn new(service: Arc<MetadataService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl EventHandler for MetadataRequestedHandler {
    fn topic(&self) -> &'static str {
        TOPIC_METADATA_REQUESTED
    }

    async fn handle(&self, scope: RequestScope, payload: EventPayload) -> Result<(), AppError> {
        let short_code = payload
            .data
            .get("short_code")
            .filter(|code| !code.is_empty())
            .ok_or_else(|| AppError::Internal("envelope data missing short_code".to_string()))?;

        let record = self.service.crawl_url_metadata(&scope, short_code).await?;

        tracing::info!(
            short_code = %record.short_code,
            correlation_id = %scope.correlation_id,
            "metadata stored"
        );
        Ok(())
    }
}
