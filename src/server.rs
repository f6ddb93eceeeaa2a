//! Server bootstrap and lifecycle.
//!
//! Wires the database pool, cache, broker producer and consumer fleet, and
//! runs the Axum server with graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::api::routes::build_router;
use crate::application::services::{MetadataService, ShortUrlService};
use crate::config::Config;
use crate::consumers::{MetadataCrawledHandler, MetadataRequestedHandler, TopicConsumer};
use crate::crawler::Crawler;
use crate::domain::entities::{TOPIC_METADATA_CRAWLED, TOPIC_METADATA_REQUESTED};
use crate::infrastructure::broker::{EventPublisher, KafkaPublisher, KafkaTopicConsumer};
use crate::infrastructure::cache::{CacheService, NullCache, RedisCache};
use crate::infrastructure::persistence::{PgOutgoingEventRepository, PgShortUrlRepository};
use crate::outbox::OutboxProducer;
use crate::state::AppState;
use crate::utils::snowflake::SnowflakeGenerator;
use crate::utils::url_validator::UrlValidator;

/// How long in-flight work gets to finish after a shutdown signal.
const SHUTDOWN_BUDGET: Duration = Duration::from_secs(5);

/// Runs the service until SIGINT/SIGTERM.
///
/// # Errors
///
/// Returns an error when the database is unreachable, migrations fail, the
/// broker client cannot be built, or the listener cannot bind.
pub async fn run(config: Config) -> Result<()> {
    let pool = PgPool::connect(&config.pg_url)
        .await
        .context("database connection failed")?;
    tracing::info!("connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("migrations failed")?;

    let cache: Arc<dyn CacheService> = match &config.redis_addr {
        Some(redis_addr) => match RedisCache::connect(redis_addr).await {
            Ok(redis) => {
                tracing::info!("cache enabled (redis)");
                Arc::new(redis)
            }
            Err(e) => {
                tracing::warn!(error = %e, "redis unavailable, running without cache");
                Arc::new(NullCache::new())
            }
        },
        None => {
            tracing::info!("cache disabled");
            Arc::new(NullCache::new())
        }
    };

    let pool_arc = Arc::new(pool.clone());
    let short_url_repository = Arc::new(PgShortUrlRepository::new(pool_arc.clone()));
    let event_repository = Arc::new(PgOutgoingEventRepository::new(pool_arc));
    let ids = Arc::new(SnowflakeGenerator::new(1));

    let publisher: Arc<dyn EventPublisher> = Arc::new(KafkaPublisher::new(
        &config.kafka_brokers,
        &config.kafka_client_id,
    )?);

    let shutdown = CancellationToken::new();
    let mut background = Vec::new();

    let producer = OutboxProducer::new(
        event_repository,
        publisher.clone(),
        config.producer.clone(),
    );
    background.push(crate::outbox::spawn(producer, shutdown.clone()));

    let metadata_service = Arc::new(MetadataService::new(
        short_url_repository.clone(),
        Arc::new(Crawler::new()?),
        ids.clone(),
    ));

    let requested_consumer = TopicConsumer::new(
        KafkaTopicConsumer::new(
            &config.kafka_brokers,
            &config.metadata_requested_consumer_group,
            &config.kafka_client_id,
            TOPIC_METADATA_REQUESTED,
        )?,
        Arc::new(MetadataRequestedHandler::new(metadata_service)),
        publisher.clone(),
        config.dlq_topic.clone(),
    );
    let crawled_consumer = TopicConsumer::new(
        KafkaTopicConsumer::new(
            &config.kafka_brokers,
            &config.metadata_crawled_consumer_group,
            &config.kafka_client_id,
            TOPIC_METADATA_CRAWLED,
        )?,
        Arc::new(MetadataCrawledHandler::new()),
        publisher,
        config.dlq_topic.clone(),
    );

    for consumer in [requested_consumer, crawled_consumer] {
        let token = shutdown.clone();
        background.push(tokio::spawn(async move {
            consumer.run(token).await;
        }));
    }

    let state = AppState {
        short_urls: Arc::new(ShortUrlService::new(short_url_repository, cache.clone(), ids)),
        url_validator: Arc::new(UrlValidator::new()?),
        db: pool,
        cache,
        requires_metadata: Arc::new(config.requires_metadata.clone()),
    };

    let app = build_router(state);

    let addr: SocketAddr = config
        .server_addr
        .parse()
        .context("invalid server address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("listener bind failed")?;
    tracing::info!("listening on http://{addr}");

    let signal_token = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_signal().await;
            signal_token.cancel();
        })
        .await?;

    tracing::info!("http server drained, stopping background tasks");
    shutdown.cancel();

    let drain = async {
        for handle in background {
            let _ = handle.await;
        }
    };
    if tokio::time::timeout(SHUTDOWN_BUDGET, drain).await.is_err() {
        tracing::warn!("background tasks did not stop within the shutdown budget");
    }

    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("shutdown signal received");
}
