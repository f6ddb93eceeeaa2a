//! Tracing subscriber setup and distributed-trace continuity helpers.
//!
//! Log output goes through an env-filtered `tracing-subscriber` pipeline,
//! text in development and json in production; span export goes to an OTLP
//! endpoint when configured. The
//! helpers below carry span identity across the outbox table and the broker:
//! the producer and consumers rebuild a remote parent span from the 32/16
//! hex-char identifiers stored on the event row / payload.

use anyhow::Result;
use opentelemetry::trace::{SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId, TraceState};
use opentelemetry::{Context, global};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
use tracing_opentelemetry::OpenTelemetrySpanExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::Config;

/// Guard that flushes span batches on shutdown.
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("failed to shut down tracer provider: {e}");
        }
    }
}

/// Initializes the global tracing subscriber.
///
/// Always installs an env-filtered fmt layer (text or json per `APP_ENV`);
/// adds an OTLP export layer when `OTEL_EXPORTER_OTLP_ENDPOINT` is set,
/// sampled at `OTEL_TRACES_SAMPLER_RATIO` with parent-based propagation.
///
/// # Errors
///
/// Returns an error if the OTLP exporter cannot be constructed or a global
/// subscriber is already installed.
pub fn init(config: &Config) -> Result<TelemetryGuard> {
    let filter = EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = if config.is_production() {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    let registry = tracing_subscriber::registry().with(filter).with(fmt_layer);

    let provider = match &config.otel_endpoint {
        Some(endpoint) => {
            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint)
                .build()?;

            let provider = SdkTracerProvider::builder()
                .with_batch_exporter(exporter)
                .with_sampler(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
                    config.otel_sampler_ratio,
                ))))
                .with_resource(
                    Resource::builder()
                        .with_service_name(config.service_name.clone())
                        .build(),
                )
                .build();

            global::set_tracer_provider(provider.clone());

            use opentelemetry::trace::TracerProvider as _;
            let tracer = provider.tracer("urlshortener");
            registry
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .init();

            Some(provider)
        }
        None => {
            registry.init();
            None
        }
    };

    Ok(TelemetryGuard { provider })
}

/// Returns the active span's trace and span IDs as lowercase hex
/// (32 and 16 chars), or empty strings when no sampled span is active.
pub fn current_trace_ids() -> (String, String) {
    let cx = tracing::Span::current().context();
    let span_context = cx.span().span_context().clone();

    if span_context.is_valid() {
        (
            span_context.trace_id().to_string(),
            span_context.span_id().to_string(),
        )
    } else {
        (String::new(), String::new())
    }
}

/// Rebuilds a remote parent context from hex-encoded identifiers, with the
/// sampled flag asserted. Returns `None` when decoding fails so callers can
/// proceed with their own context unchanged.
pub fn remote_parent_context(trace_id: &str, span_id: &str) -> Option<Context> {
    let trace_id = TraceId::from_hex(trace_id).ok()?;
    let span_id = SpanId::from_hex(span_id).ok()?;

    if trace_id == TraceId::INVALID || span_id == SpanId::INVALID {
        return None;
    }

    let span_context = SpanContext::new(
        trace_id,
        span_id,
        TraceFlags::SAMPLED,
        true,
        TraceState::default(),
    );

    Some(Context::new().with_remote_span_context(span_context))
}

/// Attaches the rebuilt remote parent to `span` when the identifiers decode;
/// leaves the span's ambient parent in place otherwise.
pub fn adopt_remote_parent(span: &tracing::Span, trace_id: &str, span_id: &str) {
    if let Some(cx) = remote_parent_context(trace_id, span_id) {
        span.set_parent(cx);
    }
}
