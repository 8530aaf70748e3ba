//! Tracer provider lifecycle management.
//!
//! The [`TracingGuard`] owns the tracer provider built by the bootstrap. It
//! is an explicit handle rather than ambient global state: the provider is
//! registered process-wide at most once, and the guard is what flushes and
//! shuts the pipeline down. When dropped, it shuts down best-effort.

use crate::config::{BootstrapConfig, ProcessingMode, Protocol};
use crate::error::BootstrapError;
use crate::instrumentation::InstrumentationConfig;
use crate::resource::build_resource;
use opentelemetry::propagation::TextMapCompositePropagator;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{WithExportConfig, WithHttpConfig, WithTonicConfig};
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};
use opentelemetry_sdk::trace::{BatchConfigBuilder, BatchSpanProcessor, SdkTracerProvider};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tonic::metadata::{MetadataKey, MetadataMap, MetadataValue};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Set once the process-wide provider registration has happened.
/// Never cleared: one registration per process lifetime.
static GLOBAL_REGISTERED: AtomicBool = AtomicBool::new(false);

/// Guard that owns the tracer provider and its shutdown.
///
/// Obtained from [`BootstrapBuilder::build`](crate::BootstrapBuilder::build).
/// Use [`shutdown()`](Self::shutdown) for explicit error handling; dropping
/// the guard flushes and shuts down with errors logged instead.
pub struct TracingGuard {
    provider: Option<SdkTracerProvider>,
    shutdown_timeout: Duration,
}

impl TracingGuard {
    /// Builds the span pipeline from configuration and wraps it in a guard.
    pub(crate) fn from_config(config: BootstrapConfig) -> Result<Self, BootstrapError> {
        let resource = build_resource(&config.resource);
        let exporter = build_span_exporter(&config)?;

        let provider = match config.processing.mode {
            ProcessingMode::Batch => {
                let batch_config = BatchConfigBuilder::default()
                    .with_max_queue_size(config.processing.batch.max_queue_size)
                    .with_max_export_batch_size(config.processing.batch.max_export_batch_size)
                    .with_scheduled_delay(config.processing.batch.scheduled_delay)
                    .build();

                let processor = BatchSpanProcessor::builder(exporter)
                    .with_batch_config(batch_config)
                    .build();

                SdkTracerProvider::builder()
                    .with_span_processor(processor)
                    .with_resource(resource)
                    .build()
            }
            ProcessingMode::Immediate => SdkTracerProvider::builder()
                .with_simple_exporter(exporter)
                .with_resource(resource)
                .build(),
        };

        if config.register_global {
            if GLOBAL_REGISTERED
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return Err(BootstrapError::AlreadyInitialized);
            }

            opentelemetry::global::set_tracer_provider(provider.clone());

            let propagator = TextMapCompositePropagator::new(vec![
                Box::new(TraceContextPropagator::new()),
                Box::new(BaggagePropagator::new()),
            ]);
            opentelemetry::global::set_text_map_propagator(propagator);
        }

        if config.init_tracing_subscriber {
            let scope_name = config
                .instrumentation_scope_name
                .clone()
                .or_else(|| config.resource.service_name.clone())
                .unwrap_or_else(|| "otel-bootstrap".to_string());
            init_subscriber(&provider, &config.instrumentation, scope_name)?;
        }

        if config.endpoint.url.is_none() {
            tracing::info!(
                target: "otel_bootstrap",
                endpoint = %config.effective_endpoint(),
                "no collector endpoint configured; using default"
            );
        }
        if let Ok(exporter) = std::env::var("OTEL_TRACES_EXPORTER") {
            tracing::info!(target: "otel_bootstrap", exporter = %exporter, "traces exporter requested via environment");
        }
        if let Ok(protocol) = std::env::var("OTEL_EXPORTER_OTLP_TRACES_PROTOCOL") {
            tracing::info!(target: "otel_bootstrap", protocol = %protocol, "export protocol requested via environment");
        }

        Ok(Self {
            provider: Some(provider),
            shutdown_timeout: config.shutdown_timeout,
        })
    }

    /// Returns the tracer provider.
    pub fn tracer_provider(&self) -> Option<&SdkTracerProvider> {
        self.provider.as_ref()
    }

    /// Returns the configured bound on the shutdown flush.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Flushes buffered spans. Errors are logged but not returned.
    pub fn flush(&self) {
        if let Some(provider) = &self.provider
            && let Err(e) = provider.force_flush()
        {
            tracing::error!(target: "otel_bootstrap", error = %e, "failed to flush spans");
        }
    }

    /// Flushes and shuts down the tracer provider.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Flush`] or [`BootstrapError::Shutdown`] when
    /// the exporter cannot deliver buffered spans. The process should still
    /// exit afterwards, with a non-zero code.
    pub fn shutdown(mut self) -> Result<(), BootstrapError> {
        if let Some(provider) = self.provider.take() {
            provider.force_flush().map_err(BootstrapError::Flush)?;
            provider.shutdown().map_err(BootstrapError::Shutdown)?;
        }
        Ok(())
    }
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            let _ = provider.force_flush();
            if let Err(e) = provider.shutdown() {
                tracing::error!(target: "otel_bootstrap", error = %e, "failed to shut down tracer provider");
            }
        }
    }
}

fn build_tonic_metadata(headers: &HashMap<String, String>) -> MetadataMap {
    let mut metadata = MetadataMap::new();
    for (key, value) in headers {
        if let (Ok(k), Ok(v)) = (
            key.parse::<MetadataKey<_>>(),
            value.parse::<MetadataValue<_>>(),
        ) {
            metadata.insert(k, v);
        }
    }
    metadata
}

/// Builds the OTLP span exporter for the configured protocol.
///
/// Construction binds the endpoint but opens no connection; network egress is
/// deferred until spans are flushed.
fn build_span_exporter(
    config: &BootstrapConfig,
) -> Result<opentelemetry_otlp::SpanExporter, BootstrapError> {
    match config.endpoint.protocol {
        Protocol::Grpc => {
            let mut builder = opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(config.traces_endpoint())
                .with_timeout(config.endpoint.timeout);

            if !config.endpoint.headers.is_empty() {
                builder = builder.with_metadata(build_tonic_metadata(&config.endpoint.headers));
            }

            builder.build().map_err(BootstrapError::TraceExporter)
        }
        Protocol::Http => {
            let mut builder = opentelemetry_otlp::SpanExporter::builder()
                .with_http()
                .with_endpoint(config.traces_endpoint())
                .with_timeout(config.endpoint.timeout)
                .with_protocol(opentelemetry_otlp::Protocol::HttpBinary);

            if !config.endpoint.headers.is_empty() {
                builder = builder.with_headers(config.endpoint.headers.clone());
            }

            builder.build().map_err(BootstrapError::TraceExporter)
        }
    }
}

fn init_subscriber(
    provider: &SdkTracerProvider,
    instrumentation: &InstrumentationConfig,
    scope_name: String,
) -> Result<(), BootstrapError> {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    for directive in instrumentation.filter_directives() {
        match directive.parse() {
            Ok(d) => filter = filter.add_directive(d),
            Err(e) => {
                tracing::warn!(
                    target: "otel_bootstrap",
                    directive = %directive,
                    error = %e,
                    "skipping invalid instrumentation filter directive"
                );
            }
        }
    }

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    let tracer = provider.tracer(scope_name);
    let telemetry_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(telemetry_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_tonic_metadata_parses_valid_headers() {
        let mut headers = HashMap::new();
        headers.insert("authorization".to_string(), "Bearer token123".to_string());
        headers.insert("x-custom-header".to_string(), "value".to_string());

        let metadata = build_tonic_metadata(&headers);

        assert_eq!(metadata.len(), 2);
        assert!(metadata.get("authorization").is_some());
        assert!(metadata.get("x-custom-header").is_some());
    }

    #[test]
    fn build_tonic_metadata_handles_empty_headers() {
        let headers = HashMap::new();
        let metadata = build_tonic_metadata(&headers);
        assert_eq!(metadata.len(), 0);
    }

    fn unregistered_config() -> BootstrapConfig {
        BootstrapConfig {
            register_global: false,
            init_tracing_subscriber: false,
            ..Default::default()
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn from_config_builds_batch_pipeline() {
        let guard = TracingGuard::from_config(unregistered_config()).unwrap();
        assert!(guard.tracer_provider().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn from_config_builds_immediate_pipeline() {
        let mut config = unregistered_config();
        config.processing.mode = ProcessingMode::Immediate;
        let guard = TracingGuard::from_config(config).unwrap();
        assert!(guard.tracer_provider().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn shutdown_without_spans_succeeds() {
        let guard = TracingGuard::from_config(unregistered_config()).unwrap();
        guard.shutdown().unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn exporter_construction_does_not_touch_network() {
        // The endpoint points nowhere reachable; construction must still
        // succeed because egress is deferred to flush time.
        let mut config = unregistered_config();
        config.endpoint.url = Some("http://192.0.2.1:4317".to_string());
        let exporter = build_span_exporter(&config);
        assert!(exporter.is_ok());
    }
}
