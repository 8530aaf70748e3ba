//! Error types for bootstrap initialisation and lifecycle.

use figment::Error as FigmentError;

/// Errors from bootstrap initialisation and lifecycle.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BootstrapError {
    /// Failed to extract configuration from sources.
    #[error("configuration error: {0}")]
    Config(#[source] Box<FigmentError>),

    /// Invalid endpoint URL format.
    #[error("invalid endpoint URL: {url} (must start with http:// or https://)")]
    InvalidEndpoint {
        /// The invalid URL that was provided.
        url: String,
    },

    /// Failed to create the span exporter. Fatal: the process must not
    /// continue in a half-initialised tracing state.
    #[error("failed to create span exporter")]
    TraceExporter(#[source] opentelemetry_otlp::ExporterBuildError),

    /// A tracer provider has already been registered for this process.
    ///
    /// Exactly one registration is permitted per process lifetime; a second
    /// registering `build()` fails here rather than silently replacing the
    /// existing provider.
    #[error("a tracer provider is already registered for this process")]
    AlreadyInitialized,

    /// Failed to initialise the tracing subscriber.
    #[error("failed to initialise tracing subscriber")]
    TracingSubscriber(#[from] tracing_subscriber::util::TryInitError),

    /// Failed to flush buffered spans.
    #[error("failed to flush spans")]
    Flush(#[source] opentelemetry_sdk::error::OTelSdkError),

    /// Failed to shut down the tracer provider.
    #[error("failed to shut down tracer provider")]
    Shutdown(#[source] opentelemetry_sdk::error::OTelSdkError),

    /// Shutdown flush did not complete within the configured timeout.
    #[error("shutdown did not complete within {timeout:?}")]
    ShutdownTimeout {
        /// The configured shutdown timeout that elapsed.
        timeout: std::time::Duration,
    },
}
