//! Configuration types for the trace bootstrap.
//!
//! These types are designed to be deserialised from multiple sources using
//! figment, supporting layered configuration from defaults, files, and
//! environment variables. Configuration is resolved once, synchronously,
//! before any provider is constructed, and never mutated afterwards.

use crate::instrumentation::InstrumentationConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// OTLP export protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// gRPC protocol (default port 4317).
    #[default]
    Grpc,
    /// HTTP with Protocol Buffers encoding (default port 4318).
    #[serde(alias = "http/protobuf", alias = "http-protobuf")]
    Http,
}

impl Protocol {
    /// Returns the default collector endpoint for this protocol.
    #[must_use]
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Protocol::Grpc => "http://localhost:4317",
            Protocol::Http => "http://localhost:4318",
        }
    }

    /// Returns the default collector port for this protocol.
    #[must_use]
    pub fn default_port(&self) -> u16 {
        match self {
            Protocol::Grpc => 4317,
            Protocol::Http => 4318,
        }
    }
}

/// Span processing mode: how finished spans reach the exporter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    /// Buffer spans and export in batches on a background worker.
    #[default]
    Batch,
    /// Hand each span to the exporter as soon as it ends.
    ///
    /// Useful for short-lived processes where the batch delay would lose
    /// spans; adds per-span export latency everywhere else.
    #[serde(alias = "simple")]
    Immediate,
}

/// Complete bootstrap configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Endpoint configuration.
    pub endpoint: EndpointConfig,

    /// Resource configuration.
    pub resource: ResourceConfig,

    /// Span processing configuration.
    pub processing: ProcessingConfig,

    /// Per-library instrumentation allow/deny list.
    pub instrumentation: InstrumentationConfig,

    /// Whether to initialise the tracing subscriber.
    pub init_tracing_subscriber: bool,

    /// Whether to register the provider as the process-wide default.
    ///
    /// Exactly one registration is permitted per process lifetime; see
    /// [`BootstrapError::AlreadyInitialized`](crate::BootstrapError::AlreadyInitialized).
    pub register_global: bool,

    /// Upper bound on the shutdown flush. If the collector is unreachable,
    /// shutdown gives up after this long instead of hanging the process.
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,

    /// Name for the instrumentation scope (otel.library.name).
    /// Defaults to `service_name` if set, otherwise "otel-bootstrap".
    pub instrumentation_scope_name: Option<String>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            endpoint: EndpointConfig::default(),
            resource: ResourceConfig::default(),
            processing: ProcessingConfig::default(),
            instrumentation: InstrumentationConfig::default(),
            init_tracing_subscriber: true,
            register_global: true,
            shutdown_timeout: Duration::from_secs(5),
            instrumentation_scope_name: None,
        }
    }
}

impl BootstrapConfig {
    /// Returns the effective endpoint URL, using the protocol default when no
    /// URL is configured.
    #[must_use]
    pub fn effective_endpoint(&self) -> String {
        self.endpoint
            .url
            .clone()
            .unwrap_or_else(|| self.endpoint.protocol.default_endpoint().to_string())
    }

    /// Returns the endpoint URL the trace exporter should use.
    ///
    /// For HTTP the OTLP traces path is appended; gRPC uses the base URL.
    #[must_use]
    pub fn traces_endpoint(&self) -> String {
        let base = self.effective_endpoint();
        let base = base.trim_end_matches('/');

        match self.endpoint.protocol {
            Protocol::Grpc => base.to_string(),
            Protocol::Http => format!("{base}/v1/traces"),
        }
    }
}

/// Endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// OTLP collector endpoint URL.
    ///
    /// If not specified, uses the protocol's default:
    /// - gRPC: `http://localhost:4317`
    /// - HTTP: `http://localhost:4318`
    pub url: Option<String>,

    /// Export protocol.
    pub protocol: Protocol,

    /// Per-request export timeout.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// HTTP headers for authentication or customisation.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: None,
            protocol: Protocol::default(),
            timeout: Duration::from_secs(10),
            headers: HashMap::new(),
        }
    }
}

/// Resource configuration: static metadata attached to every span.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Service name (`service.name`).
    pub service_name: Option<String>,

    /// Service version (`service.version`).
    pub service_version: Option<String>,

    /// Deployment environment (e.g., "production", "staging").
    pub deployment_environment: Option<String>,

    /// Additional resource attributes.
    #[serde(default)]
    pub attributes: HashMap<String, String>,

    /// Whether to run the automatic resource detectors (host, OS, process,
    /// runtime). Disable to emit only explicitly configured attributes.
    pub detectors: DetectorConfig,
}

/// Automatic resource detector selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorConfig {
    /// Run the host, OS, process, and runtime detectors.
    #[default]
    Auto,
    /// No automatic detection; only explicit attributes.
    None,
}

impl ResourceConfig {
    /// Creates a new resource config with a service name.
    pub fn with_service_name(name: impl Into<String>) -> Self {
        Self {
            service_name: Some(name.into()),
            ..Default::default()
        }
    }
}

/// Span processing configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Processing mode.
    pub mode: ProcessingMode,

    /// Batch export tuning; ignored in [`ProcessingMode::Immediate`].
    pub batch: BatchConfig,
}

/// Batch span processor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum queue size.
    pub max_queue_size: usize,

    /// Maximum batch size for export.
    pub max_export_batch_size: usize,

    /// Scheduled delay between exports.
    ///
    /// Per-request export time is bounded by
    /// [`EndpointConfig::timeout`](crate::EndpointConfig::timeout).
    #[serde(with = "humantime_serde")]
    pub scheduled_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 2048,
            max_export_batch_size: 512,
            scheduled_delay: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_default_endpoint() {
        assert_eq!(Protocol::Grpc.default_endpoint(), "http://localhost:4317");
        assert_eq!(Protocol::Http.default_endpoint(), "http://localhost:4318");
    }

    #[test]
    fn default_protocol_is_grpc() {
        assert_eq!(Protocol::default(), Protocol::Grpc);
    }

    #[test]
    fn effective_endpoint_falls_back_to_protocol_default() {
        let config = BootstrapConfig::default();
        assert_eq!(config.effective_endpoint(), "http://localhost:4317");

        let mut config = BootstrapConfig::default();
        config.endpoint.protocol = Protocol::Http;
        assert_eq!(config.effective_endpoint(), "http://localhost:4318");

        let mut config = BootstrapConfig::default();
        config.endpoint.url = Some("http://collector:4317".to_string());
        assert_eq!(config.effective_endpoint(), "http://collector:4317");
    }

    #[test]
    fn traces_endpoint_appends_path_for_http() {
        let mut config = BootstrapConfig::default();
        config.endpoint.protocol = Protocol::Http;
        assert_eq!(config.traces_endpoint(), "http://localhost:4318/v1/traces");
    }

    #[test]
    fn traces_endpoint_strips_trailing_slash_before_appending() {
        let mut config = BootstrapConfig::default();
        config.endpoint.protocol = Protocol::Http;
        config.endpoint.url = Some("http://collector:4318/".to_string());
        assert_eq!(config.traces_endpoint(), "http://collector:4318/v1/traces");
    }

    #[test]
    fn traces_endpoint_returns_base_only_for_grpc() {
        let config = BootstrapConfig::default();
        assert_eq!(config.traces_endpoint(), "http://localhost:4317");
    }

    #[test]
    fn default_processing_mode_is_batch() {
        let config = ProcessingConfig::default();
        assert_eq!(config.mode, ProcessingMode::Batch);
    }

    #[test]
    fn resource_config_with_service_name() {
        let config = ResourceConfig::with_service_name("my-service");
        assert_eq!(config.service_name, Some("my-service".to_string()));
    }

    #[test]
    fn batch_config_defaults() {
        let config = BatchConfig::default();
        assert_eq!(config.max_queue_size, 2048);
        assert_eq!(config.max_export_batch_size, 512);
        assert_eq!(config.scheduled_delay, Duration::from_secs(5));
    }

    #[test]
    fn shutdown_timeout_default() {
        let config = BootstrapConfig::default();
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
    }
}
