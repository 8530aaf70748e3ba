//! Builder for the trace bootstrap.
//!
//! The builder supports layered configuration from multiple sources:
//! 1. Compiled defaults (protocol-specific endpoints)
//! 2. Configuration files (TOML)
//! 3. Environment variables
//! 4. Programmatic overrides
//!
//! Sources are merged in order, with later sources taking precedence. The
//! configuration is resolved fully before any provider construction.

use crate::config::{BootstrapConfig, ProcessingMode, Protocol};
use crate::error::BootstrapError;
use crate::guard::TracingGuard;
use crate::instrumentation::InstrumentationConfig;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Builder for configuring and initialising the trace bootstrap.
///
/// # Example
///
/// ```no_run
/// use otel_bootstrap::{BootstrapBuilder, BootstrapError};
///
/// fn main() -> Result<(), BootstrapError> {
///     // Simple case - uses defaults (localhost:4317 for gRPC)
///     let _guard = BootstrapBuilder::new().build()?;
///
///     // Full configuration
///     let _guard = BootstrapBuilder::new()
///         .with_standard_env()
///         .endpoint("http://collector:4317")
///         .service_name("checkout-svc")
///         .build()?;
///
///     Ok(())
/// }
/// ```
#[must_use = "builders do nothing unless .build() is called"]
pub struct BootstrapBuilder {
    figment: Figment,
    resource_attributes: HashMap<String, String>,
    instrumentation_overrides: HashMap<String, bool>,
}

impl BootstrapBuilder {
    /// Creates a new builder with default configuration.
    ///
    /// Defaults include:
    /// - Protocol: gRPC
    /// - Endpoint: `http://localhost:4317` (or 4318 for HTTP)
    /// - Batch span processing
    /// - Tracing subscriber initialisation enabled
    /// - Process-wide provider registration enabled
    pub fn new() -> Self {
        Self {
            figment: Figment::from(Serialized::defaults(BootstrapConfig::default())),
            resource_attributes: HashMap::new(),
            instrumentation_overrides: HashMap::new(),
        }
    }

    /// Creates a builder from an existing figment.
    ///
    /// This allows power users to construct complex configuration chains
    /// before passing them to the bootstrap builder.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use figment::{Figment, providers::{Env, Format, Toml}};
    /// use otel_bootstrap::{BootstrapBuilder, BootstrapError};
    ///
    /// let figment = Figment::new()
    ///     .merge(Toml::file("/etc/otel-defaults.toml"))
    ///     .merge(Env::prefixed("OTEL_BOOTSTRAP_").split("_"));
    ///
    /// let _guard = BootstrapBuilder::from_figment(figment)
    ///     .service_name("checkout-svc")
    ///     .build()?;
    /// # Ok::<(), BootstrapError>(())
    /// ```
    pub fn from_figment(figment: Figment) -> Self {
        Self {
            figment,
            resource_attributes: HashMap::new(),
            instrumentation_overrides: HashMap::new(),
        }
    }

    /// Merges configuration from a TOML file.
    ///
    /// If the file doesn't exist, it's silently skipped.
    /// This allows optional configuration files that may or may not be present.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        let path = path.as_ref();
        if path.exists() {
            self.figment = self.figment.merge(Toml::file(path));
        }
        self
    }

    /// Merges configuration from environment variables with the given prefix.
    ///
    /// Environment variables are split on underscores to match nested config.
    /// For example, with prefix `OTEL_BOOTSTRAP_`:
    /// - `OTEL_BOOTSTRAP_ENDPOINT_URL` → `endpoint.url`
    /// - `OTEL_BOOTSTRAP_ENDPOINT_PROTOCOL` → `endpoint.protocol`
    /// - `OTEL_BOOTSTRAP_PROCESSING_MODE` → `processing.mode`
    /// - `OTEL_BOOTSTRAP_RESOURCE_SERVICE_NAME` → `resource.service_name`
    pub fn with_env(mut self, prefix: &str) -> Self {
        self.figment = self.figment.merge(Env::prefixed(prefix).split("_"));
        self
    }

    /// Merges configuration from standard OpenTelemetry environment variables.
    ///
    /// This reads the standard `OTEL_*` variables as defined by the
    /// OpenTelemetry specification:
    /// - `OTEL_SERVICE_NAME` → service name
    /// - `OTEL_EXPORTER_OTLP_TRACES_ENDPOINT` → endpoint URL; a value without
    ///   a scheme gets an `http://` prefix
    /// - `OTEL_EXPORTER_OTLP_TRACES_PROTOCOL` → protocol (grpc, http/protobuf)
    /// - `OTEL_TRACES_EXPORTER` → informational; logged at initialisation
    pub fn with_standard_env(mut self) -> Self {
        if let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_TRACES_ENDPOINT") {
            let endpoint = normalize_endpoint(endpoint);
            self.figment = self
                .figment
                .merge(Serialized::default("endpoint.url", endpoint));
        }

        if let Ok(protocol) = std::env::var("OTEL_EXPORTER_OTLP_TRACES_PROTOCOL") {
            let protocol = match protocol.as_str() {
                "grpc" => Some("grpc"),
                "http/protobuf" | "http/json" => Some("http"),
                _ => None,
            };
            if let Some(protocol) = protocol {
                self.figment = self
                    .figment
                    .merge(Serialized::default("endpoint.protocol", protocol));
            }
        }

        if let Ok(service_name) = std::env::var("OTEL_SERVICE_NAME") {
            self.figment = self
                .figment
                .merge(Serialized::default("resource.service_name", service_name));
        }

        self
    }

    /// Sets the OTLP collector endpoint URL explicitly.
    ///
    /// This overrides any configuration from files or environment variables.
    /// For HTTP, the traces path (`/v1/traces`) is appended automatically.
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.figment = self
            .figment
            .merge(Serialized::default("endpoint.url", url.into()));
        self
    }

    /// Sets the export protocol.
    ///
    /// The default endpoint changes based on protocol:
    /// - `Protocol::Grpc` → `http://localhost:4317`
    /// - `Protocol::Http` → `http://localhost:4318`
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        let protocol_str = match protocol {
            Protocol::Grpc => "grpc",
            Protocol::Http => "http",
        };
        self.figment = self
            .figment
            .merge(Serialized::default("endpoint.protocol", protocol_str));
        self
    }

    /// Sets the span processing mode.
    ///
    /// `Batch` (the default) buffers spans and exports on a background
    /// worker; `Immediate` exports each span as it ends.
    pub fn processing_mode(mut self, mode: ProcessingMode) -> Self {
        let mode_str = match mode {
            ProcessingMode::Batch => "batch",
            ProcessingMode::Immediate => "immediate",
        };
        self.figment = self
            .figment
            .merge(Serialized::default("processing.mode", mode_str));
        self
    }

    /// Sets the service name resource attribute.
    ///
    /// This is the most commonly configured resource attribute and identifies
    /// the process in emitted telemetry.
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.figment = self
            .figment
            .merge(Serialized::default("resource.service_name", name.into()));
        self
    }

    /// Sets the service version resource attribute.
    pub fn service_version(mut self, version: impl Into<String>) -> Self {
        self.figment = self.figment.merge(Serialized::default(
            "resource.service_version",
            version.into(),
        ));
        self
    }

    /// Sets the deployment environment resource attribute.
    pub fn deployment_environment(mut self, env: impl Into<String>) -> Self {
        self.figment = self.figment.merge(Serialized::default(
            "resource.deployment_environment",
            env.into(),
        ));
        self
    }

    /// Adds a resource attribute.
    pub fn resource_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.resource_attributes.insert(key.into(), value.into());
        self
    }

    /// Replaces the instrumentation allow/deny list wholesale.
    pub fn instrumentation(mut self, config: InstrumentationConfig) -> Self {
        self.instrumentation_overrides.clear();
        for (target, enabled) in config.libraries {
            self.instrumentation_overrides.insert(target, enabled);
        }
        self
    }

    /// Enables span collection for an instrumented library.
    pub fn enable_instrumentation(mut self, target: impl Into<String>) -> Self {
        self.instrumentation_overrides.insert(target.into(), true);
        self
    }

    /// Disables span collection for an instrumented library.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use otel_bootstrap::{BootstrapBuilder, BootstrapError};
    ///
    /// let _guard = BootstrapBuilder::new()
    ///     .service_name("checkout-svc")
    ///     .disable_instrumentation("sqlx")
    ///     .build()?;
    /// # Ok::<(), BootstrapError>(())
    /// ```
    pub fn disable_instrumentation(mut self, target: impl Into<String>) -> Self {
        self.instrumentation_overrides.insert(target.into(), false);
        self
    }

    /// Sets the upper bound on the shutdown flush.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.figment = self.figment.merge(Serialized::default(
            "shutdown_timeout",
            humantime_serde::re::humantime::format_duration(timeout).to_string(),
        ));
        self
    }

    /// Adds an HTTP header to all export requests.
    ///
    /// Useful for authentication or custom routing.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let header_key = format!("endpoint.headers.{}", key.into());
        self.figment = self
            .figment
            .merge(Serialized::default(&header_key, value.into()));
        self
    }

    /// Disables automatic tracing subscriber initialisation.
    ///
    /// By default, the bootstrap sets up a `tracing-subscriber` registry with
    /// a `tracing-opentelemetry` layer. Disable this if the host application
    /// configures the subscriber itself.
    pub fn without_tracing_subscriber(mut self) -> Self {
        self.figment = self
            .figment
            .merge(Serialized::default("init_tracing_subscriber", false));
        self
    }

    /// Skips the process-wide provider registration.
    ///
    /// The returned [`TracingGuard`] still owns a working pipeline; spans are
    /// emitted only through its provider handle. Use this for embedded or
    /// test scenarios where the process-wide slot belongs to someone else.
    pub fn without_global_registration(mut self) -> Self {
        self.figment = self
            .figment
            .merge(Serialized::default("register_global", false));
        self
    }

    /// Sets the instrumentation scope name (otel.library.name).
    ///
    /// If not set, defaults to the service name, then "otel-bootstrap".
    pub fn instrumentation_scope_name(mut self, name: impl Into<String>) -> Self {
        self.figment = self.figment.merge(Serialized::default(
            "instrumentation_scope_name",
            name.into(),
        ));
        self
    }

    /// Extracts the configuration for inspection or debugging.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration extraction fails or if the endpoint
    /// URL is invalid.
    pub fn extract_config(&self) -> Result<BootstrapConfig, BootstrapError> {
        let mut config: BootstrapConfig = self
            .figment
            .extract()
            .map_err(|e| BootstrapError::Config(Box::new(e)))?;

        // Merge side tables that don't flow through figment
        config
            .resource
            .attributes
            .extend(self.resource_attributes.clone());
        config
            .instrumentation
            .libraries
            .extend(self.instrumentation_overrides.clone());

        if let Some(ref url) = config.endpoint.url
            && !url.starts_with("http://")
            && !url.starts_with("https://")
        {
            return Err(BootstrapError::InvalidEndpoint { url: url.clone() });
        }

        Ok(config)
    }

    /// Builds the span pipeline and registers it for the process.
    ///
    /// Returns a [`TracingGuard`] that owns the provider. Shut it down
    /// explicitly via [`TracingGuard::shutdown`] or let the drop flush.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration extraction fails
    /// - Exporter construction fails (fatal, no recovery attempted)
    /// - A provider is already registered for this process
    /// - Tracing subscriber initialisation fails
    pub fn build(self) -> Result<TracingGuard, BootstrapError> {
        let config = self.extract_config()?;
        TracingGuard::from_config(config)
    }
}

impl Default for BootstrapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Prefixes a scheme onto endpoint values given as bare host:port.
fn normalize_endpoint(endpoint: String) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint
    } else {
        format!("http://{endpoint}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_default() {
        let builder = BootstrapBuilder::new();
        let config = builder.extract_config().unwrap();

        assert!(config.init_tracing_subscriber);
        assert!(config.register_global);
        assert_eq!(config.endpoint.protocol, Protocol::Grpc);
        assert_eq!(config.processing.mode, ProcessingMode::Batch);
    }

    #[test]
    fn builder_endpoint() {
        let builder = BootstrapBuilder::new().endpoint("http://collector:4317");
        let config = builder.extract_config().unwrap();

        assert_eq!(
            config.endpoint.url,
            Some("http://collector:4317".to_string())
        );
    }

    #[test]
    fn builder_protocol() {
        let builder = BootstrapBuilder::new().protocol(Protocol::Http);
        let config = builder.extract_config().unwrap();

        assert_eq!(config.endpoint.protocol, Protocol::Http);
    }

    #[test]
    fn builder_processing_mode() {
        let builder = BootstrapBuilder::new().processing_mode(ProcessingMode::Immediate);
        let config = builder.extract_config().unwrap();

        assert_eq!(config.processing.mode, ProcessingMode::Immediate);
    }

    #[test]
    fn builder_service_name() {
        let builder = BootstrapBuilder::new().service_name("my-service");
        let config = builder.extract_config().unwrap();

        assert_eq!(config.resource.service_name, Some("my-service".to_string()));
    }

    #[test]
    fn builder_resource_attribute() {
        let builder = BootstrapBuilder::new().resource_attribute("custom.key", "custom.value");
        let config = builder.extract_config().unwrap();

        assert_eq!(
            config.resource.attributes.get("custom.key"),
            Some(&"custom.value".to_string())
        );
    }

    #[test]
    fn builder_instrumentation_overrides() {
        let builder = BootstrapBuilder::new()
            .disable_instrumentation("sqlx")
            .enable_instrumentation("fs");
        let config = builder.extract_config().unwrap();

        assert!(!config.instrumentation.is_enabled("sqlx"));
        assert!(config.instrumentation.is_enabled("fs"));
    }

    #[test]
    fn builder_without_tracing_subscriber() {
        let builder = BootstrapBuilder::new().without_tracing_subscriber();
        let config = builder.extract_config().unwrap();

        assert!(!config.init_tracing_subscriber);
    }

    #[test]
    fn builder_without_global_registration() {
        let builder = BootstrapBuilder::new().without_global_registration();
        let config = builder.extract_config().unwrap();

        assert!(!config.register_global);
    }

    #[test]
    fn builder_header() {
        let builder = BootstrapBuilder::new().header("Authorization", "Bearer token123");
        let config = builder.extract_config().unwrap();

        assert_eq!(
            config.endpoint.headers.get("Authorization"),
            Some(&"Bearer token123".to_string())
        );
    }

    #[test]
    fn builder_shutdown_timeout() {
        let builder = BootstrapBuilder::new().shutdown_timeout(Duration::from_secs(2));
        let config = builder.extract_config().unwrap();

        assert_eq!(config.shutdown_timeout, Duration::from_secs(2));
    }

    #[test]
    fn standard_env_endpoint() {
        temp_env::with_var(
            "OTEL_EXPORTER_OTLP_TRACES_ENDPOINT",
            Some("http://custom:4317"),
            || {
                let builder = BootstrapBuilder::new().with_standard_env();
                let config = builder.extract_config().unwrap();
                assert_eq!(config.endpoint.url, Some("http://custom:4317".to_string()));
            },
        );
    }

    #[test]
    fn standard_env_endpoint_gets_scheme_prefix() {
        temp_env::with_var(
            "OTEL_EXPORTER_OTLP_TRACES_ENDPOINT",
            Some("collector.internal:4317"),
            || {
                let builder = BootstrapBuilder::new().with_standard_env();
                let config = builder.extract_config().unwrap();
                assert_eq!(
                    config.endpoint.url,
                    Some("http://collector.internal:4317".to_string())
                );
            },
        );
    }

    #[test]
    fn standard_env_endpoint_unset_resolves_to_default() {
        temp_env::with_var("OTEL_EXPORTER_OTLP_TRACES_ENDPOINT", None::<&str>, || {
            let builder = BootstrapBuilder::new().with_standard_env();
            let config = builder.extract_config().unwrap();
            assert_eq!(config.endpoint.url, None);
            assert_eq!(config.effective_endpoint(), "http://localhost:4317");
        });
    }

    #[test]
    fn standard_env_service_name() {
        temp_env::with_var("OTEL_SERVICE_NAME", Some("checkout-svc"), || {
            let builder = BootstrapBuilder::new().with_standard_env();
            let config = builder.extract_config().unwrap();
            assert_eq!(
                config.resource.service_name,
                Some("checkout-svc".to_string())
            );
        });
    }

    #[test]
    fn standard_env_protocol_grpc() {
        temp_env::with_var("OTEL_EXPORTER_OTLP_TRACES_PROTOCOL", Some("grpc"), || {
            let builder = BootstrapBuilder::new().with_standard_env();
            let config = builder.extract_config().unwrap();
            assert_eq!(config.endpoint.protocol, Protocol::Grpc);
        });
    }

    #[test]
    fn standard_env_protocol_http_protobuf() {
        temp_env::with_var(
            "OTEL_EXPORTER_OTLP_TRACES_PROTOCOL",
            Some("http/protobuf"),
            || {
                let builder = BootstrapBuilder::new().with_standard_env();
                let config = builder.extract_config().unwrap();
                assert_eq!(config.endpoint.protocol, Protocol::Http);
            },
        );
    }

    #[test]
    fn standard_env_unknown_protocol_keeps_default() {
        temp_env::with_var(
            "OTEL_EXPORTER_OTLP_TRACES_PROTOCOL",
            Some("carrier-pigeon"),
            || {
                let builder = BootstrapBuilder::new().with_standard_env();
                let config = builder.extract_config().unwrap();
                assert_eq!(config.endpoint.protocol, Protocol::Grpc);
            },
        );
    }

    #[test]
    fn standard_env_multiple_vars() {
        temp_env::with_vars(
            [
                (
                    "OTEL_EXPORTER_OTLP_TRACES_ENDPOINT",
                    Some("http://collector:4317"),
                ),
                ("OTEL_EXPORTER_OTLP_TRACES_PROTOCOL", Some("grpc")),
                ("OTEL_SERVICE_NAME", Some("multi-test")),
            ],
            || {
                let builder = BootstrapBuilder::new().with_standard_env();
                let config = builder.extract_config().unwrap();

                assert_eq!(
                    config.endpoint.url,
                    Some("http://collector:4317".to_string())
                );
                assert_eq!(config.endpoint.protocol, Protocol::Grpc);
                assert_eq!(config.resource.service_name, Some("multi-test".to_string()));
            },
        );
    }

    #[test]
    fn programmatic_overrides_env() {
        temp_env::with_vars(
            [
                ("OTEL_EXPORTER_OTLP_TRACES_ENDPOINT", Some("http://env:4317")),
                ("OTEL_SERVICE_NAME", Some("env-service")),
            ],
            || {
                let builder = BootstrapBuilder::new()
                    .with_standard_env()
                    .endpoint("http://programmatic:4317")
                    .service_name("programmatic-service");
                let config = builder.extract_config().unwrap();

                assert_eq!(
                    config.endpoint.url,
                    Some("http://programmatic:4317".to_string())
                );
                assert_eq!(
                    config.resource.service_name,
                    Some("programmatic-service".to_string())
                );
            },
        );
    }

    #[test]
    fn invalid_endpoint_url_rejected() {
        let builder = BootstrapBuilder::new().endpoint("ftp://collector:21");
        let result = builder.extract_config();

        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(
            matches!(err, BootstrapError::InvalidEndpoint { ref url } if url == "ftp://collector:21"),
            "Expected InvalidEndpoint error, got: {:?}",
            err
        );
    }

    #[test]
    fn valid_https_endpoint_accepted() {
        let builder = BootstrapBuilder::new().endpoint("https://collector.example.com:4317");
        let config = builder.extract_config().unwrap();
        assert_eq!(
            config.endpoint.url,
            Some("https://collector.example.com:4317".to_string())
        );
    }
}
