//! Process-level OpenTelemetry trace bootstrap.
//!
//! Wires together environment-driven configuration, an OTLP span exporter,
//! a batch or immediate span processor, and resource attribute detection
//! into a tracer provider registered once for the process - then shuts the
//! pipeline down cleanly on SIGINT/SIGTERM.
//!
//! # Example
//!
//! ```no_run
//! use otel_bootstrap::{Bootstrap, BootstrapBuilder, BootstrapError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), BootstrapError> {
//!     let bootstrap = Bootstrap::start(
//!         BootstrapBuilder::new()
//!             .with_standard_env()
//!             .service_name("checkout-svc"),
//!     )?;
//!
//!     tracing::info!("Application running");
//!
//!     let exit_code = bootstrap.run_until_shutdown().await;
//!     std::process::exit(exit_code);
//! }
//! ```
//!
//! Hosts that prefer a blocking, fail-fast initialisation can call
//! [`BootstrapBuilder::build`] directly and hold the returned
//! [`TracingGuard`] for the process lifetime.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod config;
mod error;
mod guard;
mod instrumentation;
mod lifecycle;
mod resource;

pub use builder::BootstrapBuilder;
pub use config::{
    BatchConfig, BootstrapConfig, DetectorConfig, EndpointConfig, ProcessingConfig,
    ProcessingMode, Protocol, ResourceConfig,
};
pub use error::BootstrapError;
pub use guard::TracingGuard;
pub use instrumentation::InstrumentationConfig;
pub use lifecycle::{
    Bootstrap, EXIT_SHUTDOWN_FAILURE, EXIT_SUCCESS, LifecycleState, ShutdownCoordinator,
    wait_for_signal,
};
pub use resource::RuntimeResourceDetector;

/// Re-exported for version compatibility with this crate's dependencies.
pub use opentelemetry;
/// Re-exported for version compatibility with this crate's dependencies.
pub use opentelemetry_sdk;
/// Re-exported for version compatibility with this crate's dependencies.
pub use tracing;

/// Re-exported for users who want to construct custom configuration providers.
pub use figment;
