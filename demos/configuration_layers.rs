//! Example demonstrating layered configuration.
//!
//! This shows how configuration is merged from multiple sources with clear
//! precedence: defaults → files → environment variables → programmatic.
//!
//! Run with: OTEL_SERVICE_NAME=env-override cargo run --example configuration_layers

use otel_bootstrap::{BootstrapBuilder, BootstrapError, ProcessingMode, Protocol};

fn main() -> Result<(), BootstrapError> {
    // Configuration is layered with clear precedence:
    // 1. Defaults (gRPC to http://localhost:4317, batch processing)
    // 2. File configuration (TOML files, if present)
    // 3. Environment variables (standard OTEL_* vars)
    // 4. Programmatic configuration (code-level overrides)

    let builder = BootstrapBuilder::new()
        // Read standard OTEL_* environment variables
        .with_standard_env()
        // Programmatic overrides take precedence over env vars
        .endpoint("http://localhost:4317")
        .protocol(Protocol::Grpc)
        .processing_mode(ProcessingMode::Batch)
        .service_name("layered-config-demo")
        // Configure resource attributes
        .service_version("1.0.0")
        .deployment_environment("development")
        .resource_attribute("custom.team", "platform")
        // Add authentication header
        .header("Authorization", "Bearer my-token")
        // Keep noisy database spans out of the trace stream
        .disable_instrumentation("sqlx");

    // Extract config for inspection (useful for debugging)
    let config = builder.extract_config()?;
    println!("Effective endpoint: {}", config.effective_endpoint());
    println!("Service name: {:?}", config.resource.service_name);
    println!("Processing mode: {:?}", config.processing.mode);
    println!(
        "fs instrumentation enabled: {}",
        config.instrumentation.is_enabled("fs")
    );

    // Build and register the pipeline
    let _guard = BootstrapBuilder::new()
        .with_standard_env()
        .endpoint("http://localhost:4317")
        .service_name("layered-config-demo")
        .build()?;

    tracing::info!("Configuration layers demo running");

    Ok(())
}
