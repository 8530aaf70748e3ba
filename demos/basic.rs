//! Minimal bootstrap: env-driven configuration and signal-driven shutdown.
//!
//! Run with: OTEL_SERVICE_NAME=basic-demo cargo run --example basic
//! Stop with Ctrl-C (SIGINT) or SIGTERM; buffered spans are flushed before exit.

use otel_bootstrap::{Bootstrap, BootstrapBuilder, BootstrapError};

#[tokio::main]
async fn main() -> Result<(), BootstrapError> {
    // Start the span pipeline in the background; application startup does
    // not wait on telemetry infrastructure.
    let bootstrap = Bootstrap::start(
        BootstrapBuilder::new()
            .with_standard_env()
            .service_name("basic-demo"),
    )?;

    tracing::info!("Application started");
    tracing::info!(user_id = 42, "Processing request");

    // Wait for SIGINT/SIGTERM, flush, and exit with the mapped code.
    let exit_code = bootstrap.run_until_shutdown().await;
    std::process::exit(exit_code);
}
