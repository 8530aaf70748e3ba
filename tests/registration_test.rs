//! The process-wide provider registration happens at most once per process.
//!
//! This lives in its own test binary because the registration flag is
//! process-global; a single test exercises both the success and the
//! rejection path.

use otel_bootstrap::{BootstrapBuilder, BootstrapError};

#[tokio::test(flavor = "multi_thread")]
async fn second_registering_build_fails_observably() {
    let first = BootstrapBuilder::new()
        .service_name("registration-test")
        .without_tracing_subscriber()
        .build();
    assert!(first.is_ok(), "first registration should succeed");

    let second = BootstrapBuilder::new()
        .service_name("registration-test")
        .without_tracing_subscriber()
        .build();
    assert!(
        matches!(second, Err(BootstrapError::AlreadyInitialized)),
        "second registration must fail, got: {:?}",
        second.map(|_| ()),
    );

    // A non-registering build is still allowed alongside the global one.
    let embedded = BootstrapBuilder::new()
        .service_name("registration-test")
        .without_tracing_subscriber()
        .without_global_registration()
        .build();
    assert!(embedded.is_ok());
}
