//! Resource attribute detection.
//!
//! Builds the [`Resource`] descriptor attached to every span this process
//! emits: automatic host/OS/process/runtime detection, with explicitly
//! configured attributes (service name first among them) layered on top.

use crate::config::{DetectorConfig, ResourceConfig};
use opentelemetry::KeyValue;
use opentelemetry_resource_detectors::{
    HostResourceDetector, OsResourceDetector, ProcessResourceDetector,
};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::resource::ResourceDetector;
use opentelemetry_semantic_conventions::resource::{
    PROCESS_RUNTIME_NAME, SERVICE_NAME, SERVICE_VERSION,
};

/// Detects Rust runtime resource attributes.
///
/// Captures metadata available without build-time support:
/// - `process.runtime.name` = "rust" (semantic convention)
/// - `rust.target_os`, `rust.target_arch`
/// - `rust.debug` (true for debug builds)
pub struct RuntimeResourceDetector;

impl ResourceDetector for RuntimeResourceDetector {
    fn detect(&self) -> Resource {
        Resource::builder()
            .with_attributes([
                KeyValue::new(PROCESS_RUNTIME_NAME, "rust"),
                KeyValue::new("rust.target_os", std::env::consts::OS),
                KeyValue::new("rust.target_arch", std::env::consts::ARCH),
                KeyValue::new("rust.debug", cfg!(debug_assertions)),
            ])
            .build()
    }
}

/// Builds the process resource from configuration.
///
/// Explicit attributes are added after the detectors, so a configured value
/// wins over a detected one.
pub(crate) fn build_resource(config: &ResourceConfig) -> Resource {
    let mut builder = Resource::builder();

    if config.detectors == DetectorConfig::Auto {
        builder = builder
            .with_detector(Box::new(HostResourceDetector::default()))
            .with_detector(Box::new(OsResourceDetector))
            .with_detector(Box::new(ProcessResourceDetector))
            .with_detector(Box::new(RuntimeResourceDetector));
    }

    let mut attributes: Vec<KeyValue> = config
        .attributes
        .iter()
        .map(|(k, v)| KeyValue::new(k.clone(), v.clone()))
        .collect();

    if let Some(name) = &config.service_name {
        attributes.push(KeyValue::new(SERVICE_NAME, name.clone()));
    }

    if let Some(version) = &config.service_version {
        attributes.push(KeyValue::new(SERVICE_VERSION, version.clone()));
    }

    if let Some(env) = &config.deployment_environment {
        attributes.push(KeyValue::new("deployment.environment.name", env.clone()));
    }

    builder.with_attributes(attributes).build()
}
