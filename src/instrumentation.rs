//! Per-library instrumentation allow/deny list.
//!
//! Auto-instrumentation in Rust arrives through the `tracing` ecosystem: any
//! library instrumented with `tracing` emits spans once a subscriber with an
//! OpenTelemetry layer is installed. The allow/deny list here controls which
//! of those libraries actually contribute spans, by compiling disabled
//! entries into `EnvFilter` directives (`target=off`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Instrumentation targets that are disabled unless explicitly enabled.
///
/// Filesystem spans are high-volume and rarely useful; they drown out
/// request-level traces.
const DEFAULT_DISABLED: &[&str] = &["fs"];

/// Allow/deny list over instrumented libraries.
///
/// Keys are `tracing` targets of instrumented libraries (e.g. `hyper`,
/// `tonic`, `sqlx`, `fs`); the value enables or disables span collection for
/// that library. Libraries not listed are enabled.
///
/// # Example
///
/// ```
/// use otel_bootstrap::InstrumentationConfig;
///
/// let config = InstrumentationConfig::default()
///     .disable("sqlx")
///     .enable("fs");
/// assert!(config.is_enabled("fs"));
/// assert!(!config.is_enabled("sqlx"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentationConfig {
    /// Per-library overrides, keyed by `tracing` target.
    pub libraries: BTreeMap<String, bool>,
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        let libraries = DEFAULT_DISABLED
            .iter()
            .map(|target| (target.to_string(), false))
            .collect();
        Self { libraries }
    }
}

impl InstrumentationConfig {
    /// Creates a config with no overrides; every library is enabled,
    /// including the ones disabled by default.
    #[must_use]
    pub fn allow_all() -> Self {
        Self {
            libraries: BTreeMap::new(),
        }
    }

    /// Enables span collection for a library.
    #[must_use]
    pub fn enable(mut self, target: impl Into<String>) -> Self {
        self.libraries.insert(target.into(), true);
        self
    }

    /// Disables span collection for a library.
    #[must_use]
    pub fn disable(mut self, target: impl Into<String>) -> Self {
        self.libraries.insert(target.into(), false);
        self
    }

    /// Returns whether a library's instrumentation is enabled.
    #[must_use]
    pub fn is_enabled(&self, target: &str) -> bool {
        self.libraries.get(target).copied().unwrap_or(true)
    }

    /// Returns the filter directives for disabled libraries.
    ///
    /// These are appended to the subscriber's `EnvFilter`, so an explicit
    /// `RUST_LOG` entry for the same target is overridden.
    #[must_use]
    pub fn filter_directives(&self) -> Vec<String> {
        self.libraries
            .iter()
            .filter(|(_, enabled)| !**enabled)
            .map(|(target, _)| format!("{target}=off"))
            .collect()
    }
}
