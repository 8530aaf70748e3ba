//! Process lifecycle: non-blocking start and signal-driven shutdown.
//!
//! [`Bootstrap::start`] builds the span pipeline on a background task so the
//! host application's startup path never waits on telemetry infrastructure.
//! The task's outcome is held as an explicit completion handle, not detached:
//! the shutdown path awaits it before tearing anything down, so teardown
//! never races construction.
//!
//! Shutdown follows a three-state machine, `Running` → `ShuttingDown` →
//! `Terminated`, guarded by an atomic so duplicate termination signals run
//! the flush exactly once.

use crate::builder::BootstrapBuilder;
use crate::error::BootstrapError;
use crate::guard::TracingGuard;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::task::JoinHandle;

/// Exit code for a clean shutdown.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code when the shutdown flush fails or times out.
pub const EXIT_SHUTDOWN_FAILURE: i32 = 1;

/// Lifecycle states of the bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Pipeline is (being) built and spans flow.
    Running,
    /// A termination signal was received; flush in progress.
    ShuttingDown,
    /// Shutdown sequence has completed.
    Terminated,
}

/// Atomic guard around the shutdown state machine.
///
/// Exactly one caller wins the `Running` → `ShuttingDown` transition;
/// everyone else observes `ShuttingDown` and must not re-enter the
/// shutdown sequence.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    state: AtomicU8,
}

const STATE_RUNNING: u8 = 0;
const STATE_SHUTTING_DOWN: u8 = 1;
const STATE_TERMINATED: u8 = 2;

impl ShutdownCoordinator {
    /// Creates a coordinator in the `Running` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(STATE_RUNNING),
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        match self.state.load(Ordering::SeqCst) {
            STATE_RUNNING => LifecycleState::Running,
            STATE_SHUTTING_DOWN => LifecycleState::ShuttingDown,
            _ => LifecycleState::Terminated,
        }
    }

    /// Attempts the `Running` → `ShuttingDown` transition.
    ///
    /// Returns `true` for the single caller that wins; `false` when shutdown
    /// is already in progress or finished.
    pub fn begin_shutdown(&self) -> bool {
        self.state
            .compare_exchange(
                STATE_RUNNING,
                STATE_SHUTTING_DOWN,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Marks the shutdown sequence complete.
    pub fn finish_shutdown(&self) {
        self.state.store(STATE_TERMINATED, Ordering::SeqCst);
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a bootstrap started in the background.
///
/// # Example
///
/// ```no_run
/// use otel_bootstrap::{Bootstrap, BootstrapBuilder, BootstrapError};
///
/// #[tokio::main]
/// async fn main() -> Result<(), BootstrapError> {
///     let bootstrap = Bootstrap::start(
///         BootstrapBuilder::new()
///             .with_standard_env()
///             .service_name("checkout-svc"),
///     )?;
///
///     // ... application work; startup was not blocked on telemetry ...
///
///     let exit_code = bootstrap.run_until_shutdown().await;
///     std::process::exit(exit_code);
/// }
/// ```
pub struct Bootstrap {
    startup: Option<JoinHandle<Result<TracingGuard, BootstrapError>>>,
    guard: Option<TracingGuard>,
    coordinator: Arc<ShutdownCoordinator>,
}

impl Bootstrap {
    /// Starts the bootstrap without blocking the caller.
    ///
    /// Configuration is resolved synchronously up front - a configuration or
    /// endpoint error is a fatal startup error and surfaces here. The
    /// pipeline construction itself runs on a background task; if it fails,
    /// the failure is logged and the process continues without tracing.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Config`] or
    /// [`BootstrapError::InvalidEndpoint`] when configuration cannot be
    /// resolved.
    pub fn start(builder: BootstrapBuilder) -> Result<Self, BootstrapError> {
        let config = builder.extract_config()?;
        let handle = tokio::task::spawn_blocking(move || TracingGuard::from_config(config));

        Ok(Self {
            startup: Some(handle),
            guard: None,
            coordinator: Arc::new(ShutdownCoordinator::new()),
        })
    }

    /// Awaits the background start once, keeping the built guard.
    async fn resolve(&mut self) {
        if let Some(handle) = self.startup.take() {
            self.guard = await_start(handle).await;
        }
    }

    /// Waits for the background start to finish and returns the built guard.
    ///
    /// Returns `None` when construction failed; the failure has already been
    /// logged. The guard gives direct access to the owned tracer provider,
    /// so hosts can emit spans through the handle without relying on the
    /// process-wide registration.
    pub async fn guard(&mut self) -> Option<&TracingGuard> {
        self.resolve().await;
        self.guard.as_ref()
    }

    /// Returns the shutdown coordinator, for hosts that want to observe or
    /// drive the lifecycle themselves.
    #[must_use]
    pub fn coordinator(&self) -> Arc<ShutdownCoordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.coordinator.state()
    }

    /// Waits for SIGINT or SIGTERM, then runs the shutdown sequence.
    ///
    /// Returns the process exit code: 0 on a clean flush, 1 when shutdown
    /// fails or exceeds the configured timeout.
    pub async fn run_until_shutdown(self) -> i32 {
        wait_for_signal().await;
        self.shutdown().await
    }

    /// Runs the shutdown sequence immediately.
    ///
    /// Awaits the background start first, so a pipeline that is still being
    /// built is either flushed properly or its failure logged. Runs at most
    /// once; if shutdown is already in progress the call is a no-op
    /// returning 0.
    pub async fn shutdown(mut self) -> i32 {
        if !self.coordinator.begin_shutdown() {
            return EXIT_SUCCESS;
        }

        self.resolve().await;
        let code = match self.guard.take() {
            Some(guard) => flush_and_shutdown(guard).await,
            // Start failed; there is nothing to flush and the failure was
            // already logged.
            None => EXIT_SUCCESS,
        };

        self.coordinator.finish_shutdown();
        tracing::info!(target: "otel_bootstrap", exit_code = code, "shutdown sequence complete");
        code
    }
}

/// Resolves the background start, logging a failure instead of propagating it.
async fn await_start(handle: JoinHandle<Result<TracingGuard, BootstrapError>>) -> Option<TracingGuard> {
    match handle.await {
        Ok(Ok(guard)) => Some(guard),
        Ok(Err(e)) => {
            tracing::error!(
                target: "otel_bootstrap",
                error = %e,
                "tracing bootstrap failed; continuing without tracing"
            );
            None
        }
        Err(e) => {
            tracing::error!(target: "otel_bootstrap", error = %e, "tracing bootstrap task panicked");
            None
        }
    }
}

/// Flushes and shuts down the pipeline, bounded by the guard's timeout.
async fn flush_and_shutdown(guard: TracingGuard) -> i32 {
    let timeout = guard.shutdown_timeout();
    let shutdown = tokio::task::spawn_blocking(move || guard.shutdown());

    match tokio::time::timeout(timeout, shutdown).await {
        Ok(Ok(Ok(()))) => EXIT_SUCCESS,
        Ok(Ok(Err(e))) => {
            tracing::error!(target: "otel_bootstrap", error = %e, "shutdown flush failed");
            EXIT_SHUTDOWN_FAILURE
        }
        Ok(Err(e)) => {
            tracing::error!(target: "otel_bootstrap", error = %e, "shutdown task panicked");
            EXIT_SHUTDOWN_FAILURE
        }
        Err(_) => {
            let e = BootstrapError::ShutdownTimeout { timeout };
            tracing::error!(target: "otel_bootstrap", error = %e, "abandoning shutdown flush");
            EXIT_SHUTDOWN_FAILURE
        }
    }
}

/// Resolves on the first SIGINT or SIGTERM.
pub async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
        ) {
            (Ok(mut interrupt), Ok(mut terminate)) => {
                tokio::select! {
                    _ = interrupt.recv() => {
                        tracing::info!(target: "otel_bootstrap", signal = "SIGINT", "termination signal received");
                    }
                    _ = terminate.recv() => {
                        tracing::info!(target: "otel_bootstrap", signal = "SIGTERM", "termination signal received");
                    }
                }
            }
            _ => {
                tracing::error!(
                    target: "otel_bootstrap",
                    "failed to install signal handlers; falling back to Ctrl-C"
                );
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(target: "otel_bootstrap", error = %e, "failed to listen for Ctrl-C");
        }
    }
}
