//! # Component Trait
//!
//! The `Component` trait is the whole contract between the orchestrator and the
//! things it runs: a name for error attribution, a blocking `serve`, and an
//! idempotent `stop`. The orchestrator never reaches past this trait.
//!
//! Components are held as `Arc<dyn Component>` because `stop` is called from the
//! control task while `serve` is still running on its own task.

use crate::context::Context;
use crate::error::BoxError;
use async_trait::async_trait;

/// A long-running unit managed by the [`Orchestrator`](crate::Orchestrator).
///
/// # Example
///
/// ```rust
/// use lifecycle_framework::{BoxError, Component, Context};
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
///
/// struct Ticker {
///     stopped: CancellationToken,
/// }
///
/// #[async_trait]
/// impl Component for Ticker {
///     fn name(&self) -> &str {
///         "ticker"
///     }
///
///     async fn serve(&self, _ctx: Context) -> Result<(), BoxError> {
///         self.stopped.cancelled().await;
///         Ok(())
///     }
///
///     async fn stop(&self, _ctx: Context) -> Result<(), BoxError> {
///         self.stopped.cancel();
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Component: Send + Sync + 'static {
    /// Human-readable name, used only to attribute errors and log lines.
    fn name(&self) -> &str;

    /// Runs until stopped.
    ///
    /// Returning at all, with or without an error, before [`stop`](Component::stop)
    /// was requested is treated as an anomaly and brings the whole application down.
    async fn serve(&self, ctx: Context) -> Result<(), BoxError>;

    /// Requests graceful termination.
    ///
    /// Called exactly once per run, even if `serve` never started or already
    /// returned. Should respect the deadline carried by `ctx`.
    async fn stop(&self, ctx: Context) -> Result<(), BoxError>;
}
