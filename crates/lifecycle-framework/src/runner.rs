//! # Lifecycle Runner
//!
//! [`launch`] starts one component's `serve` on its own Tokio task and ties the
//! task's exit to the shared shutdown signal.
//!
//! ## Launch Sequence
//!
//! 1. **Guard** - if `parent` is already concluded, a shutdown has begun; the
//!    component is not started and the conclusion is returned.
//! 2. **Derive** - a child context is derived from `parent`. The orchestrator
//!    threads each child into the next launch, so the last child is a descendant
//!    of every component's context.
//! 3. **Spawn** - `serve` runs with a background context, so the component's own
//!    account of why it stopped is not coloured by the parent's cancellation.
//! 4. **Exit** - when `serve` returns, the outcome is recorded and the child is
//!    cancelled. Any component exiting therefore concludes the last child, which
//!    is what the orchestrator awaits.
//!
//! A clean return is only an anomaly if it happens while the component's context
//! is still live. Once shutdown has begun the orchestrator cancels every
//! lifecycle context, and `serve` returning `Ok(())` after that is the expected
//! response to `stop`.

use crate::component::Component;
use crate::context::Context;
use crate::error::{ContextError, LifecycleError};
use crate::errset::ErrSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, Instrument};

/// A started component.
#[derive(Debug)]
pub struct Launched {
    /// Concludes when `serve` returns or an ancestor is cancelled.
    pub ctx: Context,
    /// Finishes once the outcome of `serve` has been recorded.
    pub task: JoinHandle<()>,
}

/// Launches `component.serve()` and returns its lifecycle context without blocking.
pub fn launch(
    parent: &Context,
    component: Arc<dyn Component>,
    errors: Arc<ErrSet>,
) -> Result<Launched, ContextError> {
    if let Some(conclusion) = parent.err() {
        debug!(component = component.name(), error = %conclusion, "Skipping launch");
        return Err(conclusion);
    }

    let (ctx, cancel) = Context::with_cancel(parent);
    let lifecycle = ctx.clone();
    let span = tracing::info_span!("serve", component = component.name());

    let task = tokio::spawn(
        async move {
            let name = component.name().to_string();
            info!("Serving");

            let serving = component.clone();
            let outcome = tokio::spawn(
                async move { serving.serve(Context::background()).await }.in_current_span(),
            )
            .await;

            match outcome {
                Ok(Ok(())) if lifecycle.is_done() => {
                    info!("Finished serving");
                }
                Ok(Ok(())) => {
                    errors.add(LifecycleError::StoppedWithoutError { name });
                }
                Ok(Err(source)) => {
                    errors.add(LifecycleError::Serve { name, source });
                }
                Err(join_err) => {
                    debug!(error = %join_err, "Serve task failed");
                    errors.add(LifecycleError::Panicked { name });
                }
            }

            cancel.cancel();
        }
        .instrument(span),
    );

    Ok(Launched { ctx, task })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockComponent;
    use std::time::Duration;

    #[tokio::test]
    async fn test_launch_guard_refuses_concluded_parent() {
        let (parent, cancel) = Context::with_cancel(&Context::background());
        cancel.cancel();
        let errors = Arc::new(ErrSet::new());
        let mock = MockComponent::new("db");

        let result = launch(&parent, mock.clone().into_component(), errors.clone());

        assert_eq!(result.err(), Some(ContextError::Canceled));
        tokio::task::yield_now().await;
        assert!(mock.log().calls().is_empty());
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn test_clean_exit_is_recorded_and_cancels_child() {
        let errors = Arc::new(ErrSet::new());
        let mock = MockComponent::new("worker").exit_after(Duration::from_millis(5));

        let launched =
            launch(&Context::background(), mock.into_component(), errors.clone()).unwrap();
        launched.task.await.unwrap();
        assert!(launched.ctx.is_done());

        let agg = errors.result().unwrap();
        assert_eq!(agg.to_string(), "component \"worker\" stopped without an error");
    }

    #[tokio::test]
    async fn test_serve_error_is_wrapped() {
        let errors = Arc::new(ErrSet::new());
        let mock = MockComponent::new("http").fail_after(Duration::ZERO, "bind failed");

        let launched =
            launch(&Context::background(), mock.into_component(), errors.clone()).unwrap();
        launched.task.await.unwrap();
        assert!(launched.ctx.is_done());

        assert_eq!(
            errors.result().unwrap().to_string(),
            "err serving \"http\": bind failed"
        );
    }

    #[tokio::test]
    async fn test_panic_is_recorded() {
        let errors = Arc::new(ErrSet::new());
        let mock = MockComponent::new("fragile").panic_after(Duration::ZERO);

        let launched =
            launch(&Context::background(), mock.into_component(), errors.clone()).unwrap();
        launched.task.await.unwrap();
        assert!(launched.ctx.is_done());

        assert_eq!(
            errors.result().unwrap().to_string(),
            "component \"fragile\" panicked while serving"
        );
    }

    #[tokio::test]
    async fn test_clean_exit_after_cancellation_is_not_an_anomaly() {
        let (parent, cancel) = Context::with_cancel(&Context::background());
        let errors = Arc::new(ErrSet::new());
        let mock = MockComponent::new("db");
        let component = mock.clone().into_component();

        let launched = launch(&parent, component.clone(), errors.clone()).unwrap();
        cancel.cancel();
        component.stop(Context::background()).await.unwrap();
        launched.task.await.unwrap();

        assert_eq!(mock.log().stops(), vec!["db"]);
        assert!(errors.is_empty());
    }
}
