//! # Shutdown Sequencer
//!
//! Stops components one at a time, newest first, so a component never sees one
//! of its dependencies disappear while it is still stopping.
//!
//! Every `stop` runs on a context that does *not* inherit the cancellation that
//! triggered the shutdown; otherwise it would be cancelled before it began. An
//! optional timeout bounds the whole sequence rather than each call. When it
//! expires the components not yet stopped are abandoned.

use crate::component::Component;
use crate::context::Context;
use crate::error::{ContextError, LifecycleError};
use crate::errset::ErrSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Stops a single component and records a non-cancellation failure.
#[instrument(skip_all, fields(component = component.name()))]
pub async fn shutdown(component: &dyn Component, errors: &ErrSet, ctx: Context) {
    debug!("Stopping");
    match component.stop(ctx).await {
        Ok(()) => info!("Stopped"),
        Err(source) => {
            let err = LifecycleError::Stop {
                name: component.name().to_string(),
                source,
            };
            if err.is_cancellation() {
                debug!(error = %err, "Ignoring cancellation from stop");
            } else {
                errors.add(err);
            }
        }
    }
}

/// Builds the context every `stop` of one shutdown shares.
///
/// It descends from a fresh background context, never from the one that
/// triggered the shutdown.
pub fn stop_context(timeout: Option<Duration>) -> Context {
    match timeout {
        Some(timeout) => Context::with_timeout(&Context::background(), timeout).0,
        None => Context::background(),
    }
}

/// Stops `components` in reverse order, sharing the deadline of `ctx`.
///
/// Returns the names of components abandoned because the deadline passed.
pub async fn shutdown_all(
    components: &[Arc<dyn Component>],
    errors: &ErrSet,
    ctx: &Context,
) -> Vec<String> {
    for (stopped, component) in components.iter().rev().enumerate() {
        let finished = ctx.err().is_none()
            && tokio::select! {
                biased;
                _ = ctx.done() => false,
                _ = shutdown(component.as_ref(), errors, ctx.clone()) => true,
            };

        if !finished {
            let abandoned: Vec<String> = components
                .iter()
                .rev()
                .skip(stopped)
                .map(|c| c.name().to_string())
                .collect();
            warn!(?abandoned, "Shutdown deadline exceeded");
            errors.add(ContextError::DeadlineExceeded);
            return abandoned;
        }
    }

    Vec::new()
}
