//! # Lifecycle Errors
//!
//! This module defines the error taxonomy shared by every layer of the
//! orchestrator. Components report failures as [`BoxError`]; the runner and the
//! sequencer wrap them into [`LifecycleError`] with the component name attached,
//! and the [`ErrSet`](crate::ErrSet) folds them into a single [`AggregateError`].
//!
//! ## Cancellation-class errors
//!
//! [`ContextError`] is the "expected noise" of a shutdown: once something real
//! has gone wrong, every other component tends to report that it was cancelled.
//! [`is_cancellation`] walks an error's `source()` chain looking for a
//! `ContextError`, so a component may wrap the conclusion of its context in its
//! own error type and still be recognised.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Error type returned by [`Component`](crate::Component) implementations.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Why a [`Context`](crate::Context) concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("context canceled")]
    Canceled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// A failure attributed to a single component.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The component could not be built; nothing was started.
    #[error("cant construct {name:?}: {source}")]
    Construct {
        name: String,
        #[source]
        source: BoxError,
    },

    /// `serve` returned an error.
    #[error("err serving {name:?}: {source}")]
    Serve {
        name: String,
        #[source]
        source: BoxError,
    },

    /// `serve` returned cleanly before anybody asked it to stop.
    #[error("component {name:?} stopped without an error")]
    StoppedWithoutError { name: String },

    /// The task running `serve` panicked.
    #[error("component {name:?} panicked while serving")]
    Panicked { name: String },

    /// `stop` returned an error.
    #[error("finished {name:?} with error: {source}")]
    Stop {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Context(#[from] ContextError),
}

impl LifecycleError {
    /// Name of the component this error is attributed to, if any.
    pub fn component(&self) -> Option<&str> {
        match self {
            Self::Construct { name, .. }
            | Self::Serve { name, .. }
            | Self::StoppedWithoutError { name }
            | Self::Panicked { name }
            | Self::Stop { name, .. } => Some(name),
            Self::Context(_) => None,
        }
    }

    /// Returns `true` if this error stems from a cancelled or expired context.
    pub fn is_cancellation(&self) -> bool {
        match self {
            Self::Context(_) => true,
            other => is_cancellation(other),
        }
    }
}

/// Returns `true` if `err` or anything in its `source()` chain is a [`ContextError`].
pub fn is_cancellation(err: &(dyn Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.downcast_ref::<ContextError>().is_some() {
            return true;
        }
        current = e.source();
    }
    false
}

/// The combined result of a run: every retained error, in the order recorded.
///
/// Cloning is cheap; the individual errors are shared.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}", render(.0))]
pub struct AggregateError(Vec<Arc<LifecycleError>>);

impl AggregateError {
    pub(crate) fn new(errors: Vec<Arc<LifecycleError>>) -> Self {
        Self(errors)
    }

    /// The retained errors, first-recorded first.
    pub fn errors(&self) -> impl Iterator<Item = &LifecycleError> {
        self.0.iter().map(|e| e.as_ref())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if every retained error is cancellation-class.
    pub fn is_cancellation(&self) -> bool {
        self.errors().all(LifecycleError::is_cancellation)
    }
}

fn render(errors: &[Arc<LifecycleError>]) -> RenderList<'_> {
    RenderList(errors)
}

struct RenderList<'a>(&'a [Arc<LifecycleError>]);

impl fmt::Display for RenderList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("listener gave up")]
    struct Wrapped(#[source] ContextError);

    #[test]
    fn test_cancellation_found_through_source_chain() {
        let direct = LifecycleError::Serve {
            name: "db".into(),
            source: Box::new(ContextError::Canceled),
        };
        assert!(direct.is_cancellation());

        let nested = LifecycleError::Stop {
            name: "http".into(),
            source: Box::new(Wrapped(ContextError::DeadlineExceeded)),
        };
        assert!(nested.is_cancellation());

        let plain = LifecycleError::StoppedWithoutError { name: "db".into() };
        assert!(!plain.is_cancellation());
        assert!(LifecycleError::from(ContextError::Canceled).is_cancellation());
    }

    #[test]
    fn test_messages_carry_component_name() {
        let err = LifecycleError::Serve {
            name: "httpServer".into(),
            source: "http listen: address in use".into(),
        };
        assert_eq!(
            err.to_string(),
            "err serving \"httpServer\": http listen: address in use"
        );
        assert_eq!(err.component(), Some("httpServer"));
        assert_eq!(LifecycleError::from(ContextError::Canceled).component(), None);
    }

    #[test]
    fn test_aggregate_renders_in_order() {
        let agg = AggregateError::new(vec![
            Arc::new(LifecycleError::StoppedWithoutError { name: "a".into() }),
            Arc::new(ContextError::Canceled.into()),
        ]);
        assert_eq!(
            agg.to_string(),
            "component \"a\" stopped without an error; context canceled"
        );
        assert_eq!(agg.len(), 2);
        assert!(!agg.is_cancellation());
    }
}
