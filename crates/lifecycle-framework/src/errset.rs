//! # Error Aggregator
//!
//! [`ErrSet`] collects the errors reported by concurrently running and stopping
//! components. The merge rule is small but load-bearing:
//!
//! - real errors always accumulate, first-recorded first;
//! - a cancellation-class error is kept only if nothing was recorded before it.
//!
//! A shutdown makes every component report "I was cancelled". Only the first of
//! those is interesting, and only when nothing real went wrong.

use crate::error::{AggregateError, LifecycleError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct ErrSet {
    errors: Mutex<Vec<Arc<LifecycleError>>>,
}

impl ErrSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `err` according to the merge rule.
    pub fn add(&self, err: impl Into<LifecycleError>) {
        let err = err.into();
        let mut errors = self.lock();
        if !errors.is_empty() && err.is_cancellation() {
            debug!(error = %err, "Dropping duplicate cancellation");
            return;
        }
        warn!(error = %err, recorded = errors.len() + 1, "Error recorded");
        errors.push(Arc::new(err));
    }

    /// Records the error of `result`, if any.
    pub fn add_result<E: Into<LifecycleError>>(&self, result: Result<(), E>) {
        if let Err(err) = result {
            self.add(err);
        }
    }

    /// The combined error so far, or `None` if nothing was recorded.
    pub fn result(&self) -> Option<AggregateError> {
        let errors = self.lock();
        (!errors.is_empty()).then(|| AggregateError::new(errors.clone()))
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the Vec half-pushed.
    fn lock(&self) -> MutexGuard<'_, Vec<Arc<LifecycleError>>> {
        self.errors.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ContextError;

    fn serve_err(name: &str, msg: &str) -> LifecycleError {
        LifecycleError::Serve {
            name: name.into(),
            source: msg.into(),
        }
    }

    #[test]
    fn test_empty_set_has_no_result() {
        let set = ErrSet::new();
        set.add_result(Ok::<(), LifecycleError>(()));
        assert!(set.result().is_none());
        assert!(set.is_empty());
    }

    #[test]
    fn test_cancellation_alone_is_reported() {
        let set = ErrSet::new();
        set.add(ContextError::Canceled);
        let agg = set.result().unwrap();
        assert_eq!(agg.len(), 1);
        assert!(agg.is_cancellation());
    }

    #[test]
    fn test_second_cancellation_is_dropped() {
        let set = ErrSet::new();
        set.add(ContextError::Canceled);
        set.add(ContextError::DeadlineExceeded);
        let agg = set.result().unwrap();
        assert_eq!(agg.to_string(), "context canceled");
    }

    #[test]
    fn test_cancellation_after_real_error_is_dropped() {
        let set = ErrSet::new();
        set.add(serve_err("http", "bind failed"));
        set.add(LifecycleError::Serve {
            name: "db".into(),
            source: Box::new(ContextError::Canceled),
        });
        let agg = set.result().unwrap();
        assert_eq!(agg.len(), 1);
        assert_eq!(agg.errors().next().unwrap().component(), Some("http"));
    }

    #[test]
    fn test_real_errors_accumulate_in_order() {
        let set = ErrSet::new();
        set.add(ContextError::Canceled);
        set.add(serve_err("a", "one"));
        set.add(serve_err("b", "two"));
        assert_eq!(
            set.result().unwrap().to_string(),
            "context canceled; err serving \"a\": one; err serving \"b\": two"
        );
    }

    #[test]
    fn test_concurrent_adds_keep_every_real_error() {
        let set = Arc::new(ErrSet::new());
        let threads: Vec<_> = (0..16)
            .map(|i| {
                let set = set.clone();
                std::thread::spawn(move || {
                    set.add(serve_err(&format!("c{i}"), "boom"));
                    set.add(ContextError::Canceled);
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        let agg = set.result().unwrap();
        assert_eq!(agg.len(), 16);
        assert!(agg.errors().all(|e| !e.is_cancellation()));
    }
}
