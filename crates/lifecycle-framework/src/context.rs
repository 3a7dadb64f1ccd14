//! # Cancellation Context
//!
//! A [`Context`] is a cheap, cloneable handle on a one-shot broadcast signal,
//! optionally bounded by a deadline. It is the only channel through which the
//! orchestrator, the runners and the components learn that a shutdown has begun.
//!
//! ## Hierarchy
//!
//! Contexts form a tree. [`Context::with_cancel`] derives a child whose signal
//! fires when the parent fires *or* when the returned [`CancelHandle`] is used.
//! Cancelling a child never touches its parent.
//!
//! ```rust
//! use lifecycle_framework::{Context, ContextError};
//!
//! # #[tokio::main] async fn main() {
//! let (root, cancel_root) = Context::with_cancel(&Context::background());
//! let (child, cancel_child) = Context::with_cancel(&root);
//!
//! cancel_child.cancel();
//! assert_eq!(child.err(), Some(ContextError::Canceled));
//! assert_eq!(root.err(), None);
//!
//! cancel_root.cancel();
//! root.done().await;
//! # }
//! ```
//!
//! Underneath, the signal is a [`tokio_util::sync::CancellationToken`], so any
//! number of tasks may await [`Context::done`] at the same time without the
//! signal being consumed.

use crate::error::ContextError;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct Inner {
    token: CancellationToken,
    deadline: Option<Instant>,
    /// First observed conclusion and when it happened. Never changes once set.
    cause: OnceLock<(Instant, ContextError)>,
    parent: Option<Arc<Inner>>,
}

impl Inner {
    fn expired(&self) -> Option<(Instant, ContextError)> {
        self.deadline
            .filter(|d| Instant::now() >= *d)
            .map(|d| (d, ContextError::DeadlineExceeded))
    }

    /// Resolves the conclusion and pins it, so later calls report the same cause.
    ///
    /// When both the parent and this context's own deadline have concluded,
    /// whichever happened earlier wins.
    fn conclusion(&self) -> Option<(Instant, ContextError)> {
        if let Some(pinned) = self.cause.get() {
            return Some(*pinned);
        }
        let inherited = self.parent.as_ref().and_then(|p| p.conclusion());
        let found = match (inherited, self.expired()) {
            (Some(parent), Some(own)) if own.0 < parent.0 => Some(own),
            (Some(parent), _) => Some(parent),
            (None, own) => own,
        }
        // Cancelled by an ancestor that recorded no cause of its own.
        .or_else(|| {
            self.token
                .is_cancelled()
                .then(|| (Instant::now(), ContextError::Canceled))
        })?;
        Some(*self.cause.get_or_init(|| found))
    }

    fn cancel(&self) {
        if self.conclusion().is_none() {
            let _ = self.cause.set((Instant::now(), ContextError::Canceled));
        }
        self.token.cancel();
    }
}

/// A hierarchical, cooperatively cancelled signal with an optional deadline.
#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

/// Cancels the [`Context`] it was created with, and all of that context's descendants.
///
/// Calling [`cancel`](CancelHandle::cancel) more than once has no further effect.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    inner: Arc<Inner>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.inner.cancel();
    }
}

impl Context {
    /// A root context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self {
            inner: Arc::new(Inner {
                token: CancellationToken::new(),
                deadline: None,
                cause: OnceLock::new(),
                parent: None,
            }),
        }
    }

    /// Derives a cancellable child of `parent`.
    ///
    /// If `parent` is already concluded, the child is born concluded.
    pub fn with_cancel(parent: &Context) -> (Self, CancelHandle) {
        Self::derive(parent, parent.inner.deadline)
    }

    /// Derives a child that concludes with [`ContextError::DeadlineExceeded`] at `deadline`.
    ///
    /// The effective deadline is the earlier of `deadline` and the parent's.
    pub fn with_deadline(parent: &Context, deadline: Instant) -> (Self, CancelHandle) {
        let effective = match parent.inner.deadline {
            Some(inherited) => inherited.min(deadline),
            None => deadline,
        };
        Self::derive(parent, Some(effective))
    }

    pub fn with_timeout(parent: &Context, timeout: Duration) -> (Self, CancelHandle) {
        Self::with_deadline(parent, Instant::now() + timeout)
    }

    fn derive(parent: &Context, deadline: Option<Instant>) -> (Self, CancelHandle) {
        let inner = Arc::new(Inner {
            token: parent.inner.token.child_token(),
            deadline,
            cause: OnceLock::new(),
            parent: Some(parent.inner.clone()),
        });
        let handle = CancelHandle {
            inner: inner.clone(),
        };
        (Self { inner }, handle)
    }

    /// Resolves once this context is concluded, by cancellation or by its deadline.
    ///
    /// Cancel-safe; may be awaited from any number of tasks.
    pub async fn done(&self) {
        match self.inner.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.inner.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.inner.token.cancelled().await,
        }
        self.inner.conclusion();
    }

    /// Why this context concluded, or `None` while it is still live.
    ///
    /// Once reported, the conclusion never changes.
    pub fn err(&self) -> Option<ContextError> {
        self.inner.conclusion().map(|(_, cause)| cause)
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_propagates_down_not_up() {
        let (parent, cancel_parent) = Context::with_cancel(&Context::background());
        let (child, cancel_child) = Context::with_cancel(&parent);
        let (grandchild, _) = Context::with_cancel(&child);

        cancel_child.cancel();
        assert_eq!(child.err(), Some(ContextError::Canceled));
        assert_eq!(grandchild.err(), Some(ContextError::Canceled));
        assert_eq!(parent.err(), None);

        cancel_parent.cancel();
        parent.done().await;
        assert_eq!(parent.err(), Some(ContextError::Canceled));
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let (ctx, cancel) = Context::with_cancel(&Context::background());
        cancel.cancel();
        cancel.cancel();
        ctx.done().await;
        assert_eq!(ctx.err(), Some(ContextError::Canceled));
    }

    #[tokio::test]
    async fn test_derive_from_concluded_parent_is_concluded() {
        let (parent, cancel) = Context::with_cancel(&Context::background());
        cancel.cancel();
        let (child, _) = Context::with_cancel(&parent);
        assert!(child.is_done());
        child.done().await;
    }

    #[tokio::test]
    async fn test_many_waiters_observe_one_signal() {
        let (ctx, cancel) = Context::with_cancel(&Context::background());
        let waiters: Vec<_> = (0..8)
            .map(|_| {
                let ctx = ctx.clone();
                tokio::spawn(async move { ctx.done().await })
            })
            .collect();

        cancel.cancel();
        for waiter in waiters {
            waiter.await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded() {
        let (ctx, _cancel) = Context::with_timeout(&Context::background(), Duration::from_secs(5));
        assert_eq!(ctx.err(), None);

        ctx.done().await;
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_child_inherits_earlier_deadline() {
        let (parent, _) = Context::with_timeout(&Context::background(), Duration::from_secs(1));
        let (child, _) = Context::with_timeout(&parent, Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());

        child.done().await;
        assert_eq!(child.err(), Some(ContextError::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_deadline_keeps_deadline_cause() {
        let (ctx, cancel) = Context::with_timeout(&Context::background(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_own_deadline_survives_later_parent_cancel() {
        let (root, cancel_root) = Context::with_cancel(&Context::background());
        let (child, _) = Context::with_timeout(&root, Duration::from_secs(1));

        child.done().await;
        assert_eq!(child.err(), Some(ContextError::DeadlineExceeded));

        cancel_root.cancel();
        assert_eq!(root.err(), Some(ContextError::Canceled));
        assert_eq!(child.err(), Some(ContextError::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_earlier_parent_cancel_wins_over_later_deadline() {
        let (root, cancel_root) = Context::with_cancel(&Context::background());
        let (child, _) = Context::with_timeout(&root, Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(500)).await;
        cancel_root.cancel();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(child.err(), Some(ContextError::Canceled));
    }
}
