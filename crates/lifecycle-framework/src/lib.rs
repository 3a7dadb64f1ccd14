//! # Lifecycle Framework
//!
//! This crate starts a set of interdependent long-running components in a
//! well-defined order, runs them concurrently, notices when any of them stops
//! unexpectedly, shuts all of them down in reverse order, and reports everything
//! that went wrong as one deterministic error.
//!
//! ## Architecture Overview
//!
//! The framework is layered, leaves first:
//!
//! 1. **Signal** ([`Context`]) - a hierarchical, broadcast cancellation signal with
//!    an optional deadline.
//! 2. **Errors** ([`ErrSet`]) - a mutex-guarded accumulator that keeps every real
//!    error and only the first cancellation.
//! 3. **Runner** ([`runner::launch`]) - spawns one component's `serve` and turns its
//!    exit, for any reason, into a cancellation.
//! 4. **Sequencer** ([`sequencer::shutdown_all`]) - calls `stop` newest first, one
//!    at a time, under a shared deadline.
//! 5. **Driver** ([`Orchestrator`]) - composes the above into one run.
//!
//! Components talk to the framework only through the [`Component`] trait and
//! never to each other through it.
//!
//! ## Quick Start
//!
//! ```rust
//! use lifecycle_framework::mock::MockComponent;
//! use lifecycle_framework::{Context, Orchestrator};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (root, stop) = Context::with_cancel(&Context::background());
//!
//!     let mut orchestrator = Orchestrator::new();
//!     orchestrator.register(MockComponent::new("db").into_component());
//!     orchestrator.register(MockComponent::new("http").into_component());
//!
//!     // An operator stop: both components stop cleanly, newest first.
//!     tokio::spawn(async move {
//!         tokio::time::sleep(Duration::from_millis(10)).await;
//!         stop.cancel();
//!     });
//!     assert!(orchestrator.run(&root).await.is_ok());
//! }
//! ```
//!
//! ## Error Semantics
//!
//! | What happened | What the run returns |
//! |---------------|----------------------|
//! | stop requested, everything stopped cleanly | `Ok(())` |
//! | a `serve` returned `Ok(())` on its own | "stopped without an error" |
//! | a `serve` failed, the others were cancelled | the failure only |
//! | the shutdown deadline passed, nothing else | "context deadline exceeded" |
//!
//! ## Testing
//!
//! The [`mock`] module provides [`MockComponent`](mock::MockComponent) and a shared
//! [`CallLog`](mock::CallLog) for asserting start and stop order.

pub mod component;
pub mod context;
pub mod error;
pub mod errset;
pub mod mock;
pub mod orchestrator;
pub mod runner;
pub mod sequencer;

pub use component::Component;
pub use context::{CancelHandle, Context};
pub use error::{is_cancellation, AggregateError, BoxError, ContextError, LifecycleError};
pub use errset::ErrSet;
pub use orchestrator::{Orchestrator, Phase};
