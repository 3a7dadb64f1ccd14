//! # Application Lifecycle
//!
//! Everything the binary needs around the components themselves:
//!
//! - [`app`]: builds the components and runs them under an orchestrator.
//! - [`signal`]: turns SIGINT/SIGTERM into a cancelled root context.
//! - [`telemetry`]: installs the log subscriber.

pub mod app;
pub mod signal;
pub mod telemetry;

pub use app::{run_app, App, AppError};
pub use signal::await_signal;
pub use telemetry::setup_tracing;
