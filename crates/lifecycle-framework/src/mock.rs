//! # Mock Components & Testing Guide
//!
//! [`MockComponent`] implements [`Component`] with scripted behaviour and
//! records every lifecycle call into a [`CallLog`]. Several mocks can share one
//! log, which turns "did the orchestrator stop things in reverse order?" into a
//! plain assertion on a `Vec`.
//!
//! ## Scripting
//!
//! | Builder | `serve` behaviour |
//! |---------|-------------------|
//! | *(default)* | blocks until `stop` is called, then returns `Ok(())` |
//! | `exit_after(d)` | returns `Ok(())` after `d` (an anomaly) |
//! | `fail_after(d, msg)` | returns an error after `d` |
//! | `cancel_after(d)` | returns [`ContextError::Canceled`] after `d` |
//! | `panic_after(d)` | panics after `d` |
//! | `ignore_stop()` | never returns, even after `stop` |
//! | `serve_after_stop(o)` | what `serve` returns once stopped |
//!
//! `stop` always releases `serve` first, then honours `stop_delay`,
//! `stop_returns` and `stop_hangs`.
//!
//! ## Example
//!
//! ```rust
//! use lifecycle_framework::mock::{CallLog, MockComponent};
//! use lifecycle_framework::{Context, Orchestrator};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let log = CallLog::new();
//!     let mut orchestrator = Orchestrator::new();
//!     orchestrator.register(MockComponent::new("db").with_log(&log).into_component());
//!     orchestrator.register(
//!         MockComponent::new("http")
//!             .with_log(&log)
//!             .fail_after(Duration::from_millis(10), "bind failed")
//!             .into_component(),
//!     );
//!
//!     let result = orchestrator.run(&Context::background()).await;
//!
//!     assert!(result.is_err());
//!     log.verify_stop_order(&["http", "db"]);
//! }
//! ```

use crate::component::Component;
use crate::context::Context;
use crate::error::{BoxError, ContextError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// A lifecycle call observed by a [`CallLog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Serve(String),
    ServeExit(String),
    Stop(String),
}

/// How a scripted call finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Clean,
    Fail(String),
    Canceled,
}

impl Outcome {
    fn into_result(self) -> Result<(), BoxError> {
        match self {
            Outcome::Clean => Ok(()),
            Outcome::Fail(msg) => Err(Box::new(MockError(msg))),
            Outcome::Canceled => Err(Box::new(ContextError::Canceled)),
        }
    }
}

/// Error returned by scripted failures.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct MockError(pub String);

/// Shared, ordered record of lifecycle calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Call>>>,
    changed: Arc<Notify>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: Call) {
        self.lock().push(call);
        self.changed.notify_waiters();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Call>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().clone()
    }

    /// Names passed to `serve`, in call order.
    pub fn serves(&self) -> Vec<String> {
        self.filter(|c| match c {
            Call::Serve(name) => Some(name.clone()),
            _ => None,
        })
    }

    /// Names passed to `stop`, in call order.
    pub fn stops(&self) -> Vec<String> {
        self.filter(|c| match c {
            Call::Stop(name) => Some(name.clone()),
            _ => None,
        })
    }

    fn filter(&self, f: impl Fn(&Call) -> Option<String>) -> Vec<String> {
        self.lock().iter().filter_map(f).collect()
    }

    /// Waits until `call` has been recorded.
    pub async fn wait_for(&self, call: &Call) {
        loop {
            let changed = self.changed.notified();
            if self.lock().contains(call) {
                return;
            }
            changed.await;
        }
    }

    /// Waits until `serve` of `name` has been entered.
    pub async fn wait_for_serve(&self, name: &str) {
        self.wait_for(&Call::Serve(name.to_string())).await;
    }

    /// Waits until `serve` of `name` has returned.
    pub async fn wait_for_serve_exit(&self, name: &str) {
        self.wait_for(&Call::ServeExit(name.to_string())).await;
    }

    /// Panics unless `stop` was called exactly in `expected` order, once each.
    pub fn verify_stop_order(&self, expected: &[&str]) {
        let stops = self.stops();
        if stops != expected {
            panic!("Unexpected stop order: expected {expected:?}, got {stops:?}");
        }
    }
}

#[derive(Debug, Clone)]
enum ServeScript {
    UntilStopped,
    ExitAfter(Duration, Outcome),
    PanicAfter(Duration),
    IgnoresStop,
}

/// A scriptable [`Component`] for tests.
#[derive(Debug, Clone)]
pub struct MockComponent {
    name: String,
    serve: ServeScript,
    after_stop: Outcome,
    stop_delay: Option<Duration>,
    stop_result: Outcome,
    stop_hangs: bool,
    stopped: CancellationToken,
    log: CallLog,
}

impl MockComponent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            serve: ServeScript::UntilStopped,
            after_stop: Outcome::Clean,
            stop_delay: None,
            stop_result: Outcome::Clean,
            stop_hangs: false,
            stopped: CancellationToken::new(),
            log: CallLog::new(),
        }
    }

    /// Records calls into `log` instead of a private one.
    pub fn with_log(mut self, log: &CallLog) -> Self {
        self.log = log.clone();
        self
    }

    pub fn exit_after(mut self, delay: Duration) -> Self {
        self.serve = ServeScript::ExitAfter(delay, Outcome::Clean);
        self
    }

    pub fn fail_after(mut self, delay: Duration, msg: impl Into<String>) -> Self {
        self.serve = ServeScript::ExitAfter(delay, Outcome::Fail(msg.into()));
        self
    }

    pub fn cancel_after(mut self, delay: Duration) -> Self {
        self.serve = ServeScript::ExitAfter(delay, Outcome::Canceled);
        self
    }

    pub fn panic_after(mut self, delay: Duration) -> Self {
        self.serve = ServeScript::PanicAfter(delay);
        self
    }

    /// Makes `serve` block forever, even after `stop`.
    pub fn ignore_stop(mut self) -> Self {
        self.serve = ServeScript::IgnoresStop;
        self
    }

    pub fn serve_after_stop(mut self, outcome: Outcome) -> Self {
        self.after_stop = outcome;
        self
    }

    pub fn stop_delay(mut self, delay: Duration) -> Self {
        self.stop_delay = Some(delay);
        self
    }

    pub fn stop_returns(mut self, outcome: Outcome) -> Self {
        self.stop_result = outcome;
        self
    }

    /// Makes `stop` block forever, ignoring its context.
    pub fn stop_hangs(mut self) -> Self {
        self.stop_hangs = true;
        self
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }

    pub fn into_component(self) -> Arc<dyn Component> {
        Arc::new(self)
    }
}

#[async_trait]
impl Component for MockComponent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn serve(&self, _ctx: Context) -> Result<(), BoxError> {
        self.log.record(Call::Serve(self.name.clone()));
        let result = match &self.serve {
            ServeScript::UntilStopped => {
                self.stopped.cancelled().await;
                self.after_stop.clone().into_result()
            }
            ServeScript::ExitAfter(delay, outcome) => {
                tokio::select! {
                    _ = self.stopped.cancelled() => self.after_stop.clone().into_result(),
                    _ = tokio::time::sleep(*delay) => outcome.clone().into_result(),
                }
            }
            ServeScript::PanicAfter(delay) => {
                tokio::time::sleep(*delay).await;
                panic!("{} panicked on purpose", self.name);
            }
            ServeScript::IgnoresStop => std::future::pending().await,
        };
        self.log.record(Call::ServeExit(self.name.clone()));
        result
    }

    async fn stop(&self, ctx: Context) -> Result<(), BoxError> {
        self.log.record(Call::Stop(self.name.clone()));
        self.stopped.cancel();

        if self.stop_hangs {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.stop_delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = ctx.done() => {
                    return Err(Box::new(ctx.err().unwrap_or(ContextError::Canceled)));
                }
            }
        }
        self.stop_result.clone().into_result()
    }
}
