//! # Orchestrator
//!
//! The [`Orchestrator`] drives one run of an application made of components:
//!
//! ```text
//! Idle ──register──▶ Starting ──launch all──▶ Running
//!                                               │ root cancelled, or
//!                                               │ any serve returned
//!                                               ▼
//!                   Terminated ◀──stop all── ShuttingDown
//! ```
//!
//! ## Registration
//!
//! Components are registered in the order they must start. That order is the
//! only ordering the orchestrator knows about; shutdown is its exact reverse.
//! Construction happens before [`run`](Orchestrator::run), so a constructor that
//! fails leaves nothing to roll back:
//!
//! ```rust,ignore
//! let mut orchestrator = Orchestrator::new();
//! let db = orchestrator.try_register("db_conn", DbConn::connect(&ctx).await)?;
//! orchestrator.add(HttpServer::new(addr, db));
//! orchestrator.run(&ctx).await?;
//! ```
//!
//! ## Shutdown
//!
//! Whichever comes first, the root context concluding or a component's `serve`
//! returning, moves the run to `ShuttingDown`. Every lifecycle context is then
//! cancelled, `stop` is called on every registered component newest first, and
//! the run waits for each `serve` task to settle before reading the aggregated
//! error. An optional timeout bounds the stopping and the settling together.
//!
//! A root that concludes before every component was launched interrupts
//! startup; the run then moves from `Starting` directly to `ShuttingDown`.

use crate::component::Component;
use crate::context::Context;
use crate::error::{AggregateError, BoxError, ContextError, LifecycleError};
use crate::errset::ErrSet;
use crate::runner::{self, Launched};
use crate::sequencer;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Starting,
    Running,
    ShuttingDown,
    Terminated,
}

/// Starts registered components in order and stops them in reverse.
pub struct Orchestrator {
    components: Vec<Arc<dyn Component>>,
    shutdown_timeout: Option<Duration>,
    phase: watch::Sender<Phase>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    pub fn new() -> Self {
        let (phase, _) = watch::channel(Phase::Idle);
        Self {
            components: Vec::new(),
            shutdown_timeout: None,
            phase,
        }
    }

    /// Bounds the whole shutdown sequence. Without it, shutdown waits as long
    /// as the components take.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = Some(timeout);
        self
    }

    /// Appends a component to the startup order.
    pub fn register(&mut self, component: Arc<dyn Component>) -> &mut Self {
        info!(
            component = component.name(),
            position = self.components.len(),
            "Registered"
        );
        self.components.push(component);
        self
    }

    /// Registers `component` and hands back a typed handle for its dependents.
    pub fn add<C: Component>(&mut self, component: C) -> Arc<C> {
        let component = Arc::new(component);
        self.register(component.clone());
        component
    }

    /// Registers the outcome of a constructor.
    ///
    /// A failed construction is returned as [`LifecycleError::Construct`] and
    /// should abort startup; nothing registered so far has been started.
    pub fn try_register<C, E>(
        &mut self,
        name: &str,
        built: Result<C, E>,
    ) -> Result<Arc<C>, LifecycleError>
    where
        C: Component,
        E: Into<BoxError>,
    {
        match built {
            Ok(component) => Ok(self.add(component)),
            Err(e) => {
                let err = LifecycleError::Construct {
                    name: name.to_string(),
                    source: e.into(),
                };
                error!(error = %err, "Construction failed");
                Err(err)
            }
        }
    }

    /// Observes phase transitions of the upcoming run.
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    fn enter(&self, phase: Phase) {
        info!(?phase, "Lifecycle phase");
        self.phase.send_replace(phase);
    }

    /// Runs every registered component until `root` concludes or one of them exits.
    ///
    /// Returns the aggregated error, or `Ok(())` if everything stopped cleanly.
    #[instrument(skip_all, fields(components = self.components.len()))]
    pub async fn run(self, root: &Context) -> Result<(), AggregateError> {
        let errors = Arc::new(ErrSet::new());

        self.enter(Phase::Starting);
        let (shared, cancel_all) = Context::with_cancel(root);
        let startup = self.start(&shared, &errors);

        if !startup.interrupted {
            self.enter(Phase::Running);
            startup.tail.done().await;
        }
        let tasks = startup.tasks;

        self.enter(Phase::ShuttingDown);
        let trigger = if root.is_done() {
            "stop requested"
        } else {
            "component exited"
        };
        info!(trigger, "Shutting down");
        cancel_all.cancel();

        let stop_ctx = sequencer::stop_context(self.shutdown_timeout);
        let abandoned = sequencer::shutdown_all(&self.components, &errors, &stop_ctx).await;
        if abandoned.is_empty() {
            settle(tasks, &errors, &stop_ctx).await;
        }

        self.enter(Phase::Terminated);
        match errors.result() {
            Some(agg) => {
                error!(error = %agg, "Terminated with errors");
                Err(agg)
            }
            None => {
                info!("Terminated cleanly");
                Ok(())
            }
        }
    }
}

/// What the startup loop left behind.
struct Startup {
    tail: Context,
    tasks: Vec<JoinHandle<()>>,
    interrupted: bool,
}

impl Orchestrator {
    /// Launches every component in order, threading each lifecycle context into
    /// the next launch. Stops at the first launch refused by a concluded context.
    fn start(&self, shared: &Context, errors: &Arc<ErrSet>) -> Startup {
        let mut tail = shared.clone();
        let mut tasks = Vec::with_capacity(self.components.len());

        for component in &self.components {
            match runner::launch(&tail, component.clone(), errors.clone()) {
                Ok(Launched { ctx, task }) => {
                    tail = ctx;
                    tasks.push(task);
                }
                Err(conclusion) => {
                    warn!(
                        component = component.name(),
                        error = %conclusion,
                        "Startup interrupted"
                    );
                    errors.add(conclusion);
                    return Startup {
                        tail,
                        tasks,
                        interrupted: true,
                    };
                }
            }
        }

        Startup {
            tail,
            tasks,
            interrupted: false,
        }
    }
}

/// Waits for every serve task to record its outcome, within the stop deadline.
async fn settle(tasks: Vec<JoinHandle<()>>, errors: &ErrSet, ctx: &Context) {
    let serving = tasks.len();
    let joined = async {
        for task in tasks {
            // The runner task itself never panics; serve panics are caught inside it.
            let _ = task.await;
        }
    };

    tokio::select! {
        biased;
        _ = joined => {}
        _ = ctx.done() => {
            warn!(serving, "Serve tasks still running after shutdown deadline");
            errors.add(ContextError::DeadlineExceeded);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{CallLog, MockComponent};

    fn two_mocks(log: &CallLog) -> Orchestrator {
        let mut orchestrator = Orchestrator::new();
        orchestrator.register(MockComponent::new("db").with_log(log).into_component());
        orchestrator.register(MockComponent::new("http").with_log(log).into_component());
        orchestrator
    }

    #[tokio::test]
    async fn test_start_is_interrupted_by_concluded_context() {
        let log = CallLog::new();
        let orchestrator = two_mocks(&log);
        let errors = Arc::new(ErrSet::new());
        let (shared, cancel) = Context::with_cancel(&Context::background());
        cancel.cancel();

        let startup = orchestrator.start(&shared, &errors);

        assert!(startup.interrupted);
        assert!(startup.tasks.is_empty());
        assert!(errors.result().is_some_and(|agg| agg.is_cancellation()));
    }

    #[tokio::test]
    async fn test_start_launches_everything_on_live_context() {
        let log = CallLog::new();
        let orchestrator = two_mocks(&log);
        let errors = Arc::new(ErrSet::new());
        let (shared, cancel) = Context::with_cancel(&Context::background());

        let startup = orchestrator.start(&shared, &errors);

        assert!(!startup.interrupted);
        assert_eq!(startup.tasks.len(), 2);
        assert!(!startup.tail.is_done());
        cancel.cancel();
        assert!(startup.tail.is_done());
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn test_interrupted_run_terminates_without_serving() {
        let log = CallLog::new();
        let orchestrator = two_mocks(&log);
        let phases = orchestrator.subscribe();
        let (root, cancel) = Context::with_cancel(&Context::background());
        cancel.cancel();

        let result = orchestrator.run(&root).await;

        assert!(result.is_err());
        assert_eq!(*phases.borrow(), Phase::Terminated);
        assert!(log.serves().is_empty());
        log.verify_stop_order(&["http", "db"]);
    }
}
