//! # Application Wiring
//!
//! Builds the sample application (a [`DbConn`] and an [`HttpServer`] that
//! queries it) and hands both to an [`Orchestrator`]. The database is
//! registered first, so it starts first and stops last.

use crate::components::{db_conn, DbConn, HttpServer};
use crate::config::AppConfig;
use lifecycle_framework::{AggregateError, Context, LifecycleError, Orchestrator, Phase};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum AppError {
    /// A component could not be built; nothing was started.
    #[error(transparent)]
    Startup(#[from] LifecycleError),

    /// The run ended with one or more recorded errors.
    #[error(transparent)]
    Run(#[from] AggregateError),
}

/// A fully wired application that has not started yet.
pub struct App {
    orchestrator: Orchestrator,
    db: Arc<DbConn>,
    http: Arc<HttpServer>,
}

impl App {
    /// Constructs every component in dependency order.
    #[instrument(skip_all, fields(http_addr = %config.http.addr))]
    pub async fn build(config: &AppConfig, ctx: &Context) -> Result<Self, LifecycleError> {
        let mut orchestrator = Orchestrator::new();
        if let Some(timeout) = config.shutdown.timeout() {
            orchestrator = orchestrator.with_shutdown_timeout(timeout);
        }

        let db = orchestrator.try_register(db_conn::NAME, DbConn::connect(ctx).await)?;
        let http = orchestrator.add(HttpServer::new(config.http.addr, db.clone()));
        info!(components = orchestrator.len(), "Application built");

        Ok(Self {
            orchestrator,
            db,
            http,
        })
    }

    pub fn db(&self) -> &Arc<DbConn> {
        &self.db
    }

    /// Yields the HTTP listening address once the server is bound.
    pub fn http_addr(&self) -> watch::Receiver<Option<SocketAddr>> {
        self.http.local_addr()
    }

    pub fn phases(&self) -> watch::Receiver<Phase> {
        self.orchestrator.subscribe()
    }

    /// Serves until `ctx` concludes or a component exits, then shuts down.
    pub async fn run(self, ctx: &Context) -> Result<(), AggregateError> {
        self.orchestrator.run(ctx).await
    }
}

/// Builds and runs the application under `ctx`.
pub async fn run_app(config: &AppConfig, ctx: &Context) -> Result<(), AppError> {
    let app = App::build(config, ctx).await?;
    app.run(ctx).await?;
    Ok(())
}
