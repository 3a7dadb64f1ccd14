//! # Toy HTTP Endpoint
//!
//! Serves `GET /get`, which runs a query against the [`DbConn`] and returns the
//! result as plain text (500 if the query fails). `stop` asks axum for a
//! graceful shutdown and waits, within the stop deadline, for in-flight
//! requests to drain.

use crate::components::{ComponentError, DbConn};
use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use lifecycle_framework::{BoxError, Component, Context, ContextError};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const NAME: &str = "http_server";

pub struct HttpServer {
    addr: SocketAddr,
    db: Arc<DbConn>,
    started: AtomicBool,
    shutdown: CancellationToken,
    finished: CancellationToken,
    bound: watch::Sender<Option<SocketAddr>>,
}

impl HttpServer {
    pub fn new(addr: SocketAddr, db: Arc<DbConn>) -> Self {
        info!(component = NAME, %addr, "New");
        let (bound, _) = watch::channel(None);
        Self {
            addr,
            db,
            started: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            finished: CancellationToken::new(),
            bound,
        }
    }

    /// Yields the actual listening address once bound (useful with port 0).
    pub fn local_addr(&self) -> watch::Receiver<Option<SocketAddr>> {
        self.bound.subscribe()
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/get", get(handle_get))
            .with_state(self.db.clone())
    }
}

async fn handle_get(State(db): State<Arc<DbConn>>) -> Result<String, StatusCode> {
    db.query("SELECT * FROM something").await.map_err(|e| {
        warn!(error = %e, "Query failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

#[async_trait]
impl Component for HttpServer {
    fn name(&self) -> &str {
        NAME
    }

    async fn serve(&self, _ctx: Context) -> Result<(), BoxError> {
        self.started.store(true, Ordering::SeqCst);
        let _finished = self.finished.clone().drop_guard();

        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|source| ComponentError::Bind {
                addr: self.addr,
                source,
            })?;
        let local = listener.local_addr().map_err(ComponentError::Serve)?;
        self.bound.send_replace(Some(local));
        info!(component = NAME, address = %local, "Serving");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(self.shutdown.clone().cancelled_owned())
            .await
            .map_err(ComponentError::Serve)?;

        info!(component = NAME, "Finished serving");
        Ok(())
    }

    async fn stop(&self, ctx: Context) -> Result<(), BoxError> {
        info!(component = NAME, "Stop");
        self.shutdown.cancel();
        if !self.started.load(Ordering::SeqCst) {
            return Ok(());
        }

        tokio::select! {
            _ = self.finished.cancelled() => {
                info!(component = NAME, "Stopped");
                Ok(())
            }
            _ = ctx.done() => {
                Err(ctx.err().unwrap_or(ContextError::Canceled).into())
            }
        }
    }
}
