//! # Fake Database Connection
//!
//! A stand-in for a real connection pool. It connects (or refuses to, if the
//! application is already shutting down), answers every query with a canned
//! result, and holds the connection open until stopped.

use crate::components::ComponentError;
use async_trait::async_trait;
use lifecycle_framework::{BoxError, Component, Context};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

pub const NAME: &str = "db_conn";

/// Fake database handle shared by everything that queries it.
#[derive(Debug)]
pub struct DbConn {
    closed: CancellationToken,
    stopped: AtomicBool,
}

impl DbConn {
    /// Opens the connection.
    ///
    /// Fails with the context's conclusion if `ctx` is already done.
    #[instrument(skip_all)]
    pub async fn connect(ctx: &Context) -> Result<Self, ComponentError> {
        info!("Connecting");
        if let Some(conclusion) = ctx.err() {
            return Err(ComponentError::Connect(conclusion));
        }
        info!("Connected");
        Ok(Self {
            closed: CancellationToken::new(),
            stopped: AtomicBool::new(false),
        })
    }

    pub async fn query(&self, sql: &str) -> Result<String, ComponentError> {
        if self.closed.is_cancelled() {
            return Err(ComponentError::Closed);
        }
        debug!(sql, "Query");
        Ok("Fake result".to_string())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

#[async_trait]
impl Component for DbConn {
    fn name(&self) -> &str {
        NAME
    }

    async fn serve(&self, _ctx: Context) -> Result<(), BoxError> {
        self.closed.cancelled().await;
        Ok(())
    }

    async fn stop(&self, _ctx: Context) -> Result<(), BoxError> {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            info!(component = NAME, "Stop");
            self.closed.cancel();
            info!(component = NAME, "Stopped");
        }
        Ok(())
    }
}
