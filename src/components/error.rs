//! Error types for the sample components.

use lifecycle_framework::ContextError;
use std::net::SocketAddr;
use thiserror::Error;

/// Errors raised by [`DbConn`](super::DbConn) and [`HttpServer`](super::HttpServer).
#[derive(Debug, Error)]
pub enum ComponentError {
    /// The connection was requested after shutdown had begun.
    #[error("cant connect: {0}")]
    Connect(#[source] ContextError),

    /// The connection has been stopped.
    #[error("connection closed")]
    Closed,

    /// The listener could not be bound.
    #[error("http listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The server failed while accepting connections.
    #[error("http serve: {0}")]
    Serve(#[source] std::io::Error),
}
