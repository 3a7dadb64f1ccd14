//! # Sample Components
//!
//! Two thin collaborators that give the orchestrator something to run:
//!
//! - [`DbConn`] - a fake database handle with no dependencies.
//! - [`HttpServer`] - an axum endpoint that queries the [`DbConn`].
//!
//! Registration order is `[db_conn, http_server]`, so the server is always
//! stopped before the connection it depends on.

pub mod db_conn;
pub mod error;
pub mod http_server;

pub use db_conn::DbConn;
pub use error::*;
pub use http_server::HttpServer;
