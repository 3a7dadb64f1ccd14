//! # Lifecycle Recipe
//!
//! > **Start components in order, stop them in reverse, report what went wrong.**
//!
//! This crate is a small application built on [`lifecycle_framework`]. It wires
//! a fake database connection and an HTTP endpoint together and lets the
//! [`Orchestrator`](lifecycle_framework::Orchestrator) run them until the
//! operator asks it to stop or one of them fails.
//!
//! ## 🗺️ Module Tour
//!
//! - [`components`]: the sample [`DbConn`](components::DbConn) and
//!   [`HttpServer`](components::HttpServer).
//! - [`config`]: command-line flags layered over an optional TOML file.
//! - [`lifecycle`]: application wiring, signal handling and log setup.
//!
//! ## 🚀 Running
//!
//! ```bash
//! RUST_LOG=info cargo run -- --http-addr 127.0.0.1:3000
//! curl http://127.0.0.1:3000/get   # Fake result
//! ```
//!
//! Press Ctrl-C to stop. The process exits with status 0 when every
//! component shut down cleanly, and 1 otherwise.

pub mod components;
pub mod config;
pub mod lifecycle;
