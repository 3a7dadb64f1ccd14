//! # Logging
//!
//! [`setup_tracing`] installs a compact `tracing` subscriber for the binary.
//! Verbosity follows `RUST_LOG` and defaults to `info`:
//!
//! ```bash
//! RUST_LOG=debug cargo run
//! RUST_LOG=lifecycle_framework=debug,info cargo run -- --http-addr 127.0.0.1:8080
//! ```
//!
//! Every line is structured. Component events carry a `component` field, and
//! the orchestrator logs each phase change, so a normal Ctrl-C run reads:
//!
//! ```text
//! INFO Lifecycle phase phase=Starting
//! INFO Serving component="http_server" address=0.0.0.0:3000
//! INFO Lifecycle phase phase=Running
//! INFO Received signal signal="SIGINT"
//! INFO Shutting down trigger="stop requested"
//! INFO Stop component="http_server"
//! INFO Stop component="db_conn"
//! INFO Terminated cleanly
//! ```

use tracing_subscriber::EnvFilter;

pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
