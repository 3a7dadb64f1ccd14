use clap::Parser;
use lifecycle_framework::Context;
use lifecycle_recipe::config::{AppConfig, Args};
use lifecycle_recipe::lifecycle::{await_signal, run_app, setup_tracing};
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    setup_tracing();

    let config = match AppConfig::load(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    info!(?config, "Starting application");

    let (root, stop) = Context::with_cancel(&Context::background());
    let watched = root.clone();
    tokio::spawn(async move {
        if await_signal(&watched).await.is_some() {
            stop.cancel();
        }
    });

    match run_app(&config, &root).await {
        Ok(()) => {
            info!("Application stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Application failed");
            ExitCode::FAILURE
        }
    }
}
