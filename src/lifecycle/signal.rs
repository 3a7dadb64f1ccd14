//! Operator stop requests.

use lifecycle_framework::Context;
use tracing::{info, warn};

/// Resolves on SIGINT or SIGTERM, or when `ctx` concludes first.
///
/// Returns the name of the signal received, if any.
pub async fn await_signal(ctx: &Context) -> Option<&'static str> {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cant listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Cant listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let received = tokio::select! {
        _ = interrupt => "SIGINT",
        _ = terminate => "SIGTERM",
        _ = ctx.done() => return None,
    };
    info!(signal = received, "Received signal");
    Some(received)
}
