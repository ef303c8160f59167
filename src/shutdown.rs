use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Cancellation token that fires when the process receives SIGTERM or
/// an interrupt.
///
/// Once the token fires the server stops accepting new requests;
/// in-flight deploy streams are left to drain their remaining
/// acknowledgments before the listener goes away.
pub fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        tokio::select! {
            _ = signal::ctrl_c() => {
                tracing::info!("interrupt received, draining deploy streams");
            }
            _ = terminate => {
                tracing::info!("SIGTERM received, draining deploy streams");
            }
        }

        trigger.cancel();
    });

    token
}
