use std::net::SocketAddr;

use tokio::signal::{self, ctrl_c};

use crate::{api::routes::api, state::AppState};

/// Serves the API on `bind` until Ctrl+C or SIGTERM, letting in-flight
/// requests finish.
pub async fn serve(state: AppState, bind: SocketAddr) -> Result<(), warp::Error> {
    let (address, server) =
        warp::serve(api(state)).try_bind_with_graceful_shutdown(bind, shutdown_signal())?;

    log::info!("Server running on {address}");
    server.await;

    log::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => log::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                log::error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                log::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
