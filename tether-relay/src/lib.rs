mod config;
mod signaling;

pub use config::*;
pub use signaling::*;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tracing::info;

/// Router exposing the relay at `/ws`.
pub fn router(service: SignalingService) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(service)
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: RelayConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind).await?;
    info!("Signaling relay listening on ws://{}/ws", listener.local_addr()?);

    axum::serve(listener, router(SignalingService::new())).await?;
    Ok(())
}
