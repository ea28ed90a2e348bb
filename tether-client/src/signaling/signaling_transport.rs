use crate::error::CallError;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Text frames in both directions. When `inbound` ends the relay is gone.
pub struct TransportPipe {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<String>,
}

/// The wire underneath a [`SignalingLink`](crate::SignalingLink). Retrying a
/// failed connect is the transport's business; `open` only returns once it
/// has succeeded or given up.
#[async_trait]
pub trait SignalingTransport: Send + Sync + 'static {
    async fn open(&self) -> Result<TransportPipe, CallError>;
}
