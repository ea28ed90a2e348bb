use crate::config::ReconnectPolicy;
use crate::error::CallError;
use crate::signaling::{SignalingTransport, TransportPipe};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

/// WebSocket connection to the relay, retried according to a
/// [`ReconnectPolicy`].
pub struct WsTransport {
    url: String,
    policy: ReconnectPolicy,
}

impl WsTransport {
    pub fn new(url: impl Into<String>, policy: ReconnectPolicy) -> Self {
        Self {
            url: url.into(),
            policy,
        }
    }
}

#[async_trait]
impl SignalingTransport for WsTransport {
    async fn open(&self) -> Result<TransportPipe, CallError> {
        let attempts = self.policy.attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match connect_async(self.url.as_str()).await {
                Ok((socket, _)) => {
                    info!("Connected to relay {} (attempt {})", self.url, attempt);
                    return Ok(pump(socket));
                }
                Err(e) => {
                    warn!(
                        "Relay connection attempt {}/{} to {} failed: {}",
                        attempt, attempts, self.url, e
                    );
                    last_error = e.to_string();
                }
            }

            if attempt < attempts {
                tokio::time::sleep(self.policy.delay()).await;
            }
        }

        Err(CallError::Connection(last_error))
    }
}

fn pump<S>(socket: S) -> TransportPipe
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + futures::Sink<Message>
        + Send
        + Unpin
        + 'static,
{
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();

    let mut send_task = tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    if inbound_tx.send(text.as_str().to_owned()).is_err() {
                        break;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::spawn(async move {
        tokio::select! {
            _ = (&mut send_task) => recv_task.abort(),
            _ = (&mut recv_task) => send_task.abort(),
        };
        info!("Relay socket closed");
    });

    TransportPipe {
        outbound: outbound_tx,
        inbound: inbound_rx,
    }
}
