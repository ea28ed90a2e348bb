use crate::error::CallError;
use crate::signaling::SignalingTransport;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tether_core::SignalingMessage;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Disconnected,
    Connected,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Connected,
    Message(SignalingMessage),
    Disconnected(String),
}

/// Inbound side of a [`SignalingLink`]. Outlives reconnects; ends after
/// [`SignalingLink::close`].
pub struct LinkEvents {
    rx: mpsc::UnboundedReceiver<LinkEvent>,
}

impl LinkEvents {
    /// Only the relayed messages, in arrival order.
    pub fn messages(self) -> impl Stream<Item = SignalingMessage> {
        futures::StreamExt::filter_map(self, |event| async move {
            match event {
                LinkEvent::Message(msg) => Some(msg),
                _ => None,
            }
        })
    }
}

impl Stream for LinkEvents {
    type Item = LinkEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

struct LinkState {
    status: LinkStatus,
    outbound: Option<mpsc::UnboundedSender<String>>,
    reader: Option<JoinHandle<()>>,
    events: Option<mpsc::UnboundedSender<LinkEvent>>,
    generation: u64,
}

/// The client's connection to the relay.
pub struct SignalingLink {
    transport: Arc<dyn SignalingTransport>,
    state: Arc<Mutex<LinkState>>,
}

impl SignalingLink {
    pub fn new(transport: Arc<dyn SignalingTransport>) -> (Self, LinkEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        let link = Self {
            transport,
            state: Arc::new(Mutex::new(LinkState {
                status: LinkStatus::Disconnected,
                outbound: None,
                reader: None,
                events: Some(tx),
                generation: 0,
            })),
        };
        (link, LinkEvents { rx })
    }

    pub async fn status(&self) -> LinkStatus {
        self.state.lock().await.status
    }

    /// Connect if not connected already. Concurrent callers wait for the
    /// first attempt instead of opening a second transport.
    pub async fn connect(&self) -> Result<(), CallError> {
        let mut state = self.state.lock().await;

        if state.status == LinkStatus::Connected {
            return Ok(());
        }
        let Some(events) = state.events.clone() else {
            return Err(CallError::Connection("link closed".to_owned()));
        };

        let pipe = match self.transport.open().await {
            Ok(pipe) => pipe,
            Err(e) => {
                warn!("Signaling connect failed: {}", e);
                return Err(e);
            }
        };

        state.generation += 1;
        state.status = LinkStatus::Connected;
        state.outbound = Some(pipe.outbound);
        state.reader = Some(tokio::spawn(read_frames(
            pipe.inbound,
            events.clone(),
            self.state.clone(),
            state.generation,
        )));

        info!("Signaling link connected");
        let _ = events.send(LinkEvent::Connected);
        Ok(())
    }

    /// Fire-and-forget. Fails only when there is no live connection.
    pub async fn send(&self, message: &SignalingMessage) -> Result<(), CallError> {
        let state = self.state.lock().await;

        let (LinkStatus::Connected, Some(outbound)) = (state.status, state.outbound.as_ref())
        else {
            return Err(CallError::NotConnected);
        };

        let json = serde_json::to_string(message)
            .map_err(|e| CallError::Protocol(format!("Failed to serialize: {e}")))?;
        outbound
            .send(json)
            .map_err(|_| CallError::NotConnected)?;

        debug!("Sent {} for room {}", message.kind(), message.room());
        Ok(())
    }

    /// Tear down the transport. After this no events are produced and the
    /// link cannot reconnect.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;

        if let Some(reader) = state.reader.take() {
            reader.abort();
        }
        state.outbound = None;
        state.events = None;
        state.status = LinkStatus::Disconnected;
        info!("Signaling link closed");
    }
}

async fn read_frames(
    mut inbound: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<LinkEvent>,
    state: Arc<Mutex<LinkState>>,
    generation: u64,
) {
    while let Some(text) = inbound.recv().await {
        match serde_json::from_str::<SignalingMessage>(&text) {
            Ok(msg) => {
                if events.send(LinkEvent::Message(msg)).is_err() {
                    return;
                }
            }
            Err(e) => {
                let err = CallError::Protocol(e.to_string());
                warn!("Dropping malformed signaling frame: {}. Text: {}", err, text);
            }
        }
    }

    let mut state = state.lock().await;
    if state.generation != generation || state.status != LinkStatus::Connected {
        return;
    }
    state.status = LinkStatus::Disconnected;
    state.outbound = None;
    state.reader = None;
    warn!("Signaling link lost");
    let _ = events.send(LinkEvent::Disconnected("disconnected".to_owned()));
}
