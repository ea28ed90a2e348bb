use crate::config::ClientConfig;
use crate::error::CallError;
use crate::media::MediaCapture;
use crate::room::{CallContext, CallObserver, RoomCommand, RoomRegistry};
use crate::signaling::{LinkEvent, LinkEvents, SignalingLink};
use crate::transport::PeerConnectionFactory;
use futures::StreamExt;
use std::sync::Arc;
use tether_core::{RoomId, SignalingMessage};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Entry point for the UI. Routes user actions and relayed messages to one
/// [`CallRoom`] actor per room.
#[derive(Clone)]
pub struct SessionManager {
    registry: RoomRegistry,
}

impl SessionManager {
    pub fn new(
        link: Arc<SignalingLink>,
        factory: Arc<dyn PeerConnectionFactory>,
        capture: Arc<dyn MediaCapture>,
        observer: Arc<dyn CallObserver>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            registry: RoomRegistry::new(CallContext::new(link, factory, capture, observer, config)),
        }
    }

    pub fn link(&self) -> &Arc<SignalingLink> {
        &self.registry.ctx.link
    }

    /// Rooms that currently have an actor.
    pub fn active_rooms(&self) -> Vec<RoomId> {
        self.registry.rooms()
    }

    /// Start a call as initiator. Resolves once local media is attached and
    /// the offer is being created; progress is reported via the observer.
    pub async fn start_call(&self, room: RoomId) -> Result<(), CallError> {
        let (reply, rx) = oneshot::channel();
        self.registry
            .deliver(&room, RoomCommand::StartCall { reply })
            .await
            .map_err(|_| CallError::Connection(format!("room {room} is gone")))?;

        rx.await
            .map_err(|_| CallError::Connection(format!("room {room} is gone")))?
    }

    /// Hang up. A no-op for rooms without a live call.
    pub async fn end_call(&self, room: &RoomId) {
        let Some(sender) = self.registry.get(room) else {
            debug!("end_call for unknown room {}", room);
            return;
        };

        let (done, rx) = oneshot::channel();
        if sender.send(RoomCommand::EndCall { done }).await.is_ok() {
            let _ = rx.await;
        }
    }

    /// Connect and announce presence in `room` without offering, so that an
    /// incoming offer can be answered.
    pub async fn listen(&self, room: RoomId) -> Result<(), CallError> {
        let link = &self.registry.ctx.link;
        link.connect().await?;
        self.registry.sender(&room);
        link.send(&SignalingMessage::Join { room }).await
    }

    /// Drive inbound link events until the link is closed.
    pub fn spawn(&self, mut events: LinkEvents) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                manager.handle_link_event(event).await;
            }
            debug!("Signaling event stream ended");
        })
    }

    pub async fn handle_link_event(&self, event: LinkEvent) {
        match event {
            LinkEvent::Connected => info!("Signaling link up"),

            LinkEvent::Message(msg) => {
                let room = msg.room().clone();

                // Only an offer may bring a room into existence.
                if let SignalingMessage::Offer { .. } = msg {
                    if self.registry.deliver(&room, RoomCommand::Signal(msg)).await.is_err() {
                        warn!("Room {} stopped before the offer was delivered", room);
                    }
                    return;
                }

                match self.registry.get(&room) {
                    Some(sender) => {
                        if sender.send(RoomCommand::Signal(msg)).await.is_err() {
                            debug!("Room {} finished before the message was delivered", room);
                        }
                    }
                    None => debug!("Ignoring {} for unknown room {}", msg.kind(), room),
                }
            }

            LinkEvent::Disconnected(reason) => {
                warn!("Signaling link down: {}", reason);
                for sender in self.registry.senders() {
                    let _ = sender.send(RoomCommand::LinkLost).await;
                }
            }
        }
    }

    /// End every call, then close the link.
    pub async fn shutdown(&self) {
        let rooms = self.registry.rooms();
        for room in &rooms {
            self.end_call(room).await;
        }
        self.registry.clear();
        self.registry.ctx.link.close().await;
        info!("Session manager shut down ({} rooms)", rooms.len());
    }
}
