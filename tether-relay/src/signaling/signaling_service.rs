use axum::extract::ws::Message;
use dashmap::DashMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tether_core::{RoomId, SignalingMessage};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Relay-local handle for one WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

struct SignalingInner {
    peers: DashMap<ConnectionId, mpsc::UnboundedSender<Message>>,
    rooms: DashMap<RoomId, HashSet<ConnectionId>>,
    next_id: AtomicU64,
}

/// Membership table plus outbound queues of every connected socket. Frames
/// are never interpreted beyond their room tag.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl Default for SignalingService {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalingService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                peers: DashMap::new(),
                rooms: DashMap::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn add_peer(&self, tx: mpsc::UnboundedSender<Message>) -> ConnectionId {
        let id = ConnectionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.peers.insert(id, tx);
        id
    }

    /// Forget the connection and tell the remaining members of each room it
    /// was in that it left.
    pub fn remove_peer(&self, id: ConnectionId) {
        self.inner.peers.remove(&id);

        let joined: Vec<RoomId> = self
            .inner
            .rooms
            .iter()
            .filter(|entry| entry.value().contains(&id))
            .map(|entry| entry.key().clone())
            .collect();

        for room in joined {
            self.leave(id, &room);
            let notice = SignalingMessage::Leave { room: room.clone() };
            match serde_json::to_string(&notice) {
                Ok(json) => self.broadcast(id, &room, &json),
                Err(e) => error!("Failed to serialize leave notice: {}", e),
            }
        }
    }

    /// Route one inbound text frame. The sender joins the room the frame is
    /// tagged with; the frame itself goes out unchanged to everyone else there.
    pub fn relay(&self, from: ConnectionId, text: &str) {
        let msg = match serde_json::from_str::<SignalingMessage>(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Invalid signaling frame from {}: {}", from, e);
                return;
            }
        };
        let room = msg.room().clone();

        if let SignalingMessage::Leave { .. } = msg {
            self.broadcast(from, &room, text);
            self.leave(from, &room);
            return;
        }

        let joined = self
            .inner
            .rooms
            .entry(room.clone())
            .or_default()
            .insert(from);
        if joined {
            info!("{} joined room '{}'", from, room);
        }

        self.broadcast(from, &room, text);
    }

    pub fn members(&self, room: &RoomId) -> usize {
        self.inner.rooms.get(room).map(|m| m.len()).unwrap_or(0)
    }

    fn leave(&self, id: ConnectionId, room: &RoomId) {
        let emptied = match self.inner.rooms.get_mut(room) {
            Some(mut members) => {
                members.remove(&id);
                members.is_empty()
            }
            None => return,
        };
        info!("{} left room '{}'", id, room);

        if emptied {
            self.inner.rooms.remove_if(room, |_, members| members.is_empty());
        }
    }

    fn broadcast(&self, from: ConnectionId, room: &RoomId, text: &str) {
        let targets: Vec<ConnectionId> = match self.inner.rooms.get(room) {
            Some(members) => members.iter().copied().filter(|id| *id != from).collect(),
            None => return,
        };
        if targets.is_empty() {
            debug!("No one else in room '{}' yet", room);
        }

        for target in targets {
            self.send_text(target, text);
        }
    }

    fn send_text(&self, target: ConnectionId, text: &str) {
        if let Some(peer) = self.inner.peers.get(&target) {
            if let Err(e) = peer.send(Message::Text(text.to_owned().into())) {
                error!("Failed to send WS message to {}: {:?}", target, e);
            }
        } else {
            warn!("Attempted to relay to disconnected {}", target);
        }
    }
}
