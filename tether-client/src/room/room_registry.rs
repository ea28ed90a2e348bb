use crate::room::{CallContext, CallRoom, RoomCommand};
use dashmap::DashMap;
use std::sync::Arc;
use tether_core::RoomId;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendError;
use tracing::{debug, info};

/// Live room actors by room. Actors are spawned on first use and take
/// themselves out again once their call is over.
#[derive(Clone)]
pub struct RoomRegistry {
    rooms: Arc<DashMap<RoomId, mpsc::Sender<RoomCommand>>>,
    pub(crate) ctx: CallContext,
}

impl RoomRegistry {
    pub fn new(ctx: CallContext) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            ctx,
        }
    }

    /// Sender for `room`, spawning its actor if there is none.
    pub fn sender(&self, room: &RoomId) -> mpsc::Sender<RoomCommand> {
        let mut entry = self
            .rooms
            .entry(room.clone())
            .or_insert_with(|| self.spawn(room));
        if entry.is_closed() {
            *entry = self.spawn(room);
        }
        entry.clone()
    }

    pub fn get(&self, room: &RoomId) -> Option<mpsc::Sender<RoomCommand>> {
        self.rooms.get(room).map(|s| s.clone())
    }

    /// Hand `cmd` to the actor for `room`, replacing an actor that retired
    /// between lookup and send.
    pub async fn deliver(&self, room: &RoomId, mut cmd: RoomCommand) -> Result<(), RoomCommand> {
        for _ in 0..3 {
            match self.sender(room).send(cmd).await {
                Ok(()) => return Ok(()),
                Err(SendError(returned)) => {
                    debug!("Room {} retired during delivery, retrying", room);
                    cmd = returned;
                }
            }
        }
        Err(cmd)
    }

    /// Drop the entry for `room` if it still points at `me`.
    pub fn retire(&self, room: &RoomId, me: &mpsc::WeakSender<RoomCommand>) -> bool {
        let removed = self
            .rooms
            .remove_if(room, |_, tx| {
                me.upgrade().is_some_and(|me| me.same_channel(tx))
            })
            .is_some();
        if removed {
            info!("Room {} retired", room);
        }
        removed
    }

    pub fn rooms(&self) -> Vec<RoomId> {
        self.rooms.iter().map(|e| e.key().clone()).collect()
    }

    pub fn senders(&self) -> Vec<mpsc::Sender<RoomCommand>> {
        self.rooms.iter().map(|e| e.value().clone()).collect()
    }

    pub fn clear(&self) {
        self.rooms.clear();
    }

    fn spawn(&self, room: &RoomId) -> mpsc::Sender<RoomCommand> {
        info!("Creating room: {}", room);
        let (tx, rx) = mpsc::channel(100);
        let actor = CallRoom::new(room.clone(), self.clone(), rx, tx.downgrade());
        tokio::spawn(actor.run());
        tx
    }
}
