use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tether_client::{
    MediaHandle, OfferOptions, PeerConnection, PeerConnectionFactory, RemoteStream, TransportEvent,
};
use tether_core::{IceCandidate, SessionDescription, SessionId};
use tokio::sync::{Mutex, Semaphore, mpsc};

/// One recorded call on a [`MockConnection`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionCall {
    AttachMedia,
    CreateOffer,
    CreateAnswer,
    SetLocal(SessionDescription),
    SetRemote(SessionDescription),
    AddCandidate(String),
    Close,
}

/// Peer connection that records every call and produces canned descriptions.
/// Description creation waits on `gate` so tests can hold a session in
/// `CreatingOffer`/`CreatingAnswer`.
pub struct MockConnection {
    pub session_id: SessionId,
    label: String,
    calls: Mutex<Vec<ConnectionCall>>,
    events: mpsc::Sender<TransportEvent>,
    gate: Arc<Semaphore>,
    reject_remote: bool,
}

impl MockConnection {
    pub async fn calls(&self) -> Vec<ConnectionCall> {
        self.calls.lock().await.clone()
    }

    pub async fn applied_candidates(&self) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|c| match c {
                ConnectionCall::AddCandidate(c) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn remote_descriptions(&self) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| matches!(c, ConnectionCall::SetRemote(_)))
            .count()
    }

    pub async fn is_closed(&self) -> bool {
        self.calls.lock().await.contains(&ConnectionCall::Close)
    }

    /// Pretend ICE gathering found a local candidate.
    pub async fn emit_candidate(&self, candidate: &str) {
        let _ = self
            .events
            .send(TransportEvent::CandidateGenerated(
                self.session_id,
                IceCandidate::new(candidate),
            ))
            .await;
    }

    /// Pretend the remote side added a track to `stream_id`.
    pub async fn emit_track(&self, stream_id: &str) {
        let _ = self
            .events
            .send(TransportEvent::TrackAdded(
                self.session_id,
                RemoteStream::new(stream_id, vec![]),
            ))
            .await;
    }

    pub async fn emit_disconnect(&self) {
        let _ = self
            .events
            .send(TransportEvent::Disconnected(self.session_id))
            .await;
    }

    async fn record(&self, call: ConnectionCall) {
        tracing::debug!("[MockConnection {}] {:?}", self.label, call);
        self.calls.lock().await.push(call);
    }
}

#[async_trait]
impl PeerConnection for MockConnection {
    async fn attach_media(&self, _media: &MediaHandle) -> Result<()> {
        self.record(ConnectionCall::AttachMedia).await;
        Ok(())
    }

    async fn create_offer(&self, _options: OfferOptions) -> Result<SessionDescription> {
        self.record(ConnectionCall::CreateOffer).await;
        self.gate.acquire().await?.forget();
        Ok(SessionDescription::offer(format!("offer-from-{}", self.label)))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        self.record(ConnectionCall::CreateAnswer).await;
        self.gate.acquire().await?.forget();
        Ok(SessionDescription::answer(format!("answer-from-{}", self.label)))
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<()> {
        self.record(ConnectionCall::SetLocal(description)).await;
        Ok(())
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        if self.reject_remote {
            bail!("unparseable remote description");
        }
        self.record(ConnectionCall::SetRemote(description)).await;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.record(ConnectionCall::AddCandidate(candidate.candidate))
            .await;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.record(ConnectionCall::Close).await;
        Ok(())
    }
}

/// Builds [`MockConnection`]s and keeps them for inspection.
#[derive(Clone)]
pub struct MockFactory {
    label: String,
    connections: Arc<Mutex<Vec<Arc<MockConnection>>>>,
    gate: Arc<Semaphore>,
    gated: bool,
    reject_remote: bool,
    creates: Arc<AtomicUsize>,
}

impl MockFactory {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_owned(),
            connections: Arc::new(Mutex::new(Vec::new())),
            gate: Arc::new(Semaphore::new(Semaphore::MAX_PERMITS)),
            gated: false,
            reject_remote: false,
            creates: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Description creation blocks until [`MockFactory::release`].
    pub fn gated(mut self) -> Self {
        self.gate = Arc::new(Semaphore::new(0));
        self.gated = true;
        self
    }

    pub fn rejecting_remote(mut self) -> Self {
        self.reject_remote = true;
        self
    }

    /// Let `n` pending or future description creations finish.
    pub fn release(&self, n: usize) {
        if self.gated {
            self.gate.add_permits(n);
        }
    }

    pub fn created(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub async fn connection(&self, index: usize) -> Option<Arc<MockConnection>> {
        self.connections.lock().await.get(index).cloned()
    }

    /// Wait until at least `count` connections have been built.
    pub async fn wait_for_connection(&self, count: usize, timeout_ms: u64) -> Option<Arc<MockConnection>> {
        let start = std::time::Instant::now();
        let timeout = std::time::Duration::from_millis(timeout_ms);

        loop {
            if let Some(conn) = self.connection(count - 1).await {
                return Some(conn);
            }
            if start.elapsed() > timeout {
                return None;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl PeerConnectionFactory for MockFactory {
    async fn create(
        &self,
        session_id: SessionId,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerConnection>> {
        self.creates.fetch_add(1, Ordering::SeqCst);

        let connection = Arc::new(MockConnection {
            session_id,
            label: self.label.clone(),
            calls: Mutex::new(Vec::new()),
            events,
            gate: self.gate.clone(),
            reject_remote: self.reject_remote,
        });
        self.connections.lock().await.push(connection.clone());
        Ok(connection)
    }
}
