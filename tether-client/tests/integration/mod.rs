//! Integration tests for tether-client.
//!
//! Tests are organized by functionality:
//! - `call_tests` - two peers negotiating through the relay
//! - `failure_tests` - link loss, hangups and capture failures
//! - `ordering_tests` - glare, late and duplicate messages


use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use tether_client::{ClientConfig, SessionManager, SignalingLink};
use tether_core::RoomId;
use tokio::task::JoinHandle;

use crate::utils::{CountingCapture, MemoryRelay, MockFactory, RecordingObserver};

/// Timeout for anything that crosses the relay (ms).
pub const SIGNAL_TIMEOUT_MS: u64 = 2000;

/// Initialize tracing for tests (call once per test).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

pub fn room(name: &str) -> RoomId {
    RoomId::new(name).unwrap()
}

/// One endpoint wired to a [`MemoryRelay`] with mock collaborators.
pub struct TestPeer {
    pub label: String,
    pub manager: SessionManager,
    pub factory: MockFactory,
    pub capture: CountingCapture,
    pub observer: RecordingObserver,
    pump: JoinHandle<()>,
}

impl TestPeer {
    pub fn new(relay: &MemoryRelay, label: &str) -> Self {
        Self::with(relay, label, MockFactory::new(label), CountingCapture::new())
    }

    pub fn with(
        relay: &MemoryRelay,
        label: &str,
        factory: MockFactory,
        capture: CountingCapture,
    ) -> Self {
        let (link, events) = SignalingLink::new(Arc::new(relay.transport(label)));
        let observer = RecordingObserver::new();

        let manager = SessionManager::new(
            Arc::new(link),
            Arc::new(factory.clone()),
            Arc::new(capture.clone()),
            Arc::new(observer.clone()),
            &ClientConfig::default(),
        );
        let pump = manager.spawn(events);

        Self {
            label: label.to_owned(),
            manager,
            factory,
            capture,
            observer,
            pump,
        }
    }
}

impl Drop for TestPeer {
    fn drop(&mut self) {
        self.pump.abort();
    }
}
