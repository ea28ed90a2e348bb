use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tether_client::{CallError, MediaCapture, MediaConstraints, MediaHandle};

/// Capture that hands out empty streams and counts what comes back.
#[derive(Clone, Default)]
pub struct CountingCapture {
    acquired: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
    fail: bool,
}

impl CountingCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every acquisition fails as if the user denied the device.
    pub fn denied() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Streams handed out and not yet returned.
    pub fn outstanding(&self) -> usize {
        self.acquired() - self.released()
    }
}

#[async_trait]
impl MediaCapture for CountingCapture {
    async fn acquire_local_stream(
        &self,
        _constraints: &MediaConstraints,
    ) -> Result<MediaHandle, CallError> {
        if self.fail {
            return Err(CallError::Capture("permission denied".to_owned()));
        }
        let n = self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(MediaHandle::new(format!("local-{n}"), vec![]))
    }

    fn release(&self, media: MediaHandle) {
        tracing::debug!("[CountingCapture] released {}", media.stream_id());
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}
