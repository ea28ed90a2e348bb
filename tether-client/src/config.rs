use crate::media::MediaConstraints;
use crate::transport::{OfferOptions, TransportConfig};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Bounded, fixed-delay reconnect attempts for the signaling transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl ReconnectPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub signaling_url: String,
    pub reconnect: ReconnectPolicy,
    pub transport: TransportConfig,
    pub media: MediaConstraints,
    pub offer: OfferOptions,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            signaling_url: "ws://127.0.0.1:3000/ws".to_owned(),
            reconnect: ReconnectPolicy::default(),
            transport: TransportConfig::default(),
            media: MediaConstraints::default(),
            offer: OfferOptions::default(),
        }
    }
}

impl ClientConfig {
    /// Load from a JSON file; missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }
}
