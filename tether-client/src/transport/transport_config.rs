use serde::Deserialize;
use tether_core::IceServerConfig;

/// ICE configuration for every peer connection this client opens.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig::stun(&[
                "stun:stun1.l.google.com:19302",
                "stun:stun2.l.google.com:19302",
            ])],
        }
    }
}
