use crate::media::{MediaHandle, RemoteStream};
use crate::transport::{
    OfferOptions, PeerConnection, PeerConnectionFactory, TransportConfig, TransportEvent,
};
use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::Arc;
use tether_core::{IceCandidate, SdpType, SessionDescription, SessionId};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_remote::TrackRemote;

/// webrtc-rs backed peer connection.
pub struct WebRtcConnection {
    pub session_id: SessionId,
    pub peer_connection: Arc<RTCPeerConnection>,
}

impl WebRtcConnection {
    /// Build the connection and wire its callbacks into `event_tx`.
    pub async fn new(
        session_id: SessionId,
        config: &TransportConfig,
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let state_tx = event_tx.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();

                Box::pin(async move {
                    info!("Peer connection state for session {}: {:?}", session_id, s);
                    if ends_call(s) {
                        let _ = tx.send(TransportEvent::Disconnected(session_id)).await;
                    } else if s == RTCPeerConnectionState::Disconnected {
                        warn!("Session {} lost connectivity, waiting for ICE to recover", session_id);
                    }
                })
            },
        ));

        let ice_tx = event_tx.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let _ = tx
                    .send(TransportEvent::CandidateGenerated(session_id, from_init(init)))
                    .await;
            })
        }));

        let track_tx = event_tx;
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();

                Box::pin(async move {
                    info!(
                        "Received remote {} track for session {}",
                        track.kind(),
                        session_id
                    );
                    let stream = RemoteStream::new(track.stream_id(), vec![track]);
                    let _ = tx.send(TransportEvent::TrackAdded(session_id, stream)).await;
                })
            },
        ));

        Ok(Self {
            session_id,
            peer_connection,
        })
    }

    async fn ensure_receivers(&self, options: OfferOptions) -> Result<()> {
        let transceivers = self.peer_connection.get_transceivers().await;

        for (wanted, kind) in [
            (options.receive_audio, RTPCodecType::Audio),
            (options.receive_video, RTPCodecType::Video),
        ] {
            if !wanted || transceivers.iter().any(|t| t.kind() == kind) {
                continue;
            }
            self.peer_connection
                .add_transceiver_from_kind(
                    kind,
                    Some(RTCRtpTransceiverInit {
                        direction: RTCRtpTransceiverDirection::Recvonly,
                        send_encodings: vec![],
                    }),
                )
                .await?;
        }
        Ok(())
    }
}

fn from_init(init: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_m_line_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}

fn to_rtc(description: SessionDescription) -> Result<RTCSessionDescription> {
    let desc = match description.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(description.sdp)?,
        SdpType::Answer => RTCSessionDescription::answer(description.sdp)?,
        SdpType::Pranswer => RTCSessionDescription::pranswer(description.sdp)?,
        SdpType::Rollback => bail!("rollback descriptions are not supported"),
    };
    Ok(desc)
}

#[async_trait]
impl PeerConnection for WebRtcConnection {
    async fn attach_media(&self, media: &MediaHandle) -> Result<()> {
        for track in media.tracks() {
            let sender = self.peer_connection.add_track(Arc::clone(track)).await?;

            // RTCP has to be read for interceptors (NACK, reports) to run.
            tokio::spawn(async move {
                let mut buf = vec![0u8; 1500];
                while sender.read(&mut buf).await.is_ok() {}
            });
        }
        debug!(
            "Attached {} local tracks to session {}",
            media.tracks().len(),
            self.session_id
        );
        Ok(())
    }

    async fn create_offer(&self, options: OfferOptions) -> Result<SessionDescription> {
        self.ensure_receivers(options).await?;
        let offer = self.peer_connection.create_offer(None).await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self.peer_connection.create_answer(None).await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_local_description(to_rtc(description)?)
            .await?;
        Ok(())
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_remote_description(to_rtc(description)?)
            .await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

/// Opens a [`WebRtcConnection`] per session with a shared ICE configuration.
#[derive(Clone, Default)]
pub struct WebRtcConnectionFactory {
    config: TransportConfig,
}

impl WebRtcConnectionFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PeerConnectionFactory for WebRtcConnectionFactory {
    async fn create(
        &self,
        session_id: SessionId,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerConnection>> {
        let connection = WebRtcConnection::new(session_id, &self.config, events).await?;
        Ok(Arc::new(connection))
    }
}

/// `Disconnected` is transient and may recover on its own; only `Failed`
/// is final.
fn ends_call(state: RTCPeerConnectionState) -> bool {
    state == RTCPeerConnectionState::Failed
}
