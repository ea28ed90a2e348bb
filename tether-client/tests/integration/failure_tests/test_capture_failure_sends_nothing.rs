use std::time::Duration;

use tether_client::{CallError, CallStatus};
use tether_core::{SessionDescription, SignalingMessage};

use crate::integration::{TestPeer, init_tracing, room};
use crate::utils::{CountingCapture, MemoryRelay, MockFactory};

#[tokio::test]
async fn test_capture_failure_on_start() {
    init_tracing();

    let relay = MemoryRelay::new();
    let alice = TestPeer::with(
        &relay,
        "alice",
        MockFactory::new("alice"),
        CountingCapture::denied(),
    );
    let r1 = room("r1");

    let err = alice.manager.start_call(r1.clone()).await.unwrap_err();

    assert!(matches!(err, CallError::Capture(_)));
    assert_eq!(alice.factory.created(), 0);
    assert!(relay.frames_from("alice").await.is_empty());
    assert!(matches!(
        alice.observer.last(&r1).await,
        Some(CallStatus::Error(_))
    ));
}

#[tokio::test]
async fn test_capture_failure_on_answer() {
    init_tracing();

    let relay = MemoryRelay::new();
    let bob = TestPeer::with(
        &relay,
        "bob",
        MockFactory::new("bob"),
        CountingCapture::denied(),
    );
    let r1 = room("r1");

    bob.manager.listen(r1.clone()).await.unwrap();
    relay
        .inject(
            "bob",
            &SignalingMessage::Offer {
                sdp: SessionDescription::offer("remote"),
                room: r1.clone(),
            },
        )
        .await;

    assert!(
        bob.observer
            .wait_for(&r1, 1000, |s| matches!(s, CallStatus::Error(_)))
            .await
    );
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(bob.factory.created(), 0);
    assert_eq!(relay.kinds_from("bob").await, vec!["join-room"]);
}
