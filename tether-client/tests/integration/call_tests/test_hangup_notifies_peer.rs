use tether_client::CallStatus;
use tether_core::SignalingMessage;

use crate::integration::{SIGNAL_TIMEOUT_MS, TestPeer, init_tracing, room};
use crate::utils::MemoryRelay;

#[tokio::test]
async fn test_hangup_notifies_peer() {
    init_tracing();

    let relay = MemoryRelay::new();
    let alice = TestPeer::new(&relay, "alice");
    let bob = TestPeer::new(&relay, "bob");
    let r1 = room("r1");

    bob.manager.listen(r1.clone()).await.unwrap();
    alice.manager.start_call(r1.clone()).await.unwrap();
    assert!(
        alice
            .observer
            .wait_for_status(&r1, CallStatus::Connected, SIGNAL_TIMEOUT_MS)
            .await
    );

    bob.manager.end_call(&r1).await;

    assert_eq!(bob.observer.last(&r1).await, Some(CallStatus::Idle));
    assert_eq!(bob.capture.released(), 1);
    assert!(bob.factory.connection(0).await.unwrap().is_closed().await);
    assert_eq!(
        relay.wait_for_frame("bob", "leave-room", SIGNAL_TIMEOUT_MS).await,
        Some(SignalingMessage::Leave { room: r1.clone() })
    );

    // the far side tears down on leave-room
    assert!(
        alice
            .observer
            .wait_for_status(&r1, CallStatus::Idle, SIGNAL_TIMEOUT_MS)
            .await
    );
    assert_eq!(alice.capture.outstanding(), 0);
    assert!(alice.factory.connection(0).await.unwrap().is_closed().await);

    // a second hangup is a no-op
    bob.manager.end_call(&r1).await;
    assert_eq!(bob.capture.released(), 1);
    assert_eq!(
        relay
            .kinds_from("bob")
            .await
            .iter()
            .filter(|k| **k == "leave-room")
            .count(),
        1
    );
}
