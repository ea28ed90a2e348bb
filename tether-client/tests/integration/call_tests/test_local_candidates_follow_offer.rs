use std::time::Duration;

use tether_client::CallStatus;

use crate::integration::{SIGNAL_TIMEOUT_MS, TestPeer, init_tracing, room};
use crate::utils::{CountingCapture, MemoryRelay, MockFactory};

#[tokio::test]
async fn test_local_candidates_follow_offer() {
    init_tracing();

    let relay = MemoryRelay::new();
    let alice = TestPeer::with(
        &relay,
        "alice",
        MockFactory::new("alice").gated(),
        CountingCapture::new(),
    );
    let bob = TestPeer::new(&relay, "bob");
    let r1 = room("r1");

    bob.manager.listen(r1.clone()).await.unwrap();
    alice.manager.start_call(r1.clone()).await.unwrap();

    // gathering starts while alice is still in CreatingOffer
    let caller = alice
        .factory
        .wait_for_connection(1, SIGNAL_TIMEOUT_MS)
        .await
        .expect("initiator never created a connection");
    caller.emit_candidate("early-local").await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(
        relay.frames_from("alice").await.is_empty(),
        "nothing may reach the relay before the offer"
    );

    alice.factory.release(1);
    assert!(
        alice
            .observer
            .wait_for_status(&r1, CallStatus::Connected, SIGNAL_TIMEOUT_MS)
            .await
    );
    assert!(relay.wait_for_frame("alice", "ice-candidate", SIGNAL_TIMEOUT_MS).await.is_some());
    assert_eq!(
        relay.kinds_from("alice").await,
        vec!["join-room", "offer", "ice-candidate"]
    );

    let callee = bob.factory.connection(0).await.unwrap();
    let start = std::time::Instant::now();
    while callee.applied_candidates().await.is_empty()
        && start.elapsed() < Duration::from_millis(SIGNAL_TIMEOUT_MS)
    {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(callee.applied_candidates().await, vec!["early-local"]);
}
