use tether_client::{CallStatus, LinkStatus};

use crate::integration::{SIGNAL_TIMEOUT_MS, TestPeer, init_tracing, room};
use crate::utils::MemoryRelay;

#[tokio::test]
async fn test_link_drop_closes_session() {
    init_tracing();

    let relay = MemoryRelay::new();
    let alice = TestPeer::new(&relay, "alice");
    let r1 = room("r1");

    alice.manager.start_call(r1.clone()).await.unwrap();
    // nobody answers: alice sits in AwaitingAnswer
    assert!(relay.wait_for_frame("alice", "offer", SIGNAL_TIMEOUT_MS).await.is_some());

    relay.drop_all().await;

    assert!(
        alice
            .observer
            .wait_for_status(&r1, CallStatus::Error("disconnected".to_owned()), SIGNAL_TIMEOUT_MS)
            .await,
        "link loss should surface as an error"
    );
    assert_eq!(alice.capture.acquired(), 1);
    assert_eq!(alice.capture.released(), 1);
    assert!(alice.factory.connection(0).await.unwrap().is_closed().await);
    assert_eq!(alice.manager.link().status().await, LinkStatus::Disconnected);

    // a fresh call reconnects the link
    alice.manager.start_call(r1.clone()).await.unwrap();
    assert!(relay.wait_for_count("alice", "offer", 2, SIGNAL_TIMEOUT_MS).await);
    assert_eq!(alice.factory.created(), 2);
}
