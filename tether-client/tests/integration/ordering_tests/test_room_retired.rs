use std::time::Duration;

use tether_client::CallStatus;
use tether_core::{SessionDescription, SignalingMessage};

use crate::integration::{SIGNAL_TIMEOUT_MS, TestPeer, init_tracing, room};
use crate::utils::MemoryRelay;

async fn wait_for_rooms(peer: &TestPeer, count: usize) -> bool {
    let start = std::time::Instant::now();
    while peer.manager.active_rooms().len() != count {
        if start.elapsed() > Duration::from_millis(SIGNAL_TIMEOUT_MS) {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    true
}

#[tokio::test]
async fn test_room_retired_after_remote_leave() {
    init_tracing();

    let relay = MemoryRelay::new();
    let alice = TestPeer::new(&relay, "alice");
    let bob = TestPeer::new(&relay, "bob");
    let r1 = room("r1");

    bob.manager.listen(r1.clone()).await.unwrap();
    alice.manager.start_call(r1.clone()).await.unwrap();
    assert!(
        bob.observer
            .wait_for_status(&r1, CallStatus::Connected, SIGNAL_TIMEOUT_MS)
            .await
    );
    assert_eq!(bob.manager.active_rooms(), vec![r1.clone()]);

    alice.manager.end_call(&r1).await;
    assert!(
        bob.observer
            .wait_for_status(&r1, CallStatus::Idle, SIGNAL_TIMEOUT_MS)
            .await
    );
    assert!(wait_for_rooms(&bob, 0).await, "bob's room outlived its call");
    assert!(wait_for_rooms(&alice, 0).await, "alice's room outlived its call");

    // a later call in the same room starts from scratch
    alice.manager.start_call(r1.clone()).await.unwrap();
    assert!(relay.wait_for_count("bob", "answer", 2, SIGNAL_TIMEOUT_MS).await);
    assert_eq!(bob.factory.created(), 2);
    assert_eq!(alice.factory.created(), 2);
}

#[tokio::test]
async fn test_stray_offer_room_is_retired() {
    init_tracing();

    let relay = MemoryRelay::new();
    let bob = TestPeer::new(&relay, "bob");
    let lobby = room("lobby");
    let stray = room("stray");

    bob.manager.listen(lobby.clone()).await.unwrap();
    relay
        .inject(
            "bob",
            &SignalingMessage::Offer {
                sdp: SessionDescription::offer("offer-from-nobody"),
                room: stray.clone(),
            },
        )
        .await;
    assert!(relay.wait_for_frame("bob", "answer", SIGNAL_TIMEOUT_MS).await.is_some());
    assert_eq!(bob.manager.active_rooms().len(), 2);

    relay
        .inject("bob", &SignalingMessage::Leave { room: stray.clone() })
        .await;

    assert!(wait_for_rooms(&bob, 1).await);
    assert_eq!(bob.manager.active_rooms(), vec![lobby]);
    assert_eq!(bob.capture.outstanding(), 0);
}
