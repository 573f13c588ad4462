use std::sync::Arc;
use std::time::Duration;

use gridsync_core::event::{EventPayload, StreamKind, UserJoinPayload};
use gridsync_core::testing::InMemoryEventStore;
use gridsync_hub::bus::NullBus;
use gridsync_hub::{HubConfig, StreamHub};

fn join_payload(user_id: &str) -> EventPayload {
    EventPayload::UserJoin(UserJoinPayload {
        user_id: user_id.to_owned(),
        display_name: "Ada".to_owned(),
    })
}

#[tokio::test]
async fn subscriber_receives_events_appended_after_it_joins() {
    let hub = StreamHub::new(
        Arc::new(InMemoryEventStore::new()),
        Arc::new(NullBus),
        "instance-a",
        HubConfig::default(),
    );

    let mut sub = hub.subscribe(StreamKind::Room, "r1").await;

    hub.append_and_broadcast(StreamKind::Room, "r1", join_payload("u1"), None, 1, 1)
        .await
        .unwrap();

    let received = tokio::time::timeout(Duration::from_secs(1), sub.recv())
        .await
        .expect("did not time out")
        .expect("subscription closed");

    assert_eq!(received.seq, 1);
}

#[tokio::test]
async fn subscribers_to_different_streams_are_isolated() {
    let hub = StreamHub::new(
        Arc::new(InMemoryEventStore::new()),
        Arc::new(NullBus),
        "instance-a",
        HubConfig::default(),
    );

    let mut sub_r1 = hub.subscribe(StreamKind::Room, "r1").await;
    let mut sub_r2 = hub.subscribe(StreamKind::Room, "r2").await;

    hub.append_and_broadcast(StreamKind::Room, "r1", join_payload("u1"), None, 1, 1)
        .await
        .unwrap();

    let received = tokio::time::timeout(Duration::from_millis(200), sub_r1.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received.stream_id, "r1");

    let timed_out = tokio::time::timeout(Duration::from_millis(100), sub_r2.recv()).await;
    assert!(timed_out.is_err(), "r2 subscriber should not see r1's event");
}

#[tokio::test]
async fn dropping_a_subscription_unregisters_it() {
    let hub = StreamHub::new(
        Arc::new(InMemoryEventStore::new()),
        Arc::new(NullBus),
        "instance-a",
        HubConfig::default(),
    );

    let sub = hub.subscribe(StreamKind::Room, "r1").await;
    drop(sub);

    // Broadcasting after the only subscriber dropped must not panic or
    // block, even though nothing is listening anymore.
    hub.append_and_broadcast(StreamKind::Room, "r1", join_payload("u1"), None, 1, 1)
        .await
        .unwrap();
}

#[tokio::test]
async fn catch_up_reads_events_after_a_given_seq() {
    let hub = StreamHub::new(
        Arc::new(InMemoryEventStore::new()),
        Arc::new(NullBus),
        "instance-a",
        HubConfig::default(),
    );

    for i in 0..3 {
        hub.append_and_broadcast(
            StreamKind::Room,
            "r1",
            join_payload(&format!("u{i}")),
            None,
            i,
            1,
        )
        .await
        .unwrap();
    }

    let events = hub.catch_up(StreamKind::Room, "r1", 1).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].seq, 2);
}
