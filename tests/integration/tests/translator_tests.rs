//! Dispatch translation integration tests
//!
//! Run with: cargo test -p integration-tests --test translator_tests

use futures::StreamExt;
use herald_common::BusBackend;
use herald_core::events::ReconnectEvent;
use herald_core::{
    ClientHandle, DispatchEnvelope, EventFilter, EventKind, EventPayload, RawDispatch, ShardInfo,
};
use herald_dispatch::bus::{EventBusBuilder, EventBusExt};
use herald_dispatch::frames::{pump, PumpStats};
use herald_dispatch::DispatchTranslator;
use integration_tests::*;
use serde_json::{json, Value};

/// Wire names with a registered handler that reads the payload
const DECODED_DISPATCHES: &[&str] = &[
    "READY",
    "GATEWAY_STATE_CHANGE",
    "GUILD_CREATE",
    "GUILD_UPDATE",
    "GUILD_DELETE",
    "GUILD_BAN_ADD",
    "GUILD_BAN_REMOVE",
    "GUILD_EMOJIS_UPDATE",
    "GUILD_INTEGRATIONS_UPDATE",
    "GUILD_MEMBER_ADD",
    "GUILD_MEMBER_REMOVE",
    "GUILD_MEMBER_UPDATE",
    "GUILD_MEMBERS_CHUNK",
    "GUILD_ROLE_CREATE",
    "GUILD_ROLE_UPDATE",
    "GUILD_ROLE_DELETE",
    "CHANNEL_CREATE",
    "CHANNEL_UPDATE",
    "CHANNEL_DELETE",
    "CHANNEL_PINS_UPDATE",
    "TYPING_START",
    "WEBHOOKS_UPDATE",
    "MESSAGE_CREATE",
    "MESSAGE_UPDATE",
    "MESSAGE_DELETE",
    "MESSAGE_DELETE_BULK",
    "MESSAGE_REACTION_ADD",
    "MESSAGE_REACTION_REMOVE",
    "MESSAGE_REACTION_REMOVE_ALL",
    "PRESENCE_UPDATE",
    "USER_UPDATE",
    "VOICE_STATE_UPDATE",
    "VOICE_SERVER_UPDATE",
    "INVITE_CREATE",
    "INVITE_DELETE",
];

fn translate(event_type: &str, data: Value) -> Option<EventPayload> {
    DispatchTranslator::global()
        .handle(&DispatchEnvelope::new(
            RawDispatch::new(event_type, data),
            ClientHandle::new("integration"),
            ShardInfo::new(1, 2),
        ))
        .map(herald_core::DomainEvent::into_payload)
}

// ============================================================================
// Unknown and malformed dispatches
// ============================================================================

#[test]
fn test_unknown_dispatches_produce_nothing() {
    for name in [
        "",
        "SOMETHING_NEW",
        "ready",
        "GUILD_SCHEDULED_EVENT_CREATE",
        "INTERACTION_CREATE",
        "THREAD_CREATE",
    ] {
        assert!(translate(name, json!({"id": "1"})).is_none(), "{name:?}");
    }
}

#[test]
fn test_malformed_payloads_are_dropped() {
    assert_eq!(DECODED_DISPATCHES.len() + 1, DispatchTranslator::global().len());
    for name in DECODED_DISPATCHES {
        for data in [json!("garbage"), json!(42), Value::Null] {
            assert!(translate(name, data.clone()).is_none(), "{name} with {data}");
        }
    }
}

// ============================================================================
// Connection state
// ============================================================================

#[test]
fn test_gateway_state_mapping() {
    let state = |data: Value| translate("GATEWAY_STATE_CHANGE", data);

    assert!(matches!(
        state(json!({"state": "CONNECTED"})),
        Some(EventPayload::Connected)
    ));
    match state(json!({"state": "DISCONNECTED", "close_code": 4004, "reason": "auth"})) {
        Some(EventPayload::Disconnected(disconnect)) => {
            assert_eq!(disconnect.close_code, Some(4004));
            assert_eq!(disconnect.reason.as_deref(), Some("auth"));
        }
        other => panic!("unexpected payload {other:?}"),
    }
    assert!(matches!(
        state(json!({"state": "RETRY_STARTED"})),
        Some(EventPayload::ReconnectStarted)
    ));
    assert!(matches!(
        state(json!({"state": "RETRY_SUCCEEDED", "attempt": 2})),
        Some(EventPayload::Reconnected(ReconnectEvent { attempt: 2 }))
    ));
    assert!(matches!(
        state(json!({"state": "RETRY_FAILED", "attempt": 5})),
        Some(EventPayload::ReconnectFailed(ReconnectEvent { attempt: 5 }))
    ));
    assert!(state(json!({"state": "DISCONNECTED_RESUME"})).is_none());
    assert!(state(json!({"state": "RETRY_RESUME_STARTED"})).is_none());
    assert!(state(json!({"state": "EXPLODED"})).is_none());
}

#[test]
fn test_event_carries_source_context() {
    let client = ClientHandle::new("bot-a");
    let event = DispatchTranslator::global()
        .handle(&DispatchEnvelope::new(
            RawDispatch::new("RESUMED", Value::Null),
            client.clone(),
            ShardInfo::new(3, 4),
        ))
        .unwrap();
    assert_eq!(event.kind(), EventKind::Resumed);
    assert_eq!(event.shard(), ShardInfo::new(3, 4));
    assert!(event.client().same_client(&client));
}

// ============================================================================
// Frames through a bus
// ============================================================================

#[tokio::test]
async fn test_recorded_session_replays_lifecycle_to_late_subscriber() {
    let input = [
        state_frame("CONNECTED"),
        frame(
            "READY",
            json!({
                "v": 10,
                "user": {"id": "1", "username": "herald"},
                "guilds": [{"id": "5"}],
                "session_id": "abc"
            }),
        ),
        frame(
            "GUILD_CREATE",
            json!({"id": "5", "name": "home", "owner_id": "1"}),
        ),
        frame(
            "MESSAGE_CREATE",
            json!({
                "id": "100",
                "channel_id": "7",
                "author": {"id": "2", "username": "ana"},
                "content": "hi",
                "timestamp": "2024-01-01T00:00:00+00:00"
            }),
        ),
        "{ broken".to_string(),
        frame("SOMETHING_NEW", json!({})),
    ]
    .join("\n");

    let bus = EventBusBuilder::new(BusBackend::ReplayUntilSubscribed)
        .build()
        .unwrap();
    let stats = pump(
        input.as_bytes(),
        &ClientHandle::new("integration"),
        1,
        DispatchTranslator::global(),
        bus.as_ref(),
    )
    .await
    .unwrap();
    assert_eq!(
        stats,
        PumpStats {
            frames: 5,
            published: 4,
            ignored: 1,
            malformed: 1,
        }
    );

    let mut stream = bus.subscribe(EventFilter::All);
    let kinds: Vec<EventKind> = take_n(&mut stream, 3)
        .await
        .unwrap()
        .iter()
        .map(|event| event.kind())
        .collect();
    assert_eq!(
        kinds,
        vec![EventKind::Connected, EventKind::Ready, EventKind::GuildCreate]
    );

    bus.shutdown();
    assert!(stream.next().await.is_none());
}
