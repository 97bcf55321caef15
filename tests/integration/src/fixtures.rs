//! Test fixtures and data generators

use herald_common::BusBackend;
use herald_core::events::{ReconnectEvent, TypingStartEvent};
use herald_core::{ClientHandle, DomainEvent, EventPayload, ShardInfo, Snowflake};
use serde_json::{json, Value};

/// Every backend the factory can build
pub const ALL_BACKENDS: [BusBackend; 5] = [
    BusBackend::Direct,
    BusBackend::Buffered,
    BusBackend::ReplayWindow,
    BusBackend::ReplayUntilSubscribed,
    BusBackend::Resilient,
];

pub fn event(payload: EventPayload) -> DomainEvent {
    DomainEvent::new(ClientHandle::new("integration"), ShardInfo::single(), payload)
}

/// Lifecycle event numbered `n`, used to check ordering
pub fn numbered(n: u32) -> DomainEvent {
    event(EventPayload::Reconnected(ReconnectEvent { attempt: n }))
}

/// Channel event that the default replay filter does not retain
pub fn typing(user: u64) -> DomainEvent {
    event(EventPayload::TypingStart(TypingStartEvent {
        channel_id: Snowflake::new(7),
        guild_id: None,
        user_id: Snowflake::new(user),
        timestamp: 1_700_000_000,
    }))
}

/// Attempt number of a `numbered` event
pub fn number_of(event: &DomainEvent) -> Option<u32> {
    match event.payload() {
        EventPayload::Reconnected(reconnect) => Some(reconnect.attempt),
        _ => None,
    }
}

/// One recorded gateway frame as a JSON line
pub fn frame(event_type: &str, data: Value) -> String {
    json!({ "t": event_type, "d": data }).to_string()
}

pub fn state_frame(state: &str) -> String {
    frame("GATEWAY_STATE_CHANGE", json!({ "state": state }))
}
