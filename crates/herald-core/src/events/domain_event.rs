//! Domain events - typed events produced from gateway dispatches
//!
//! A `DomainEvent` is what subscribers receive. It is built once by the
//! translator and then shared read-only behind an `Arc` by every subscription.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event_kind::{EventCategory, EventKind};
use super::payloads::{
    BanEvent, ChannelPayload, DisconnectEvent, EmojisUpdateEvent, GuildDeleteEvent, GuildPayload,
    GuildRefEvent, InviteCreateEvent, InviteDeleteEvent, MemberChunkEvent, MemberEvent,
    MemberLeaveEvent, MessageBulkDeleteEvent, MessageDeleteEvent, MessagePayload,
    MessageUpdateEvent, PinsUpdateEvent, PresenceUpdateEvent, ReactionEvent,
    ReactionRemoveAllEvent, ReadyEvent, ReconnectEvent, RoleDeleteEvent, RoleEvent,
    TypingStartEvent, UserPayload, VoiceServerEvent, VoiceStateEvent, WebhooksUpdateEvent,
};
use crate::value_objects::{ClientHandle, ShardInfo};

/// All possible event payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    // =========================================================================
    // Lifecycle Events
    // =========================================================================
    Connected,
    Disconnected(DisconnectEvent),
    ReconnectStarted,
    Reconnected(ReconnectEvent),
    ReconnectFailed(ReconnectEvent),
    Ready(Box<ReadyEvent>),
    Resumed,

    // =========================================================================
    // Guild Events
    // =========================================================================
    GuildCreate(GuildPayload),
    GuildUpdate(GuildPayload),
    GuildDelete(GuildDeleteEvent),
    MemberJoin(MemberEvent),
    MemberLeave(MemberLeaveEvent),
    MemberUpdate(MemberEvent),
    MemberChunk(MemberChunkEvent),
    Ban(BanEvent),
    Unban(BanEvent),
    EmojisUpdate(EmojisUpdateEvent),
    IntegrationsUpdate(GuildRefEvent),

    // =========================================================================
    // Role Events
    // =========================================================================
    RoleCreate(RoleEvent),
    RoleUpdate(RoleEvent),
    RoleDelete(RoleDeleteEvent),

    // =========================================================================
    // Channel Events
    // =========================================================================
    ChannelCreate(ChannelPayload),
    ChannelUpdate(ChannelPayload),
    ChannelDelete(ChannelPayload),
    PinsUpdate(PinsUpdateEvent),
    TypingStart(TypingStartEvent),
    WebhooksUpdate(WebhooksUpdateEvent),

    // =========================================================================
    // Message Events
    // =========================================================================
    MessageCreate(Box<MessagePayload>),
    MessageUpdate(MessageUpdateEvent),
    MessageDelete(MessageDeleteEvent),
    MessageBulkDelete(MessageBulkDeleteEvent),

    // =========================================================================
    // Reaction Events
    // =========================================================================
    ReactionAdd(ReactionEvent),
    ReactionRemove(ReactionEvent),
    ReactionRemoveAll(ReactionRemoveAllEvent),

    // =========================================================================
    // Presence Events
    // =========================================================================
    PresenceUpdate(PresenceUpdateEvent),
    UserUpdate(UserPayload),

    // =========================================================================
    // Voice Events
    // =========================================================================
    VoiceStateUpdate(VoiceStateEvent),
    VoiceServerUpdate(VoiceServerEvent),

    // =========================================================================
    // Invite Events
    // =========================================================================
    InviteCreate(InviteCreateEvent),
    InviteDelete(InviteDeleteEvent),
}

impl EventPayload {
    /// Get the stable discriminant
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Connected => EventKind::Connected,
            Self::Disconnected(_) => EventKind::Disconnected,
            Self::ReconnectStarted => EventKind::ReconnectStarted,
            Self::Reconnected(_) => EventKind::Reconnected,
            Self::ReconnectFailed(_) => EventKind::ReconnectFailed,
            Self::Ready(_) => EventKind::Ready,
            Self::Resumed => EventKind::Resumed,
            Self::GuildCreate(_) => EventKind::GuildCreate,
            Self::GuildUpdate(_) => EventKind::GuildUpdate,
            Self::GuildDelete(_) => EventKind::GuildDelete,
            Self::MemberJoin(_) => EventKind::MemberJoin,
            Self::MemberLeave(_) => EventKind::MemberLeave,
            Self::MemberUpdate(_) => EventKind::MemberUpdate,
            Self::MemberChunk(_) => EventKind::MemberChunk,
            Self::Ban(_) => EventKind::Ban,
            Self::Unban(_) => EventKind::Unban,
            Self::EmojisUpdate(_) => EventKind::EmojisUpdate,
            Self::IntegrationsUpdate(_) => EventKind::IntegrationsUpdate,
            Self::RoleCreate(_) => EventKind::RoleCreate,
            Self::RoleUpdate(_) => EventKind::RoleUpdate,
            Self::RoleDelete(_) => EventKind::RoleDelete,
            Self::ChannelCreate(_) => EventKind::ChannelCreate,
            Self::ChannelUpdate(_) => EventKind::ChannelUpdate,
            Self::ChannelDelete(_) => EventKind::ChannelDelete,
            Self::PinsUpdate(_) => EventKind::PinsUpdate,
            Self::TypingStart(_) => EventKind::TypingStart,
            Self::WebhooksUpdate(_) => EventKind::WebhooksUpdate,
            Self::MessageCreate(_) => EventKind::MessageCreate,
            Self::MessageUpdate(_) => EventKind::MessageUpdate,
            Self::MessageDelete(_) => EventKind::MessageDelete,
            Self::MessageBulkDelete(_) => EventKind::MessageBulkDelete,
            Self::ReactionAdd(_) => EventKind::ReactionAdd,
            Self::ReactionRemove(_) => EventKind::ReactionRemove,
            Self::ReactionRemoveAll(_) => EventKind::ReactionRemoveAll,
            Self::PresenceUpdate(_) => EventKind::PresenceUpdate,
            Self::UserUpdate(_) => EventKind::UserUpdate,
            Self::VoiceStateUpdate(_) => EventKind::VoiceStateUpdate,
            Self::VoiceServerUpdate(_) => EventKind::VoiceServerUpdate,
            Self::InviteCreate(_) => EventKind::InviteCreate,
            Self::InviteDelete(_) => EventKind::InviteDelete,
        }
    }
}

/// A typed event, tagged with the client and shard that produced it
#[derive(Debug, Clone)]
pub struct DomainEvent {
    client: ClientHandle,
    shard: ShardInfo,
    received_at: DateTime<Utc>,
    payload: EventPayload,
}

impl DomainEvent {
    /// Create an event received now
    pub fn new(client: ClientHandle, shard: ShardInfo, payload: EventPayload) -> Self {
        Self {
            client,
            shard,
            received_at: Utc::now(),
            payload,
        }
    }

    /// Override the receive timestamp
    #[must_use]
    pub fn with_received_at(mut self, received_at: DateTime<Utc>) -> Self {
        self.received_at = received_at;
        self
    }

    pub fn client(&self) -> &ClientHandle {
        &self.client
    }

    pub fn shard(&self) -> ShardInfo {
        self.shard
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    pub fn into_payload(self) -> EventPayload {
        self.payload
    }

    #[inline]
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    #[inline]
    pub fn category(&self) -> EventCategory {
        self.kind().category()
    }

    /// Whether this is a connection lifecycle event
    pub fn is_lifecycle(&self) -> bool {
        self.category() == EventCategory::Lifecycle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::Snowflake;

    fn event(payload: EventPayload) -> DomainEvent {
        DomainEvent::new(ClientHandle::new("test"), ShardInfo::single(), payload)
    }

    #[test]
    fn test_payload_kind() {
        let delete = EventPayload::GuildDelete(GuildDeleteEvent {
            id: Snowflake::new(1),
            unavailable: true,
        });
        assert_eq!(delete.kind(), EventKind::GuildDelete);
        assert_eq!(EventPayload::Resumed.kind(), EventKind::Resumed);
    }

    #[test]
    fn test_event_category() {
        let connected = event(EventPayload::Connected);
        assert!(connected.is_lifecycle());

        let reconnected = event(EventPayload::Reconnected(ReconnectEvent { attempt: 2 }));
        assert_eq!(reconnected.category(), EventCategory::Lifecycle);

        let role = event(EventPayload::RoleDelete(RoleDeleteEvent {
            guild_id: Snowflake::new(1),
            role_id: Snowflake::new(2),
        }));
        assert!(!role.is_lifecycle());
        assert_eq!(role.category(), EventCategory::Role);
    }

    #[test]
    fn test_payload_serialization() {
        let json = serde_json::to_string(&EventPayload::Reconnected(ReconnectEvent {
            attempt: 3,
        }))
        .unwrap();
        assert!(json.contains(r#""type":"RECONNECTED""#));
        assert!(json.contains(r#""attempt":3"#));

        let unit = serde_json::to_string(&EventPayload::Connected).unwrap();
        assert_eq!(unit, r#"{"type":"CONNECTED"}"#);
    }

    #[test]
    fn test_received_at_override() {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let event = event(EventPayload::Resumed).with_received_at(at);
        assert_eq!(event.received_at(), at);
    }
}
