//! Domain events
//!
//! Typed events delivered to subscribers, their payloads, and the kind
//! taxonomy used for filtering.

mod domain_event;
mod event_kind;
mod payloads;

pub use domain_event::{DomainEvent, EventPayload};
pub use event_kind::{EventCategory, EventFilter, EventKind};
pub use payloads::{
    BanEvent, ChannelPayload, DisconnectEvent, EmojiPayload, EmojisUpdateEvent, GuildDeleteEvent,
    GuildPayload, GuildRefEvent, InviteCreateEvent, InviteDeleteEvent, MemberChunkEvent,
    MemberEvent, MemberLeaveEvent, MemberPayload, MessageBulkDeleteEvent, MessageDeleteEvent,
    MessagePayload, MessageUpdateEvent, PinsUpdateEvent, PresenceUpdateEvent, ReactionEvent,
    ReactionRemoveAllEvent, ReadyEvent, ReconnectEvent, RoleDeleteEvent, RoleEvent, RolePayload,
    TypingStartEvent, UnavailableGuild, UserIdPayload, UserPayload, VoiceServerEvent,
    VoiceStateEvent, WebhooksUpdateEvent,
};
