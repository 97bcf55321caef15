//! Event kinds, categories and subscription filters
//!
//! `EventKind` is the stable discriminant of every `EventPayload` variant. Buses
//! filter subscriptions on it instead of on the payload type itself.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad grouping of event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Connection lifecycle of a shard
    Lifecycle,
    /// Guild, member, ban, emoji and integration changes
    Guild,
    Role,
    Channel,
    Message,
    Reaction,
    /// Presence and user changes
    Presence,
    Voice,
    Invite,
}

impl EventCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lifecycle => "lifecycle",
            Self::Guild => "guild",
            Self::Role => "role",
            Self::Channel => "channel",
            Self::Message => "message",
            Self::Reaction => "reaction",
            Self::Presence => "presence",
            Self::Voice => "voice",
            Self::Invite => "invite",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discriminant of a domain event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    // Lifecycle
    Connected,
    Disconnected,
    ReconnectStarted,
    Reconnected,
    ReconnectFailed,
    Ready,
    Resumed,

    // Guild
    GuildCreate,
    GuildUpdate,
    GuildDelete,
    MemberJoin,
    MemberLeave,
    MemberUpdate,
    MemberChunk,
    Ban,
    Unban,
    EmojisUpdate,
    IntegrationsUpdate,

    // Role
    RoleCreate,
    RoleUpdate,
    RoleDelete,

    // Channel
    ChannelCreate,
    ChannelUpdate,
    ChannelDelete,
    PinsUpdate,
    TypingStart,
    WebhooksUpdate,

    // Message
    MessageCreate,
    MessageUpdate,
    MessageDelete,
    MessageBulkDelete,

    // Reaction
    ReactionAdd,
    ReactionRemove,
    ReactionRemoveAll,

    // Presence
    PresenceUpdate,
    UserUpdate,

    // Voice
    VoiceStateUpdate,
    VoiceServerUpdate,

    // Invite
    InviteCreate,
    InviteDelete,
}

impl EventKind {
    /// Event name used in logs
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "Connected",
            Self::Disconnected => "Disconnected",
            Self::ReconnectStarted => "ReconnectStarted",
            Self::Reconnected => "Reconnected",
            Self::ReconnectFailed => "ReconnectFailed",
            Self::Ready => "Ready",
            Self::Resumed => "Resumed",
            Self::GuildCreate => "GuildCreate",
            Self::GuildUpdate => "GuildUpdate",
            Self::GuildDelete => "GuildDelete",
            Self::MemberJoin => "MemberJoin",
            Self::MemberLeave => "MemberLeave",
            Self::MemberUpdate => "MemberUpdate",
            Self::MemberChunk => "MemberChunk",
            Self::Ban => "Ban",
            Self::Unban => "Unban",
            Self::EmojisUpdate => "EmojisUpdate",
            Self::IntegrationsUpdate => "IntegrationsUpdate",
            Self::RoleCreate => "RoleCreate",
            Self::RoleUpdate => "RoleUpdate",
            Self::RoleDelete => "RoleDelete",
            Self::ChannelCreate => "ChannelCreate",
            Self::ChannelUpdate => "ChannelUpdate",
            Self::ChannelDelete => "ChannelDelete",
            Self::PinsUpdate => "PinsUpdate",
            Self::TypingStart => "TypingStart",
            Self::WebhooksUpdate => "WebhooksUpdate",
            Self::MessageCreate => "MessageCreate",
            Self::MessageUpdate => "MessageUpdate",
            Self::MessageDelete => "MessageDelete",
            Self::MessageBulkDelete => "MessageBulkDelete",
            Self::ReactionAdd => "ReactionAdd",
            Self::ReactionRemove => "ReactionRemove",
            Self::ReactionRemoveAll => "ReactionRemoveAll",
            Self::PresenceUpdate => "PresenceUpdate",
            Self::UserUpdate => "UserUpdate",
            Self::VoiceStateUpdate => "VoiceStateUpdate",
            Self::VoiceServerUpdate => "VoiceServerUpdate",
            Self::InviteCreate => "InviteCreate",
            Self::InviteDelete => "InviteDelete",
        }
    }

    pub const fn category(self) -> EventCategory {
        match self {
            Self::Connected
            | Self::Disconnected
            | Self::ReconnectStarted
            | Self::Reconnected
            | Self::ReconnectFailed
            | Self::Ready
            | Self::Resumed => EventCategory::Lifecycle,
            Self::GuildCreate
            | Self::GuildUpdate
            | Self::GuildDelete
            | Self::MemberJoin
            | Self::MemberLeave
            | Self::MemberUpdate
            | Self::MemberChunk
            | Self::Ban
            | Self::Unban
            | Self::EmojisUpdate
            | Self::IntegrationsUpdate => EventCategory::Guild,
            Self::RoleCreate | Self::RoleUpdate | Self::RoleDelete => EventCategory::Role,
            Self::ChannelCreate
            | Self::ChannelUpdate
            | Self::ChannelDelete
            | Self::PinsUpdate
            | Self::TypingStart
            | Self::WebhooksUpdate => EventCategory::Channel,
            Self::MessageCreate
            | Self::MessageUpdate
            | Self::MessageDelete
            | Self::MessageBulkDelete => EventCategory::Message,
            Self::ReactionAdd | Self::ReactionRemove | Self::ReactionRemoveAll => {
                EventCategory::Reaction
            }
            Self::PresenceUpdate | Self::UserUpdate => EventCategory::Presence,
            Self::VoiceStateUpdate | Self::VoiceServerUpdate => EventCategory::Voice,
            Self::InviteCreate | Self::InviteDelete => EventCategory::Invite,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which events a subscription receives
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EventFilter {
    /// Every event
    #[default]
    All,
    /// Every event in one category
    Category(EventCategory),
    /// Exactly one kind
    Kind(EventKind),
    /// Any of the listed kinds
    Kinds(Vec<EventKind>),
}

impl EventFilter {
    #[must_use]
    pub fn kinds(kinds: impl IntoIterator<Item = EventKind>) -> Self {
        Self::Kinds(kinds.into_iter().collect())
    }

    pub fn matches(&self, kind: EventKind) -> bool {
        match self {
            Self::All => true,
            Self::Category(category) => kind.category() == *category,
            Self::Kind(expected) => kind == *expected,
            Self::Kinds(kinds) => kinds.contains(&kind),
        }
    }
}

impl From<EventKind> for EventFilter {
    fn from(kind: EventKind) -> Self {
        Self::Kind(kind)
    }
}

impl From<EventCategory> for EventFilter {
    fn from(category: EventCategory) -> Self {
        Self::Category(category)
    }
}

impl fmt::Display for EventFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("Event"),
            Self::Category(category) => write!(f, "{category}:*"),
            Self::Kind(kind) => f.write_str(kind.as_str()),
            Self::Kinds(kinds) => {
                let names: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
                write!(f, "{{{}}}", names.join(","))
            }
        }
    }
}
