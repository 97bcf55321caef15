//! Event payload definitions
//!
//! Data carried by each domain event, decoded from the `d` field of the
//! matching gateway dispatch. Only the fields a consumer commonly needs are
//! kept; unknown fields are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

// === Lifecycle Events ===

/// Shard lost its connection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Reconnect attempt progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectEvent {
    /// Attempt number, starting at 1
    #[serde(default)]
    pub attempt: u32,
}

/// READY event payload
///
/// Sent after a successful Identify.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyEvent {
    /// Gateway protocol version
    pub v: u8,

    /// Current user
    pub user: UserPayload,

    /// Guilds the user is in (initially unavailable)
    #[serde(default)]
    pub guilds: Vec<UnavailableGuild>,

    /// Session ID for resuming
    pub session_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_gateway_url: Option<String>,
}

/// Unavailable guild in READY event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnavailableGuild {
    pub id: Snowflake,
    #[serde(default = "default_true")]
    pub unavailable: bool,
}

fn default_true() -> bool {
    true
}

// === User Payload ===

/// User data included in events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPayload {
    pub id: Snowflake,
    pub username: String,
    #[serde(default)]
    pub discriminator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

/// Partial user with just an ID
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UserIdPayload {
    pub id: Snowflake,
}

// === Guild Events ===

/// GUILD_CREATE / GUILD_UPDATE payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildPayload {
    pub id: Snowflake,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub owner_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_count: Option<u64>,
    #[serde(default)]
    pub large: bool,
    #[serde(default)]
    pub unavailable: bool,
}

/// GUILD_DELETE event payload
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GuildDeleteEvent {
    pub id: Snowflake,
    /// If true, this is a temporary outage; otherwise the user left, was kicked,
    /// or the guild was deleted
    #[serde(default)]
    pub unavailable: bool,
}

/// Guild-scoped event with nothing beyond the guild id
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GuildRefEvent {
    pub guild_id: Snowflake,
}

/// Member data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberPayload {
    pub user: UserPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<DateTime<Utc>>,
}

/// GUILD_MEMBER_ADD / GUILD_MEMBER_UPDATE payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberEvent {
    pub guild_id: Snowflake,
    #[serde(flatten)]
    pub member: MemberPayload,
}

/// GUILD_MEMBER_REMOVE payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberLeaveEvent {
    pub guild_id: Snowflake,
    pub user: UserPayload,
}

/// GUILD_MEMBERS_CHUNK payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberChunkEvent {
    pub guild_id: Snowflake,
    #[serde(default)]
    pub members: Vec<MemberPayload>,
    pub chunk_index: u32,
    pub chunk_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

/// GUILD_BAN_ADD / GUILD_BAN_REMOVE payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanEvent {
    pub guild_id: Snowflake,
    pub user: UserPayload,
}

/// Custom or unicode emoji
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmojiPayload {
    /// None for unicode emoji
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub animated: bool,
}

/// GUILD_EMOJIS_UPDATE payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmojisUpdateEvent {
    pub guild_id: Snowflake,
    #[serde(default)]
    pub emojis: Vec<EmojiPayload>,
}

// === Role Events ===

/// Role data included in events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolePayload {
    pub id: Snowflake,
    pub name: String,
    #[serde(default)]
    pub permissions: String,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub color: u32,
}

/// GUILD_ROLE_CREATE / GUILD_ROLE_UPDATE payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleEvent {
    pub guild_id: Snowflake,
    pub role: RolePayload,
}

/// GUILD_ROLE_DELETE payload
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoleDeleteEvent {
    pub guild_id: Snowflake,
    pub role_id: Snowflake,
}

// === Channel Events ===

/// CHANNEL_CREATE / CHANNEL_UPDATE / CHANNEL_DELETE payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelPayload {
    pub id: Snowflake,
    #[serde(rename = "type")]
    pub channel_type: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Snowflake>,
}

/// CHANNEL_PINS_UPDATE payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinsUpdateEvent {
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_pin_timestamp: Option<DateTime<Utc>>,
}

/// TYPING_START payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingStartEvent {
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub user_id: Snowflake,
    /// Unix timestamp in seconds
    pub timestamp: i64,
}

/// WEBHOOKS_UPDATE payload
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WebhooksUpdateEvent {
    pub guild_id: Snowflake,
    pub channel_id: Snowflake,
}

// === Message Events ===

/// MESSAGE_CREATE payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub author: UserPayload,
    #[serde(default)]
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_timestamp: Option<DateTime<Utc>>,
}

/// MESSAGE_UPDATE payload (partial update)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageUpdateEvent {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_timestamp: Option<DateTime<Utc>>,
}

/// MESSAGE_DELETE payload
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MessageDeleteEvent {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
}

/// MESSAGE_DELETE_BULK payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBulkDeleteEvent {
    pub ids: Vec<Snowflake>,
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
}

// === Reaction Events ===

/// MESSAGE_REACTION_ADD / MESSAGE_REACTION_REMOVE payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub user_id: Snowflake,
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub emoji: EmojiPayload,
}

/// MESSAGE_REACTION_REMOVE_ALL payload
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReactionRemoveAllEvent {
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
}

// === Presence Events ===

/// PRESENCE_UPDATE payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceUpdateEvent {
    pub user: UserIdPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub status: String,
}

// === Voice Events ===

/// VOICE_STATE_UPDATE payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceStateEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    /// None when the user left voice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<Snowflake>,
    pub user_id: Snowflake,
    pub session_id: String,
    #[serde(default)]
    pub self_mute: bool,
    #[serde(default)]
    pub self_deaf: bool,
}

/// VOICE_SERVER_UPDATE payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceServerEvent {
    pub token: String,
    pub guild_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

// === Invite Events ===

/// INVITE_CREATE payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteCreateEvent {
    pub code: String,
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub max_uses: u32,
    /// Seconds; 0 means never
    #[serde(default)]
    pub max_age: u32,
    #[serde(default)]
    pub temporary: bool,
}

/// INVITE_DELETE payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteDeleteEvent {
    pub code: String,
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
}
