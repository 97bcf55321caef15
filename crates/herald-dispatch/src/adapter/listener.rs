//! Blocking event listener
//!
//! Implement only the callbacks you care about; `on_event` routes every
//! domain event to the one matching its kind. Callbacks receive the full
//! event (client, shard, receive time) and its typed payload.

use herald_core::events::{
    BanEvent, ChannelPayload, DisconnectEvent, EmojisUpdateEvent, GuildDeleteEvent, GuildPayload,
    GuildRefEvent, InviteCreateEvent, InviteDeleteEvent, MemberChunkEvent, MemberEvent,
    MemberLeaveEvent, MessageBulkDeleteEvent, MessageDeleteEvent, MessagePayload,
    MessageUpdateEvent, PinsUpdateEvent, PresenceUpdateEvent, ReactionEvent,
    ReactionRemoveAllEvent, ReadyEvent, ReconnectEvent, RoleDeleteEvent, RoleEvent,
    TypingStartEvent, UserPayload, VoiceServerEvent, VoiceStateEvent, WebhooksUpdateEvent,
};
use herald_core::{DomainEvent, EventPayload};

/// Synchronous callbacks, one per event kind, all defaulting to no-ops
#[allow(unused_variables)]
pub trait EventListener: Send + Sync {
    // === Lifecycle ===

    fn on_connected(&self, event: &DomainEvent) {}
    fn on_disconnected(&self, event: &DomainEvent, disconnect: &DisconnectEvent) {}
    fn on_reconnect_started(&self, event: &DomainEvent) {}
    fn on_reconnected(&self, event: &DomainEvent, reconnect: &ReconnectEvent) {}
    fn on_reconnect_failed(&self, event: &DomainEvent, reconnect: &ReconnectEvent) {}
    fn on_ready(&self, event: &DomainEvent, ready: &ReadyEvent) {}
    fn on_resumed(&self, event: &DomainEvent) {}

    // === Guild ===

    fn on_guild_create(&self, event: &DomainEvent, guild: &GuildPayload) {}
    fn on_guild_update(&self, event: &DomainEvent, guild: &GuildPayload) {}
    fn on_guild_delete(&self, event: &DomainEvent, guild: &GuildDeleteEvent) {}
    fn on_member_join(&self, event: &DomainEvent, member: &MemberEvent) {}
    fn on_member_leave(&self, event: &DomainEvent, member: &MemberLeaveEvent) {}
    fn on_member_update(&self, event: &DomainEvent, member: &MemberEvent) {}
    fn on_member_chunk(&self, event: &DomainEvent, chunk: &MemberChunkEvent) {}
    fn on_ban(&self, event: &DomainEvent, ban: &BanEvent) {}
    fn on_unban(&self, event: &DomainEvent, unban: &BanEvent) {}
    fn on_emojis_update(&self, event: &DomainEvent, emojis: &EmojisUpdateEvent) {}
    fn on_integrations_update(&self, event: &DomainEvent, guild: &GuildRefEvent) {}

    // === Role ===

    fn on_role_create(&self, event: &DomainEvent, role: &RoleEvent) {}
    fn on_role_update(&self, event: &DomainEvent, role: &RoleEvent) {}
    fn on_role_delete(&self, event: &DomainEvent, role: &RoleDeleteEvent) {}

    // === Channel ===

    fn on_channel_create(&self, event: &DomainEvent, channel: &ChannelPayload) {}
    fn on_channel_update(&self, event: &DomainEvent, channel: &ChannelPayload) {}
    fn on_channel_delete(&self, event: &DomainEvent, channel: &ChannelPayload) {}
    fn on_pins_update(&self, event: &DomainEvent, pins: &PinsUpdateEvent) {}
    fn on_typing_start(&self, event: &DomainEvent, typing: &TypingStartEvent) {}
    fn on_webhooks_update(&self, event: &DomainEvent, webhooks: &WebhooksUpdateEvent) {}

    // === Message ===

    fn on_message_create(&self, event: &DomainEvent, message: &MessagePayload) {}
    fn on_message_update(&self, event: &DomainEvent, message: &MessageUpdateEvent) {}
    fn on_message_delete(&self, event: &DomainEvent, message: &MessageDeleteEvent) {}
    fn on_message_bulk_delete(&self, event: &DomainEvent, messages: &MessageBulkDeleteEvent) {}

    // === Reaction ===

    fn on_reaction_add(&self, event: &DomainEvent, reaction: &ReactionEvent) {}
    fn on_reaction_remove(&self, event: &DomainEvent, reaction: &ReactionEvent) {}
    fn on_reaction_remove_all(&self, event: &DomainEvent, reactions: &ReactionRemoveAllEvent) {}

    // === Presence ===

    fn on_presence_update(&self, event: &DomainEvent, presence: &PresenceUpdateEvent) {}
    fn on_user_update(&self, event: &DomainEvent, user: &UserPayload) {}

    // === Voice ===

    fn on_voice_state_update(&self, event: &DomainEvent, voice: &VoiceStateEvent) {}
    fn on_voice_server_update(&self, event: &DomainEvent, voice: &VoiceServerEvent) {}

    // === Invite ===

    fn on_invite_create(&self, event: &DomainEvent, invite: &InviteCreateEvent) {}
    fn on_invite_delete(&self, event: &DomainEvent, invite: &InviteDeleteEvent) {}

    /// Route `event` to the callback for its kind
    fn on_event(&self, event: &DomainEvent) {
        match event.payload() {
            EventPayload::Connected => self.on_connected(event),
            EventPayload::Disconnected(p) => self.on_disconnected(event, p),
            EventPayload::ReconnectStarted => self.on_reconnect_started(event),
            EventPayload::Reconnected(p) => self.on_reconnected(event, p),
            EventPayload::ReconnectFailed(p) => self.on_reconnect_failed(event, p),
            EventPayload::Ready(p) => self.on_ready(event, p),
            EventPayload::Resumed => self.on_resumed(event),

            EventPayload::GuildCreate(p) => self.on_guild_create(event, p),
            EventPayload::GuildUpdate(p) => self.on_guild_update(event, p),
            EventPayload::GuildDelete(p) => self.on_guild_delete(event, p),
            EventPayload::MemberJoin(p) => self.on_member_join(event, p),
            EventPayload::MemberLeave(p) => self.on_member_leave(event, p),
            EventPayload::MemberUpdate(p) => self.on_member_update(event, p),
            EventPayload::MemberChunk(p) => self.on_member_chunk(event, p),
            EventPayload::Ban(p) => self.on_ban(event, p),
            EventPayload::Unban(p) => self.on_unban(event, p),
            EventPayload::EmojisUpdate(p) => self.on_emojis_update(event, p),
            EventPayload::IntegrationsUpdate(p) => self.on_integrations_update(event, p),

            EventPayload::RoleCreate(p) => self.on_role_create(event, p),
            EventPayload::RoleUpdate(p) => self.on_role_update(event, p),
            EventPayload::RoleDelete(p) => self.on_role_delete(event, p),

            EventPayload::ChannelCreate(p) => self.on_channel_create(event, p),
            EventPayload::ChannelUpdate(p) => self.on_channel_update(event, p),
            EventPayload::ChannelDelete(p) => self.on_channel_delete(event, p),
            EventPayload::PinsUpdate(p) => self.on_pins_update(event, p),
            EventPayload::TypingStart(p) => self.on_typing_start(event, p),
            EventPayload::WebhooksUpdate(p) => self.on_webhooks_update(event, p),

            EventPayload::MessageCreate(p) => self.on_message_create(event, p),
            EventPayload::MessageUpdate(p) => self.on_message_update(event, p),
            EventPayload::MessageDelete(p) => self.on_message_delete(event, p),
            EventPayload::MessageBulkDelete(p) => self.on_message_bulk_delete(event, p),

            EventPayload::ReactionAdd(p) => self.on_reaction_add(event, p),
            EventPayload::ReactionRemove(p) => self.on_reaction_remove(event, p),
            EventPayload::ReactionRemoveAll(p) => self.on_reaction_remove_all(event, p),

            EventPayload::PresenceUpdate(p) => self.on_presence_update(event, p),
            EventPayload::UserUpdate(p) => self.on_user_update(event, p),

            EventPayload::VoiceStateUpdate(p) => self.on_voice_state_update(event, p),
            EventPayload::VoiceServerUpdate(p) => self.on_voice_server_update(event, p),

            EventPayload::InviteCreate(p) => self.on_invite_create(event, p),
            EventPayload::InviteDelete(p) => self.on_invite_delete(event, p),
        }
    }
}
