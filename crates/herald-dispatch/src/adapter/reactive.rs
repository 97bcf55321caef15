//! Async event listener
//!
//! Each callback returns `anyhow::Result<()>`; an error is logged by the bus
//! subscription running the listener and never ends it. `hook_on_event`
//! awaits the callback matching the event kind.

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::events::{
    BanEvent, ChannelPayload, DisconnectEvent, EmojisUpdateEvent, GuildDeleteEvent, GuildPayload,
    GuildRefEvent, InviteCreateEvent, InviteDeleteEvent, MemberChunkEvent, MemberEvent,
    MemberLeaveEvent, MessageBulkDeleteEvent, MessageDeleteEvent, MessagePayload,
    MessageUpdateEvent, PinsUpdateEvent, PresenceUpdateEvent, ReactionEvent,
    ReactionRemoveAllEvent, ReadyEvent, ReconnectEvent, RoleDeleteEvent, RoleEvent,
    TypingStartEvent, UserPayload, VoiceServerEvent, VoiceStateEvent, WebhooksUpdateEvent,
};
use herald_core::{DomainEvent, EventPayload};

/// Async callbacks, one per event kind, all completing immediately by default
#[async_trait]
#[allow(unused_variables)]
pub trait AsyncEventListener: Send + Sync {
    // === Lifecycle ===

    async fn on_connected(&self, event: &DomainEvent) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_disconnected(
        &self,
        event: &DomainEvent,
        disconnect: &DisconnectEvent,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_reconnect_started(&self, event: &DomainEvent) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_reconnected(
        &self,
        event: &DomainEvent,
        reconnect: &ReconnectEvent,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_reconnect_failed(
        &self,
        event: &DomainEvent,
        reconnect: &ReconnectEvent,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_ready(&self, event: &DomainEvent, ready: &ReadyEvent) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_resumed(&self, event: &DomainEvent) -> anyhow::Result<()> {
        Ok(())
    }

    // === Guild ===

    async fn on_guild_create(
        &self,
        event: &DomainEvent,
        guild: &GuildPayload,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_guild_update(
        &self,
        event: &DomainEvent,
        guild: &GuildPayload,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_guild_delete(
        &self,
        event: &DomainEvent,
        guild: &GuildDeleteEvent,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_member_join(
        &self,
        event: &DomainEvent,
        member: &MemberEvent,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_member_leave(
        &self,
        event: &DomainEvent,
        member: &MemberLeaveEvent,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_member_update(
        &self,
        event: &DomainEvent,
        member: &MemberEvent,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_member_chunk(
        &self,
        event: &DomainEvent,
        chunk: &MemberChunkEvent,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_ban(&self, event: &DomainEvent, ban: &BanEvent) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_unban(&self, event: &DomainEvent, unban: &BanEvent) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_emojis_update(
        &self,
        event: &DomainEvent,
        emojis: &EmojisUpdateEvent,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_integrations_update(
        &self,
        event: &DomainEvent,
        guild: &GuildRefEvent,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    // === Role ===

    async fn on_role_create(&self, event: &DomainEvent, role: &RoleEvent) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_role_update(&self, event: &DomainEvent, role: &RoleEvent) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_role_delete(
        &self,
        event: &DomainEvent,
        role: &RoleDeleteEvent,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    // === Channel ===

    async fn on_channel_create(
        &self,
        event: &DomainEvent,
        channel: &ChannelPayload,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_channel_update(
        &self,
        event: &DomainEvent,
        channel: &ChannelPayload,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_channel_delete(
        &self,
        event: &DomainEvent,
        channel: &ChannelPayload,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_pins_update(
        &self,
        event: &DomainEvent,
        pins: &PinsUpdateEvent,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_typing_start(
        &self,
        event: &DomainEvent,
        typing: &TypingStartEvent,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_webhooks_update(
        &self,
        event: &DomainEvent,
        webhooks: &WebhooksUpdateEvent,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    // === Message ===

    async fn on_message_create(
        &self,
        event: &DomainEvent,
        message: &MessagePayload,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_message_update(
        &self,
        event: &DomainEvent,
        message: &MessageUpdateEvent,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_message_delete(
        &self,
        event: &DomainEvent,
        message: &MessageDeleteEvent,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_message_bulk_delete(
        &self,
        event: &DomainEvent,
        messages: &MessageBulkDeleteEvent,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    // === Reaction ===

    async fn on_reaction_add(
        &self,
        event: &DomainEvent,
        reaction: &ReactionEvent,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_reaction_remove(
        &self,
        event: &DomainEvent,
        reaction: &ReactionEvent,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_reaction_remove_all(
        &self,
        event: &DomainEvent,
        reactions: &ReactionRemoveAllEvent,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    // === Presence ===

    async fn on_presence_update(
        &self,
        event: &DomainEvent,
        presence: &PresenceUpdateEvent,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_user_update(&self, event: &DomainEvent, user: &UserPayload) -> anyhow::Result<()> {
        Ok(())
    }

    // === Voice ===

    async fn on_voice_state_update(
        &self,
        event: &DomainEvent,
        voice: &VoiceStateEvent,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_voice_server_update(
        &self,
        event: &DomainEvent,
        voice: &VoiceServerEvent,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    // === Invite ===

    async fn on_invite_create(
        &self,
        event: &DomainEvent,
        invite: &InviteCreateEvent,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_invite_delete(
        &self,
        event: &DomainEvent,
        invite: &InviteDeleteEvent,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Await the callback matching `event`
    async fn hook_on_event(&self, event: &DomainEvent) -> anyhow::Result<()> {
        match event.payload() {
            EventPayload::Connected => self.on_connected(event).await,
            EventPayload::Disconnected(p) => self.on_disconnected(event, p).await,
            EventPayload::ReconnectStarted => self.on_reconnect_started(event).await,
            EventPayload::Reconnected(p) => self.on_reconnected(event, p).await,
            EventPayload::ReconnectFailed(p) => self.on_reconnect_failed(event, p).await,
            EventPayload::Ready(p) => self.on_ready(event, p).await,
            EventPayload::Resumed => self.on_resumed(event).await,

            EventPayload::GuildCreate(p) => self.on_guild_create(event, p).await,
            EventPayload::GuildUpdate(p) => self.on_guild_update(event, p).await,
            EventPayload::GuildDelete(p) => self.on_guild_delete(event, p).await,
            EventPayload::MemberJoin(p) => self.on_member_join(event, p).await,
            EventPayload::MemberLeave(p) => self.on_member_leave(event, p).await,
            EventPayload::MemberUpdate(p) => self.on_member_update(event, p).await,
            EventPayload::MemberChunk(p) => self.on_member_chunk(event, p).await,
            EventPayload::Ban(p) => self.on_ban(event, p).await,
            EventPayload::Unban(p) => self.on_unban(event, p).await,
            EventPayload::EmojisUpdate(p) => self.on_emojis_update(event, p).await,
            EventPayload::IntegrationsUpdate(p) => self.on_integrations_update(event, p).await,

            EventPayload::RoleCreate(p) => self.on_role_create(event, p).await,
            EventPayload::RoleUpdate(p) => self.on_role_update(event, p).await,
            EventPayload::RoleDelete(p) => self.on_role_delete(event, p).await,

            EventPayload::ChannelCreate(p) => self.on_channel_create(event, p).await,
            EventPayload::ChannelUpdate(p) => self.on_channel_update(event, p).await,
            EventPayload::ChannelDelete(p) => self.on_channel_delete(event, p).await,
            EventPayload::PinsUpdate(p) => self.on_pins_update(event, p).await,
            EventPayload::TypingStart(p) => self.on_typing_start(event, p).await,
            EventPayload::WebhooksUpdate(p) => self.on_webhooks_update(event, p).await,

            EventPayload::MessageCreate(p) => self.on_message_create(event, p).await,
            EventPayload::MessageUpdate(p) => self.on_message_update(event, p).await,
            EventPayload::MessageDelete(p) => self.on_message_delete(event, p).await,
            EventPayload::MessageBulkDelete(p) => self.on_message_bulk_delete(event, p).await,

            EventPayload::ReactionAdd(p) => self.on_reaction_add(event, p).await,
            EventPayload::ReactionRemove(p) => self.on_reaction_remove(event, p).await,
            EventPayload::ReactionRemoveAll(p) => self.on_reaction_remove_all(event, p).await,

            EventPayload::PresenceUpdate(p) => self.on_presence_update(event, p).await,
            EventPayload::UserUpdate(p) => self.on_user_update(event, p).await,

            EventPayload::VoiceStateUpdate(p) => self.on_voice_state_update(event, p).await,
            EventPayload::VoiceServerUpdate(p) => self.on_voice_server_update(event, p).await,

            EventPayload::InviteCreate(p) => self.on_invite_create(event, p).await,
            EventPayload::InviteDelete(p) => self.on_invite_delete(event, p).await,
        }
    }
}

/// Runs several listeners for each event, in registration order
///
/// Every listener sees the event even when an earlier one fails; the first
/// error is returned.
#[derive(Clone, Default)]
pub struct CompositeListener {
    listeners: Vec<Arc<dyn AsyncEventListener>>,
}

impl CompositeListener {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, listener: Arc<dyn AsyncEventListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl FromIterator<Arc<dyn AsyncEventListener>> for CompositeListener {
    fn from_iter<I: IntoIterator<Item = Arc<dyn AsyncEventListener>>>(iter: I) -> Self {
        Self {
            listeners: iter.into_iter().collect(),
        }
    }
}

impl std::fmt::Debug for CompositeListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeListener")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[async_trait]
impl AsyncEventListener for CompositeListener {
    async fn hook_on_event(&self, event: &DomainEvent) -> anyhow::Result<()> {
        let mut first_error = None;
        for listener in &self.listeners {
            if let Err(err) = listener.hook_on_event(event).await {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
