//! Guild, member and role dispatches

use herald_core::events::GuildDeleteEvent;
use herald_core::{CoreResult, DispatchEnvelope, DispatchType, EventPayload};

use super::{decode, decoded, DispatchTranslator};

pub(super) fn register(translator: &mut DispatchTranslator) {
    use DispatchType as D;

    translator
        .register(D::GuildCreate, decoded(D::GuildCreate, EventPayload::GuildCreate))
        .register(D::GuildUpdate, decoded(D::GuildUpdate, EventPayload::GuildUpdate))
        .register(D::GuildDelete, guild_delete)
        .register(D::GuildBanAdd, decoded(D::GuildBanAdd, EventPayload::Ban))
        .register(D::GuildBanRemove, decoded(D::GuildBanRemove, EventPayload::Unban))
        .register(
            D::GuildEmojisUpdate,
            decoded(D::GuildEmojisUpdate, EventPayload::EmojisUpdate),
        )
        .register(
            D::GuildIntegrationsUpdate,
            decoded(D::GuildIntegrationsUpdate, EventPayload::IntegrationsUpdate),
        )
        .register(D::GuildMemberAdd, decoded(D::GuildMemberAdd, EventPayload::MemberJoin))
        .register(
            D::GuildMemberRemove,
            decoded(D::GuildMemberRemove, EventPayload::MemberLeave),
        )
        .register(
            D::GuildMemberUpdate,
            decoded(D::GuildMemberUpdate, EventPayload::MemberUpdate),
        )
        .register(
            D::GuildMembersChunk,
            decoded(D::GuildMembersChunk, EventPayload::MemberChunk),
        )
        .register(D::GuildRoleCreate, decoded(D::GuildRoleCreate, EventPayload::RoleCreate))
        .register(D::GuildRoleUpdate, decoded(D::GuildRoleUpdate, EventPayload::RoleUpdate))
        .register(D::GuildRoleDelete, decoded(D::GuildRoleDelete, EventPayload::RoleDelete));
}

fn guild_delete(envelope: &DispatchEnvelope) -> CoreResult<Option<EventPayload>> {
    let deleted: GuildDeleteEvent = decode(DispatchType::GuildDelete, envelope)?;
    if deleted.unavailable {
        tracing::debug!(guild_id = %deleted.id, shard = %envelope.shard, "Guild became unavailable");
    }
    Ok(Some(EventPayload::GuildDelete(deleted)))
}
