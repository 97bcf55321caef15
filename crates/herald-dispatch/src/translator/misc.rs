//! Presence, user, voice and invite dispatches

use herald_core::{DispatchType, EventPayload};

use super::{decoded, DispatchTranslator};

pub(super) fn register(translator: &mut DispatchTranslator) {
    use DispatchType as D;

    translator
        .register(
            D::PresenceUpdate,
            decoded(D::PresenceUpdate, EventPayload::PresenceUpdate),
        )
        .register(D::UserUpdate, decoded(D::UserUpdate, EventPayload::UserUpdate))
        .register(
            D::VoiceStateUpdate,
            decoded(D::VoiceStateUpdate, EventPayload::VoiceStateUpdate),
        )
        .register(
            D::VoiceServerUpdate,
            decoded(D::VoiceServerUpdate, EventPayload::VoiceServerUpdate),
        )
        .register(D::InviteCreate, decoded(D::InviteCreate, EventPayload::InviteCreate))
        .register(D::InviteDelete, decoded(D::InviteDelete, EventPayload::InviteDelete));
}
