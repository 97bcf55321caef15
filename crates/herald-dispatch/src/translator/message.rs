//! Message and reaction dispatches

use herald_core::events::MessagePayload;
use herald_core::{DispatchType, EventPayload};

use super::{decoded, DispatchTranslator};

pub(super) fn register(translator: &mut DispatchTranslator) {
    use DispatchType as D;

    translator
        .register(
            D::MessageCreate,
            decoded(D::MessageCreate, |message: MessagePayload| {
                EventPayload::MessageCreate(Box::new(message))
            }),
        )
        .register(D::MessageUpdate, decoded(D::MessageUpdate, EventPayload::MessageUpdate))
        .register(D::MessageDelete, decoded(D::MessageDelete, EventPayload::MessageDelete))
        .register(
            D::MessageDeleteBulk,
            decoded(D::MessageDeleteBulk, EventPayload::MessageBulkDelete),
        )
        .register(
            D::MessageReactionAdd,
            decoded(D::MessageReactionAdd, EventPayload::ReactionAdd),
        )
        .register(
            D::MessageReactionRemove,
            decoded(D::MessageReactionRemove, EventPayload::ReactionRemove),
        )
        .register(
            D::MessageReactionRemoveAll,
            decoded(D::MessageReactionRemoveAll, EventPayload::ReactionRemoveAll),
        );
}
