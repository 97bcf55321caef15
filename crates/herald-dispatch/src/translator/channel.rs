//! Channel dispatches

use herald_core::{DispatchType, EventPayload};

use super::{decoded, DispatchTranslator};

pub(super) fn register(translator: &mut DispatchTranslator) {
    use DispatchType as D;

    translator
        .register(D::ChannelCreate, decoded(D::ChannelCreate, EventPayload::ChannelCreate))
        .register(D::ChannelUpdate, decoded(D::ChannelUpdate, EventPayload::ChannelUpdate))
        .register(D::ChannelDelete, decoded(D::ChannelDelete, EventPayload::ChannelDelete))
        .register(
            D::ChannelPinsUpdate,
            decoded(D::ChannelPinsUpdate, EventPayload::PinsUpdate),
        )
        .register(D::TypingStart, decoded(D::TypingStart, EventPayload::TypingStart))
        .register(
            D::WebhooksUpdate,
            decoded(D::WebhooksUpdate, EventPayload::WebhooksUpdate),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::{ClientHandle, DispatchEnvelope, RawDispatch, ShardInfo};
    use serde_json::json;

    #[test]
    fn test_channel_create_keeps_type() {
        let mut translator = DispatchTranslator::new();
        register(&mut translator);

        let event = translator
            .handle(&DispatchEnvelope::new(
                RawDispatch::new(
                    "CHANNEL_CREATE",
                    json!({"id": "10", "type": 2, "guild_id": "1", "name": "voice"}),
                ),
                ClientHandle::new("test"),
                ShardInfo::single(),
            ))
            .unwrap();

        match event.payload() {
            EventPayload::ChannelCreate(channel) => {
                assert_eq!(channel.channel_type, 2);
                assert_eq!(channel.name.as_deref(), Some("voice"));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }
}
