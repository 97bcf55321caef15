//! Session and connection lifecycle dispatches

use herald_core::events::{DisconnectEvent, ReadyEvent, ReconnectEvent};
use herald_core::{
    CoreResult, DispatchEnvelope, DispatchType, EventPayload, GatewayState, GatewayStateChange,
};

use super::{decode, DispatchTranslator};

pub(super) fn register(translator: &mut DispatchTranslator) {
    translator
        .register(DispatchType::Ready, ready)
        .register(DispatchType::Resumed, resumed)
        .register(DispatchType::GatewayStateChange, gateway_state_changed);
}

fn ready(envelope: &DispatchEnvelope) -> CoreResult<Option<EventPayload>> {
    let ready: ReadyEvent = decode(DispatchType::Ready, envelope)?;
    tracing::debug!(
        shard = %envelope.shard,
        session_id = %ready.session_id,
        guilds = ready.guilds.len(),
        "Gateway session ready"
    );
    Ok(Some(EventPayload::Ready(Box::new(ready))))
}

fn resumed(_envelope: &DispatchEnvelope) -> CoreResult<Option<EventPayload>> {
    Ok(Some(EventPayload::Resumed))
}

/// Only settled connection states become events; resume attempts in progress do not
fn gateway_state_changed(envelope: &DispatchEnvelope) -> CoreResult<Option<EventPayload>> {
    let change: GatewayStateChange = decode(DispatchType::GatewayStateChange, envelope)?;

    let payload = match change.state {
        GatewayState::Connected => EventPayload::Connected,
        GatewayState::Disconnected => EventPayload::Disconnected(DisconnectEvent {
            close_code: change.close_code,
            reason: change.reason,
        }),
        GatewayState::RetryStarted => EventPayload::ReconnectStarted,
        GatewayState::RetrySucceeded => EventPayload::Reconnected(ReconnectEvent {
            attempt: change.attempt,
        }),
        GatewayState::RetryFailed => EventPayload::ReconnectFailed(ReconnectEvent {
            attempt: change.attempt,
        }),
        GatewayState::DisconnectedResume | GatewayState::RetryResumeStarted => {
            tracing::trace!(shard = %envelope.shard, state = ?change.state, "Gateway state produces no event");
            return Ok(None);
        }
    };
    Ok(Some(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::{ClientHandle, EventKind, RawDispatch, ShardInfo};
    use serde_json::json;

    fn state_envelope(change: &GatewayStateChange) -> DispatchEnvelope {
        DispatchEnvelope::new(
            RawDispatch::gateway_state(change),
            ClientHandle::new("test"),
            ShardInfo::single(),
        )
    }

    fn translate(change: GatewayStateChange) -> Option<EventKind> {
        gateway_state_changed(&state_envelope(&change))
            .unwrap()
            .map(|payload| payload.kind())
    }

    #[test]
    fn test_gateway_state_mapping() {
        assert_eq!(
            translate(GatewayStateChange::new(GatewayState::Connected)),
            Some(EventKind::Connected)
        );
        assert_eq!(
            translate(GatewayStateChange::new(GatewayState::Disconnected)),
            Some(EventKind::Disconnected)
        );
        assert_eq!(
            translate(GatewayStateChange::new(GatewayState::RetryStarted)),
            Some(EventKind::ReconnectStarted)
        );
        assert_eq!(
            translate(GatewayStateChange::new(GatewayState::RetrySucceeded)),
            Some(EventKind::Reconnected)
        );
        assert_eq!(
            translate(GatewayStateChange::new(GatewayState::RetryFailed)),
            Some(EventKind::ReconnectFailed)
        );
        assert_eq!(
            translate(GatewayStateChange::new(GatewayState::DisconnectedResume)),
            None
        );
        assert_eq!(
            translate(GatewayStateChange::new(GatewayState::RetryResumeStarted)),
            None
        );
    }

    #[test]
    fn test_disconnect_carries_close_details() {
        let change = GatewayStateChange::new(GatewayState::Disconnected).with_close(4004, "auth");
        match gateway_state_changed(&state_envelope(&change)).unwrap() {
            Some(EventPayload::Disconnected(disconnect)) => {
                assert_eq!(disconnect.close_code, Some(4004));
                assert_eq!(disconnect.reason.as_deref(), Some("auth"));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_ready_decodes_session() {
        let envelope = DispatchEnvelope::new(
            RawDispatch::new(
                "READY",
                json!({
                    "v": 10,
                    "user": {"id": "80351110224678912", "username": "herald", "discriminator": "0"},
                    "guilds": [{"id": "41771983423143937"}],
                    "session_id": "abc"
                }),
            ),
            ClientHandle::new("test"),
            ShardInfo::single(),
        );
        match ready(&envelope).unwrap() {
            Some(EventPayload::Ready(ready)) => {
                assert_eq!(ready.session_id, "abc");
                assert!(ready.guilds[0].unavailable);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_unknown_state_is_decode_error() {
        let envelope = DispatchEnvelope::new(
            RawDispatch::new("GATEWAY_STATE_CHANGE", json!({"state": "SLEEPING"})),
            ClientHandle::new("test"),
            ShardInfo::single(),
        );
        assert!(gateway_state_changed(&envelope).is_err());
    }
}
