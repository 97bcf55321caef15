//! Raw dispatch envelope produced by the wire client

use serde::{Deserialize, Serialize};

use super::dispatch_type::DispatchType;
use crate::value_objects::{ClientHandle, ShardInfo};

/// The `t`/`d` pair of an op-0 gateway frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDispatch {
    #[serde(rename = "t")]
    pub event_type: String,
    #[serde(rename = "d", default)]
    pub data: serde_json::Value,
}

impl RawDispatch {
    pub fn new(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
        }
    }

    /// Build the synthetic dispatch the wire client sends on connection-state changes
    pub fn gateway_state(change: &GatewayStateChange) -> Self {
        Self {
            event_type: DispatchType::GatewayStateChange.as_str().to_string(),
            data: serde_json::to_value(change).unwrap_or_default(),
        }
    }

    /// Closed discriminant, `None` for names this client does not know
    pub fn dispatch_type(&self) -> Option<DispatchType> {
        DispatchType::from_str(&self.event_type)
    }
}

/// One dispatch, tagged with its producing client and shard
#[derive(Debug, Clone)]
pub struct DispatchEnvelope {
    pub payload: RawDispatch,
    pub client: ClientHandle,
    pub shard: ShardInfo,
}

impl DispatchEnvelope {
    pub fn new(payload: RawDispatch, client: ClientHandle, shard: ShardInfo) -> Self {
        Self {
            payload,
            client,
            shard,
        }
    }
}

/// Connection state reported by the wire client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayState {
    Connected,
    Disconnected,
    /// Disconnected, a resume will be attempted
    DisconnectedResume,
    RetryStarted,
    RetryResumeStarted,
    RetrySucceeded,
    RetryFailed,
}

/// Data of a `GATEWAY_STATE_CHANGE` dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayStateChange {
    pub state: GatewayState,
    #[serde(default)]
    pub attempt: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl GatewayStateChange {
    pub fn new(state: GatewayState) -> Self {
        Self {
            state,
            attempt: 0,
            close_code: None,
            reason: None,
        }
    }

    #[must_use]
    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    #[must_use]
    pub fn with_close(mut self, code: u16, reason: impl Into<String>) -> Self {
        self.close_code = Some(code);
        self.reason = Some(reason.into());
        self
    }
}
