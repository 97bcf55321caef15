//! Dispatch translation
//!
//! Maps raw gateway dispatches onto typed domain events. One handler is
//! registered per `DispatchType`; unregistered or unknown dispatches are
//! ignored, and payloads that fail to decode are logged and dropped.

mod channel;
mod guild;
mod lifecycle;
mod message;
mod misc;

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use herald_core::{CoreError, CoreResult, DispatchEnvelope, DispatchType, DomainEvent, EventPayload};
use serde::de::DeserializeOwned;

/// Turns one dispatch into an event payload, or `None` when it produces no event
pub type DispatchHandler =
    Box<dyn Fn(&DispatchEnvelope) -> CoreResult<Option<EventPayload>> + Send + Sync>;

/// Registry of dispatch handlers keyed by dispatch type
#[derive(Default)]
pub struct DispatchTranslator {
    handlers: HashMap<DispatchType, DispatchHandler>,
}

impl DispatchTranslator {
    /// Translator with no handlers
    pub fn new() -> Self {
        Self::default()
    }

    /// Translator with every built-in handler registered
    pub fn standard() -> Self {
        let mut translator = Self::new();
        lifecycle::register(&mut translator);
        guild::register(&mut translator);
        channel::register(&mut translator);
        message::register(&mut translator);
        misc::register(&mut translator);
        translator
    }

    /// Process-wide standard translator
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<DispatchTranslator> = OnceLock::new();
        GLOBAL.get_or_init(Self::standard)
    }

    /// Register the handler for `dispatch`, replacing any previous one
    pub fn register<F>(&mut self, dispatch: DispatchType, handler: F) -> &mut Self
    where
        F: Fn(&DispatchEnvelope) -> CoreResult<Option<EventPayload>> + Send + Sync + 'static,
    {
        if self.handlers.insert(dispatch, Box::new(handler)).is_some() {
            tracing::debug!(dispatch = %dispatch, "Dispatch handler replaced");
        }
        self
    }

    pub fn is_registered(&self, dispatch: DispatchType) -> bool {
        self.handlers.contains_key(&dispatch)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Translate one dispatch
    ///
    /// Returns `None` for unknown or unregistered dispatch types, for
    /// dispatches that map to no event, and for payloads that fail to decode.
    pub fn handle(&self, envelope: &DispatchEnvelope) -> Option<DomainEvent> {
        let Some(dispatch) = envelope.payload.dispatch_type() else {
            tracing::trace!(
                event_type = %envelope.payload.event_type,
                shard = %envelope.shard,
                "Unknown dispatch type ignored"
            );
            return None;
        };

        let Some(handler) = self.handlers.get(&dispatch) else {
            tracing::trace!(dispatch = %dispatch, "No handler registered for dispatch");
            return None;
        };

        match handler(envelope) {
            Ok(payload) => payload.map(|payload| {
                DomainEvent::new(envelope.client.clone(), envelope.shard, payload)
            }),
            Err(err) => {
                tracing::warn!(
                    dispatch = %dispatch,
                    shard = %envelope.shard,
                    client = %envelope.client,
                    error = %err,
                    "Failed to translate dispatch"
                );
                None
            }
        }
    }
}

impl fmt::Debug for DispatchTranslator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut registered: Vec<&str> = self.handlers.keys().map(|d| d.as_str()).collect();
        registered.sort_unstable();
        f.debug_struct("DispatchTranslator")
            .field("handlers", &registered)
            .finish()
    }
}

/// Decode the dispatch data as `T`
fn decode<T: DeserializeOwned>(dispatch: DispatchType, envelope: &DispatchEnvelope) -> CoreResult<T> {
    T::deserialize(&envelope.payload.data).map_err(|source| CoreError::decode(dispatch, source))
}

/// Handler that decodes the data as `T` and wraps it, for one-to-one dispatches
fn decoded<T>(
    dispatch: DispatchType,
    wrap: fn(T) -> EventPayload,
) -> impl Fn(&DispatchEnvelope) -> CoreResult<Option<EventPayload>> + Send + Sync + 'static
where
    T: DeserializeOwned + 'static,
{
    move |envelope: &DispatchEnvelope| decode(dispatch, envelope).map(|data| Some(wrap(data)))
}
