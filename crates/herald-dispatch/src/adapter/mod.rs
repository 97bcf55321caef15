//! Structured consumers
//!
//! Per-kind callback traits for consumers that prefer methods over matching
//! on `EventPayload`. Attach them with `EventBusExt::subscribe_listener` or
//! `EventBusExt::subscribe_adapter`.

mod listener;
mod reactive;

pub use listener::EventListener;
pub use reactive::{AsyncEventListener, CompositeListener};
