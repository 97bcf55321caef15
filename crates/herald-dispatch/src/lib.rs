//! # herald-dispatch
//!
//! Turns raw gateway dispatches into typed domain events and distributes
//! them to subscribers through interchangeable event bus backends.

pub mod adapter;
pub mod bus;
pub mod frames;
pub mod translator;

pub use adapter::{AsyncEventListener, CompositeListener, EventListener};
pub use bus::{bus_from_config, EventBus, EventBusBuilder, EventBusExt, EventStream};
pub use translator::DispatchTranslator;
