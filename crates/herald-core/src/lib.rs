//! # herald-core
//!
//! Domain layer: raw gateway dispatches, the typed domain events they are
//! translated into, and the value objects both carry.
//! This crate has no async runtime or I/O dependencies.

pub mod dispatch;
pub mod error;
pub mod events;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use dispatch::{DispatchEnvelope, DispatchType, GatewayState, GatewayStateChange, RawDispatch};
pub use error::{CoreError, CoreResult};
pub use events::{DomainEvent, EventCategory, EventFilter, EventKind, EventPayload};
pub use value_objects::{ClientHandle, ShardInfo, Snowflake, SnowflakeParseError};
