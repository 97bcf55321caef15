//! Bus errors

use thiserror::Error;

use super::subscription::SubscriptionId;

/// Event bus errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// Two threads called `publish` on the same bus at once
    #[error("{bus}: concurrent publish detected, emission must be serialized")]
    NonSerializedEmission { bus: &'static str },

    /// A subscription queue exceeded its capacity under a fatal policy
    #[error("{bus}: subscription {subscription} overflowed its capacity of {capacity}")]
    Overflow {
        bus: &'static str,
        subscription: SubscriptionId,
        capacity: usize,
    },

    #[error("No tokio runtime available to run subscriptions")]
    NoRuntime,

    #[error("Failed to start scheduler: {0}")]
    Scheduler(String),
}

/// Result type alias for bus operations
pub type BusResult<T> = Result<T, BusError>;
