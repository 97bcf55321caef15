//! Overflow and backpressure policies

use std::fmt;
use std::time::{Duration, Instant};

/// Per-subscription queue capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capacity {
    #[default]
    Unbounded,
    Bounded(usize),
}

impl Capacity {
    /// `None` and `Some(0)` mean unbounded
    pub fn from_option(capacity: Option<usize>) -> Self {
        match capacity {
            Some(n) if n > 0 => Self::Bounded(n),
            _ => Self::Unbounded,
        }
    }

    pub fn is_full(self, len: usize) -> bool {
        match self {
            Self::Unbounded => false,
            Self::Bounded(n) => len >= n,
        }
    }

    pub fn limit(self) -> usize {
        match self {
            Self::Unbounded => usize::MAX,
            Self::Bounded(n) => n,
        }
    }
}

/// Bounds for the fail-fast-with-retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first failed one
    pub max_attempts: u32,
    /// Busy-wait between attempts
    pub spin: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            spin: Duration::from_micros(50),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, spin: Duration) -> Self {
        Self { max_attempts, spin }
    }

    /// Busy-wait for one spin interval
    pub(crate) fn spin_once(&self) {
        let start = Instant::now();
        while start.elapsed() < self.spin {
            std::hint::spin_loop();
        }
    }
}

/// What happens when a subscription queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Queue everything; exceeding a bounded capacity fails the bus
    #[default]
    Buffer,
    /// Discard the newest event for that subscription
    DropLatest,
    /// Evict the oldest queued event to make room
    DropOldest,
    /// Any overflow fails the bus
    Error,
    /// Spin and retry a bounded number of times, then discard
    FailFastRetry(RetryPolicy),
}

impl OverflowPolicy {
    /// Whether an overflow under this policy terminates the bus
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::Buffer | Self::Error)
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffer => f.write_str("buffer"),
            Self::DropLatest => f.write_str("drop-latest"),
            Self::DropOldest => f.write_str("drop-oldest"),
            Self::Error => f.write_str("error"),
            Self::FailFastRetry(retry) => write!(
                f,
                "fail-fast-retry({}x{}us)",
                retry.max_attempts,
                retry.spin.as_micros()
            ),
        }
    }
}

/// Why an event did not reach a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscardReason {
    /// No subscriber was attached
    NoSubscriber,
    /// A subscription queue was full
    Overflow,
    /// The subscription was cancelled while the event was being delivered
    Cancelled,
    /// The bus was already shut down or failed
    Terminated,
}

impl DiscardReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoSubscriber => "no_subscriber",
            Self::Overflow => "overflow",
            Self::Cancelled => "cancelled",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified outcome of a single emission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitResult {
    Ok,
    FailZeroSubscriber,
    FailOverflow,
    FailCancelled,
    FailTerminated,
    FailNonSerialized,
}

impl EmitResult {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_from_option() {
        assert_eq!(Capacity::from_option(None), Capacity::Unbounded);
        assert_eq!(Capacity::from_option(Some(0)), Capacity::Unbounded);
        assert_eq!(Capacity::from_option(Some(4)), Capacity::Bounded(4));
        assert!(Capacity::Bounded(2).is_full(2));
        assert!(!Capacity::Unbounded.is_full(usize::MAX - 1));
    }

    #[test]
    fn test_fatal_policies() {
        assert!(OverflowPolicy::Buffer.is_fatal());
        assert!(OverflowPolicy::Error.is_fatal());
        assert!(!OverflowPolicy::DropLatest.is_fatal());
        assert!(!OverflowPolicy::FailFastRetry(RetryPolicy::default()).is_fatal());
    }

    #[test]
    fn test_policy_display() {
        let retry = OverflowPolicy::FailFastRetry(RetryPolicy::new(3, Duration::from_micros(20)));
        assert_eq!(retry.to_string(), "fail-fast-retry(3x20us)");
        assert_eq!(OverflowPolicy::DropOldest.to_string(), "drop-oldest");
    }
}
