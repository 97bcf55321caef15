//! Event bus configuration
//!
//! Loads bus settings from `HERALD_*` environment variables (and a `.env` file
//! when present). Unset variables fall back to defaults; malformed ones are
//! rejected.

use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Which bus implementation to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BusBackend {
    /// Plain multicast, no history
    Direct,
    /// Warm-up backlog handed to the first subscriber
    Buffered,
    /// Every subscriber gets the retained window first
    ReplayWindow,
    /// Replay until the first subscriber arrives, then go live
    #[default]
    ReplayUntilSubscribed,
    /// Classified emission with bounded retry
    Resilient,
}

impl BusBackend {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Buffered => "buffered",
            Self::ReplayWindow => "replay-window",
            Self::ReplayUntilSubscribed => "replay-until-subscribed",
            Self::Resilient => "resilient",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "direct" => Some(Self::Direct),
            "buffered" => Some(Self::Buffered),
            "replay-window" => Some(Self::ReplayWindow),
            "replay-until-subscribed" => Some(Self::ReplayUntilSubscribed),
            "resilient" => Some(Self::Resilient),
            _ => None,
        }
    }
}

/// What a subscription queue does when it is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowStrategy {
    #[default]
    Buffer,
    /// Drop the newest event
    Drop,
    DropOldest,
    Error,
    FailFastRetry,
}

impl OverflowStrategy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "buffer" => Some(Self::Buffer),
            "drop" | "drop-latest" => Some(Self::Drop),
            "drop-oldest" | "latest" => Some(Self::DropOldest),
            "error" => Some(Self::Error),
            "fail-fast-retry" => Some(Self::FailFastRetry),
            _ => None,
        }
    }
}

/// Bound on the replay window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayLimitSetting {
    /// Keep the newest `n` events
    Count(usize),
    /// Keep events younger than this
    MaxAge(Duration),
}

impl Default for ReplayLimitSetting {
    fn default() -> Self {
        Self::MaxAge(default_replay_age())
    }
}

impl ReplayLimitSetting {
    /// `<n>` is a count, `<n>ms` / `<n>s` / `<n>m` an age
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(count) = s.parse::<usize>() {
            return Some(Self::Count(count));
        }
        parse_duration(s).map(Self::MaxAge)
    }
}

/// Event bus configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    pub backend: BusBackend,
    pub overflow: OverflowStrategy,
    /// Per-subscription queue capacity, `None` = unbounded
    pub capacity: Option<usize>,
    /// Dedicated worker threads, 0 = use the current runtime
    pub scheduler_threads: usize,
    pub replay_limit: ReplayLimitSetting,
    /// How long a new subscriber waits for more history before going live
    pub replay_quiescence: Duration,
    pub stop_replaying_after: Duration,
    pub retry_attempts: u32,
    pub retry_spin: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            backend: BusBackend::default(),
            overflow: OverflowStrategy::default(),
            capacity: None,
            scheduler_threads: 0,
            replay_limit: ReplayLimitSetting::default(),
            replay_quiescence: default_replay_quiescence(),
            stop_replaying_after: default_stop_replaying_after(),
            retry_attempts: default_retry_attempts(),
            retry_spin: default_retry_spin(),
        }
    }
}

// Default value functions
fn default_replay_age() -> Duration {
    Duration::from_secs(120)
}

fn default_replay_quiescence() -> Duration {
    Duration::from_millis(1)
}

fn default_stop_replaying_after() -> Duration {
    Duration::from_secs(5)
}

fn default_retry_attempts() -> u32 {
    8
}

fn default_retry_spin() -> Duration {
    Duration::from_micros(50)
}

impl BusConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if a variable is set to a value that cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let capacity = read(&lookup, "HERALD_BUFFER_CAPACITY", |s| s.parse::<usize>().ok())?
            .unwrap_or(0);

        Ok(Self {
            backend: read(&lookup, "HERALD_BUS_BACKEND", BusBackend::parse)?
                .unwrap_or(defaults.backend),
            overflow: read(&lookup, "HERALD_OVERFLOW", OverflowStrategy::parse)?
                .unwrap_or(defaults.overflow),
            capacity: (capacity > 0).then_some(capacity),
            scheduler_threads: read(&lookup, "HERALD_SCHEDULER_THREADS", |s| s.parse().ok())?
                .unwrap_or(defaults.scheduler_threads),
            replay_limit: read(&lookup, "HERALD_REPLAY_LIMIT", ReplayLimitSetting::parse)?
                .unwrap_or(defaults.replay_limit),
            replay_quiescence: read(&lookup, "HERALD_REPLAY_QUIESCENCE_MS", parse_millis)?
                .unwrap_or(defaults.replay_quiescence),
            stop_replaying_after: read(&lookup, "HERALD_STOP_REPLAYING_AFTER_MS", parse_millis)?
                .unwrap_or(defaults.stop_replaying_after),
            retry_attempts: read(&lookup, "HERALD_RETRY_ATTEMPTS", |s| s.parse().ok())?
                .unwrap_or(defaults.retry_attempts),
            retry_spin: read(&lookup, "HERALD_RETRY_SPIN_US", |s| {
                s.parse().ok().map(Duration::from_micros)
            })?
            .unwrap_or(defaults.retry_spin),
        })
    }
}

fn read<F, T>(
    lookup: &F,
    key: &'static str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse(raw.trim())
            .map(Some)
            .ok_or(ConfigError::InvalidValue(key, raw)),
    }
}

fn parse_millis(s: &str) -> Option<Duration> {
    s.parse().ok().map(Duration::from_millis)
}

/// Parse `<n>ms`, `<n>s` or `<n>m`
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.parse().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else {
        None
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
