//! Shard information
//!
//! Every dispatch arrives on one shard of the gateway connection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a gateway shard within the client's shard set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShardInfo {
    /// Zero-based shard index
    pub index: u32,
    /// Total number of shards
    pub count: u32,
}

impl ShardInfo {
    #[must_use]
    pub const fn new(index: u32, count: u32) -> Self {
        Self { index, count }
    }

    /// A client running a single shard
    #[must_use]
    pub const fn single() -> Self {
        Self { index: 0, count: 1 }
    }

    /// Shard responsible for a guild (`(guild_id >> 22) % count`)
    #[must_use]
    pub fn for_guild(guild_id: crate::Snowflake, count: u32) -> Self {
        let count = count.max(1);
        let index = (guild_id.into_inner() >> 22) % u64::from(count);
        Self {
            index: index as u32,
            count,
        }
    }
}

impl Default for ShardInfo {
    fn default() -> Self {
        Self::single()
    }
}

impl fmt::Display for ShardInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.index, self.count)
    }
}
