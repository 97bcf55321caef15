//! Value objects - immutable identifiers and context carried by every event

mod client;
mod shard;
mod snowflake;

pub use client::ClientHandle;
pub use shard::ShardInfo;
pub use snowflake::{Snowflake, SnowflakeParseError};
