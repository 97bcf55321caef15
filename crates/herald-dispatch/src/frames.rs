//! Recorded gateway frames
//!
//! Reads newline-delimited JSON dispatch frames (`{"t": .., "d": .., "shard": n}`),
//! translates each one and publishes the result on a bus. Used by the
//! `herald-dispatch` binary to replay captured gateway traffic.

use anyhow::Context;
use herald_core::{ClientHandle, DispatchEnvelope, RawDispatch, ShardInfo};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::bus::EventBus;
use crate::translator::DispatchTranslator;

/// One recorded dispatch
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GatewayFrame {
    #[serde(flatten)]
    pub dispatch: RawDispatch,
    /// Shard index the frame arrived on
    #[serde(default)]
    pub shard: u32,
}

impl GatewayFrame {
    /// Parse one line; blank lines yield `None`
    pub fn parse(line: &str) -> serde_json::Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(line).map(Some)
    }

    pub fn into_envelope(self, client: &ClientHandle, shard_count: u32) -> DispatchEnvelope {
        let shard = ShardInfo::new(self.shard, shard_count.max(self.shard + 1));
        DispatchEnvelope::new(self.dispatch, client.clone(), shard)
    }
}

/// Counts from one replay run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    pub frames: u64,
    pub published: u64,
    /// Frames that produced no event
    pub ignored: u64,
    pub malformed: u64,
}

/// Translate and publish every frame read from `reader` until EOF
///
/// Malformed lines are logged and skipped; a bus failure stops the run.
pub async fn pump<R>(
    reader: R,
    client: &ClientHandle,
    shard_count: u32,
    translator: &DispatchTranslator,
    bus: &dyn EventBus,
) -> anyhow::Result<PumpStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = PumpStats::default();
    let mut lines = reader.lines();
    let mut line_no = 0u64;

    while let Some(line) = lines.next_line().await.context("Failed to read frame")? {
        line_no += 1;
        let frame = match GatewayFrame::parse(&line) {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(err) => {
                tracing::warn!(line = line_no, error = %err, "Skipping malformed frame");
                stats.malformed += 1;
                continue;
            }
        };
        stats.frames += 1;

        let envelope = frame.into_envelope(client, shard_count);
        match translator.handle(&envelope) {
            Some(event) => {
                bus.publish(event)
                    .with_context(|| format!("Publishing frame on line {line_no}"))?;
                stats.published += 1;
            }
            None => stats.ignored += 1,
        }
    }

    tracing::info!(
        frames = stats.frames,
        published = stats.published,
        ignored = stats.ignored,
        malformed = stats.malformed,
        "Frame input exhausted"
    );
    Ok(stats)
}
