//! Gateway capture replay
//!
//! Reads recorded dispatch frames (one JSON object per line) from a file or
//! stdin, translates them and publishes them on the configured event bus. A
//! logging subscriber attaches after `HERALD_SUBSCRIBE_AFTER_MS`, which makes
//! the replaying backends easy to observe.
//!
//! Run with:
//! ```bash
//! HERALD_BUS_BACKEND=replay-until-subscribed cargo run -p herald-dispatch -- capture.ndjson
//! ```

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures::StreamExt;
use herald_common::{try_init_tracing_with_config, BusConfig, TracingConfig};
use herald_core::events::{DisconnectEvent, GuildPayload, MessagePayload, ReadyEvent};
use herald_core::{ClientHandle, DomainEvent};
use herald_dispatch::frames::pump;
use herald_dispatch::{bus_from_config, DispatchTranslator, EventBusExt, EventListener};
use tokio::io::{AsyncBufRead, BufReader};
use tokio::sync::oneshot;
use tracing::{debug, error, info};

/// Time left for the consumer to drain before shutdown
const LINGER: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() {
    if let Err(e) = try_init_tracing_with_config(TracingConfig::from_env()) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run().await {
        error!(error = %e, "Replay failed");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = BusConfig::from_env().context("Failed to load bus configuration")?;
    info!(
        backend = config.backend.as_str(),
        overflow = ?config.overflow,
        capacity = ?config.capacity,
        "Configuration loaded"
    );

    let subscribe_after = env::var("HERALD_SUBSCRIBE_AFTER_MS")
        .ok()
        .map(|v| v.parse::<u64>())
        .transpose()
        .context("HERALD_SUBSCRIBE_AFTER_MS must be a number of milliseconds")?
        .map_or(Duration::ZERO, Duration::from_millis);
    let shard_count = env::var("HERALD_SHARD_COUNT")
        .ok()
        .map(|v| v.parse::<u32>())
        .transpose()
        .context("HERALD_SHARD_COUNT must be a positive integer")?
        .unwrap_or(1);

    let bus = bus_from_config(&config)?;
    let client = ClientHandle::new("replay");

    let (subscribed_tx, subscribed_rx) = oneshot::channel();
    let consumer = {
        let bus = bus.clone();
        tokio::spawn(async move {
            tokio::time::sleep(subscribe_after).await;
            let mut handled = bus.subscribe_listener(Arc::new(LoggingListener));
            let _ = subscribed_tx.send(());
            let mut count = 0u64;
            while let Some(event) = handled.next().await {
                debug!(kind = %event.kind(), shard = %event.shard(), "Event handled");
                count += 1;
            }
            count
        })
    };

    let input = open_input(env::args().nth(1)).await?;
    let stats = pump(input, &client, shard_count, DispatchTranslator::global(), bus.as_ref()).await?;

    let _ = subscribed_rx.await;
    tokio::time::sleep(LINGER).await;
    bus.shutdown();

    let handled = consumer.await.context("Consumer task failed")?;
    let bus_stats = bus.stats();
    info!(
        frames = stats.frames,
        published = stats.published,
        ignored = stats.ignored,
        malformed = stats.malformed,
        handled,
        delivered = bus_stats.delivered,
        dropped = bus_stats.dropped,
        no_subscriber = bus_stats.no_subscriber,
        "Replay finished"
    );
    Ok(())
}

async fn open_input(path: Option<String>) -> anyhow::Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    match path.as_deref() {
        None | Some("-") => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {path}"))?;
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

/// Logs the events worth seeing when watching a replay
struct LoggingListener;

impl EventListener for LoggingListener {
    fn on_ready(&self, event: &DomainEvent, ready: &ReadyEvent) {
        info!(
            shard = %event.shard(),
            user = %ready.user.username,
            guilds = ready.guilds.len(),
            "Ready"
        );
    }

    fn on_disconnected(&self, event: &DomainEvent, disconnect: &DisconnectEvent) {
        info!(
            shard = %event.shard(),
            close_code = ?disconnect.close_code,
            reason = ?disconnect.reason,
            "Disconnected"
        );
    }

    fn on_guild_create(&self, event: &DomainEvent, guild: &GuildPayload) {
        info!(shard = %event.shard(), guild_id = %guild.id, name = %guild.name, "Guild available");
    }

    fn on_message_create(&self, _event: &DomainEvent, message: &MessagePayload) {
        info!(
            channel_id = %message.channel_id,
            author = %message.author.username,
            content = %message.content,
            "Message"
        );
    }
}
