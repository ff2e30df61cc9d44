mod batch;
mod buffer;
mod config;
mod dispatcher;
mod handler;
mod keepalive;
mod metrics;
mod schema;

use std::sync::Arc;
use std::time::Duration;

use dotenv::dotenv;
use serenity::prelude::*;
use tracing::{error, info};

use crate::buffer::MessageStore;
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::handler::Handler;
use crate::metrics::MetricsRegistry;

const SWEEP_INTERVAL_SECONDS: u64 = 60;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let cfg = Config::from_env();
    let store = MessageStore::new();
    let metrics_registry = Arc::new(MetricsRegistry::new());
    let dispatcher = Arc::new(Dispatcher::new(&cfg));

    tokio::spawn(keepalive::run(
        store.clone(),
        metrics_registry.clone(),
        cfg.port,
    ));

    // Retention sweeper: evicts messages older than the context window.
    {
        let store = store.clone();
        let window = cfg.context_window();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECONDS));
            ticker.tick().await; // the first tick completes immediately
            loop {
                ticker.tick().await;
                store.sweep(chrono::Utc::now(), window).await;
            }
        });
    }

    // Dispatch loop: flushes unchecked messages to the moderation service.
    {
        let store = store.clone();
        let dispatcher = dispatcher.clone();
        let interval = cfg.check_interval_seconds;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                dispatcher.flush(&store).await;
            }
        });
    }

    let intents =
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT;
    let mut client = Client::builder(&cfg.discord_token, intents)
        .event_handler(Handler {
            store: store.clone(),
        })
        .await?;

    // On Ctrl-C: one best-effort final flush of pending messages, then
    // shut the shards down. The flush outcome is not awaited past exit.
    {
        let store = store.clone();
        let dispatcher = dispatcher.clone();
        let shard_manager = client.shard_manager.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!(error = %err, "Failed to listen for shutdown signal");
                return;
            }
            info!("Shutting down, flushing pending messages");
            dispatcher.flush(&store).await;
            shard_manager.shutdown_all().await;
        });
    }

    info!("Starting bot...");
    if let Err(err) = client.start().await {
        error!(error = %err, "Discord client error");
        return Err(err.into());
    }

    Ok(())
}
