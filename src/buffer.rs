use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::batch::{compose, GuildBatch};
use crate::metrics::{BUFFERED_MESSAGES, MESSAGES_BUFFERED, MESSAGES_EVICTED};
use crate::schema::BufferedMessage;

/// Rolling per-channel message buffers. The store is the only shared
/// mutable state in the process; every task holds a clone of the handle and
/// goes through these operations.
#[derive(Clone)]
pub struct MessageStore {
    channels: Arc<Mutex<HashMap<String, Vec<BufferedMessage>>>>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Appends a message to its channel's buffer, creating the buffer on
    /// first sight. One channel belongs to exactly one guild; a message
    /// claiming a different guild than the buffered ones is dropped.
    pub async fn append(&self, message: BufferedMessage) {
        let mut channels = self.channels.lock().await;
        let buffer = channels.entry(message.channel_id.clone()).or_default();

        if let Some(first) = buffer.first() {
            if first.guild_id != message.guild_id {
                warn!(
                    channel_id = %message.channel_id,
                    expected = %first.guild_id,
                    got = %message.guild_id,
                    "Dropping message with mismatched guild for channel"
                );
                return;
            }
        }

        buffer.push(message);
        MESSAGES_BUFFERED.inc();
        BUFFERED_MESSAGES.set(channels.values().map(Vec::len).sum::<usize>() as f64);
    }

    /// Evicts every message older than the context window, in place,
    /// keeping the remaining messages in insertion order. Eviction ignores
    /// the checked flag: a checked message is still context until it ages
    /// out, and an unchecked one does not outlive the window.
    pub async fn sweep(&self, now: DateTime<Utc>, window: Duration) {
        let cutoff = now - window;
        let mut channels = self.channels.lock().await;

        let mut evicted = 0;
        for buffer in channels.values_mut() {
            let before = buffer.len();
            buffer.retain(|m| m.timestamp > cutoff);
            evicted += before - buffer.len();
        }

        if evicted > 0 {
            debug!(evicted, "Evicted messages older than the context window");
            MESSAGES_EVICTED.inc_by(evicted as f64);
        }
        BUFFERED_MESSAGES.set(channels.values().map(Vec::len).sum::<usize>() as f64);
    }

    /// Snapshot of this tick's per-guild batches. The snapshot copies the
    /// payload data, so the dispatcher can hold it across its network call
    /// without keeping the store locked.
    pub async fn compose_batches(&self) -> HashMap<String, GuildBatch> {
        let channels = self.channels.lock().await;
        compose(&channels)
    }

    /// Marks the given messages as checked, by identity, on the buffered
    /// messages themselves. Messages evicted between composition and
    /// acknowledgement are simply gone and skipped.
    pub async fn mark_checked(&self, ids: &[String]) {
        let ids: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut channels = self.channels.lock().await;
        for buffer in channels.values_mut() {
            for message in buffer.iter_mut() {
                if ids.contains(message.id.as_str()) {
                    message.checked = true;
                }
            }
        }
    }

    /// Aggregate count across all channels, for the keep-alive diagnostic.
    pub async fn total_buffered(&self) -> usize {
        let channels = self.channels.lock().await;
        channels.values().map(Vec::len).sum()
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}
