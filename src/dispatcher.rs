use reqwest::Client;
use tracing::{error, info};

use crate::batch::GuildBatch;
use crate::buffer::MessageStore;
use crate::config::Config;
use crate::metrics::{DISPATCH_FAILURES, MESSAGES_CHECKED, VIOLATIONS_REPORTED};
use crate::schema::BatchResponse;

type DynErr = Box<dyn std::error::Error + Send + Sync>;

/// Sends composed batches to the moderation service and marks acknowledged
/// messages as checked.
pub struct Dispatcher {
    client: Client,
    endpoint: String,
    auth_key: String,
}

impl Dispatcher {
    pub fn new(cfg: &Config) -> Self {
        Self {
            client: Client::new(),
            endpoint: cfg.moderation_url.clone(),
            auth_key: cfg.auth_key.clone(),
        }
    }

    /// One dispatch tick: compose the per-guild batches and send each one
    /// independently. A failed guild is logged and left untouched, so its
    /// messages are recomposed next tick; other guilds proceed regardless.
    pub async fn flush(&self, store: &MessageStore) {
        let batches = store.compose_batches().await;
        if batches.is_empty() {
            return;
        }

        let mut total_checked = 0u64;
        for (guild_id, batch) in batches {
            match self.send_batch(&batch).await {
                Ok(result) => {
                    info!(
                        guild_id = %guild_id,
                        checked = result.checked,
                        violations = result.violations,
                        "Batch accepted by moderation service"
                    );
                    total_checked += result.checked;
                    MESSAGES_CHECKED.inc_by(result.checked as f64);
                    VIOLATIONS_REPORTED.inc_by(result.violations as f64);
                    // Only an acknowledged batch flips the flags, and it
                    // flips all of them at once.
                    store.mark_checked(&batch.new_ids).await;
                }
                Err(err) => {
                    error!(guild_id = %guild_id, error = %err, "Failed to dispatch batch");
                    DISPATCH_FAILURES.inc();
                }
            }
        }

        info!(total_checked, "Moderation check pass complete");
    }

    async fn send_batch(&self, batch: &GuildBatch) -> Result<BatchResponse, DynErr> {
        let res = self
            .client
            .post(format!("{}/batch", self.endpoint))
            .header("X-Bot-Auth", &self.auth_key)
            .json(&batch.payload)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(format!("moderation endpoint returned {}", res.status()).into());
        }

        Ok(res.json::<BatchResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::BufferedMessage;
    use chrono::{Duration, TimeZone, Utc};
    use warp::Filter;

    fn test_config(endpoint: String) -> Config {
        Config {
            discord_token: "test-token".into(),
            moderation_url: endpoint,
            auth_key: "test-key".into(),
            context_window_minutes: 10,
            check_interval_seconds: 60,
            port: 0,
        }
    }

    fn msg(id: &str, channel: &str, guild: &str, minute: i64) -> BufferedMessage {
        let base = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        BufferedMessage {
            id: id.into(),
            author: format!("user-{id}"),
            user_id: format!("uid-{id}"),
            content: format!("message {id}"),
            channel_id: channel.into(),
            guild_id: guild.into(),
            timestamp: base + Duration::minutes(minute),
            checked: false,
        }
    }

    async fn spawn_moderation_stub(status: u16, body: &'static str) -> String {
        let route = warp::path("batch")
            .and(warp::post())
            .map(move || {
                warp::reply::with_status(
                    warp::reply::with_header(body, "Content-Type", "application/json"),
                    warp::http::StatusCode::from_u16(status).unwrap(),
                )
            });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn successful_dispatch_marks_the_batch_checked() {
        let endpoint = spawn_moderation_stub(200, r#"{"checked": 2, "violations": 0}"#).await;
        let dispatcher = Dispatcher::new(&test_config(endpoint));

        let store = MessageStore::new();
        store.append(msg("a", "c1", "g", 0)).await;
        store.append(msg("b", "c1", "g", 2)).await;

        dispatcher.flush(&store).await;

        // Both acknowledged: nothing left to send, both still buffered.
        assert!(store.compose_batches().await.is_empty());
        assert_eq!(store.total_buffered().await, 2);
    }

    #[tokio::test]
    async fn rejected_dispatch_leaves_messages_pending() {
        let endpoint = spawn_moderation_stub(500, "internal error").await;
        let dispatcher = Dispatcher::new(&test_config(endpoint));

        let store = MessageStore::new();
        store.append(msg("a", "c1", "g", 0)).await;
        store.append(msg("b", "c1", "g", 2)).await;

        dispatcher.flush(&store).await;

        // Failure marks nothing: the next tick recomposes the same batch.
        let retry = store.compose_batches().await;
        assert_eq!(retry["g"].new_ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn failure_in_one_guild_does_not_block_another() {
        // The stub rejects one guild and accepts the other.
        let route = warp::path("batch")
            .and(warp::post())
            .and(warp::body::json())
            .map(|body: serde_json::Value| {
                if body["guild_id"] == "bad" {
                    warp::reply::with_status(
                        "internal error".to_string(),
                        warp::http::StatusCode::INTERNAL_SERVER_ERROR,
                    )
                } else {
                    warp::reply::with_status(
                        r#"{"checked": 1, "violations": 0}"#.to_string(),
                        warp::http::StatusCode::OK,
                    )
                }
            });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        let dispatcher = Dispatcher::new(&test_config(format!("http://{}", addr)));

        let store = MessageStore::new();
        store.append(msg("a", "c1", "bad", 0)).await;
        store.append(msg("b", "c2", "good", 0)).await;

        dispatcher.flush(&store).await;

        let retry = store.compose_batches().await;
        assert_eq!(retry.len(), 1);
        assert_eq!(retry["bad"].new_ids, vec!["a"]);
    }

    #[tokio::test]
    async fn transport_failure_leaves_messages_pending() {
        // Nothing listens here; the connection itself fails.
        let dispatcher = Dispatcher::new(&test_config("http://127.0.0.1:1".into()));

        let store = MessageStore::new();
        store.append(msg("a", "c1", "g", 0)).await;

        dispatcher.flush(&store).await;

        let retry = store.compose_batches().await;
        assert_eq!(retry["g"].new_ids, vec!["a"]);
    }
}
