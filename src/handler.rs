use chrono::Utc;
use serenity::{
    async_trait,
    model::{channel::Message, gateway::Ready},
    prelude::*,
};
use tracing::{debug, info};

use crate::buffer::MessageStore;
use crate::schema::BufferedMessage;

/// Ingest boundary: turns Discord message events into buffered records.
pub struct Handler {
    pub store: MessageStore,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);
        info!(guilds = ready.guilds.len(), "Serving guilds");
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        // Bot traffic and DMs never reach the buffer.
        if msg.author.bot {
            return;
        }
        let Some(guild_id) = msg.guild_id else {
            return;
        };

        let record = BufferedMessage {
            id: msg.id.to_string(),
            author: msg.author.name.clone(),
            user_id: msg.author.id.to_string(),
            content: msg.content.clone(),
            channel_id: msg.channel_id.to_string(),
            guild_id: guild_id.to_string(),
            timestamp: Utc::now(),
            checked: false,
        };

        debug!(
            guild_id = %record.guild_id,
            channel_id = %record.channel_id,
            author = %record.author,
            "Buffered message"
        );
        self.store.append(record).await;
    }
}
