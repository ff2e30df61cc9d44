use std::collections::{HashMap, HashSet};

use crate::schema::{BatchRequest, BufferedMessage};

/// One tick's payload for a single guild, together with the buffer ids of
/// the messages sent as new so the dispatcher can mark them after the
/// moderation service acknowledges the batch.
#[derive(Debug, Clone)]
pub struct GuildBatch {
    pub new_ids: Vec<String>,
    pub payload: BatchRequest,
}

/// Groups unchecked messages by guild. A channel with no unchecked messages
/// contributes nothing; a qualifying channel contributes its unchecked
/// messages as new and its entire live sequence as context. Context is
/// deduplicated by message id, keeping the first occurrence.
pub fn compose(channels: &HashMap<String, Vec<BufferedMessage>>) -> HashMap<String, GuildBatch> {
    let mut groups: HashMap<&str, (Vec<&BufferedMessage>, Vec<&BufferedMessage>)> = HashMap::new();

    for buffer in channels.values() {
        let unchecked: Vec<&BufferedMessage> = buffer.iter().filter(|m| !m.checked).collect();
        if unchecked.is_empty() {
            continue;
        }
        // All messages in one channel share a guild, so the first one
        // resolves the group.
        let guild_id = match buffer.first() {
            Some(m) => m.guild_id.as_str(),
            None => continue,
        };

        let (new_refs, context_refs) = groups.entry(guild_id).or_default();
        new_refs.extend(unchecked);
        context_refs.extend(buffer.iter());
    }

    let mut batches = HashMap::new();
    for (guild_id, (new_refs, context_refs)) in groups {
        let mut seen = HashSet::new();
        let context_messages = context_refs
            .iter()
            .filter(|m| seen.insert(m.id.as_str()))
            .map(|m| m.to_context_message())
            .collect();

        batches.insert(
            guild_id.to_string(),
            GuildBatch {
                new_ids: new_refs.iter().map(|m| m.id.clone()).collect(),
                payload: BatchRequest {
                    guild_id: guild_id.to_string(),
                    new_messages: new_refs.iter().map(|m| m.to_new_message()).collect(),
                    context_messages,
                },
            },
        );
    }
    batches
}
