use std::sync::Arc;

use tracing::trace;
use twilight_model::channel::Channel as TwilightChannel;

use crate::cache::Cache;
use crate::util::markers::{ChannelId, GuildId};

pub struct Channel {
    pub id: ChannelId,
    pub guild_id: Option<GuildId>,
    // raw channel type as sent by the gateway
    pub kind: u8,
    pub name: Option<String>,
    pub position: i64,
    pub parent_id: Option<ChannelId>,
    pub topic: Option<String>,
    pub nsfw: bool,
}

impl Channel {
    pub fn from_channel(channel: &TwilightChannel, guild_id: Option<GuildId>) -> Self {
        Channel {
            id: channel.id,
            guild_id: channel.guild_id.or(guild_id),
            kind: channel.kind.into(),
            name: channel.name.clone(),
            position: channel.position.map(i64::from).unwrap_or_default(),
            parent_id: channel.parent_id,
            topic: channel.topic.clone(),
            nsfw: channel.nsfw.unwrap_or_default(),
        }
    }
}

impl Cache {
    pub fn get_channel(&self, channel_id: &ChannelId) -> Option<Arc<Channel>> {
        self.channels.read().get(channel_id).cloned()
    }

    /// Store a channel in the index and register it with its guild. Returns the new channel and
    /// the one it replaced.
    pub fn insert_channel(&self, channel: &TwilightChannel) -> (Arc<Channel>, Option<Arc<Channel>>) {
        let channel = Arc::new(Channel::from_channel(channel, None));
        if let Some(guild) = channel.guild_id.and_then(|guild_id| self.get_guild(&guild_id)) {
            guild.insert_channel(channel.id);
        }
        trace!("Caching channel {}", channel.id);
        let old = self.channels.write().insert(channel.id, channel.clone());
        (channel, old)
    }

    pub fn remove_channel(&self, channel_id: &ChannelId) -> Option<Arc<Channel>> {
        let old = self.channels.write().remove(channel_id);
        if let Some(guild) = old
            .as_ref()
            .and_then(|channel| channel.guild_id)
            .and_then(|guild_id| self.get_guild(&guild_id))
        {
            guild.remove_channel(channel_id);
        }
        old
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::cache::test_util;

    fn raw(id: u64, guild_id: u64, name: &str) -> TwilightChannel {
        serde_json::from_value(json!({"id": id.to_string(), "guild_id": guild_id.to_string(), "type": 0, "name": name}))
            .unwrap()
    }

    #[test]
    fn channels_register_with_their_guild() {
        let cache = Cache::default();
        let guild = cache.create_guild(test_util::guild(vec![]));

        let (channel, old) = cache.insert_channel(&raw(32, 10, "memes"));
        assert!(old.is_none());
        assert_eq!(channel.guild_id, Some(guild.id));
        assert!(guild.channel_ids().contains(&ChannelId::new(32)));

        let (_, old) = cache.insert_channel(&raw(32, 10, "dank-memes"));
        assert_eq!(old.unwrap().name.as_deref(), Some("memes"));

        cache.remove_channel(&ChannelId::new(32));
        assert!(!guild.channel_ids().contains(&ChannelId::new(32)));
        assert!(cache.get_channel(&ChannelId::new(32)).is_none());
    }
}
