use std::sync::Arc;

use tracing::{debug, trace};
use twilight_model::gateway::payload::incoming::{ChannelCreate, ChannelDelete, ChannelUpdate};

use crate::cache::Channel;
use crate::events::ShardContext;

pub fn on_channel_create(channel: ChannelCreate, context: &ShardContext) {
    trace!("Channel {} created", channel.id);
    let (channel, _) = context.cache.insert_channel(&channel);
    context.events.channel_create(&channel);
}

pub fn on_channel_update(channel: ChannelUpdate, context: &ShardContext) {
    let (new, old) = context.cache.insert_channel(&channel);
    context.events.channel_update(&new, old.as_ref());
}

pub fn on_channel_delete(channel: ChannelDelete, context: &ShardContext) {
    let removed = context.cache.remove_channel(&channel.id).unwrap_or_else(|| {
        debug!("Deleted channel {} wasn't cached, using the payload", channel.id);
        Arc::new(Channel::from_channel(&channel, None))
    });
    context.events.channel_delete(&removed);
}
