use tracing::{debug, info, trace, warn};
use twilight_model::gateway::payload::incoming::{BanAdd, BanRemove, GuildDelete, GuildEmojisUpdate, GuildUpdate};

use crate::events::payload::GuildCreate;
use crate::events::ShardContext;

pub fn on_guild_create(create: GuildCreate, context: &ShardContext) {
    let guild = match create {
        GuildCreate::Available(guild) => *guild,
        GuildCreate::Unavailable(stub) if stub.unavailable => {
            // still in an outage, nothing to build yet
            debug!("Guild {} is still unavailable on shard {}", stub.id, context.shard_id);
            context.cache.mark_unavailable(stub.id);
            return;
        }
        GuildCreate::Unavailable(stub) => {
            warn!("Ignoring a guild stub for {} that isn't flagged unavailable", stub.id);
            return;
        }
    };

    let unavailable_since = context.cache.clear_unavailable(&guild.id);
    let guild = context.cache.create_guild(guild);

    match unavailable_since {
        Some(since) => {
            info!("Guild {} is available again on shard {}", guild.id, context.shard_id);
            context.events.guild_available(context.shard_id, &guild, since);
        }
        None => {
            trace!("Guild {} created on shard {}", guild.id, context.shard_id);
            context.events.guild_create(context.shard_id, &guild);
        }
    }
}

pub fn on_guild_update(update: GuildUpdate, context: &ShardContext) {
    if let Some((old, new)) = context.cache.update_guild(&update) {
        trace!("Updated guild {}", update.id);
        context.events.guild_update(&new, &old);
    } else {
        warn!("Received a guild update for a guild that wasn't cached: {}", update.id);
    }
}

pub fn on_guild_delete(event: GuildDelete, context: &ShardContext) {
    if event.unavailable {
        info!("Guild {} became unavailable", event.id);
        context.cache.mark_unavailable(event.id);
        context.events.guild_unavailable(context.shard_id, event.id);
    } else {
        let old = context.cache.remove_guild(&event.id);
        if old.is_some() {
            info!("Removed from guild {}", event.id);
        } else {
            warn!("Received a guild delete event for a server that wasn't cached: {}", event.id);
        }
        context.events.guild_delete(context.shard_id, event.id, old.as_ref());
    }
}

pub fn on_ban_add(ban: BanAdd, context: &ShardContext) {
    if let Some(guild) = context.cache.get_guild(&ban.guild_id) {
        context.events.guild_ban_add(&guild, &ban.user);
    } else {
        warn!("Got a ban for user {} in uncached guild {}", ban.user.id, ban.guild_id);
    }
}

pub fn on_ban_remove(ban: BanRemove, context: &ShardContext) {
    if let Some(guild) = context.cache.get_guild(&ban.guild_id) {
        context.events.guild_ban_remove(&guild, &ban.user);
    } else {
        warn!("Got an unban for user {} in uncached guild {}", ban.user.id, ban.guild_id);
    }
}

pub fn on_emojis_update(update: GuildEmojisUpdate, context: &ShardContext) {
    if let Some(update) = context.cache.replace_emoji(&update.guild_id, &update.emojis) {
        context.events.guild_emojis_update(&update.guild, &update.new, &update.old);
    }
}
