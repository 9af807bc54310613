use tracing::{debug, warn};

use twilight_model::gateway::payload::incoming::{RoleCreate, RoleDelete, RoleUpdate};

use crate::events::ShardContext;

pub fn on_role_create(create: RoleCreate, context: &ShardContext) {
    if let Some((role, _)) = context.cache.insert_role(&create.guild_id, &create.role) {
        if let Some(guild) = context.cache.get_guild(&create.guild_id) {
            context.events.role_create(&guild, &role);
        }
    }
}

pub fn on_role_update(update: RoleUpdate, context: &ShardContext) {
    match context.cache.insert_role(&update.guild_id, &update.role) {
        Some((new, Some(old))) => {
            if let Some(guild) = context.cache.get_guild(&update.guild_id) {
                context.events.role_update(&guild, &new, &old);
            }
        }
        // stored anyway, there is just no old state to compare against
        Some((new, None)) => debug!("Got an update for uncached role {} in guild {}", new.id, update.guild_id),
        None => {}
    }
}

pub fn on_role_delete(delete: RoleDelete, context: &ShardContext) {
    let Some(guild) = context.cache.get_guild(&delete.guild_id) else {
        warn!("Got a role delete for uncached guild {}", delete.guild_id);
        return;
    };
    if let Some(role) = context.cache.remove_role(&delete.guild_id, &delete.role_id) {
        context.events.role_delete(&guild, &role);
    } else {
        debug!("Role {} was deleted from guild {} but never cached", delete.role_id, delete.guild_id);
    }
}
