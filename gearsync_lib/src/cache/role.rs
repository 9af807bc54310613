use std::sync::Arc;

use tracing::warn;
use twilight_model::guild::{Permissions, Role as TwilightRole};

use crate::cache::Cache;
use crate::util::markers::{GuildId, RoleId};

pub struct Role {
    // cache role id as well since we need it for role ordering
    pub id: RoleId,
    pub name: String,
    pub color: u32,
    pub hoisted: bool,
    pub position: i64,
    pub permissions: Permissions,
    pub managed: bool,
    pub mentionable: bool,
}

impl Role {
    pub fn from_role(role: &TwilightRole) -> Self {
        Role {
            id: role.id,
            name: role.name.clone(),
            color: role.color,
            hoisted: role.hoist,
            position: role.position,
            permissions: role.permissions,
            managed: role.managed,
            mentionable: role.mentionable,
        }
    }
}

impl Cache {
    /// Store a role, handing back the new role and the one it replaced.
    pub fn insert_role(&self, guild_id: &GuildId, role: &TwilightRole) -> Option<(Arc<Role>, Option<Arc<Role>>)> {
        if let Some(guild) = self.get_guild(guild_id) {
            let role = Arc::new(Role::from_role(role));
            let old = guild.insert_role(role.clone());
            Some((role, old))
        } else {
            warn!("Tried to add a role to an uncached guild: {}", guild_id);
            None
        }
    }

    pub fn remove_role(&self, guild_id: &GuildId, role_id: &RoleId) -> Option<Arc<Role>> {
        if let Some(guild) = self.get_guild(guild_id) {
            guild.remove_role(role_id)
        } else {
            warn!("Tried to remove a role from an uncached guild: {}", guild_id);
            None
        }
    }
}
