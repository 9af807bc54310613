use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, trace};
use twilight_model::guild::{Emoji as TwilightEmoji, Guild as TwilightGuild, PartialGuild, Permissions, Role as TwilightRole};
use twilight_model::util::ImageHash;

use crate::cache::{Cache, Channel, Emoji, Member, Role, VoiceState};
use crate::util::markers::{ChannelId, EmojiId, GuildId, RoleId, UserId};

pub struct Guild {
    pub id: GuildId,
    pub name: String,
    pub icon: Option<ImageHash>,
    pub owner_id: UserId,
    pub description: Option<String>,
    pub preferred_locale: String,
    member_count: AtomicU64,
    roles: RwLock<HashMap<RoleId, Arc<Role>>>,
    emoji: RwLock<HashMap<EmojiId, Arc<Emoji>>>,
    // the channels themselves live in the cache wide channel index
    channels: Arc<RwLock<HashSet<ChannelId>>>,
    members: Arc<RwLock<HashMap<UserId, Arc<Member>>>>,
    voice_states: Arc<RwLock<HashMap<UserId, Arc<VoiceState>>>>,
    unavailable_since: RwLock<Option<DateTime<Utc>>>,
}

impl Guild {
    /// Build the guild shell, members are added by the cache afterwards since they need the
    /// shared user index.
    pub fn from_guild(guild: &TwilightGuild) -> Self {
        Guild {
            id: guild.id,
            name: guild.name.clone(),
            icon: guild.icon,
            owner_id: guild.owner_id,
            description: guild.description.clone(),
            preferred_locale: guild.preferred_locale.clone(),
            member_count: AtomicU64::new(guild.member_count.unwrap_or_default()),
            roles: RwLock::new(convert_roles(&guild.roles)),
            emoji: RwLock::new(convert_emoji(&guild.emojis)),
            channels: Arc::new(RwLock::new(guild.channels.iter().map(|channel| channel.id).collect())),
            members: Default::default(),
            voice_states: Arc::new(RwLock::new(
                guild
                    .voice_states
                    .iter()
                    .map(|state| (state.user_id, Arc::new(VoiceState::from_voice_state(state))))
                    .collect(),
            )),
            unavailable_since: RwLock::new(None),
        }
    }

    /// Carry the members, channels and voice states over to the updated guild. Roles and emoji
    /// come with every update so those get replaced.
    pub fn update(old: &Arc<Guild>, new: &PartialGuild) -> Self {
        Guild {
            id: old.id,
            name: new.name.clone(),
            icon: new.icon,
            owner_id: new.owner_id,
            description: new.description.clone(),
            preferred_locale: new.preferred_locale.clone(),
            member_count: AtomicU64::new(old.member_count()),
            roles: RwLock::new(convert_roles(&new.roles)),
            emoji: RwLock::new(convert_emoji(&new.emojis)),
            channels: old.channels.clone(),
            members: old.members.clone(),
            voice_states: old.voice_states.clone(),
            unavailable_since: RwLock::new(old.unavailable_since()),
        }
    }

    pub fn member_count(&self) -> u64 {
        self.member_count.load(Ordering::SeqCst)
    }

    pub fn increment_member_count(&self) -> u64 {
        self.member_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn decrement_member_count(&self) -> u64 {
        self.member_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| Some(count.saturating_sub(1)))
            .unwrap_or_default()
            .saturating_sub(1)
    }

    pub fn unavailable_since(&self) -> Option<DateTime<Utc>> {
        *self.unavailable_since.read()
    }

    pub fn is_unavailable(&self) -> bool {
        self.unavailable_since.read().is_some()
    }

    fn mark_unavailable(&self, since: DateTime<Utc>) {
        *self.unavailable_since.write() = Some(since);
    }

    pub fn insert_role(&self, role: Arc<Role>) -> Option<Arc<Role>> {
        self.roles.write().insert(role.id, role)
    }

    pub fn remove_role(&self, role_id: &RoleId) -> Option<Arc<Role>> {
        self.roles.write().remove(role_id)
    }

    pub fn get_role(&self, role_id: &RoleId) -> Option<Arc<Role>> {
        self.roles.read().get(role_id).cloned()
    }

    pub fn roles(&self) -> Vec<Arc<Role>> {
        let mut roles: Vec<_> = self.roles.read().values().cloned().collect();
        roles.sort_by_key(|role| (role.position, role.id));
        roles
    }

    pub fn emoji(&self) -> Vec<Arc<Emoji>> {
        self.emoji.read().values().cloned().collect()
    }

    /// Swap out all emoji, returns the old ones.
    pub fn replace_emoji(&self, emoji: &[TwilightEmoji]) -> Vec<Arc<Emoji>> {
        let old = std::mem::replace(&mut *self.emoji.write(), convert_emoji(emoji));
        old.into_values().collect()
    }

    pub fn insert_channel(&self, channel_id: ChannelId) -> bool {
        self.channels.write().insert(channel_id)
    }

    pub fn remove_channel(&self, channel_id: &ChannelId) -> bool {
        self.channels.write().remove(channel_id)
    }

    pub fn channel_ids(&self) -> HashSet<ChannelId> {
        self.channels.read().clone()
    }

    pub fn insert_member(&self, user_id: UserId, member: Arc<Member>) -> Option<Arc<Member>> {
        // mutual guild counts are handled by the cache, this could be a member update as well
        self.members.write().insert(user_id, member)
    }

    pub fn remove_member(&self, user_id: &UserId) -> Option<Arc<Member>> {
        self.members.write().remove(user_id)
    }

    pub fn get_member(&self, user_id: &UserId) -> Option<Arc<Member>> {
        self.members.read().get(user_id).cloned()
    }

    pub fn members(&self) -> Vec<Arc<Member>> {
        self.members.read().values().cloned().collect()
    }

    pub fn cached_member_count(&self) -> usize {
        self.members.read().len()
    }

    pub fn get_voice_state(&self, user_id: &UserId) -> Option<Arc<VoiceState>> {
        self.voice_states.read().get(user_id).cloned()
    }

    /// Store the latest voice state of a user, returns the previous one.
    pub fn set_voice_state(&self, state: Arc<VoiceState>) -> Option<Arc<VoiceState>> {
        self.voice_states.write().insert(state.user_id, state)
    }

    /// Guild level permissions for a user with the given roles. Channel overwrites are not taken
    /// into account.
    pub fn permissions_for(&self, user_id: UserId, member_roles: &[RoleId]) -> Permissions {
        if user_id == self.owner_id {
            return Permissions::all();
        }

        let roles = self.roles.read();
        // the @everyone role shares its id with the guild
        let everyone: RoleId = self.id.cast();
        let mut permissions = roles
            .get(&everyone)
            .map(|role| role.permissions)
            .unwrap_or_else(Permissions::empty);
        for role_id in member_roles {
            if let Some(role) = roles.get(role_id) {
                permissions |= role.permissions;
            }
        }

        if permissions.contains(Permissions::ADMINISTRATOR) {
            Permissions::all()
        } else {
            permissions
        }
    }
}

fn convert_emoji(twilight_emoji: &[TwilightEmoji]) -> HashMap<EmojiId, Arc<Emoji>> {
    let mut emojis = HashMap::with_capacity(twilight_emoji.len());
    for emoji in twilight_emoji {
        emojis.insert(emoji.id, Arc::new(Emoji::from_emoji(emoji)));
    }
    emojis
}

fn convert_roles(twilight_roles: &[TwilightRole]) -> HashMap<RoleId, Arc<Role>> {
    let mut roles = HashMap::with_capacity(twilight_roles.len());
    for role in twilight_roles {
        roles.insert(role.id, Arc::new(Role::from_role(role)));
    }
    roles
}

impl Cache {
    /// Build and store a guild from a full GUILD_CREATE, replacing whatever was cached for it.
    pub fn create_guild(&self, twilight_guild: TwilightGuild) -> Arc<Guild> {
        trace!("Inserting guild {} into the cache", twilight_guild.id);
        let guild = Arc::new(Guild::from_guild(&twilight_guild));

        let old = self.guilds.write().remove(&guild.id);
        if let Some(old) = old {
            // One already existed, cleanup the user and channel index
            self.cleanup_guild(&old);
        }

        {
            let mut channels = self.channels.write();
            for channel in &twilight_guild.channels {
                channels.insert(channel.id, Arc::new(Channel::from_channel(channel, Some(guild.id))));
            }
        }

        for member in &twilight_guild.members {
            self.store_member(&guild, member);
        }

        self.guilds.write().insert(guild.id, guild.clone());
        guild
    }

    /// Apply a GUILD_UPDATE, returns the old and the new guild if it was cached.
    pub fn update_guild(&self, update: &PartialGuild) -> Option<(Arc<Guild>, Arc<Guild>)> {
        let mut guilds = self.guilds.write();
        let old = guilds.get(&update.id)?.clone();

        // migrate the channels, members and voice states
        let new = Arc::new(Guild::update(&old, update));
        guilds.insert(update.id, new.clone());
        Some((old, new))
    }

    /// Evict a guild and all of its channels.
    pub fn remove_guild(&self, guild_id: &GuildId) -> Option<Arc<Guild>> {
        let old = self.guilds.write().remove(guild_id);
        if let Some(guild) = &old {
            self.cleanup_guild(guild);
        }
        self.unavailable_guilds.write().remove(guild_id);
        old
    }

    /// Flag a guild as unavailable without touching any of its cached state.
    pub fn mark_unavailable(&self, guild_id: GuildId) -> DateTime<Utc> {
        let now = Utc::now();
        self.unavailable_guilds.write().insert(guild_id, now);
        if let Some(guild) = self.get_guild(&guild_id) {
            guild.mark_unavailable(now);
        }
        now
    }

    /// Clear the unavailable marker, returning when the guild went unavailable if it was marked.
    pub fn clear_unavailable(&self, guild_id: &GuildId) -> Option<DateTime<Utc>> {
        self.unavailable_guilds.write().remove(guild_id)
    }

    pub fn is_unavailable(&self, guild_id: &GuildId) -> bool {
        self.unavailable_guilds.read().contains_key(guild_id)
    }

    pub fn unavailable_guilds(&self) -> Vec<GuildId> {
        self.unavailable_guilds.read().keys().copied().collect()
    }

    /// Release the users and channels referenced by a guild that is leaving the cache.
    fn cleanup_guild(&self, guild: &Guild) {
        let members = guild.members();
        if !members.is_empty() {
            let before = self.users.read().len();
            for member in &members {
                self.release_user(&member.user());
            }
            debug!(
                "Purged {} users from cache after removing guild {}",
                before.saturating_sub(self.users.read().len()),
                guild.id
            );
        }

        let mut channels = self.channels.write();
        for channel_id in guild.channels.read().iter() {
            channels.remove(channel_id);
        }
    }

    pub fn get_guild(&self, guild_id: &GuildId) -> Option<Arc<Guild>> {
        self.guilds.read().get(guild_id).cloned()
    }

    pub fn guild_ids(&self) -> Vec<GuildId> {
        self.guilds.read().keys().copied().collect()
    }

    pub fn for_each_guild(&self, mut todo: impl FnMut(&GuildId, &Arc<Guild>)) {
        for (guild_id, guild) in self.guilds.read().iter() {
            todo(guild_id, guild);
        }
    }
}
