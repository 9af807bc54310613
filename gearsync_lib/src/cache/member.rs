use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;
use twilight_model::gateway::payload::incoming::MemberUpdate;
use twilight_model::guild::{Member as TwilightMember, Permissions};
use twilight_model::user::User as TwilightUser;
use twilight_model::util::Timestamp;

use crate::cache::{Cache, Guild, User};
use crate::util::markers::{GuildId, RoleId, UserId};

pub struct Member {
    pub guild_id: GuildId,
    user: RwLock<Arc<User>>,
    pub nickname: Option<String>,
    pub roles: Vec<RoleId>,
    pub joined_at: Timestamp,
    pub premium_since: Option<Timestamp>,
    pub communication_disabled_until: Option<Timestamp>,
    pub deaf: bool,
    pub mute: bool,
    pub pending: bool,
    // guild level permissions at the time this member was stored
    pub permissions: Permissions,
}

impl Member {
    pub fn from_member(guild_id: GuildId, member: &TwilightMember, user: Arc<User>, permissions: Permissions) -> Self {
        Member {
            guild_id,
            user: RwLock::new(user),
            nickname: member.nick.clone(),
            roles: member.roles.clone(),
            joined_at: member.joined_at,
            premium_since: member.premium_since,
            communication_disabled_until: member.communication_disabled_until,
            deaf: member.deaf,
            mute: member.mute,
            pending: member.pending,
            permissions,
        }
    }

    /// Lay an update over the cached member. Voice flags the update leaves out fall back to what
    /// we knew before.
    pub fn merge_update(old: Option<&Member>, update: &MemberUpdate, user: Arc<User>, permissions: Permissions) -> Self {
        Member {
            guild_id: update.guild_id,
            user: RwLock::new(user),
            nickname: update.nick.clone(),
            roles: update.roles.clone(),
            joined_at: update.joined_at,
            premium_since: update.premium_since,
            communication_disabled_until: update.communication_disabled_until,
            deaf: update.deaf.or_else(|| old.map(|member| member.deaf)).unwrap_or_default(),
            mute: update.mute.or_else(|| old.map(|member| member.mute)).unwrap_or_default(),
            pending: update.pending,
            permissions,
        }
    }

    pub fn user(&self) -> Arc<User> {
        self.user.read().clone()
    }

    pub fn user_id(&self) -> UserId {
        self.user.read().id
    }

    pub fn set_user(&self, user: Arc<User>) {
        *self.user.write() = user
    }

    //helper to avoid cloning a user arc just to modify the mutual guilds count
    pub fn add_mutual_guild(&self) -> u32 {
        self.user.read().mutual_guilds.fetch_add(1, Ordering::SeqCst)
    }

    pub fn has_role(&self, role_id: &RoleId) -> bool {
        self.roles.contains(role_id)
    }
}

/// Who left a guild. Members we never cached only leave their user behind.
pub enum RemovedMember {
    Cached(Arc<Member>),
    Uncached(Arc<User>),
}

impl RemovedMember {
    pub fn user(&self) -> Arc<User> {
        match self {
            RemovedMember::Cached(member) => member.user(),
            RemovedMember::Uncached(user) => user.clone(),
        }
    }

    pub fn member(&self) -> Option<&Arc<Member>> {
        match self {
            RemovedMember::Cached(member) => Some(member),
            RemovedMember::Uncached(_) => None,
        }
    }
}

impl Cache {
    pub(super) fn store_member(&self, guild: &Guild, member: &TwilightMember) -> Arc<Member> {
        let user = self.resolve_user(&member.user);
        let permissions = guild.permissions_for(user.id, &member.roles);
        let member = Arc::new(Member::from_member(guild.id, member, user, permissions));
        if guild.insert_member(member.user_id(), member.clone()).is_none() {
            member.add_mutual_guild();
        }
        member
    }

    pub fn get_member(&self, guild_id: &GuildId, user_id: &UserId) -> Option<Arc<Member>> {
        self.get_guild(guild_id)?.get_member(user_id)
    }

    /// A member joined, this also bumps the guild member count.
    pub fn add_member(&self, guild_id: &GuildId, member: &TwilightMember) -> Option<Arc<Member>> {
        let Some(guild) = self.get_guild(guild_id) else {
            warn!("Got a member add for uncached guild {}", guild_id);
            return None;
        };
        guild.increment_member_count();
        Some(self.store_member(&guild, member))
    }

    /// Store a batch of requested members. These are already part of the guild member count.
    pub fn chunk_members(&self, guild_id: &GuildId, members: &[TwilightMember]) -> Option<Vec<Arc<Member>>> {
        let Some(guild) = self.get_guild(guild_id) else {
            warn!("Got a member chunk for uncached guild {}", guild_id);
            return None;
        };
        Some(members.iter().map(|member| self.store_member(&guild, member)).collect())
    }

    pub fn remove_member(&self, guild_id: &GuildId, user: &TwilightUser) -> Option<RemovedMember> {
        let Some(guild) = self.get_guild(guild_id) else {
            warn!("Got a member remove for uncached guild {}", guild_id);
            return None;
        };
        guild.decrement_member_count();

        match guild.remove_member(&user.id) {
            Some(member) => {
                self.release_user(&member.user());
                Some(RemovedMember::Cached(member))
            }
            None => Some(RemovedMember::Uncached(Arc::new(User::from_user(user)))),
        }
    }

    /// Merge a member update, returns the new member and the cached one it replaced.
    pub fn update_member(&self, update: &MemberUpdate) -> Option<(Arc<Member>, Option<Arc<Member>>)> {
        let Some(guild) = self.get_guild(&update.guild_id) else {
            warn!("Got a member update for uncached guild {}", update.guild_id);
            return None;
        };

        let old = guild.get_member(&update.user.id);
        let user = self.resolve_user(&update.user);
        let permissions = guild.permissions_for(user.id, &update.roles);
        let new = Arc::new(Member::merge_update(old.as_deref(), update, user, permissions));
        if guild.insert_member(update.user.id, new.clone()).is_none() {
            new.add_mutual_guild();
        }
        Some((new, old))
    }
}
