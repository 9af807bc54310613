use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tracing::trace;
use twilight_model::user::{CurrentUser, User as TwilightUser, UserFlags};
use twilight_model::util::ImageHash;

use crate::cache::Cache;
use crate::util::markers::UserId;

pub struct User {
    pub id: UserId,
    pub name: String,
    pub discriminator: u16,
    pub avatar: Option<ImageHash>,
    pub bot: bool,
    pub flags: UserFlags,

    // how many cached guilds have this user as member
    pub mutual_guilds: AtomicU32,
}

impl User {
    pub fn from_user(user: &TwilightUser) -> Self {
        User {
            id: user.id,
            name: user.name.clone(),
            discriminator: user.discriminator,
            avatar: user.avatar,
            bot: user.bot,
            flags: user.public_flags.unwrap_or_else(UserFlags::empty),
            mutual_guilds: AtomicU32::new(0),
        }
    }

    pub fn from_current_user(user: &CurrentUser) -> Self {
        User {
            id: user.id,
            name: user.name.clone(),
            discriminator: user.discriminator,
            avatar: user.avatar,
            bot: user.bot,
            flags: user.public_flags.unwrap_or_else(UserFlags::empty),
            mutual_guilds: AtomicU32::new(0),
        }
    }

    fn assemble(user: &TwilightUser, old: &User) -> Self {
        User {
            mutual_guilds: AtomicU32::new(old.mutual_guilds.load(Ordering::SeqCst)),
            ..User::from_user(user)
        }
    }

    // ids and bot flags don't change, only check what can
    pub fn is_updated(&self, user: &TwilightUser) -> bool {
        self.name != user.name
            || self.discriminator != user.discriminator
            || self.avatar != user.avatar
            || self.flags != user.public_flags.unwrap_or_else(UserFlags::empty)
    }

    pub fn mutual_guilds(&self) -> u32 {
        self.mutual_guilds.load(Ordering::SeqCst)
    }
}

impl Cache {
    pub fn get_user(&self, user_id: &UserId) -> Option<Arc<User>> {
        self.users.read().get(user_id).cloned()
    }

    pub fn current_user(&self) -> Option<Arc<User>> {
        self.current_user.read().clone()
    }

    pub fn current_user_id(&self) -> Option<UserId> {
        self.current_user.read().as_ref().map(|user| user.id)
    }

    /// Replace our own user, returns the previous one if there was one.
    pub fn set_current_user(&self, user: &CurrentUser) -> (Arc<User>, Option<Arc<User>>) {
        let new = Arc::new(User::from_current_user(user));
        let old = self.current_user.write().replace(new.clone());
        (new, old)
    }

    /// Get the shared user for a user payload. When the payload carries changes the cached
    /// user is swapped out everywhere it is referenced.
    pub(crate) fn resolve_user(&self, user: &TwilightUser) -> Arc<User> {
        let cached = self.get_user(&user.id);
        match cached {
            Some(cached) if !cached.is_updated(user) => cached,
            Some(cached) => {
                trace!("User {} changed, updating it in all guilds", user.id);
                let updated = Arc::new(User::assemble(user, &cached));
                self.users.write().insert(user.id, updated.clone());
                for guild in self.guilds.read().values() {
                    if let Some(member) = guild.get_member(&user.id) {
                        member.set_user(updated.clone());
                    }
                }
                updated
            }
            None => {
                let new = Arc::new(User::from_user(user));
                self.users.write().insert(user.id, new.clone());
                new
            }
        }
    }

    /// Purge a user that is no longer a member of any cached guild.
    pub(crate) fn release_user(&self, user: &User) {
        let remaining = user
            .mutual_guilds
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| Some(count.saturating_sub(1)))
            .unwrap_or_default()
            .saturating_sub(1);
        if remaining == 0 {
            self.users.write().remove(&user.id);
        }
    }
}
