use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::util::markers::{ChannelId, GuildId, UserId};

pub mod channel;
pub mod emoji;
pub mod guild;
pub mod member;
pub mod message;
pub mod role;
pub mod user;
pub mod voice_state;

pub use channel::Channel;
pub use emoji::Emoji;
pub use guild::Guild;
pub use member::{Member, RemovedMember};
pub use message::{Message, MessageCache, Reaction};
pub use role::Role;
pub use user::User;
pub use voice_state::{VoiceState, VoiceTransition};

pub const DEFAULT_MESSAGE_CACHE_SIZE: usize = 1000;

/// Everything one shard knows about. The shard's receive loop is the only writer, other tasks
/// are free to read through the shared `Arc`.
pub struct Cache {
    guilds: RwLock<HashMap<GuildId, Arc<Guild>>>,
    unavailable_guilds: RwLock<HashMap<GuildId, DateTime<Utc>>>,
    channels: RwLock<HashMap<ChannelId, Arc<Channel>>>,

    users: RwLock<HashMap<UserId, Arc<User>>>,
    current_user: RwLock<Option<Arc<User>>>,

    messages: MessageCache,
}

impl Cache {
    pub fn new(message_cache_size: usize) -> Self {
        Cache {
            guilds: Default::default(),
            unavailable_guilds: Default::default(),
            channels: Default::default(),
            users: Default::default(),
            current_user: Default::default(),
            messages: MessageCache::new(message_cache_size),
        }
    }

    pub fn stats(&self) -> CacheStats {
        let guilds = self.guilds.read();
        CacheStats {
            guilds: guilds.len(),
            unavailable_guilds: self.unavailable_guilds.read().len(),
            channels: self.channels.read().len(),
            members: guilds.values().map(|guild| guild.cached_member_count()).sum(),
            users: self.users.read().len(),
            messages: self.messages.len(),
        }
    }
}

impl Default for Cache {
    fn default() -> Self {
        Cache::new(DEFAULT_MESSAGE_CACHE_SIZE)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub guilds: usize,
    pub unavailable_guilds: usize,
    pub channels: usize,
    pub members: usize,
    pub users: usize,
    pub messages: usize,
}
