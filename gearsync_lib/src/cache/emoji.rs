use std::sync::Arc;

use tracing::warn;
use twilight_model::guild::Emoji as TwilightEmoji;

use crate::cache::{Cache, Guild};
use crate::util::markers::{EmojiId, GuildId, RoleId};

pub struct Emoji {
    pub id: EmojiId,
    pub name: String,
    pub roles: Vec<RoleId>,
    pub animated: bool,
    pub available: bool,
}

impl Emoji {
    pub fn from_emoji(emoji: &TwilightEmoji) -> Self {
        Emoji {
            id: emoji.id,
            name: emoji.name.clone(),
            roles: emoji.roles.clone(),
            animated: emoji.animated,
            available: emoji.available,
        }
    }
}

pub struct EmojiUpdate {
    pub guild: Arc<Guild>,
    pub new: Vec<Arc<Emoji>>,
    pub old: Vec<Arc<Emoji>>,
}

impl Cache {
    pub fn replace_emoji(&self, guild_id: &GuildId, emoji: &[TwilightEmoji]) -> Option<EmojiUpdate> {
        if let Some(guild) = self.get_guild(guild_id) {
            let old = guild.replace_emoji(emoji);
            let new = guild.emoji();
            Some(EmojiUpdate { guild, new, old })
        } else {
            warn!("Received emoji for uncached guild {}", guild_id);
            None
        }
    }
}
