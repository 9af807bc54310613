use twilight_model::id::marker::{ChannelMarker, EmojiMarker, GuildMarker, MessageMarker, RoleMarker, UserMarker};
use twilight_model::id::Id;

pub type ChannelId = Id<ChannelMarker>;
pub type EmojiId = Id<EmojiMarker>;
pub type GuildId = Id<GuildMarker>;
pub type MessageId = Id<MessageMarker>;
pub type RoleId = Id<RoleMarker>;
pub type UserId = Id<UserMarker>;
