use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cache::Cache;
use crate::util::error::DispatchError;

pub use handler::{EventEmitter, EventHandler, NoopHandler};

mod channel;
mod guild;
pub mod handler;
mod member;
mod message;
mod other;
pub mod payload;
mod role;
mod voice;

/// What a dispatch handler needs: the shard it runs on, that shard's cache and the callbacks.
#[derive(Clone)]
pub struct ShardContext {
    pub shard_id: u64,
    pub cache: Arc<Cache>,
    pub events: EventEmitter,
}

impl ShardContext {
    pub fn new(shard_id: u64, cache: Arc<Cache>, events: EventEmitter) -> Self {
        ShardContext { shard_id, cache, events }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchKind {
    Ready,
    Resumed,
    GuildCreate,
    GuildUpdate,
    GuildDelete,
    GuildBanAdd,
    GuildBanRemove,
    GuildEmojisUpdate,
    GuildMemberAdd,
    GuildMemberRemove,
    GuildMemberUpdate,
    GuildMembersChunk,
    GuildRoleCreate,
    GuildRoleUpdate,
    GuildRoleDelete,
    ChannelCreate,
    ChannelUpdate,
    ChannelDelete,
    MessageCreate,
    MessageUpdate,
    MessageDelete,
    MessageDeleteBulk,
    MessageReactionAdd,
    MessageReactionRemove,
    MessageReactionRemoveAll,
    MessageReactionRemoveEmoji,
    PresenceUpdate,
    TypingStart,
    UserUpdate,
    VoiceStateUpdate,
    WebhooksUpdate,
}

const DISPATCH_TABLE: &[(&str, DispatchKind)] = &[
    ("READY", DispatchKind::Ready),
    ("RESUMED", DispatchKind::Resumed),
    ("GUILD_CREATE", DispatchKind::GuildCreate),
    ("GUILD_UPDATE", DispatchKind::GuildUpdate),
    ("GUILD_DELETE", DispatchKind::GuildDelete),
    ("GUILD_BAN_ADD", DispatchKind::GuildBanAdd),
    ("GUILD_BAN_REMOVE", DispatchKind::GuildBanRemove),
    ("GUILD_EMOJIS_UPDATE", DispatchKind::GuildEmojisUpdate),
    ("GUILD_MEMBER_ADD", DispatchKind::GuildMemberAdd),
    ("GUILD_MEMBER_REMOVE", DispatchKind::GuildMemberRemove),
    ("GUILD_MEMBER_UPDATE", DispatchKind::GuildMemberUpdate),
    ("GUILD_MEMBERS_CHUNK", DispatchKind::GuildMembersChunk),
    ("GUILD_ROLE_CREATE", DispatchKind::GuildRoleCreate),
    ("GUILD_ROLE_UPDATE", DispatchKind::GuildRoleUpdate),
    ("GUILD_ROLE_DELETE", DispatchKind::GuildRoleDelete),
    ("CHANNEL_CREATE", DispatchKind::ChannelCreate),
    ("CHANNEL_UPDATE", DispatchKind::ChannelUpdate),
    ("CHANNEL_DELETE", DispatchKind::ChannelDelete),
    ("MESSAGE_CREATE", DispatchKind::MessageCreate),
    ("MESSAGE_UPDATE", DispatchKind::MessageUpdate),
    ("MESSAGE_DELETE", DispatchKind::MessageDelete),
    ("MESSAGE_DELETE_BULK", DispatchKind::MessageDeleteBulk),
    ("MESSAGE_REACTION_ADD", DispatchKind::MessageReactionAdd),
    ("MESSAGE_REACTION_REMOVE", DispatchKind::MessageReactionRemove),
    ("MESSAGE_REACTION_REMOVE_ALL", DispatchKind::MessageReactionRemoveAll),
    ("MESSAGE_REACTION_REMOVE_EMOJI", DispatchKind::MessageReactionRemoveEmoji),
    ("PRESENCE_UPDATE", DispatchKind::PresenceUpdate),
    ("TYPING_START", DispatchKind::TypingStart),
    ("USER_UPDATE", DispatchKind::UserUpdate),
    ("VOICE_STATE_UPDATE", DispatchKind::VoiceStateUpdate),
    ("WEBHOOKS_UPDATE", DispatchKind::WebhooksUpdate),
];

impl DispatchKind {
    pub fn from_name(name: &str) -> Option<DispatchKind> {
        DISPATCH_TABLE
            .iter()
            .find(|(event, _)| *event == name)
            .map(|(_, kind)| *kind)
    }

    pub fn name(self) -> &'static str {
        DISPATCH_TABLE
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(event, _)| *event)
            .unwrap_or("UNKNOWN")
    }
}

/// What the connection needs to know after a dispatch went through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    Ready {
        session_id: String,
        resume_url: Option<String>,
    },
    Resumed,
    Event,
}

fn decode<T: DeserializeOwned>(kind: DispatchKind, data: Option<Value>) -> Result<T, DispatchError> {
    let data = data.ok_or(DispatchError::MissingData { event: kind.name() })?;
    serde_json::from_value(data).map_err(|source| DispatchError::MalformedPayload {
        event: kind.name(),
        source,
    })
}

//Just a hub function to fan out to the relevant handlers
pub fn handle_dispatch(kind: DispatchKind, data: Option<Value>, context: &ShardContext) -> Result<Dispatched, DispatchError> {
    match kind {
        DispatchKind::Ready => return Ok(other::on_ready(decode(kind, data)?, context)),
        DispatchKind::Resumed => {
            other::on_resumed(context);
            return Ok(Dispatched::Resumed);
        }
        DispatchKind::GuildCreate => guild::on_guild_create(decode(kind, data)?, context),
        DispatchKind::GuildUpdate => guild::on_guild_update(decode(kind, data)?, context),
        DispatchKind::GuildDelete => guild::on_guild_delete(decode(kind, data)?, context),
        DispatchKind::GuildBanAdd => guild::on_ban_add(decode(kind, data)?, context),
        DispatchKind::GuildBanRemove => guild::on_ban_remove(decode(kind, data)?, context),
        DispatchKind::GuildEmojisUpdate => guild::on_emojis_update(decode(kind, data)?, context),
        DispatchKind::GuildMemberAdd => member::on_member_add(decode(kind, data)?, context),
        DispatchKind::GuildMemberRemove => member::on_member_remove(decode(kind, data)?, context),
        DispatchKind::GuildMemberUpdate => member::on_member_update(decode(kind, data)?, context),
        DispatchKind::GuildMembersChunk => member::on_member_chunk(decode(kind, data)?, context),
        DispatchKind::GuildRoleCreate => role::on_role_create(decode(kind, data)?, context),
        DispatchKind::GuildRoleUpdate => role::on_role_update(decode(kind, data)?, context),
        DispatchKind::GuildRoleDelete => role::on_role_delete(decode(kind, data)?, context),
        DispatchKind::ChannelCreate => channel::on_channel_create(decode(kind, data)?, context),
        DispatchKind::ChannelUpdate => channel::on_channel_update(decode(kind, data)?, context),
        DispatchKind::ChannelDelete => channel::on_channel_delete(decode(kind, data)?, context),
        DispatchKind::MessageCreate => message::on_message_create(decode(kind, data)?, context),
        DispatchKind::MessageUpdate => message::on_message_update(decode(kind, data)?, context),
        DispatchKind::MessageDelete => message::on_message_delete(decode(kind, data)?, context),
        DispatchKind::MessageDeleteBulk => message::on_message_delete_bulk(decode(kind, data)?, context),
        DispatchKind::MessageReactionAdd => message::on_reaction_add(decode(kind, data)?, context),
        DispatchKind::MessageReactionRemove => message::on_reaction_remove(decode(kind, data)?, context),
        DispatchKind::MessageReactionRemoveAll => message::on_reaction_remove_all(decode(kind, data)?, context),
        DispatchKind::MessageReactionRemoveEmoji => message::on_reaction_remove_emoji(decode(kind, data)?, context),
        DispatchKind::PresenceUpdate => other::on_presence_update(decode(kind, data)?, context),
        DispatchKind::TypingStart => other::on_typing_start(decode(kind, data)?, context),
        DispatchKind::UserUpdate => other::on_user_update(decode(kind, data)?, context),
        DispatchKind::VoiceStateUpdate => voice::on_voice_state_update(decode(kind, data)?, context),
        DispatchKind::WebhooksUpdate => other::on_webhooks_update(decode(kind, data)?, context),
    }
    Ok(Dispatched::Event)
}
