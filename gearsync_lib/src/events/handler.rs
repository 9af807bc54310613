use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use twilight_model::gateway::payload::incoming::{
    MessageDelete, ReactionRemoveAll, ReactionRemoveEmoji, Ready, TypingStart, WebhooksUpdate,
};
use twilight_model::gateway::presence::Presence;
use twilight_model::gateway::GatewayReaction;
use twilight_model::user::User as TwilightUser;

use crate::cache::{Channel, Emoji, Guild, Member, Message, RemovedMember, Role, User, VoiceState};
use crate::gateway::payload::GatewayPayload;
use crate::gateway::shard::ConnectionState;
use crate::util::markers::{ChannelId, GuildId, RoleId};

/// Callbacks for everything the gateway tells us. Every method defaults to doing nothing so
/// implementors only pick what they care about.
///
/// Callbacks run on the shard's receive loop after the cache has been updated, anything slow
/// should be handed off to a task.
#[allow(unused_variables)]
pub trait EventHandler: Send + Sync {
    /// Every frame the shard receives, before it gets processed.
    fn raw(&self, shard: u64, payload: &GatewayPayload) {}

    fn shard_state(&self, shard: u64, state: ConnectionState) {}

    fn heartbeat_ack(&self, shard: u64, latency: Option<Duration>) {}

    fn ready(&self, shard: u64, ready: &Ready) {}

    fn resumed(&self, shard: u64) {}

    fn guild_create(&self, shard: u64, guild: &Arc<Guild>) {}

    /// A guild we lost during an outage came back.
    fn guild_available(&self, shard: u64, guild: &Arc<Guild>, unavailable_since: DateTime<Utc>) {}

    fn guild_update(&self, new: &Arc<Guild>, old: &Arc<Guild>) {}

    /// We got removed from a guild. The guild is only there if it was cached.
    fn guild_delete(&self, shard: u64, guild_id: GuildId, guild: Option<&Arc<Guild>>) {}

    fn guild_unavailable(&self, shard: u64, guild_id: GuildId) {}

    fn guild_ban_add(&self, guild: &Arc<Guild>, user: &TwilightUser) {}

    fn guild_ban_remove(&self, guild: &Arc<Guild>, user: &TwilightUser) {}

    fn guild_emojis_update(&self, guild: &Arc<Guild>, new: &[Arc<Emoji>], old: &[Arc<Emoji>]) {}

    fn member_add(&self, member: &Arc<Member>) {}

    fn member_remove(&self, guild: &Arc<Guild>, member: &RemovedMember) {}

    fn member_update(&self, new: &Arc<Member>, old: Option<&Arc<Member>>) {}

    fn nickname_update(&self, member: &Arc<Member>, old_nickname: Option<&str>) {}

    fn role_gained(&self, member: &Arc<Member>, role_id: RoleId) {}

    fn role_lost(&self, member: &Arc<Member>, role_id: RoleId) {}

    fn members_chunk(&self, guild: &Arc<Guild>, members: &[Arc<Member>]) {}

    fn role_create(&self, guild: &Arc<Guild>, role: &Arc<Role>) {}

    fn role_update(&self, guild: &Arc<Guild>, new: &Arc<Role>, old: &Arc<Role>) {}

    fn role_delete(&self, guild: &Arc<Guild>, role: &Arc<Role>) {}

    fn channel_create(&self, channel: &Arc<Channel>) {}

    fn channel_update(&self, new: &Arc<Channel>, old: Option<&Arc<Channel>>) {}

    fn channel_delete(&self, channel: &Arc<Channel>) {}

    fn message_create(&self, message: &Arc<Message>) {}

    fn message_update(&self, new: &Arc<Message>, old: &Arc<Message>) {}

    fn message_delete(&self, delete: &MessageDelete, cached: Option<&Arc<Message>>) {}

    /// The message is there when it was cached, the reaction payload has the ids either way.
    fn reaction_add(&self, reaction: &GatewayReaction, message: Option<&Arc<Message>>) {}

    fn reaction_remove(&self, reaction: &GatewayReaction, message: Option<&Arc<Message>>) {}

    fn reaction_remove_all(&self, event: &ReactionRemoveAll, message: Option<&Arc<Message>>) {}

    fn reaction_remove_emoji(&self, event: &ReactionRemoveEmoji, message: Option<&Arc<Message>>) {}

    fn voice_channel_join(&self, member: &Arc<Member>, channel_id: ChannelId) {}

    fn voice_channel_switch(&self, member: &Arc<Member>, from: ChannelId, to: ChannelId) {}

    fn voice_channel_leave(&self, member: &Arc<Member>, channel_id: ChannelId) {}

    fn voice_state_update(&self, member: &Arc<Member>, state: &Arc<VoiceState>, previous: Option<&Arc<VoiceState>>) {}

    /// Our own user changed.
    fn bot_update(&self, new: &Arc<User>, old: Option<&Arc<User>>) {}

    fn presence_update(&self, presence: &Presence) {}

    fn typing_start(&self, typing: &TypingStart) {}

    fn webhooks_update(&self, update: &WebhooksUpdate) {}
}

pub struct NoopHandler;

impl EventHandler for NoopHandler {}

/// Shared handle to the registered handler.
#[derive(Clone)]
pub struct EventEmitter(Arc<dyn EventHandler>);

impl EventEmitter {
    pub fn new(handler: Arc<dyn EventHandler>) -> Self {
        EventEmitter(handler)
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        EventEmitter(Arc::new(NoopHandler))
    }
}

impl Deref for EventEmitter {
    type Target = dyn EventHandler;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;

    /// Writes down every callback it receives as a short string, raw frames are only counted.
    #[derive(Default)]
    pub struct RecordingHandler {
        pub events: Mutex<Vec<String>>,
        pub raw_frames: AtomicUsize,
    }

    impl RecordingHandler {
        fn push(&self, event: String) {
            self.events.lock().push(event);
        }

        pub fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.events.lock())
        }

        pub fn raw_frames(&self) -> usize {
            self.raw_frames.load(Ordering::SeqCst)
        }
    }

    impl EventHandler for RecordingHandler {
        fn raw(&self, _shard: u64, _payload: &GatewayPayload) {
            self.raw_frames.fetch_add(1, Ordering::SeqCst);
        }

        fn ready(&self, shard: u64, ready: &Ready) {
            self.push(format!("ready {} {}", shard, ready.session_id))
        }

        fn resumed(&self, shard: u64) {
            self.push(format!("resumed {}", shard))
        }

        fn heartbeat_ack(&self, shard: u64, _latency: Option<Duration>) {
            self.push(format!("heartbeat_ack {}", shard))
        }

        fn guild_create(&self, _shard: u64, guild: &Arc<Guild>) {
            self.push(format!("guild_create {}", guild.id))
        }

        fn guild_available(&self, _shard: u64, guild: &Arc<Guild>, _unavailable_since: DateTime<Utc>) {
            self.push(format!("guild_available {}", guild.id))
        }

        fn guild_update(&self, new: &Arc<Guild>, old: &Arc<Guild>) {
            self.push(format!("guild_update {} -> {}", old.name, new.name))
        }

        fn guild_delete(&self, _shard: u64, guild_id: GuildId, guild: Option<&Arc<Guild>>) {
            self.push(format!("guild_delete {} {}", guild_id, guild.is_some()))
        }

        fn guild_unavailable(&self, _shard: u64, guild_id: GuildId) {
            self.push(format!("guild_unavailable {}", guild_id))
        }

        fn guild_ban_add(&self, guild: &Arc<Guild>, user: &TwilightUser) {
            self.push(format!("guild_ban_add {} {}", guild.id, user.id))
        }

        fn guild_ban_remove(&self, guild: &Arc<Guild>, user: &TwilightUser) {
            self.push(format!("guild_ban_remove {} {}", guild.id, user.id))
        }

        fn guild_emojis_update(&self, guild: &Arc<Guild>, new: &[Arc<Emoji>], old: &[Arc<Emoji>]) {
            self.push(format!("guild_emojis_update {} {} {}", guild.id, new.len(), old.len()))
        }

        fn member_add(&self, member: &Arc<Member>) {
            self.push(format!("member_add {}", member.user_id()))
        }

        fn member_remove(&self, _guild: &Arc<Guild>, member: &RemovedMember) {
            self.push(format!("member_remove {} {}", member.user().id, member.member().is_some()))
        }

        fn member_update(&self, new: &Arc<Member>, old: Option<&Arc<Member>>) {
            self.push(format!("member_update {} {}", new.user_id(), old.is_some()))
        }

        fn nickname_update(&self, member: &Arc<Member>, old_nickname: Option<&str>) {
            self.push(format!(
                "nickname_update {:?} -> {:?}",
                old_nickname,
                member.nickname.as_deref()
            ))
        }

        fn role_gained(&self, _member: &Arc<Member>, role_id: RoleId) {
            self.push(format!("role_gained {}", role_id))
        }

        fn role_lost(&self, _member: &Arc<Member>, role_id: RoleId) {
            self.push(format!("role_lost {}", role_id))
        }

        fn members_chunk(&self, guild: &Arc<Guild>, members: &[Arc<Member>]) {
            self.push(format!("members_chunk {} {}", guild.id, members.len()))
        }

        fn role_create(&self, _guild: &Arc<Guild>, role: &Arc<Role>) {
            self.push(format!("role_create {}", role.id))
        }

        fn role_update(&self, _guild: &Arc<Guild>, new: &Arc<Role>, old: &Arc<Role>) {
            self.push(format!("role_update {} -> {}", old.name, new.name))
        }

        fn role_delete(&self, _guild: &Arc<Guild>, role: &Arc<Role>) {
            self.push(format!("role_delete {}", role.id))
        }

        fn channel_create(&self, channel: &Arc<Channel>) {
            self.push(format!("channel_create {}", channel.id))
        }

        fn channel_update(&self, new: &Arc<Channel>, old: Option<&Arc<Channel>>) {
            self.push(format!("channel_update {} {}", new.id, old.is_some()))
        }

        fn channel_delete(&self, channel: &Arc<Channel>) {
            self.push(format!("channel_delete {}", channel.id))
        }

        fn message_create(&self, message: &Arc<Message>) {
            self.push(format!("message_create {}", message.id))
        }

        fn message_update(&self, new: &Arc<Message>, old: &Arc<Message>) {
            self.push(format!("message_update {:?} -> {:?}", old.content, new.content))
        }

        fn message_delete(&self, delete: &MessageDelete, cached: Option<&Arc<Message>>) {
            self.push(format!("message_delete {} {}", delete.id, cached.is_some()))
        }

        fn reaction_add(&self, reaction: &GatewayReaction, message: Option<&Arc<Message>>) {
            self.push(format!("reaction_add {} {}", reaction.message_id, message.is_some()))
        }

        fn reaction_remove(&self, reaction: &GatewayReaction, message: Option<&Arc<Message>>) {
            self.push(format!("reaction_remove {} {}", reaction.message_id, message.is_some()))
        }

        fn reaction_remove_all(&self, event: &ReactionRemoveAll, message: Option<&Arc<Message>>) {
            self.push(format!("reaction_remove_all {} {}", event.message_id, message.is_some()))
        }

        fn reaction_remove_emoji(&self, event: &ReactionRemoveEmoji, message: Option<&Arc<Message>>) {
            self.push(format!("reaction_remove_emoji {} {}", event.message_id, message.is_some()))
        }

        fn voice_channel_join(&self, _member: &Arc<Member>, channel_id: ChannelId) {
            self.push(format!("voice_join {}", channel_id))
        }

        fn voice_channel_switch(&self, _member: &Arc<Member>, from: ChannelId, to: ChannelId) {
            self.push(format!("voice_switch {} {}", from, to))
        }

        fn voice_channel_leave(&self, _member: &Arc<Member>, channel_id: ChannelId) {
            self.push(format!("voice_leave {}", channel_id))
        }

        fn voice_state_update(&self, member: &Arc<Member>, _state: &Arc<VoiceState>, previous: Option<&Arc<VoiceState>>) {
            self.push(format!("voice_state_update {} {}", member.user_id(), previous.is_some()))
        }

        fn bot_update(&self, new: &Arc<User>, old: Option<&Arc<User>>) {
            self.push(format!("bot_update {} {}", new.name, old.is_some()))
        }

        fn presence_update(&self, presence: &Presence) {
            self.push(format!("presence_update {}", presence.user.id()))
        }

        fn typing_start(&self, typing: &TypingStart) {
            self.push(format!("typing_start {}", typing.user_id))
        }

        fn webhooks_update(&self, update: &WebhooksUpdate) {
            self.push(format!("webhooks_update {}", update.channel_id))
        }
    }
}
