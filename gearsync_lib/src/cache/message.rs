use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;
use twilight_model::channel::message::{Message as TwilightMessage, ReactionType};
use twilight_model::gateway::payload::incoming::MessageUpdate;
use twilight_model::util::Timestamp;

use crate::cache::{Cache, User};
use crate::util::markers::{ChannelId, GuildId, MessageId, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub emoji: ReactionType,
    pub count: u64,
    // whether we reacted with this ourselves
    pub me: bool,
}

pub struct Message {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub guild_id: Option<GuildId>,
    pub author: Arc<User>,
    pub content: String,
    pub timestamp: Timestamp,
    pub edited_timestamp: Option<Timestamp>,
    reactions: RwLock<Vec<Reaction>>,
}

/// Custom emoji match on id and name, the animated flag doesn't make it a different reaction.
pub fn same_emoji(a: &ReactionType, b: &ReactionType) -> bool {
    match (a, b) {
        (ReactionType::Custom { id: a_id, name: a_name, .. }, ReactionType::Custom { id: b_id, name: b_name, .. }) => {
            a_id == b_id && a_name == b_name
        }
        (ReactionType::Unicode { name: a_name }, ReactionType::Unicode { name: b_name }) => a_name == b_name,
        _ => false,
    }
}

impl Message {
    pub fn from_message(message: &TwilightMessage) -> Self {
        Message {
            id: message.id,
            channel_id: message.channel_id,
            guild_id: message.guild_id,
            author: Arc::new(User::from_user(&message.author)),
            content: message.content.clone(),
            timestamp: message.timestamp,
            edited_timestamp: message.edited_timestamp,
            reactions: RwLock::new(
                message
                    .reactions
                    .iter()
                    .map(|reaction| Reaction {
                        emoji: reaction.emoji.clone(),
                        count: reaction.count,
                        me: reaction.me,
                    })
                    .collect(),
            ),
        }
    }

    fn update(old: &Message, update: &MessageUpdate) -> Self {
        Message {
            id: old.id,
            channel_id: old.channel_id,
            guild_id: old.guild_id,
            author: old.author.clone(),
            content: update.content.clone().unwrap_or_else(|| old.content.clone()),
            timestamp: old.timestamp,
            edited_timestamp: update.edited_timestamp.or(old.edited_timestamp),
            reactions: RwLock::new(old.reactions()),
        }
    }

    pub fn reactions(&self) -> Vec<Reaction> {
        self.reactions.read().clone()
    }

    pub fn reaction(&self, emoji: &ReactionType) -> Option<Reaction> {
        self.reactions.read().iter().find(|reaction| same_emoji(&reaction.emoji, emoji)).cloned()
    }

    fn add_reaction(&self, emoji: &ReactionType, by_me: bool) {
        let mut reactions = self.reactions.write();
        match reactions.iter_mut().find(|reaction| same_emoji(&reaction.emoji, emoji)) {
            Some(reaction) => {
                reaction.count += 1;
                reaction.me |= by_me;
            }
            None => reactions.push(Reaction {
                emoji: emoji.clone(),
                count: 1,
                me: by_me,
            }),
        }
    }

    // entries that drop to zero stay in place, counts never go below zero
    fn remove_reaction(&self, emoji: &ReactionType, by_me: bool) {
        if let Some(reaction) = self
            .reactions
            .write()
            .iter_mut()
            .find(|reaction| same_emoji(&reaction.emoji, emoji))
        {
            reaction.count = reaction.count.saturating_sub(1);
            if by_me {
                reaction.me = false;
            }
        }
    }

    fn clear_reactions(&self, emoji: Option<&ReactionType>) {
        let mut reactions = self.reactions.write();
        match emoji {
            Some(emoji) => reactions.retain(|reaction| !same_emoji(&reaction.emoji, emoji)),
            None => reactions.clear(),
        }
    }
}

#[derive(Default)]
struct MessageStore {
    messages: HashMap<MessageId, Arc<Message>>,
    // insertion order, oldest first
    order: VecDeque<MessageId>,
}

/// Bounded message store, evicts the oldest message once full.
pub struct MessageCache {
    capacity: usize,
    inner: RwLock<MessageStore>,
}

impl MessageCache {
    pub fn new(capacity: usize) -> Self {
        MessageCache {
            capacity,
            inner: Default::default(),
        }
    }

    pub fn get(&self, message_id: &MessageId) -> Option<Arc<Message>> {
        self.inner.read().messages.get(message_id).cloned()
    }

    pub fn insert(&self, message: Arc<Message>) -> Option<Arc<Message>> {
        if self.capacity == 0 {
            return None;
        }
        let mut store = self.inner.write();
        let old = store.messages.insert(message.id, message.clone());
        if old.is_none() {
            store.order.push_back(message.id);
            while store.order.len() > self.capacity {
                if let Some(evicted) = store.order.pop_front() {
                    trace!("Evicting message {} from the message cache", evicted);
                    store.messages.remove(&evicted);
                }
            }
        }
        old
    }

    pub fn remove(&self, message_id: &MessageId) -> Option<Arc<Message>> {
        let mut store = self.inner.write();
        let old = store.messages.remove(message_id);
        if old.is_some() {
            store.order.retain(|id| id != message_id);
        }
        old
    }

    pub fn len(&self) -> usize {
        self.inner.read().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cache {
    pub fn get_message(&self, message_id: &MessageId) -> Option<Arc<Message>> {
        self.messages.get(message_id)
    }

    pub fn insert_message(&self, message: &TwilightMessage) -> Arc<Message> {
        let message = Arc::new(Message::from_message(message));
        self.messages.insert(message.clone());
        message
    }

    /// Merge an edit into a cached message, returns the new and old message.
    pub fn update_message(&self, update: &MessageUpdate) -> Option<(Arc<Message>, Arc<Message>)> {
        let old = self.messages.get(&update.id)?;
        let new = Arc::new(Message::update(&old, update));
        self.messages.insert(new.clone());
        Some((new, old))
    }

    pub fn remove_message(&self, message_id: &MessageId) -> Option<Arc<Message>> {
        self.messages.remove(message_id)
    }

    fn is_current_user(&self, user_id: &UserId) -> bool {
        self.current_user_id().as_ref() == Some(user_id)
    }

    pub fn add_reaction(&self, message_id: &MessageId, emoji: &ReactionType, user_id: &UserId) -> Option<Arc<Message>> {
        let message = self.messages.get(message_id)?;
        message.add_reaction(emoji, self.is_current_user(user_id));
        Some(message)
    }

    pub fn remove_reaction(&self, message_id: &MessageId, emoji: &ReactionType, user_id: &UserId) -> Option<Arc<Message>> {
        let message = self.messages.get(message_id)?;
        message.remove_reaction(emoji, self.is_current_user(user_id));
        Some(message)
    }

    /// Drop all reactions from a message, or only those for one emoji.
    pub fn clear_reactions(&self, message_id: &MessageId, emoji: Option<&ReactionType>) -> Option<Arc<Message>> {
        let message = self.messages.get(message_id)?;
        message.clear_reactions(emoji);
        Some(message)
    }
}
