use tracing::trace;
use twilight_model::gateway::payload::incoming::{
    MessageCreate, MessageDelete, MessageDeleteBulk, MessageUpdate, ReactionAdd, ReactionRemove, ReactionRemoveAll,
    ReactionRemoveEmoji,
};

use crate::events::ShardContext;

pub fn on_message_create(message: MessageCreate, context: &ShardContext) {
    let message = context.cache.insert_message(&message);
    context.events.message_create(&message);
}

pub fn on_message_update(update: MessageUpdate, context: &ShardContext) {
    if let Some((new, old)) = context.cache.update_message(&update) {
        context.events.message_update(&new, &old);
    } else {
        trace!("Ignoring update for uncached message {}", update.id);
    }
}

pub fn on_message_delete(delete: MessageDelete, context: &ShardContext) {
    let cached = context.cache.remove_message(&delete.id);
    context.events.message_delete(&delete, cached.as_ref());
}

pub fn on_message_delete_bulk(bulk: MessageDeleteBulk, context: &ShardContext) {
    for id in bulk.ids {
        on_message_delete(
            MessageDelete {
                id,
                channel_id: bulk.channel_id,
                guild_id: bulk.guild_id,
            },
            context,
        );
    }
}

pub fn on_reaction_add(reaction: ReactionAdd, context: &ShardContext) {
    let message = context
        .cache
        .add_reaction(&reaction.message_id, &reaction.emoji, &reaction.user_id);
    context.events.reaction_add(&reaction, message.as_ref());
}

pub fn on_reaction_remove(reaction: ReactionRemove, context: &ShardContext) {
    let message = context
        .cache
        .remove_reaction(&reaction.message_id, &reaction.emoji, &reaction.user_id);
    context.events.reaction_remove(&reaction, message.as_ref());
}

pub fn on_reaction_remove_all(event: ReactionRemoveAll, context: &ShardContext) {
    let message = context.cache.clear_reactions(&event.message_id, None);
    context.events.reaction_remove_all(&event, message.as_ref());
}

pub fn on_reaction_remove_emoji(event: ReactionRemoveEmoji, context: &ShardContext) {
    let message = context.cache.clear_reactions(&event.message_id, Some(&event.emoji));
    context.events.reaction_remove_emoji(&event, message.as_ref());
}
