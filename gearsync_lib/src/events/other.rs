use tracing::{info, trace};
use twilight_model::gateway::payload::incoming::{PresenceUpdate, Ready, TypingStart, UserUpdate, WebhooksUpdate};

use crate::events::{Dispatched, ShardContext};

pub fn on_ready(ready: Ready, context: &ShardContext) -> Dispatched {
    info!(
        "Shard {} is ready as {} with {} guilds",
        context.shard_id,
        ready.user.name,
        ready.guilds.len()
    );
    context.cache.set_current_user(&ready.user);
    context.events.ready(context.shard_id, &ready);

    Dispatched::Ready {
        session_id: ready.session_id,
        resume_url: Some(ready.resume_gateway_url),
    }
}

pub fn on_resumed(context: &ShardContext) {
    info!("Shard {} successfully resumed", context.shard_id);
    context.events.resumed(context.shard_id);
}

pub fn on_user_update(user: UserUpdate, context: &ShardContext) {
    let (new, old) = context.cache.set_current_user(&user);
    context.events.bot_update(&new, old.as_ref());
}

pub fn on_presence_update(presence: PresenceUpdate, context: &ShardContext) {
    trace!("Presence update for {}", presence.user.id());
    context.events.presence_update(&presence);
}

pub fn on_typing_start(typing: TypingStart, context: &ShardContext) {
    context.events.typing_start(&typing);
}

pub fn on_webhooks_update(update: WebhooksUpdate, context: &ShardContext) {
    context.events.webhooks_update(&update);
}
