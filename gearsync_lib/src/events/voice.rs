use std::sync::Arc;

use tracing::{debug, trace};
use twilight_model::gateway::payload::incoming::VoiceStateUpdate;

use crate::cache::{VoiceState, VoiceTransition};
use crate::events::ShardContext;

pub fn on_voice_state_update(update: VoiceStateUpdate, context: &ShardContext) {
    let Some(guild_id) = update.guild_id else {
        trace!("Ignoring voice state update without a guild for user {}", update.user_id);
        return;
    };
    let Some(guild) = context.cache.get_guild(&guild_id) else {
        debug!("Voice state update for uncached guild {}", guild_id);
        return;
    };
    let Some(member) = guild.get_member(&update.user_id) else {
        debug!("Voice state update for uncached member {} in guild {}", update.user_id, guild_id);
        return;
    };

    let state = Arc::new(VoiceState::from_voice_state(&update));
    let previous = guild.set_voice_state(state.clone());

    match VoiceTransition::classify(previous.as_ref().and_then(|previous| previous.channel_id), state.channel_id) {
        Some(VoiceTransition::Join(channel_id)) => context.events.voice_channel_join(&member, channel_id),
        Some(VoiceTransition::Switch { from, to }) => context.events.voice_channel_switch(&member, from, to),
        Some(VoiceTransition::Leave(channel_id)) => context.events.voice_channel_leave(&member, channel_id),
        None => {}
    }
    context.events.voice_state_update(&member, &state, previous.as_ref());
}
