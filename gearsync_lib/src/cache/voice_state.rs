use twilight_model::voice::VoiceState as TwilightVoiceState;

use crate::util::markers::{ChannelId, UserId};

pub struct VoiceState {
    pub user_id: UserId,
    // None means the user is not connected anywhere
    pub channel_id: Option<ChannelId>,
    pub session_id: String,
    pub muted: bool,
    pub server_muted: bool,
    pub deafened: bool,
    pub server_deafened: bool,
    pub video: bool,
    pub streaming: bool,
    pub suppressed: bool,
}

impl VoiceState {
    pub fn from_voice_state(state: &TwilightVoiceState) -> Self {
        VoiceState {
            user_id: state.user_id,
            channel_id: state.channel_id,
            session_id: state.session_id.clone(),
            muted: state.self_mute,
            server_muted: state.mute,
            deafened: state.self_deaf,
            server_deafened: state.deaf,
            video: state.self_video,
            streaming: state.self_stream,
            suppressed: state.suppress,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceTransition {
    Join(ChannelId),
    Switch { from: ChannelId, to: ChannelId },
    Leave(ChannelId),
}

impl VoiceTransition {
    /// What happened between the previously known channel and the new one. Mute/deaf changes
    /// within the same channel are not a transition.
    pub fn classify(previous: Option<ChannelId>, current: Option<ChannelId>) -> Option<VoiceTransition> {
        match (previous, current) {
            (None, Some(channel)) => Some(VoiceTransition::Join(channel)),
            (Some(from), Some(to)) if from != to => Some(VoiceTransition::Switch { from, to }),
            (Some(channel), None) => Some(VoiceTransition::Leave(channel)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions() {
        let first = ChannelId::new(1);
        let second = ChannelId::new(2);
        assert_eq!(VoiceTransition::classify(None, Some(first)), Some(VoiceTransition::Join(first)));
        assert_eq!(
            VoiceTransition::classify(Some(first), Some(second)),
            Some(VoiceTransition::Switch { from: first, to: second })
        );
        assert_eq!(VoiceTransition::classify(Some(first), None), Some(VoiceTransition::Leave(first)));
        assert_eq!(VoiceTransition::classify(Some(first), Some(first)), None);
        assert_eq!(VoiceTransition::classify(None, None), None);
    }
}
