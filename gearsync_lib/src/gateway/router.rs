use tracing::{debug, trace, warn};

use crate::events::{handle_dispatch, DispatchKind, Dispatched, ShardContext};
use crate::gateway::payload::{GatewayPayload, HelloPayload, OpCode};
use crate::gateway::session::Session;

/// What the shard loop has to do about a frame once the router is done with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterAction {
    /// Start heartbeating at this interval (ms) and log in.
    Hello(u64),
    HeartbeatAck,
    /// The gateway wants a heartbeat right now.
    HeartbeatRequested,
    Reconnect,
    InvalidSession {
        resumable: bool,
    },
    Ready,
    Resumed,
    Dispatched,
    Ignored,
}

pub struct PayloadRouter {
    context: ShardContext,
}

impl PayloadRouter {
    pub fn new(context: ShardContext) -> Self {
        PayloadRouter { context }
    }

    pub fn context(&self) -> &ShardContext {
        &self.context
    }

    pub fn route(&self, payload: GatewayPayload, session: &mut Session) -> RouterAction {
        if let Some(sequence) = payload.s {
            session.observe_sequence(sequence);
        }
        self.context.events.raw(self.context.shard_id, &payload);

        match payload.opcode() {
            Some(OpCode::Dispatch) => self.dispatch(payload, session),
            Some(OpCode::Hello) => {
                let hello = payload
                    .d
                    .map(serde_json::from_value::<HelloPayload>)
                    .transpose();
                match hello {
                    Ok(Some(hello)) => RouterAction::Hello(hello.heartbeat_interval),
                    Ok(None) => {
                        warn!("Shard {} got a HELLO without data", self.context.shard_id);
                        RouterAction::Ignored
                    }
                    Err(e) => {
                        warn!("Shard {} got a malformed HELLO: {}", self.context.shard_id, e);
                        RouterAction::Ignored
                    }
                }
            }
            Some(OpCode::HeartbeatAck) => RouterAction::HeartbeatAck,
            Some(OpCode::Heartbeat) => RouterAction::HeartbeatRequested,
            Some(OpCode::Reconnect) => RouterAction::Reconnect,
            Some(OpCode::InvalidSession) => {
                let resumable = payload.d.as_ref().and_then(|d| d.as_bool()).unwrap_or(false);
                if !resumable {
                    session.clear();
                }
                RouterAction::InvalidSession { resumable }
            }
            other => {
                debug!("Shard {} ignoring op {} ({:?})", self.context.shard_id, payload.op, other);
                RouterAction::Ignored
            }
        }
    }

    fn dispatch(&self, payload: GatewayPayload, session: &mut Session) -> RouterAction {
        let GatewayPayload { d, t, .. } = payload;
        let Some(name) = t else {
            warn!("Shard {} got a dispatch without an event name", self.context.shard_id);
            return RouterAction::Ignored;
        };
        let Some(kind) = DispatchKind::from_name(&name) else {
            trace!("Shard {} ignoring unknown event {}", self.context.shard_id, name);
            return RouterAction::Ignored;
        };

        match handle_dispatch(kind, d, &self.context) {
            Ok(Dispatched::Ready { session_id, resume_url }) => {
                session.start(session_id, resume_url);
                RouterAction::Ready
            }
            Ok(Dispatched::Resumed) => RouterAction::Resumed,
            Ok(Dispatched::Event) => RouterAction::Dispatched,
            Err(e) => {
                warn!("Shard {} dropped an event: {}", self.context.shard_id, e);
                RouterAction::Dispatched
            }
        }
    }
}
