use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use twilight_model::gateway::Intents;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Dispatch,
    Heartbeat,
    Identify,
    Resume,
    Reconnect,
    InvalidSession,
    Hello,
    HeartbeatAck,
}

impl OpCode {
    pub fn from_u8(op: u8) -> Option<OpCode> {
        Some(match op {
            0 => OpCode::Dispatch,
            1 => OpCode::Heartbeat,
            2 => OpCode::Identify,
            6 => OpCode::Resume,
            7 => OpCode::Reconnect,
            9 => OpCode::InvalidSession,
            10 => OpCode::Hello,
            11 => OpCode::HeartbeatAck,
            _ => return None,
        })
    }

    pub fn code(self) -> u8 {
        match self {
            OpCode::Dispatch => 0,
            OpCode::Heartbeat => 1,
            OpCode::Identify => 2,
            OpCode::Resume => 6,
            OpCode::Reconnect => 7,
            OpCode::InvalidSession => 9,
            OpCode::Hello => 10,
            OpCode::HeartbeatAck => 11,
        }
    }
}

/// A single gateway frame, both directions use the same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayPayload {
    pub op: u8,
    #[serde(default)]
    pub d: Option<Value>,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
}

impl GatewayPayload {
    pub fn opcode(&self) -> Option<OpCode> {
        OpCode::from_u8(self.op)
    }

    fn outbound(op: OpCode, d: Value) -> Self {
        GatewayPayload {
            op: op.code(),
            d: Some(d),
            s: None,
            t: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelloPayload {
    pub heartbeat_interval: u64,
}

/// Connection properties sent along with every identify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentifyProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

impl Default for IdentifyProperties {
    fn default() -> Self {
        IdentifyProperties {
            os: std::env::consts::OS.to_string(),
            browser: "gearsync".to_string(),
            device: "gearsync".to_string(),
        }
    }
}

pub fn identify(token: &str, intents: Intents, shard: [u64; 2], properties: &IdentifyProperties) -> GatewayPayload {
    GatewayPayload::outbound(
        OpCode::Identify,
        json!({
            "token": token,
            "intents": intents.bits(),
            "properties": properties,
            "compress": false,
            "shard": shard,
        }),
    )
}

pub fn resume(token: &str, session_id: &str, sequence: Option<u64>) -> GatewayPayload {
    GatewayPayload::outbound(
        OpCode::Resume,
        json!({
            "token": token,
            "session_id": session_id,
            "seq": sequence,
        }),
    )
}

pub fn heartbeat(sequence: Option<u64>) -> GatewayPayload {
    GatewayPayload::outbound(OpCode::Heartbeat, sequence.map(Value::from).unwrap_or(Value::Null))
}

/// What to do after the gateway closed the socket on us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    Resume,
    Reidentify,
    Fatal,
}

pub fn classify_close(code: u16) -> CloseAction {
    match code {
        // authentication failed, invalid shard, sharding required, invalid api version,
        // invalid intents, disallowed intents
        4004 | 4010 | 4011 | 4012 | 4013 | 4014 => CloseAction::Fatal,
        // invalid sequence, session timed out
        4007 | 4009 => CloseAction::Reidentify,
        _ => CloseAction::Resume,
    }
}
