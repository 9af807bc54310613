use std::error::Error;
use std::fmt::{Display, Formatter};

use tokio_tungstenite::tungstenite;
use twilight_http::response::DeserializeBodyError;

#[derive(Debug)]
pub enum GatewayError {
    WebSocket(Box<tungstenite::Error>),
    Json(serde_json::Error),
    Http(twilight_http::Error),
    HttpBody(DeserializeBodyError),
    // close codes we are not allowed to reconnect after
    FatalClose(u16),
    HelloTimeout,
    IdentifyRejected(u32),
    Protocol(String),
}

impl GatewayError {
    /// Whether the shard has to stop for good after this error, everything else goes through
    /// the regular reconnect path.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GatewayError::FatalClose(_) | GatewayError::IdentifyRejected(_) | GatewayError::Http(_) | GatewayError::HttpBody(_)
        )
    }
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::WebSocket(e) => write!(f, "Websocket error: {}", e),
            GatewayError::Json(e) => write!(f, "Serde error: {}", e),
            GatewayError::Http(e) => write!(f, "Twilight error: {}", e),
            GatewayError::HttpBody(e) => write!(f, "Failed to deserialize the gateway info response: {}", e),
            GatewayError::FatalClose(code) => write!(f, "Gateway closed the connection with unrecoverable code {}", code),
            GatewayError::HelloTimeout => write!(f, "Timed out waiting for the gateway hello"),
            GatewayError::IdentifyRejected(attempts) => {
                write!(f, "Gateway rejected our identify {} times in a row, giving up", attempts)
            }
            GatewayError::Protocol(reason) => write!(f, "Gateway protocol error: {}", reason),
        }
    }
}

impl Error for GatewayError {}

impl From<tungstenite::Error> for GatewayError {
    fn from(e: tungstenite::Error) -> Self {
        GatewayError::WebSocket(Box::new(e))
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Json(e)
    }
}

impl From<twilight_http::Error> for GatewayError {
    fn from(e: twilight_http::Error) -> Self {
        GatewayError::Http(e)
    }
}

impl From<DeserializeBodyError> for GatewayError {
    fn from(e: DeserializeBodyError) -> Self {
        GatewayError::HttpBody(e)
    }
}

/// Failure to turn a dispatch into something the cache can work with. These never take the
/// connection down, the event gets logged and dropped.
#[derive(Debug)]
pub enum DispatchError {
    MalformedPayload {
        event: &'static str,
        source: serde_json::Error,
    },
    MissingData {
        event: &'static str,
    },
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::MalformedPayload { event, source } => {
                write!(f, "Malformed {} payload: {}", event, source)
            }
            DispatchError::MissingData { event } => write!(f, "{} dispatch without any data", event),
        }
    }
}

impl Error for DispatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DispatchError::MalformedPayload { source, .. } => Some(source),
            DispatchError::MissingData { .. } => None,
        }
    }
}
