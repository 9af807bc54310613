use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, warn};

use crate::gateway::payload::GatewayPayload;
use crate::util::error::GatewayError;
use crate::util::GatewayResult;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub type WsWriter = SplitSink<WsStream, Message>;
pub type WsReader = SplitStream<WsStream>;

pub const API_VERSION: u8 = 10;

/// Everything the writer task can be asked to do.
#[derive(Debug)]
pub enum Outbound {
    Payload(GatewayPayload),
    Close(u16),
}

/// What came out of the socket.
#[derive(Debug)]
pub enum Inbound {
    Payload(GatewayPayload),
    // close code if the gateway sent one, None when the stream just ended
    Closed(Option<u16>),
    Error(GatewayError),
}

/// Append the version and encoding query to a gateway url.
pub fn versioned_url(url: &str) -> String {
    let separator = if url.ends_with('/') { "" } else { "/" };
    format!("{}{}?v={}&encoding=json", url, separator, API_VERSION)
}

pub struct GatewayConnection {
    writer: WsWriter,
    reader: WsReader,
}

impl GatewayConnection {
    pub async fn connect(url: &str) -> GatewayResult<Self> {
        let (socket, _response) = connect_async(versioned_url(url)).await?;
        let (writer, reader) = socket.split();
        Ok(GatewayConnection { writer, reader })
    }

    pub fn into_parts(self) -> (WsWriter, WsReader) {
        (self.writer, self.reader)
    }
}

/// Spawn the task that owns the write half. It stops once the channel closes, a write fails or
/// after sending a close frame.
pub fn spawn_writer(shard_id: u64, mut writer: WsWriter, mut outbound: mpsc::Receiver<Outbound>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            match message {
                Outbound::Payload(payload) => {
                    let json = match serde_json::to_string(&payload) {
                        Ok(json) => json,
                        Err(e) => {
                            error!("Shard {} failed to serialize an outbound payload: {}", shard_id, e);
                            continue;
                        }
                    };
                    if let Err(e) = writer.send(Message::Text(json)).await {
                        debug!("Shard {} writer failed to send: {}", shard_id, e);
                        break;
                    }
                }
                Outbound::Close(code) => {
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: "".into(),
                    };
                    if let Err(e) = writer.send(Message::Close(Some(frame))).await {
                        debug!("Shard {} writer failed to send close frame: {}", shard_id, e);
                    }
                    break;
                }
            }
        }
        let _ = writer.close().await;
    })
}

/// Wait for the next gateway frame, skipping control frames and text we can't parse.
pub async fn next_inbound(shard_id: u64, reader: &mut WsReader) -> Inbound {
    loop {
        match reader.next().await {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<GatewayPayload>(&text) {
                Ok(payload) => return Inbound::Payload(payload),
                Err(e) => warn!("Shard {} received a frame that isn't a gateway payload: {}", shard_id, e),
            },
            Some(Ok(Message::Close(frame))) => return Inbound::Closed(frame.map(|frame| u16::from(frame.code))),
            // ping/pong are answered by tungstenite, we don't use compression so no binary either
            Some(Ok(_)) => {}
            Some(Err(e)) => return Inbound::Error(e.into()),
            None => return Inbound::Closed(None),
        }
    }
}
