use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gearsync_lib::util::markers::GuildId;
use gearsync_lib::{ClusterBuilder, EventHandler, GatewayError};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};
use twilight_model::gateway::payload::incoming::Ready;
use twilight_model::gateway::Intents;

type Socket = WebSocketStream<TcpStream>;

struct Forwarder(mpsc::UnboundedSender<String>);

impl EventHandler for Forwarder {
    fn ready(&self, _shard: u64, ready: &Ready) {
        let _ = self.0.send(format!("ready {}", ready.session_id));
    }

    fn resumed(&self, _shard: u64) {
        let _ = self.0.send("resumed".to_string());
    }
}

async fn send(socket: &mut Socket, frame: Value) {
    socket.send(Message::Text(frame.to_string())).await.unwrap();
}

/// Next frame with the given op, heartbeats that happen to come in between are skipped.
async fn expect_op(socket: &mut Socket, op: u64) -> Value {
    loop {
        match socket.next().await {
            Some(Ok(Message::Text(text))) => {
                let frame: Value = serde_json::from_str(&text).unwrap();
                if frame["op"] == op {
                    return frame;
                }
            }
            Some(Ok(_)) => {}
            other => panic!("socket ended while waiting for op {}: {:?}", op, other),
        }
    }
}

/// The op of the identify or resume the client logs in with.
async fn login_op(socket: &mut Socket) -> (u64, Value) {
    loop {
        match socket.next().await {
            Some(Ok(Message::Text(text))) => {
                let frame: Value = serde_json::from_str(&text).unwrap();
                match frame["op"].as_u64() {
                    Some(op) if op == 2 || op == 6 => return (op, frame),
                    _ => {}
                }
            }
            Some(Ok(_)) => {}
            other => panic!("socket ended before the client logged in: {:?}", other),
        }
    }
}

/// Read until the client closes, returning the code it closed with.
async fn client_close(socket: &mut Socket) -> Option<u16> {
    loop {
        match socket.next().await {
            Some(Ok(Message::Close(frame))) => return frame.map(|frame| u16::from(frame.code)),
            Some(Ok(_)) => {}
            _ => return None,
        }
    }
}

async fn accept(listener: &TcpListener) -> Socket {
    let (stream, _) = listener.accept().await.unwrap();
    accept_async(stream).await.unwrap()
}

async fn hello_every(listener: &TcpListener, heartbeat_interval: u64) -> Socket {
    let mut socket = accept(listener).await;
    send(&mut socket, json!({"op": 10, "d": {"heartbeat_interval": heartbeat_interval}})).await;
    socket
}

async fn hello(listener: &TcpListener) -> Socket {
    hello_every(listener, 45000).await
}

/// READY pointing resumes back at the local server.
fn ready(seq: u64, session_id: &str, url: &str) -> Value {
    json!({
        "op": 0, "s": seq, "t": "READY",
        "d": {
            "v": 10,
            "session_id": session_id,
            "resume_gateway_url": url,
            "application": {"id": "1", "flags": 0},
            "user": {
                "id": "1",
                "username": "GearBot",
                "discriminator": "0001",
                "bot": true,
                "mfa_enabled": false
            },
            "guilds": []
        }
    })
}

fn guild_create(seq: u64) -> Value {
    json!({
        "op": 0, "s": seq, "t": "GUILD_CREATE",
        "d": {
            "id": "10",
            "name": "Gearbox",
            "owner_id": "1",
            "member_count": 0,
            "afk_timeout": 300,
            "default_message_notifications": 0,
            "explicit_content_filter": 0,
            "features": [],
            "mfa_level": 0,
            "nsfw_level": 0,
            "preferred_locale": "en-US",
            "premium_progress_bar_enabled": false,
            "premium_tier": 0,
            "system_channel_flags": 0,
            "verification_level": 0,
            "roles": [],
            "emojis": [],
            "channels": [],
            "members": [],
            "voice_states": []
        }
    })
}

async fn close(mut socket: Socket, code: u16) {
    let frame = CloseFrame {
        code: CloseCode::from(code),
        reason: "".into(),
    };
    let _ = socket.close(Some(frame)).await;
    while let Some(Ok(_)) = socket.next().await {}
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<String>) -> String {
    tokio::time::timeout(Duration::from_secs(10), events.recv())
        .await
        .expect("timed out waiting for an event")
        .unwrap()
}

fn builder(url: String, handler: Arc<dyn EventHandler>) -> ClusterBuilder {
    ClusterBuilder::new("token", Intents::GUILDS | Intents::GUILD_MEMBERS)
        .gateway_url(url)
        .shard_scheme(0..1, 1)
        .backoff(10, 50)
        .identify_delay(Duration::ZERO)
        .event_handler(handler)
}

#[tokio::test]
async fn resumes_after_a_resumable_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let server_url = url.clone();

    let server = tokio::spawn(async move {
        let mut socket = hello(&listener).await;
        let identify = expect_op(&mut socket, 2).await;
        send(&mut socket, ready(1, "abc", &server_url)).await;
        send(&mut socket, guild_create(2)).await;
        close(socket, 4000).await;

        let mut socket = hello(&listener).await;
        let resume = expect_op(&mut socket, 6).await;
        send(&mut socket, json!({"op": 0, "s": 3, "t": "RESUMED", "d": {}})).await;
        // wait for the client to hang up on shutdown
        while let Some(Ok(_)) = socket.next().await {}
        (identify, resume)
    });

    let (sender, mut events) = mpsc::unbounded_channel();
    let cluster = builder(url, Arc::new(Forwarder(sender))).build().await.unwrap();
    cluster.up();

    assert_eq!(next_event(&mut events).await, "ready abc");
    assert_eq!(next_event(&mut events).await, "resumed");

    // the resume kept the cache
    let cache = cluster.cache(0).unwrap();
    assert!(cache.get_guild(&GuildId::new(10)).is_some());
    // the snapshot is written right after the callback so give it a moment
    let info = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let (_, info) = cluster.info().remove(0);
            if info.last_sequence == Some(3) {
                return info;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(info.session_id.as_deref(), Some("abc"));

    cluster.down();
    let results = cluster.join().await;
    assert!(results[0].1.is_ok());

    let (identify, resume) = server.await.unwrap();
    assert_eq!(identify["d"]["token"], "token");
    assert_eq!(identify["d"]["shard"], json!([0, 1]));
    assert_eq!(resume["d"]["session_id"], "abc");
    assert_eq!(resume["d"]["seq"], 2);
}

#[tokio::test]
async fn fatal_close_stops_the_shard() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let server = tokio::spawn(async move {
        let mut socket = hello(&listener).await;
        expect_op(&mut socket, 2).await;
        close(socket, 4004).await;
    });

    let (sender, _events) = mpsc::unbounded_channel();
    let cluster = builder(url, Arc::new(Forwarder(sender))).build().await.unwrap();
    cluster.up();

    let results = tokio::time::timeout(Duration::from_secs(10), cluster.join())
        .await
        .unwrap();
    assert!(matches!(results[0].1, Err(GatewayError::FatalClose(4004))));
    server.await.unwrap();
}

#[tokio::test]
async fn gives_up_after_repeated_identify_failures() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let server = tokio::spawn(async move {
        for _ in 0..2 {
            let mut socket = hello(&listener).await;
            expect_op(&mut socket, 2).await;
            send(&mut socket, json!({"op": 9, "d": false})).await;
            while let Some(Ok(_)) = socket.next().await {}
        }
    });

    let (sender, _events) = mpsc::unbounded_channel();
    let cluster = builder(url, Arc::new(Forwarder(sender)))
        .max_identify_failures(2)
        .build()
        .await
        .unwrap();
    cluster.up();

    let results = tokio::time::timeout(Duration::from_secs(10), cluster.join())
        .await
        .unwrap();
    assert!(matches!(results[0].1, Err(GatewayError::IdentifyRejected(2))));
    server.await.unwrap();
}

#[tokio::test]
async fn unconfirmed_resume_falls_back_to_identify() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let server_url = url.clone();

    let server = tokio::spawn(async move {
        let mut ops = Vec::new();

        let mut socket = hello(&listener).await;
        let (op, _) = login_op(&mut socket).await;
        ops.push(op);
        send(&mut socket, ready(1, "abc", &server_url)).await;
        close(socket, 4000).await;

        // the resume is never confirmed
        let mut socket = hello(&listener).await;
        let (op, resume) = login_op(&mut socket).await;
        ops.push(op);
        close(socket, 4000).await;

        let mut socket = hello(&listener).await;
        let (op, _) = login_op(&mut socket).await;
        ops.push(op);
        send(&mut socket, ready(1, "def", &server_url)).await;
        while let Some(Ok(_)) = socket.next().await {}
        (ops, resume)
    });

    let (sender, mut events) = mpsc::unbounded_channel();
    let cluster = builder(url, Arc::new(Forwarder(sender))).build().await.unwrap();
    cluster.up();

    assert_eq!(next_event(&mut events).await, "ready abc");
    assert_eq!(next_event(&mut events).await, "ready def");

    cluster.down();
    let results = cluster.join().await;
    assert!(results[0].1.is_ok());

    let (ops, resume) = server.await.unwrap();
    assert_eq!(ops, vec![2, 6, 2]);
    assert_eq!(resume["d"]["session_id"], "abc");
}

#[tokio::test]
async fn missed_heartbeat_ack_resumes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let server_url = url.clone();

    let server = tokio::spawn(async move {
        // heartbeats come in quickly and are never acked
        let mut socket = hello_every(&listener, 100).await;
        expect_op(&mut socket, 2).await;
        send(&mut socket, ready(1, "abc", &server_url)).await;
        let code = client_close(&mut socket).await;
        while let Some(Ok(_)) = socket.next().await {}

        let mut socket = hello(&listener).await;
        let resume = expect_op(&mut socket, 6).await;
        send(&mut socket, json!({"op": 0, "s": 2, "t": "RESUMED", "d": {}})).await;
        while let Some(Ok(_)) = socket.next().await {}
        (code, resume)
    });

    let (sender, mut events) = mpsc::unbounded_channel();
    let cluster = builder(url, Arc::new(Forwarder(sender))).build().await.unwrap();
    cluster.up();

    assert_eq!(next_event(&mut events).await, "ready abc");
    assert_eq!(next_event(&mut events).await, "resumed");

    cluster.down();
    let results = cluster.join().await;
    assert!(results[0].1.is_ok());

    let (code, resume) = server.await.unwrap();
    assert_eq!(code, Some(4000));
    assert_eq!(resume["d"]["session_id"], "abc");
    assert_eq!(resume["d"]["seq"], 1);
}

#[tokio::test]
async fn silent_gateway_gets_dropped_after_the_hello_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let server_url = url.clone();

    let server = tokio::spawn(async move {
        // no HELLO on the first connection
        let mut socket = accept(&listener).await;
        let code = client_close(&mut socket).await;
        while let Some(Ok(_)) = socket.next().await {}

        let mut socket = hello(&listener).await;
        expect_op(&mut socket, 2).await;
        send(&mut socket, ready(1, "abc", &server_url)).await;
        while let Some(Ok(_)) = socket.next().await {}
        code
    });

    let (sender, mut events) = mpsc::unbounded_channel();
    let cluster = builder(url, Arc::new(Forwarder(sender)))
        .hello_timeout(Duration::from_millis(200))
        .build()
        .await
        .unwrap();
    cluster.up();

    assert_eq!(next_event(&mut events).await, "ready abc");

    cluster.down();
    let results = cluster.join().await;
    assert!(results[0].1.is_ok());
    assert_eq!(server.await.unwrap(), Some(4000));
}
