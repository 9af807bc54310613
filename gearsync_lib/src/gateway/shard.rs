use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use twilight_model::gateway::Intents;

use crate::events::ShardContext;
use crate::gateway::backoff::Backoff;
use crate::gateway::connection::{next_inbound, spawn_writer, GatewayConnection, Inbound, Outbound, WsReader};
use crate::gateway::heartbeat::{Beat, Heartbeater};
use crate::gateway::payload::{self, classify_close, CloseAction, GatewayPayload, IdentifyProperties};
use crate::gateway::reconnect::ReconnectTimer;
use crate::gateway::router::{PayloadRouter, RouterAction};
use crate::gateway::session::Session;
use crate::util::error::GatewayError;
use crate::util::GatewayResult;

pub const HELLO_TIMEOUT: Duration = Duration::from_secs(30);
const WRITER_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);
// not 1000/1001, those end the session on discord's side
const RESUMABLE_CLOSE: u16 = 4000;
const NORMAL_CLOSE: u16 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Identifying,
    Ready,
    Resuming,
    Reconnecting,
}

impl ConnectionState {
    pub fn name(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Identifying => "identifying",
            ConnectionState::Ready => "ready",
            ConnectionState::Resuming => "resuming",
            ConnectionState::Reconnecting => "reconnecting",
        }
    }
}

/// Snapshot of a shard as seen from outside its task.
#[derive(Debug, Clone, Default)]
pub struct ShardInfo {
    pub state: ConnectionState,
    pub session_id: Option<String>,
    pub last_sequence: Option<u64>,
    pub latency: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct ShardConfig {
    pub shard_id: u64,
    pub total_shards: u64,
    pub token: String,
    pub intents: Intents,
    pub gateway_url: String,
    pub properties: IdentifyProperties,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub max_identify_failures: u32,
    /// How long a fresh connection may go without HELLO before it gets dropped.
    pub hello_timeout: Duration,
    /// How long to wait before the very first connect, used to stagger identifies.
    pub start_delay: Duration,
}

/// How a single connection ended.
#[derive(Debug)]
enum ConnectionEnd {
    Resume,
    Reidentify,
    Shutdown,
    Fatal(GatewayError),
}

pub struct Shard {
    config: ShardConfig,
    router: PayloadRouter,
    session: Session,
    state: ConnectionState,
    info: Arc<RwLock<ShardInfo>>,
    shutdown: watch::Receiver<bool>,
    backoff: Backoff,
    reconnect: ReconnectTimer,
    // set while an identify is out and READY hasn't arrived yet
    awaiting_ready: bool,
    // set while a resume is out and neither RESUMED nor a dispatch confirmed it
    resume_pending: bool,
    identify_failures: u32,
}

impl Shard {
    pub fn new(
        config: ShardConfig,
        context: ShardContext,
        info: Arc<RwLock<ShardInfo>>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let backoff = Backoff::new(config.backoff_base_ms, config.backoff_max_ms);
        Shard {
            config,
            router: PayloadRouter::new(context),
            session: Session::default(),
            state: ConnectionState::Disconnected,
            info,
            shutdown,
            backoff,
            reconnect: ReconnectTimer::default(),
            awaiting_ready: false,
            resume_pending: false,
            identify_failures: 0,
        }
    }

    pub fn id(&self) -> u64 {
        self.config.shard_id
    }

    /// Keep the shard connected until shutdown is requested or the gateway tells us to go away
    /// for good.
    pub async fn run(mut self) -> GatewayResult<()> {
        if !self.config.start_delay.is_zero() {
            debug!("Shard {} starting in {:?}", self.id(), self.config.start_delay);
            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut self.shutdown) => return Ok(()),
                _ = tokio::time::sleep(self.config.start_delay) => {}
            }
        }

        let result = loop {
            if *self.shutdown.borrow_and_update() {
                break Ok(());
            }

            match self.connect_and_run().await {
                ConnectionEnd::Shutdown => break Ok(()),
                ConnectionEnd::Fatal(e) => break Err(e),
                ConnectionEnd::Resume => self.set_state(ConnectionState::Resuming),
                ConnectionEnd::Reidentify => {
                    self.session.clear();
                    self.sync_info();
                    self.set_state(ConnectionState::Reconnecting);
                }
            }

            let delay = self.backoff.next_delay();
            info!(
                "Shard {} reconnecting in {:?} (attempt {})",
                self.id(),
                delay,
                self.backoff.attempt()
            );
            let due = self.reconnect.schedule(delay);
            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut self.shutdown) => break Ok(()),
                _ = due => {}
            }
        };

        self.reconnect.cancel();
        self.set_state(ConnectionState::Disconnected);
        match &result {
            Ok(()) => info!("Shard {} shut down", self.id()),
            Err(e) => error!("Shard {} stopped: {}", self.id(), e),
        }
        result
    }

    async fn connect_and_run(&mut self) -> ConnectionEnd {
        self.set_state(ConnectionState::Connecting);
        let url = self.session.connect_url(&self.config.gateway_url).to_string();
        debug!("Shard {} connecting to {}", self.id(), url);

        let connection = tokio::select! {
            biased;
            _ = wait_for_shutdown(&mut self.shutdown) => return ConnectionEnd::Shutdown,
            connection = GatewayConnection::connect(&url) => connection,
        };
        let connection = match connection {
            Ok(connection) => connection,
            Err(e) => {
                warn!("Shard {} failed to connect: {}", self.id(), e);
                return self.connection_lost();
            }
        };

        let (writer, mut reader) = connection.into_parts();
        let (outbound, outbound_receiver) = mpsc::channel(64);
        let mut writer_handle = spawn_writer(self.id(), writer, outbound_receiver);

        let end = self.event_loop(&mut reader, &outbound).await;

        // give the writer a moment to get the close frame out
        drop(outbound);
        if tokio::time::timeout(WRITER_FLUSH_TIMEOUT, &mut writer_handle).await.is_err() {
            debug!("Shard {} writer didn't finish in time", self.id());
            writer_handle.abort();
        }
        end
    }

    async fn event_loop(&mut self, reader: &mut WsReader, outbound: &mpsc::Sender<Outbound>) -> ConnectionEnd {
        let hello_deadline = tokio::time::sleep(self.config.hello_timeout);
        tokio::pin!(hello_deadline);
        let mut heartbeater: Option<Heartbeater> = None;
        let mut beats: Option<Interval> = None;

        loop {
            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut self.shutdown) => {
                    info!("Shard {} closing the connection", self.id());
                    let _ = outbound.send(Outbound::Close(NORMAL_CLOSE)).await;
                    return ConnectionEnd::Shutdown;
                }
                _ = next_beat(&mut beats) => {
                    let Some(heart) = heartbeater.as_mut() else {
                        continue;
                    };
                    match heart.tick() {
                        Beat::Send => {
                            if !self.send(outbound, payload::heartbeat(self.session.last_sequence)).await {
                                return self.connection_lost();
                            }
                        }
                        Beat::Timeout => {
                            warn!("Shard {} missed a heartbeat ack, reconnecting", self.id());
                            let _ = outbound.send(Outbound::Close(RESUMABLE_CLOSE)).await;
                            return self.connection_lost();
                        }
                    }
                }
                _ = &mut hello_deadline, if heartbeater.is_none() => {
                    warn!("Shard {}: {}", self.id(), GatewayError::HelloTimeout);
                    let _ = outbound.send(Outbound::Close(RESUMABLE_CLOSE)).await;
                    return self.connection_lost();
                }
                inbound = next_inbound(self.config.shard_id, reader) => match inbound {
                    Inbound::Payload(frame) => {
                        let action = self.router.route(frame, &mut self.session);
                        self.sync_info();
                        match action {
                            RouterAction::Hello(interval) => {
                                let heart = Heartbeater::new(interval);
                                let mut timer =
                                    tokio::time::interval_at(Instant::now() + heart.first_delay(), heart.interval());
                                timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
                                beats = Some(timer);
                                heartbeater = Some(heart);
                                if !self.login(outbound).await {
                                    return self.connection_lost();
                                }
                            }
                            RouterAction::HeartbeatAck => {
                                if let Some(heart) = heartbeater.as_mut() {
                                    heart.ack();
                                    self.info.write().latency = heart.latency();
                                    self.router.context().events.heartbeat_ack(self.id(), heart.latency());
                                }
                            }
                            RouterAction::HeartbeatRequested => {
                                if !self.send(outbound, payload::heartbeat(self.session.last_sequence)).await {
                                    return self.connection_lost();
                                }
                            }
                            RouterAction::Reconnect => {
                                info!("Shard {} was asked to reconnect", self.id());
                                // the gateway asked for this, the session is still good
                                self.resume_pending = false;
                                let _ = outbound.send(Outbound::Close(RESUMABLE_CLOSE)).await;
                                return self.connection_lost();
                            }
                            RouterAction::InvalidSession { resumable } => {
                                warn!("Shard {} got an invalid session (resumable: {})", self.id(), resumable);
                                if resumable {
                                    self.resume_pending = false;
                                }
                                let _ = outbound.send(Outbound::Close(RESUMABLE_CLOSE)).await;
                                return self.connection_lost();
                            }
                            RouterAction::Ready => {
                                self.awaiting_ready = false;
                                self.resume_pending = false;
                                self.identify_failures = 0;
                                self.backoff.reset();
                                self.set_state(ConnectionState::Ready);
                            }
                            RouterAction::Resumed | RouterAction::Dispatched => {
                                // any dispatch after a resume means the gateway took it
                                if self.state == ConnectionState::Resuming {
                                    self.resume_pending = false;
                                    self.backoff.reset();
                                    self.set_state(ConnectionState::Ready);
                                }
                            }
                            RouterAction::Ignored => {}
                        }
                    }
                    Inbound::Closed(code) => {
                        info!("Shard {} connection closed with code {:?}", self.id(), code);
                        match code.map(classify_close) {
                            Some(CloseAction::Fatal) => {
                                return ConnectionEnd::Fatal(GatewayError::FatalClose(code.unwrap_or_default()));
                            }
                            Some(CloseAction::Reidentify) => {
                                self.session.clear();
                                return self.connection_lost();
                            }
                            Some(CloseAction::Resume) | None => return self.connection_lost(),
                        }
                    }
                    Inbound::Error(e) => {
                        warn!("Shard {} lost its connection: {}", self.id(), e);
                        return self.connection_lost();
                    }
                }
            }
        }
    }

    /// Resume if we still have a session, identify otherwise.
    async fn login(&mut self, outbound: &mpsc::Sender<Outbound>) -> bool {
        if let Some(session_id) = self.session.session_id.clone() {
            info!("Shard {} resuming session {}", self.id(), session_id);
            self.set_state(ConnectionState::Resuming);
            self.resume_pending = true;
            let frame = payload::resume(&self.config.token, &session_id, self.session.last_sequence);
            self.send(outbound, frame).await
        } else {
            info!("Shard {} identifying", self.id());
            self.session.clear();
            self.sync_info();
            self.set_state(ConnectionState::Identifying);
            self.awaiting_ready = true;
            let frame = payload::identify(
                &self.config.token,
                self.config.intents,
                [self.config.shard_id, self.config.total_shards],
                &self.config.properties,
            );
            self.send(outbound, frame).await
        }
    }

    async fn send(&self, outbound: &mpsc::Sender<Outbound>, frame: GatewayPayload) -> bool {
        if outbound.send(Outbound::Payload(frame)).await.is_err() {
            warn!("Shard {} writer is gone", self.id());
            return false;
        }
        true
    }

    /// Decide what to do after losing the socket, giving up after too many identifies that never
    /// got a READY. A resume the gateway never confirmed isn't tried again.
    fn connection_lost(&mut self) -> ConnectionEnd {
        if self.resume_pending {
            self.resume_pending = false;
            warn!(
                "Shard {} lost the connection before its resume was confirmed, identifying instead",
                self.id()
            );
            self.session.clear();
            return ConnectionEnd::Reidentify;
        }
        if self.awaiting_ready {
            self.awaiting_ready = false;
            self.identify_failures += 1;
            if self.identify_failures >= self.config.max_identify_failures {
                return ConnectionEnd::Fatal(GatewayError::IdentifyRejected(self.identify_failures));
            }
        }
        if self.session.can_resume() {
            ConnectionEnd::Resume
        } else {
            ConnectionEnd::Reidentify
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        debug!("Shard {} is now {}", self.id(), state.name());
        self.state = state;
        self.info.write().state = state;
        self.router.context().events.shard_state(self.id(), state);
    }

    fn sync_info(&self) {
        let mut info = self.info.write();
        info.session_id.clone_from(&self.session.session_id);
        info.last_sequence = self.session.last_sequence;
    }
}

async fn next_beat(beats: &mut Option<Interval>) {
    match beats {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Resolves once shutdown was requested, or once nobody can request it anymore.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
