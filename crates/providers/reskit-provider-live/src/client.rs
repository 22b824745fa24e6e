//! Socket.IO websocket client
//!
//! One supervisor task owns the websocket. It answers engine pings, turns
//! socket events into [`LiveEvent`]s and writes queued room commands. When the
//! connection drops it reconnects with exponential backoff; callers see a
//! `Disconnected` event followed by a fresh `Connected` once the namespace is
//! accepted again.

use crate::codec::{EnginePacket, SocketPacket};
use crate::events::{LiveEvent, RoomCommand};
use futures_util::{SinkExt, StreamExt};
use reskit_core::{ClientConfig, ProjectId, ReskitError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::time::Instant;
use tokio_tungstenite::{
    connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, warn};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Room membership and teardown, as seen by the chat view
pub trait LiveChannel: Send + Sync {
    /// Emit `join {projectId}`
    fn join(&self, project: &ProjectId) -> Result<()>;

    /// Emit `leave {projectId}`
    fn leave(&self, project: &ProjectId) -> Result<()>;

    /// Disconnect and stop reconnecting
    fn close(&self) -> Result<()>;
}

/// Live channel settings
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// Websocket endpoint including the Engine.IO query
    pub socket_url: Url,
    /// Limit for opening the websocket and receiving the handshake
    pub connect_timeout: Duration,
    /// Reconnect after an unexpected drop
    pub reconnect: bool,
    /// First reconnect delay; doubles per failed attempt
    pub reconnect_delay: Duration,
    /// Upper bound for the reconnect delay
    pub max_reconnect_delay: Duration,
}

impl LiveConfig {
    /// Derive the live endpoint from the HTTP service settings
    pub fn from_client_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            socket_url: socket_url(&config.base_url)?,
            connect_timeout: config.connect_timeout,
            reconnect: true,
            reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(30),
        })
    }

    /// Delay before reconnect attempt `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.reconnect_delay
            .saturating_mul(factor)
            .min(self.max_reconnect_delay)
    }
}

/// `http://host/` → `ws://host/socket.io/?EIO=4&transport=websocket`
pub fn socket_url(base: &Url) -> Result<Url> {
    let mut url = base
        .join("/socket.io/")
        .map_err(|e| ReskitError::config(format!("Invalid live endpoint: {}", e)))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ReskitError::config(format!(
                "Unsupported scheme for live channel: {}",
                other
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| ReskitError::config("Cannot switch to a websocket scheme"))?;
    url.query_pairs_mut()
        .clear()
        .append_pair("EIO", "4")
        .append_pair("transport", "websocket");
    Ok(url)
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Opening the websocket or waiting for the namespace
    Connecting,
    /// Namespace accepted
    Connected,
    /// Dropped, waiting to reconnect
    Disconnected,
    /// Closed for good
    Closed,
}

enum Outbound {
    Frame(String),
    Close,
}

enum SessionEnd {
    Closed,
    Dropped(String),
    Refused(String),
}

/// Deadline for the next sign of life from the server
struct Heartbeat {
    window: Duration,
    deadline: Instant,
}

impl Heartbeat {
    fn arm(&mut self, window: Duration) {
        self.window = window;
        self.beat();
    }

    fn beat(&mut self) {
        self.deadline = Instant::now() + self.window;
    }
}

enum Step {
    Reply(String),
    Continue,
    End(String),
    Refuse(String),
}

/// Reconnecting Socket.IO client for the chat rooms
pub struct LiveClient {
    config: LiveConfig,
    command_tx: Option<mpsc::UnboundedSender<Outbound>>,
    state: Arc<RwLock<ConnectionState>>,
}

impl LiveClient {
    /// Create an unconnected client
    pub fn new(config: LiveConfig) -> Self {
        Self {
            config,
            command_tx: None,
            state: Arc::new(RwLock::new(ConnectionState::Closed)),
        }
    }

    /// Open the websocket and start the supervisor task
    ///
    /// The first attempt is awaited so an unreachable service is reported to
    /// the caller. Events arrive on the returned receiver.
    pub async fn connect(&mut self) -> Result<mpsc::UnboundedReceiver<LiveEvent>> {
        *self.state.write().await = ConnectionState::Connecting;
        let ws = match Self::open(&self.config).await {
            Ok(ws) => ws,
            Err(e) => {
                *self.state.write().await = ConnectionState::Closed;
                return Err(e);
            }
        };

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let config = self.config.clone();
        let state = self.state.clone();
        tokio::spawn(async move {
            Self::supervise(config, ws, command_rx, event_tx, state).await;
        });

        self.command_tx = Some(command_tx);
        Ok(event_rx)
    }

    /// Current state
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    fn emit(&self, command: RoomCommand) -> Result<()> {
        debug!(event = command.name(), "Queueing room command");
        let frame = SocketPacket::event(command.name(), vec![command.payload()]).into_frame();
        self.send(Outbound::Frame(frame))
    }

    fn send(&self, outbound: Outbound) -> Result<()> {
        self.command_tx
            .as_ref()
            .ok_or_else(|| ReskitError::live("live channel is not connected"))?
            .send(outbound)
            .map_err(|_| ReskitError::live("live channel has stopped"))
    }

    async fn open(config: &LiveConfig) -> Result<WsStream> {
        info!(url = %config.socket_url, "Opening live channel");
        let (ws, _) = tokio::time::timeout(
            config.connect_timeout,
            connect_async(config.socket_url.as_str()),
        )
        .await
        .map_err(|_| {
            ReskitError::live(format!("timed out connecting to {}", config.socket_url))
        })?
        .map_err(|e| ReskitError::live(format!("failed to connect: {}", e)))?;
        Ok(ws)
    }

    async fn supervise(
        config: LiveConfig,
        first: WsStream,
        mut command_rx: mpsc::UnboundedReceiver<Outbound>,
        event_tx: mpsc::UnboundedSender<LiveEvent>,
        state: Arc<RwLock<ConnectionState>>,
    ) {
        let mut next = Some(first);
        let mut attempt: u32 = 0;

        loop {
            let ws = match next.take() {
                Some(ws) => ws,
                None => {
                    *state.write().await = ConnectionState::Connecting;
                    match Self::open(&config).await {
                        Ok(ws) => ws,
                        Err(e) => {
                            warn!(error = %e, attempt, "Reconnect failed");
                            let _ = event_tx.send(LiveEvent::Error(e.to_string()));
                            attempt += 1;
                            if !Self::wait_before_retry(&config, attempt, &mut command_rx).await {
                                break;
                            }
                            continue;
                        }
                    }
                }
            };

            match Self::run_session(&config, ws, &mut command_rx, &event_tx, &state).await {
                SessionEnd::Closed => break,
                SessionEnd::Refused(reason) => {
                    warn!(%reason, "Live channel refused; not reconnecting");
                    break;
                }
                SessionEnd::Dropped(reason) => {
                    *state.write().await = ConnectionState::Disconnected;
                    if !config.reconnect {
                        warn!(%reason, "Live channel dropped");
                        break;
                    }
                    attempt = 1;
                    warn!(%reason, "Live channel dropped, reconnecting");
                    if !Self::wait_before_retry(&config, attempt, &mut command_rx).await {
                        break;
                    }
                }
            }
        }

        *state.write().await = ConnectionState::Closed;
        info!("Live channel closed");
    }

    /// Sleep out the backoff; `false` when a close arrives meanwhile
    async fn wait_before_retry(
        config: &LiveConfig,
        attempt: u32,
        command_rx: &mut mpsc::UnboundedReceiver<Outbound>,
    ) -> bool {
        let delay = config.backoff(attempt);
        debug!(?delay, attempt, "Waiting before reconnect");
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                command = command_rx.recv() => match command {
                    Some(Outbound::Frame(frame)) => {
                        debug!(%frame, "Dropping frame while disconnected");
                    }
                    Some(Outbound::Close) | None => return false,
                },
            }
        }
    }

    async fn run_session(
        config: &LiveConfig,
        ws: WsStream,
        command_rx: &mut mpsc::UnboundedReceiver<Outbound>,
        event_tx: &mpsc::UnboundedSender<LiveEvent>,
        state: &Arc<RwLock<ConnectionState>>,
    ) -> SessionEnd {
        let (mut sink, mut stream) = ws.split();
        let mut connected = false;
        // until the handshake arrives the connect timeout applies
        let mut heartbeat = Heartbeat {
            window: config.connect_timeout,
            deadline: Instant::now() + config.connect_timeout,
        };

        let end = loop {
            tokio::select! {
                incoming = stream.next() => match incoming {
                    Some(Ok(WsMessage::Text(text))) => {
                        let step = Self::handle_frame(
                            &text,
                            &mut connected,
                            &mut heartbeat,
                            event_tx,
                            state,
                        )
                        .await;
                        match step {
                            Step::Reply(reply) => {
                                if let Err(e) = sink.send(WsMessage::Text(reply)).await {
                                    break SessionEnd::Dropped(format!("send failed: {}", e));
                                }
                            }
                            Step::Continue => {}
                            Step::End(reason) => break SessionEnd::Dropped(reason),
                            Step::Refuse(reason) => break SessionEnd::Refused(reason),
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        break SessionEnd::Dropped("server closed the connection".to_string());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!(error = %e, "Live channel read failed");
                        break SessionEnd::Dropped(e.to_string());
                    }
                },
                command = command_rx.recv() => match command {
                    Some(Outbound::Frame(frame)) => {
                        if !connected {
                            debug!(%frame, "Dropping frame before namespace connect");
                            continue;
                        }
                        if let Err(e) = sink.send(WsMessage::Text(frame)).await {
                            break SessionEnd::Dropped(format!("send failed: {}", e));
                        }
                    }
                    Some(Outbound::Close) | None => {
                        let _ = sink
                            .send(WsMessage::Text(SocketPacket::disconnect().into_frame()))
                            .await;
                        let _ = sink.send(WsMessage::Close(None)).await;
                        break SessionEnd::Closed;
                    }
                },
                _ = tokio::time::sleep_until(heartbeat.deadline) => {
                    break SessionEnd::Dropped("heartbeat timed out".to_string());
                }
            }
        };

        if connected {
            let reason = match &end {
                SessionEnd::Closed => "closed by client".to_string(),
                SessionEnd::Dropped(reason) | SessionEnd::Refused(reason) => reason.clone(),
            };
            let _ = event_tx.send(LiveEvent::Disconnected { reason });
        }
        end
    }

    async fn handle_frame(
        text: &str,
        connected: &mut bool,
        heartbeat: &mut Heartbeat,
        event_tx: &mpsc::UnboundedSender<LiveEvent>,
        state: &Arc<RwLock<ConnectionState>>,
    ) -> Step {
        let packet = match EnginePacket::decode(text) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed engine frame");
                return Step::Continue;
            }
        };

        match packet {
            EnginePacket::Open(handshake) => {
                debug!(sid = %handshake.sid, "Engine handshake");
                heartbeat.arm(Duration::from_millis(
                    handshake.ping_interval + handshake.ping_timeout,
                ));
                Step::Reply(SocketPacket::connect().into_frame())
            }
            EnginePacket::Ping(payload) => {
                heartbeat.beat();
                Step::Reply(EnginePacket::Pong(payload).encode())
            }
            EnginePacket::Close => Step::End("server closed the session".to_string()),
            EnginePacket::Message(body) => match SocketPacket::decode(&body) {
                Ok(SocketPacket::Connect { .. }) => {
                    *connected = true;
                    *state.write().await = ConnectionState::Connected;
                    info!("Live channel connected");
                    let _ = event_tx.send(LiveEvent::Connected);
                    Step::Continue
                }
                Ok(SocketPacket::Disconnect { .. }) => {
                    Step::End("server disconnected the namespace".to_string())
                }
                Ok(SocketPacket::Event { name, args, .. }) => {
                    debug!(event = %name, "Live event");
                    for event in LiveEvent::from_socket_event(&name, args) {
                        let _ = event_tx.send(event);
                    }
                    Step::Continue
                }
                Ok(SocketPacket::ConnectError { data, .. }) => {
                    let reason = data
                        .get("message")
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| data.to_string());
                    warn!(%reason, "Namespace connection refused");
                    let _ = event_tx.send(LiveEvent::Error(reason.clone()));
                    Step::Refuse(reason)
                }
                Ok(SocketPacket::Ack { .. }) => Step::Continue,
                Err(e) => {
                    warn!(error = %e, "Ignoring malformed socket packet");
                    Step::Continue
                }
            },
            EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => Step::Continue,
        }
    }
}

impl LiveChannel for LiveClient {
    fn join(&self, project: &ProjectId) -> Result<()> {
        self.emit(RoomCommand::Join(project.clone()))
    }

    fn leave(&self, project: &ProjectId) -> Result<()> {
        self.emit(RoomCommand::Leave(project.clone()))
    }

    fn close(&self) -> Result<()> {
        self.send(Outbound::Close)
    }
}
