//! Game Server
//!
//! Async listeners for the two transports:
//!
//! - **Stream (TCP)**: length-prefixed frames, one identity token per
//!   connection, requests on a connection handled strictly in order.
//! - **Single-shot**: one request per message, token carried in the body.
//!   Served as WebSocket binary messages and as plain HTTP bodies (any
//!   method, any path; the reply body is the response).

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use serde::{Serialize, Deserialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, RwLock};
use tokio::time::interval;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use axum::body::Bytes;
use axum::extract::State;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn, error, debug, instrument};

use crate::game::lobby::LobbyManager;
use crate::game::player::PlayerRegistry;
use crate::network::codec::{encode_frame, FrameDecoder, FrameError, LengthWidth, DEFAULT_MAX_PAYLOAD};
use crate::network::dispatcher::Dispatcher;
use crate::network::handlers::register_game_handlers;
use crate::network::single_shot;

/// Default stream listener port.
pub const DEFAULT_PORT: u16 = 2021;

const READ_BUFFER_LEN: usize = 8 * 1024;

/// Longest pause between eviction sweeps.
const MAX_EVICTION_INTERVAL_SECS: u64 = 60;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Stream (TCP) bind address.
    pub bind_addr: SocketAddr,
    /// Single-shot WebSocket bind address. Disabled when `None`.
    pub ws_bind_addr: Option<SocketAddr>,
    /// Single-shot HTTP bind address. Disabled when `None`.
    pub http_bind_addr: Option<SocketAddr>,
    /// Maximum concurrent stream and WebSocket connections.
    pub max_connections: usize,
    /// Largest accepted frame payload.
    pub max_payload_len: usize,
    /// Length-field width of the stream protocol.
    pub length_width: LengthWidth,
    /// Finished lobbies are dropped this long after the game ends.
    /// Kept forever when `None`.
    pub lobby_ttl_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            ws_bind_addr: None,
            http_bind_addr: None,
            max_connections: 1000,
            max_payload_len: DEFAULT_MAX_PAYLOAD,
            length_width: LengthWidth::Standard,
            lobby_ttl_secs: None,
        }
    }
}

impl ServerConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, GameServerError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&text).map_err(|e| GameServerError::Config(e.to_string()))
    }

    /// Apply `DURAK_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<(), GameServerError> {
        if let Some(addr) = env_parse::<SocketAddr>("DURAK_BIND_ADDR")? {
            self.bind_addr = addr;
        }
        if let Some(addr) = env_parse::<SocketAddr>("DURAK_WS_BIND_ADDR")? {
            self.ws_bind_addr = Some(addr);
        }
        if let Some(addr) = env_parse::<SocketAddr>("DURAK_HTTP_BIND_ADDR")? {
            self.http_bind_addr = Some(addr);
        }
        if let Some(max) = env_parse::<usize>("DURAK_MAX_CONNECTIONS")? {
            self.max_connections = max;
        }
        if let Some(max) = env_parse::<usize>("DURAK_MAX_PAYLOAD")? {
            self.max_payload_len = max;
        }
        if let Ok(wide) = std::env::var("DURAK_WIDE_LENGTH") {
            self.length_width = if wide == "1" || wide == "true" {
                LengthWidth::Wide
            } else {
                LengthWidth::Standard
            };
        }
        if let Some(ttl) = env_parse::<u64>("DURAK_LOBBY_TTL_SECS")? {
            self.lobby_ttl_secs = Some(ttl);
        }
        Ok(())
    }
}

fn env_parse<T>(name: &str) -> Result<Option<T>, GameServerError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value.parse().map(Some)
            .map_err(|e| GameServerError::Config(format!("{}={:?}: {}", name, value, e))),
        Err(_) => Ok(None),
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Socket or file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Stream could not be decoded.
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    /// Connection limit reached.
    #[error("Connection limit reached")]
    ConnectionLimitReached,

    /// Bad configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transport {
    Stream,
    SingleShot,
}

/// Connected client state.
struct ConnectedClient {
    transport: Transport,
    connected_at: Instant,
}

type Clients = Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>;

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Player registry.
    players: Arc<PlayerRegistry>,
    /// Lobby manager.
    lobbies: Arc<LobbyManager>,
    /// Handler routing.
    dispatcher: Arc<Dispatcher>,
    /// Connected clients.
    clients: Clients,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server with the game handlers registered.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let players = Arc::new(PlayerRegistry::new());
        let lobbies = Arc::new(LobbyManager::new());

        let mut dispatcher = Dispatcher::new(players.clone());
        register_game_handlers(&mut dispatcher, lobbies.clone());

        Self {
            config,
            players,
            lobbies,
            dispatcher: Arc::new(dispatcher),
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured addresses and serve until shutdown.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        let ws_listener = match self.config.ws_bind_addr {
            Some(addr) => Some(TcpListener::bind(addr).await?),
            None => None,
        };
        match self.config.http_bind_addr {
            Some(addr) => {
                let http_listener = TcpListener::bind(addr).await?;
                tokio::try_join!(
                    self.serve(listener, ws_listener),
                    self.serve_http(http_listener),
                )?;
                Ok(())
            }
            None => self.serve(listener, ws_listener).await,
        }
    }

    /// Serve single-shot requests over HTTP until shutdown. Each request
    /// body is one single-shot request; the reply is always `200`.
    #[instrument(skip_all)]
    pub async fn serve_http(&self, listener: TcpListener) -> Result<(), GameServerError> {
        info!("Single-shot HTTP listening on {}", listener.local_addr()?);

        let app = Router::new()
            .fallback(handle_http)
            .with_state(self.dispatcher.clone());

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;
        Ok(())
    }

    /// Serve on already-bound listeners until shutdown.
    #[instrument(skip_all)]
    pub async fn serve(
        &self,
        listener: TcpListener,
        ws_listener: Option<TcpListener>,
    ) -> Result<(), GameServerError> {
        info!("Game server listening on {} ({:?} length)", listener.local_addr()?, self.config.length_width);
        if let Some(ws) = &ws_listener {
            info!("Single-shot WebSocket listening on {}", ws.local_addr()?);
        }

        let eviction_handle = self.config.lobby_ttl_secs.map(|ttl| {
            let lobbies = self.lobbies.clone();
            tokio::spawn(async move {
                Self::run_eviction_loop(lobbies, ttl).await;
            })
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.register_client(addr, Transport::Stream).await {
                                self.handle_stream(stream, addr);
                            }
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                result = accept_optional(&ws_listener) => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.register_client(addr, Transport::SingleShot).await {
                                self.handle_websocket(stream, addr);
                            }
                        }
                        Err(e) => {
                            error!("WebSocket accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        if let Some(handle) = eviction_handle {
            handle.abort();
        }

        Ok(())
    }

    /// Record a new client unless the connection limit is reached.
    async fn register_client(&self, addr: SocketAddr, transport: Transport) -> bool {
        let mut clients = self.clients.write().await;
        if clients.len() >= self.config.max_connections {
            warn!("{}, rejecting {}", GameServerError::ConnectionLimitReached, addr);
            return false;
        }
        info!("New {:?} connection from {}", transport, addr);
        clients.insert(addr, ConnectedClient { transport, connected_at: Instant::now() });
        true
    }

    async fn unregister_client(clients: &Clients, addr: SocketAddr) {
        if let Some(client) = clients.write().await.remove(&addr) {
            info!("{:?} client {} disconnected after {:?}", client.transport, addr, client.connected_at.elapsed());
        }
    }

    /// Handle a stream connection on its own task.
    fn handle_stream(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let dispatcher = self.dispatcher.clone();
        let config = self.config.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let token = uuid::Uuid::new_v4().simple().to_string();
            debug!("Connection {} has token {}", addr, token);

            tokio::select! {
                result = Self::serve_stream(stream, &token, &dispatcher, &config) => {
                    match result {
                        Ok(()) => debug!("Client {} closed the stream", addr),
                        Err(GameServerError::Frame(e)) => warn!("Dropping {}: {}", addr, e),
                        Err(e) => error!("Stream error for {}: {}", addr, e),
                    }
                }
                _ = shutdown_rx.recv() => {
                    debug!("Closing {} for shutdown", addr);
                }
            }

            Self::unregister_client(&clients, addr).await;
        });
    }

    /// Decode-and-dispatch loop for one stream connection. A new chunk is
    /// read only after every frame of the previous one has been answered.
    async fn serve_stream(
        mut stream: TcpStream,
        token: &str,
        dispatcher: &Dispatcher,
        config: &ServerConfig,
    ) -> Result<(), GameServerError> {
        let mut decoder = FrameDecoder::new(config.length_width, config.max_payload_len);
        let mut buf = vec![0u8; READ_BUFFER_LEN];
        let mut frames = Vec::new();

        loop {
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                return Ok(());
            }

            // Frames ahead of a bad header are answered before the drop
            let decoded = decoder.feed(&buf[..n], &mut frames);
            for frame in frames.drain(..) {
                let response = dispatcher.dispatch(token, frame.code, frame.payload).await;
                let bytes = encode_frame(response.status, &response.payload, decoder.width());
                stream.write_all(&bytes).await?;
            }
            decoded?;
        }
    }

    /// Handle a single-shot WebSocket connection on its own task.
    fn handle_websocket(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let dispatcher = self.dispatcher.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    Self::unregister_client(&clients, addr).await;
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Binary(body))) => {
                                let response = single_shot::serve(&dispatcher, &body).await;
                                if let Err(e) = ws_sender.send(Message::Binary(response)).await {
                                    error!("WebSocket send failed for {}: {}", addr, e);
                                    break;
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            Some(Ok(other)) => {
                                debug!("Ignoring non-binary message from {}: {:?}", addr, other);
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = ws_sender.send(Message::Close(None)).await;
                        break;
                    }
                }
            }

            Self::unregister_client(&clients, addr).await;
        });
    }

    /// Periodically drop finished lobbies older than `ttl_secs`.
    async fn run_eviction_loop(lobbies: Arc<LobbyManager>, ttl_secs: u64) {
        let period = ttl_secs.clamp(1, MAX_EVICTION_INTERVAL_SECS);
        let mut interval = interval(Duration::from_secs(period));
        let ttl = chrono::Duration::seconds(ttl_secs.min(u32::MAX as u64) as i64);

        loop {
            interval.tick().await;
            let evicted = lobbies.evict_finished(ttl).await;
            if evicted > 0 {
                debug!("Eviction sweep removed {} lobbies", evicted);
            }
        }
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Number of retained lobbies.
    pub async fn lobby_count(&self) -> usize {
        self.lobbies.lobby_count().await
    }

    /// Number of known players.
    pub async fn player_count(&self) -> usize {
        self.players.player_count().await
    }
}

async fn handle_http(State(dispatcher): State<Arc<Dispatcher>>, body: Bytes) -> Vec<u8> {
    single_shot::serve(&dispatcher, &body).await
}

/// Accept on `listener`, or wait forever when there is none.
async fn accept_optional(listener: &Option<TcpListener>) -> std::io::Result<(TcpStream, SocketAddr)> {
    match listener {
        Some(listener) => listener.accept().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::codec::Frame;

    fn local_config() -> ServerConfig {
        ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        }
    }

    /// Start a server on ephemeral ports; returns (server, stream addr, ws addr).
    async fn start(config: ServerConfig, with_ws: bool) -> (Arc<GameServer>, SocketAddr, Option<SocketAddr>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let ws_listener = if with_ws {
            Some(TcpListener::bind("127.0.0.1:0").await.unwrap())
        } else {
            None
        };
        let ws_addr = ws_listener.as_ref().map(|l| l.local_addr().unwrap());

        let server = Arc::new(GameServer::new(config));
        let running = server.clone();
        tokio::spawn(async move {
            running.serve(listener, ws_listener).await.unwrap();
        });
        (server, addr, ws_addr)
    }

    async fn read_frames(stream: &mut TcpStream, decoder: &mut FrameDecoder, want: usize) -> Vec<Frame> {
        let mut frames = Vec::new();
        let mut buf = [0u8; 1024];
        while frames.len() < want {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "server closed the stream");
            decoder.feed(&buf[..n], &mut frames).unwrap();
        }
        frames
    }

    async fn request(stream: &mut TcpStream, code: u16, payload: &[u8]) -> Frame {
        let mut decoder = FrameDecoder::new(LengthWidth::Standard, DEFAULT_MAX_PAYLOAD);
        stream.write_all(&encode_frame(code, payload, LengthWidth::Standard)).await.unwrap();
        read_frames(stream, &mut decoder, 1).await.remove(0)
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 2021);
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.max_payload_len, 64 * 1024);
        assert_eq!(config.length_width, LengthWidth::Standard);
        assert!(config.ws_bind_addr.is_none());
        assert!(config.http_bind_addr.is_none());
        assert!(config.lobby_ttl_secs.is_none());
    }

    #[test]
    fn test_config_from_json_file() {
        let path = std::env::temp_dir().join(format!("durak-config-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{"bind_addr":"127.0.0.1:3000","length_width":"wide","lobby_ttl_secs":600}"#).unwrap();

        let config = ServerConfig::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.length_width, LengthWidth::Wide);
        assert_eq!(config.lobby_ttl_secs, Some(600));
        assert_eq!(config.max_connections, 1000);

        assert!(matches!(
            ServerConfig::from_json_file(&path),
            Err(GameServerError::Io(_))
        ));
    }

    #[test]
    fn test_config_env_overrides() {
        std::env::set_var("DURAK_BIND_ADDR", "127.0.0.1:4000");
        std::env::set_var("DURAK_WIDE_LENGTH", "1");
        std::env::set_var("DURAK_MAX_CONNECTIONS", "8");
        std::env::set_var("DURAK_HTTP_BIND_ADDR", "127.0.0.1:4001");

        let mut config = ServerConfig::default();
        config.apply_env().unwrap();
        assert_eq!(config.bind_addr.port(), 4000);
        assert_eq!(config.http_bind_addr, Some("127.0.0.1:4001".parse::<SocketAddr>().unwrap()));
        assert_eq!(config.length_width, LengthWidth::Wide);
        assert_eq!(config.max_connections, 8);

        std::env::set_var("DURAK_MAX_CONNECTIONS", "many");
        assert!(matches!(config.apply_env(), Err(GameServerError::Config(_))));

        for name in ["DURAK_BIND_ADDR", "DURAK_WIDE_LENGTH", "DURAK_MAX_CONNECTIONS", "DURAK_HTTP_BIND_ADDR"] {
            std::env::remove_var(name);
        }
    }

    #[tokio::test]
    async fn test_server_creation() {
        let server = GameServer::new(local_config());

        assert_eq!(server.connection_count().await, 0);
        assert_eq!(server.lobby_count().await, 0);
        assert_eq!(server.player_count().await, 0);
    }

    #[tokio::test]
    async fn test_server_shutdown() {
        let server = GameServer::new(local_config());
        server.shutdown();
        // Should not panic
    }

    #[tokio::test]
    async fn test_stream_game_over_loopback() {
        let (server, addr, _) = start(local_config(), false).await;
        let mut alice = TcpStream::connect(addr).await.unwrap();
        let mut bob = TcpStream::connect(addr).await.unwrap();

        assert_eq!(request(&mut alice, 3, &[]).await, Frame { code: 1, payload: vec![] });
        assert_eq!(request(&mut alice, 2, b"Alice").await.code, 0);
        assert_eq!(request(&mut bob, 2, b"Bob").await.code, 0);

        let state = request(&mut alice, 3, &[]).await;
        assert_eq!(state.code, 0);
        assert_eq!(state.payload[0], 2);
        let state = request(&mut bob, 3, &[]).await;
        assert_eq!(state.payload[0], 1);

        assert_eq!(server.lobby_count().await, 1);
        assert_eq!(server.player_count().await, 2);
        assert_eq!(server.connection_count().await, 2);

        server.shutdown();
    }

    #[tokio::test]
    async fn test_pipelined_requests_answered_in_order() {
        let (server, addr, _) = start(local_config(), false).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        let mut batch = encode_frame(99, &[], LengthWidth::Standard);
        batch.extend(encode_frame(2, b"Solo", LengthWidth::Standard));
        batch.extend(encode_frame(3, &[], LengthWidth::Standard));
        batch.extend(encode_frame(4, &[0, 0, 0, 0], LengthWidth::Standard));
        client.write_all(&batch).await.unwrap();

        let mut decoder = FrameDecoder::new(LengthWidth::Standard, DEFAULT_MAX_PAYLOAD);
        let frames = read_frames(&mut client, &mut decoder, 4).await;
        let statuses: Vec<u16> = frames.iter().map(|f| f.code).collect();
        // unknown, join, state (idle), attack while idle
        assert_eq!(statuses, vec![1, 0, 0, 2]);
        assert_eq!(frames[2].payload[0], 0);

        server.shutdown();
    }

    #[tokio::test]
    async fn test_wide_length_stream() {
        let config = ServerConfig { length_width: LengthWidth::Wide, ..local_config() };
        let (server, addr, _) = start(config, false).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(&encode_frame(3, &[], LengthWidth::Wide)).await.unwrap();
        let mut decoder = FrameDecoder::new(LengthWidth::Wide, DEFAULT_MAX_PAYLOAD);
        let frames = read_frames(&mut client, &mut decoder, 1).await;
        assert_eq!(frames, vec![Frame { code: 1, payload: vec![] }]);

        server.shutdown();
    }

    #[tokio::test]
    async fn test_oversized_frame_drops_connection() {
        let config = ServerConfig { max_payload_len: 16, ..local_config() };
        let (server, addr, _) = start(config, false).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        let mut header = vec![2, 0];
        header.extend_from_slice(&1_000_000u32.to_le_bytes());
        client.write_all(&header).await.unwrap();

        let mut buf = [0u8; 16];
        let read = client.read(&mut buf).await;
        assert!(matches!(read, Ok(0) | Err(_)));

        server.shutdown();
    }

    #[tokio::test]
    async fn test_frame_ahead_of_oversized_header_answered() {
        let config = ServerConfig { max_payload_len: 16, ..local_config() };
        let (server, addr, _) = start(config, false).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        let mut bytes = encode_frame(2, b"Alice", LengthWidth::Standard);
        bytes.extend_from_slice(&[3, 0]);
        bytes.extend_from_slice(&1000u32.to_le_bytes());
        client.write_all(&bytes).await.unwrap();

        let mut decoder = FrameDecoder::new(LengthWidth::Standard, DEFAULT_MAX_PAYLOAD);
        let joined = read_frames(&mut client, &mut decoder, 1).await;
        assert_eq!(joined, vec![Frame { code: 0, payload: vec![] }]);
        assert_eq!(server.lobby_count().await, 1);

        let mut buf = [0u8; 16];
        let read = client.read(&mut buf).await;
        assert!(matches!(read, Ok(0) | Err(_)));

        server.shutdown();
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let config = ServerConfig { max_connections: 1, ..local_config() };
        let (server, addr, _) = start(config, false).await;

        let mut first = TcpStream::connect(addr).await.unwrap();
        assert_eq!(request(&mut first, 2, b"First").await.code, 0);

        let mut second = TcpStream::connect(addr).await.unwrap();
        let _ = second.write_all(&encode_frame(3, &[], LengthWidth::Standard)).await;
        let mut buf = [0u8; 16];
        let read = second.read(&mut buf).await;
        assert!(matches!(read, Ok(0) | Err(_)));

        // First connection is unaffected
        assert_eq!(request(&mut first, 3, &[]).await.code, 0);
        assert_eq!(server.connection_count().await, 1);

        server.shutdown();
    }

    /// One HTTP/1.1 exchange; returns the response status line and body.
    async fn http_exchange(addr: SocketAddr, method: &str, body: &[u8]) -> (String, Vec<u8>) {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let head = format!(
            "{} / HTTP/1.1\r\nHost: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            method, addr, body.len()
        );
        stream.write_all(head.as_bytes()).await.unwrap();
        stream.write_all(body).await.unwrap();

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.unwrap();
        let split = raw.windows(4).position(|w| w == b"\r\n\r\n").unwrap();
        let head = String::from_utf8_lossy(&raw[..split]).into_owned();
        let status_line = head.lines().next().unwrap().to_string();
        (status_line, raw[split + 4..].to_vec())
    }

    #[tokio::test]
    async fn test_single_shot_over_http() {
        let server = Arc::new(GameServer::new(local_config()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let running = server.clone();
        let handle = tokio::spawn(async move { running.serve_http(listener).await });

        let join = |token: &str, name: &[u8]| single_shot::SingleShotRequest {
            code: 2,
            token: token.to_string(),
            payload: name.to_vec(),
        }.to_bytes();

        let (status, body) = http_exchange(addr, "GET", &join("alice001", b"Alice")).await;
        assert!(status.contains("200"), "{}", status);
        assert_eq!(body, vec![0, 0]);

        let (_, body) = http_exchange(addr, "POST", &join("bob00001", b"Bob")).await;
        assert_eq!(body, vec![0, 0]);

        let state = single_shot::SingleShotRequest { code: 3, token: "alice001".to_string(), payload: vec![] };
        let (_, body) = http_exchange(addr, "GET", &state.to_bytes()).await;
        assert_eq!(&body[..2], &[0, 0]);
        assert_eq!(body[2], 2);

        // Short body still gets a 200 with status 1
        let (status, body) = http_exchange(addr, "GET", &[2, 0]).await;
        assert!(status.contains("200"), "{}", status);
        assert_eq!(body, vec![1, 0]);

        assert_eq!(server.lobby_count().await, 1);
        server.shutdown();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_single_shot_over_websocket() {
        let (server, _, ws_addr) = start(local_config(), true).await;
        let ws_addr = ws_addr.unwrap();
        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}", ws_addr)).await.unwrap();

        let join = single_shot::SingleShotRequest {
            code: 2,
            token: "player01".to_string(),
            payload: b"Eve".to_vec(),
        };
        ws.send(Message::Binary(join.to_bytes())).await.unwrap();
        let reply = ws.next().await.unwrap().unwrap();
        assert_eq!(reply, Message::Binary(vec![0, 0]));

        ws.send(Message::Binary(vec![2, 0, b'x'])).await.unwrap();
        let reply = ws.next().await.unwrap().unwrap();
        assert_eq!(reply, Message::Binary(vec![1, 0]));

        assert_eq!(server.player_count().await, 1);
        server.shutdown();
    }
}
