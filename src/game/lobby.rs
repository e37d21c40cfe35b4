//! Lobby Manager
//!
//! Pairs joining players first-come-first-paired and owns every lobby.
//! Each lobby sits behind its own mutex, so Attack/Defend/GetState from the
//! two participants are serialized per lobby.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use chrono::{Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::core::rng::derive_lobby_seed;
use crate::game::player::PlayerHandle;
use crate::game::state::{Lobby, LobbyId, LobbyStatus};

/// Shared handle to a lobby.
pub type LobbyHandle = Arc<Mutex<Lobby>>;

/// Result of a join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Lobby the player now sits in.
    pub lobby_id: LobbyId,
    /// The join filled the lobby and started the game.
    pub started: bool,
}

/// Owns all lobbies and the single open (waiting) lobby slot.
#[derive(Default)]
pub struct LobbyManager {
    lobbies: RwLock<BTreeMap<LobbyId, LobbyHandle>>,
    /// Lobby waiting for a second player. Held for the whole join.
    open: Mutex<Option<LobbyId>>,
}

impl LobbyManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the open lobby (creating one if needed); starts the game when
    /// the second player arrives.
    pub async fn join(&self, player: &PlayerHandle, nickname: String) -> JoinOutcome {
        let mut open = self.open.lock().await;

        let waiting = match open.as_ref() {
            Some(id) => self.get(id).await.map(|lobby| (id.clone(), lobby)),
            None => None,
        };
        let (lobby_id, lobby) = match waiting {
            Some(found) => found,
            None => {
                let created = self.create_lobby().await;
                *open = Some(created.0.clone());
                created
            }
        };

        let mut lobby = lobby.lock().await;
        let mut player = player.write().await;
        player.nickname = nickname;
        player.lobby_id = Some(lobby_id.clone());

        if !lobby.seat(player.id.clone()) {
            debug!("Player {} already waiting in lobby {}", player.id, lobby_id);
            return JoinOutcome { lobby_id, started: false };
        }
        info!("Player {} ({}) joined lobby {}", player.id, player.nickname, lobby_id);

        let started = lobby.is_full();
        if started {
            lobby.start_game();
            *open = None;
        }

        JoinOutcome { lobby_id, started }
    }

    async fn create_lobby(&self) -> (LobbyId, LobbyHandle) {
        let uuid = uuid::Uuid::new_v4();
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        let seed = derive_lobby_seed(uuid.as_bytes(), nonce);
        let id = uuid.to_string();
        let handle = Arc::new(Mutex::new(Lobby::new(id.clone(), seed)));

        let mut lobbies = self.lobbies.write().await;
        lobbies.insert(id.clone(), handle.clone());
        info!("Created lobby {}", id);
        (id, handle)
    }

    /// Get a lobby by id.
    pub async fn get(&self, id: &str) -> Option<LobbyHandle> {
        self.lobbies.read().await.get(id).cloned()
    }

    /// Lobby the player last joined, if it still exists.
    pub async fn lobby_of(&self, player: &PlayerHandle) -> Option<LobbyHandle> {
        let lobby_id = player.read().await.lobby_id.clone()?;
        self.get(&lobby_id).await
    }

    /// Id of the lobby currently waiting for a second player.
    pub async fn open_lobby(&self) -> Option<LobbyId> {
        self.open.lock().await.clone()
    }

    /// Number of lobbies retained.
    pub async fn lobby_count(&self) -> usize {
        self.lobbies.read().await.len()
    }

    /// Drop finished lobbies whose game ended more than `ttl` ago.
    /// Returns the number removed.
    pub async fn evict_finished(&self, ttl: Duration) -> usize {
        let cutoff = Utc::now() - ttl;
        let mut lobbies = self.lobbies.write().await;
        let mut expired = Vec::new();

        for (id, lobby) in lobbies.iter() {
            let lobby = lobby.lock().await;
            let done = lobby.status == LobbyStatus::Finish
                && lobby.finished_at.map_or(false, |t| t <= cutoff);
            if done {
                expired.push(id.clone());
            }
        }

        for id in &expired {
            lobbies.remove(id);
        }
        if !expired.is_empty() {
            info!("Evicted {} finished lobbies", expired.len());
        }
        expired.len()
    }
}
