//! Player Registry
//!
//! Process-wide map from the client-supplied identity token to a player
//! record. Records are created lazily on first reference and never evicted.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::game::state::LobbyId;

/// Opaque identity token supplied by the client (accepted as-is).
pub type PlayerId = String;

/// A known player.
///
/// Hands are owned by the lobby seat, not the player record, so that every
/// hand mutation happens under the lobby lock.
#[derive(Debug, Clone, Default)]
pub struct Player {
    /// Identity token.
    pub id: PlayerId,
    /// Nickname from the last Join.
    pub nickname: String,
    /// Lobby the player last joined.
    pub lobby_id: Option<LobbyId>,
}

impl Player {
    /// Create a fresh record.
    pub fn new(id: impl Into<PlayerId>) -> Self {
        Self {
            id: id.into(),
            nickname: String::new(),
            lobby_id: None,
        }
    }
}

/// Shared handle to a player record.
pub type PlayerHandle = Arc<RwLock<Player>>;

/// Registry of all players seen by this process.
#[derive(Default)]
pub struct PlayerRegistry {
    players: RwLock<BTreeMap<PlayerId, PlayerHandle>>,
}

impl PlayerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a player, creating the record on first reference.
    pub async fn get_or_create(&self, id: &str) -> PlayerHandle {
        if let Some(player) = self.players.read().await.get(id) {
            return player.clone();
        }

        let mut players = self.players.write().await;
        players
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(Player::new(id))))
            .clone()
    }

    /// Get a player if known.
    pub async fn get(&self, id: &str) -> Option<PlayerHandle> {
        self.players.read().await.get(id).cloned()
    }

    /// Number of known players.
    pub async fn player_count(&self) -> usize {
        self.players.read().await.len()
    }
}
