//! Game Logic Module
//!
//! Players, lobbies and the Durak turn state machine.
//!
//! ## Module Structure
//!
//! - `player`: Identity-token keyed player registry
//! - `state`: Lobby data model, dealing and hand order
//! - `rules`: Attack / Defend transitions and the beats rule
//! - `snapshot`: Per-player projection and GetState layout
//! - `lobby`: Matchmaking, lobby registry and eviction

pub mod player;
pub mod state;
pub mod rules;
pub mod snapshot;
pub mod lobby;

// Re-export key types
pub use player::{Player, PlayerHandle, PlayerId, PlayerRegistry};
pub use state::{Lobby, LobbyId, LobbyStatus, HAND_SIZE};
pub use rules::{can_beat, DefendAction, GameError};
pub use snapshot::{ClientStatus, StateSnapshot};
pub use lobby::{JoinOutcome, LobbyHandle, LobbyManager};
