//! # Durak Game Server
//!
//! Authoritative server for two-player Durak over a compact binary protocol.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       DURAK SERVER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/              - Primitives                             │
//! │  ├── card.rs        - Suits, ranks, 16-bit card codes        │
//! │  └── rng.rs         - Seeded Xorshift128+ and shuffle        │
//! │                                                              │
//! │  game/              - Game logic                             │
//! │  ├── player.rs      - Player registry                        │
//! │  ├── state.rs       - Lobby model, dealing, hand order       │
//! │  ├── rules.rs       - Attack / Defend state machine          │
//! │  ├── snapshot.rs    - Per-player GetState view               │
//! │  └── lobby.rs       - Matchmaking and lobby registry         │
//! │                                                              │
//! │  network/           - Networking                             │
//! │  ├── codec.rs       - Incremental frame decoder              │
//! │  ├── dispatcher.rs  - Code → async handler routing           │
//! │  ├── protocol.rs    - Handler codes, payload layouts         │
//! │  ├── handlers.rs    - Join / GetState / Attack / Defend      │
//! │  ├── single_shot.rs - Token-in-body transport                │
//! │  └── server.rs      - TCP, WebSocket, HTTP listeners, config │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! - Each connection decodes and dispatches its frames one at a time, so
//!   responses leave in request order.
//! - Each lobby sits behind its own mutex; the two players' requests
//!   against it are serialized.
//! - Joins are serialized by the single open-lobby slot.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use crate::core::card::{Card, CardCode, Rank, Suit};
pub use crate::core::rng::DeterministicRng;
pub use crate::game::lobby::LobbyManager;
pub use crate::game::player::{PlayerId, PlayerRegistry};
pub use crate::game::state::{Lobby, LobbyStatus};
pub use crate::network::server::{GameServer, GameServerError, ServerConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
