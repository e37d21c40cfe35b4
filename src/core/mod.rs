//! Core primitives.
//!
//! Card identity and wire codes, plus the seeded RNG used to shuffle decks.
//! Nothing here touches I/O or shared state.

pub mod card;
pub mod rng;

// Re-export core types
pub use card::{build_deck, Card, CardCode, CardCodeError, Rank, Suit, DECK_SIZE};
pub use rng::{derive_lobby_seed, DeterministicRng};
