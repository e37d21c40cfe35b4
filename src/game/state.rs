//! Lobby State
//!
//! The shared match context for two players: deck, trump, piles, seats and
//! turn state, plus the dealing logic that keeps hands topped up.
//!
//! Card conservation: deck + both hands + fall pile + attack pile always
//! hold the 36 cards of the original deck exactly once. The trump card is a
//! reference into the deck (its last card), not a separate pile.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use tracing::info;

use crate::core::card::{build_deck, Card, Suit};
use crate::core::rng::DeterministicRng;
use crate::game::player::PlayerId;

/// Lobby identifier (UUID string).
pub type LobbyId = String;

/// Hands are topped up to this many cards.
pub const HAND_SIZE: usize = 6;

/// Players per lobby.
pub const LOBBY_CAPACITY: usize = 2;

/// Shuffle passes applied to a fresh deck.
pub const DEFAULT_SHUFFLE_ROUNDS: u32 = 10;

/// Stored lobby status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LobbyStatus {
    /// Waiting for a second player.
    Idle,
    /// `player_move` must attack.
    Move,
    /// `player_move` must defend or pass.
    Def,
    /// Game over, `winner` is set.
    Finish,
}

/// One participant and their hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    /// Seated player.
    pub player_id: PlayerId,
    /// Cards held, kept sorted by [`sort_hand`].
    pub hand: Vec<Card>,
}

/// A two-player Durak match.
#[derive(Debug, Clone)]
pub struct Lobby {
    /// Lobby identifier.
    pub id: LobbyId,
    /// Current status.
    pub status: LobbyStatus,
    /// Remaining deck; cards are dealt from the front.
    pub deck: Vec<Card>,
    /// Trump reference card (last card of the shuffled deck).
    pub trump: Card,
    /// Cards successfully defended and out of play.
    pub fall_pile: Vec<Card>,
    /// Cards laid down by the attacker, awaiting defense.
    pub attack_pile: Vec<Card>,
    /// Player whose action is expected.
    pub player_move: Option<PlayerId>,
    /// Winner once finished.
    pub winner: Option<PlayerId>,
    /// Seats in join order.
    seats: Vec<Seat>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time the game finished.
    pub finished_at: Option<DateTime<Utc>>,
}

impl Lobby {
    /// Create a lobby with a freshly shuffled deck.
    pub fn new(id: LobbyId, seed: u64) -> Self {
        let mut deck = build_deck();
        let mut rng = DeterministicRng::new(seed);
        rng.shuffle_rounds(&mut deck, DEFAULT_SHUFFLE_ROUNDS);
        let trump = deck[deck.len() - 1];
        Self::with_deck(id, deck, trump)
    }

    /// Create a lobby from an explicit deck and trump card.
    pub fn with_deck(id: LobbyId, deck: Vec<Card>, trump: Card) -> Self {
        Self {
            id,
            status: LobbyStatus::Idle,
            deck,
            trump,
            fall_pile: Vec::new(),
            attack_pile: Vec::new(),
            player_move: None,
            winner: None,
            seats: Vec::with_capacity(LOBBY_CAPACITY),
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Trump suit.
    pub fn trump_suit(&self) -> Suit {
        self.trump.suit
    }

    /// Seat a player with an empty hand. Returns false if already seated or full.
    pub fn seat(&mut self, player_id: PlayerId) -> bool {
        if self.is_full() || self.contains(&player_id) {
            return false;
        }
        self.seats.push(Seat { player_id, hand: Vec::new() });
        true
    }

    /// Seats in join order.
    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    /// Both players present.
    pub fn is_full(&self) -> bool {
        self.seats.len() >= LOBBY_CAPACITY
    }

    /// Is the player seated here.
    pub fn contains(&self, player_id: &str) -> bool {
        self.seats.iter().any(|s| s.player_id == player_id)
    }

    /// Hand of a seated player.
    pub fn hand(&self, player_id: &str) -> Option<&[Card]> {
        self.seats.iter()
            .find(|s| s.player_id == player_id)
            .map(|s| s.hand.as_slice())
    }

    pub(crate) fn hand_mut(&mut self, player_id: &str) -> Option<&mut Vec<Card>> {
        self.seats.iter_mut()
            .find(|s| s.player_id == player_id)
            .map(|s| &mut s.hand)
    }

    /// The other seated player.
    pub fn opponent_of(&self, player_id: &str) -> Option<&PlayerId> {
        self.seats.iter()
            .map(|s| &s.player_id)
            .find(|id| id.as_str() != player_id)
    }

    /// Deal, sort and hand the first move to the first joiner.
    pub fn start_game(&mut self) {
        self.deal();
        self.sort_hands();
        self.status = LobbyStatus::Move;
        self.player_move = self.seats.first().map(|s| s.player_id.clone());
        info!("Lobby {} started, trump {}", self.id, self.trump);
    }

    /// Deal round-robin in join order, one card per short hand per round,
    /// until every hand holds [`HAND_SIZE`] cards or the deck runs out.
    pub fn deal(&mut self) {
        loop {
            let mut dealt = false;
            for seat in &mut self.seats {
                if seat.hand.len() >= HAND_SIZE {
                    continue;
                }
                if self.deck.is_empty() {
                    return;
                }
                seat.hand.push(self.deck.remove(0));
                dealt = true;
            }
            if !dealt {
                return;
            }
        }
    }

    /// Sort every hand.
    pub fn sort_hands(&mut self) {
        let trump_suit = self.trump_suit();
        for seat in &mut self.seats {
            sort_hand(&mut seat.hand, trump_suit);
        }
    }

    /// Top hands back up, then finish the game if a hand is still empty.
    ///
    /// The first seat (join order) with an empty hand wins.
    pub fn refill_and_check_win(&mut self) {
        self.deal();
        self.sort_hands();

        let winner = self.seats.iter()
            .find(|s| s.hand.is_empty())
            .map(|s| s.player_id.clone());

        if let Some(winner) = winner {
            info!("Lobby {} finished, winner {}", self.id, winner);
            self.status = LobbyStatus::Finish;
            self.winner = Some(winner);
            self.finished_at = Some(Utc::now());
        }
    }

    /// Total cards across deck, hands and piles.
    pub fn card_count(&self) -> usize {
        self.deck.len()
            + self.fall_pile.len()
            + self.attack_pile.len()
            + self.seats.iter().map(|s| s.hand.len()).sum::<usize>()
    }
}

/// Order a hand: non-trump cards before trumps, then strongest rank first
/// (lowest numeric rank), then by suit.
pub fn sort_hand(hand: &mut [Card], trump_suit: Suit) {
    hand.sort_by_key(|c| (c.suit == trump_suit, c.rank, c.suit));
}
