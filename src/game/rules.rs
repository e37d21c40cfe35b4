//! Attack / Defend Rules
//!
//! Turn state machine: `Idle → Move ⇄ Def → Finish`.
//!
//! Every rule violation maps to a small wire status code via
//! [`GameError::status_code`]; nothing else crosses the wire.

use thiserror::Error;

use crate::core::card::{Card, CardCode, Suit};
use crate::game::player::PlayerId;
use crate::game::state::{Lobby, LobbyStatus};

/// Rule violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GameError {
    /// Player is not seated in any lobby.
    #[error("not in a lobby")]
    NotInLobby,
    /// Selection is malformed, mixed-rank, duplicated or not held.
    #[error("invalid card selection")]
    InvalidSelection,
    /// Action not allowed in the current status.
    #[error("wrong game phase")]
    WrongPhase,
    /// Another player is expected to act.
    #[error("not your turn")]
    NotYourTurn,
    /// Attack with no cards.
    #[error("empty attack selection")]
    EmptyAttack,
    /// No opponent seated.
    #[error("no opponent")]
    NoOpponent,
    /// Defending card not held by the defender.
    #[error("defend card not owned")]
    CardNotOwned,
    /// Defending card does not beat its attack card.
    #[error("defend card cannot beat attack card")]
    CannotBeat,
}

impl GameError {
    /// Wire status code.
    pub fn status_code(self) -> u16 {
        match self {
            GameError::NotInLobby | GameError::InvalidSelection => 1,
            GameError::WrongPhase => 2,
            GameError::NotYourTurn => 3,
            GameError::EmptyAttack => 4,
            GameError::NoOpponent => 5,
            GameError::CardNotOwned => 6,
            GameError::CannotBeat => 7,
        }
    }
}

/// Defender's choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefendAction {
    /// Take the whole attack pile.
    Pass,
    /// Cover each attack card with the card at the same position.
    Cover(Vec<CardCode>),
}

/// Does `defend` beat `attack` given the trump suit.
///
/// A trump beats any non-trump; otherwise only a stronger card of the
/// same suit (lower numeric rank) beats.
pub fn can_beat(defend: Card, attack: Card, trump_suit: Suit) -> bool {
    if defend.suit == trump_suit && attack.suit != trump_suit {
        return true;
    }
    defend.suit == attack.suit && defend.rank < attack.rank
}

/// Decode a selection; `None` if any code is not a real card.
fn decode_selection(codes: &[CardCode]) -> Option<Vec<Card>> {
    codes.iter()
        .map(|code| code.card().ok().flatten())
        .collect()
}

fn has_duplicates(cards: &[Card]) -> bool {
    cards.iter()
        .enumerate()
        .any(|(i, card)| cards[i + 1..].contains(card))
}

fn holds_all(hand: &[Card], cards: &[Card]) -> bool {
    cards.iter().all(|card| hand.contains(card))
}

impl Lobby {
    /// Phase, turn and opponent checks shared by Attack and Defend, in that
    /// order. Returns the opponent's id.
    pub fn check_turn(&self, expected: LobbyStatus, player_id: &str) -> Result<PlayerId, GameError> {
        if self.status != expected {
            return Err(GameError::WrongPhase);
        }
        if self.player_move.as_deref() != Some(player_id) {
            return Err(GameError::NotYourTurn);
        }
        self.opponent_of(player_id).cloned().ok_or(GameError::NoOpponent)
    }

    /// Lay down same-rank cards from the attacker's hand.
    pub fn attack(&mut self, player_id: &str, selection: &[CardCode]) -> Result<(), GameError> {
        let defender = self.check_turn(LobbyStatus::Move, player_id)?;

        if selection.is_empty() {
            return Err(GameError::EmptyAttack);
        }
        let cards = decode_selection(selection).ok_or(GameError::InvalidSelection)?;
        let first_rank = cards[0].rank;
        if cards.iter().any(|c| c.rank != first_rank) || has_duplicates(&cards) {
            return Err(GameError::InvalidSelection);
        }

        let hand = self.hand_mut(player_id).ok_or(GameError::NotInLobby)?;
        if !holds_all(hand, &cards) {
            return Err(GameError::InvalidSelection);
        }
        hand.retain(|c| !cards.contains(c));

        self.attack_pile = cards;
        self.player_move = Some(defender);
        self.status = LobbyStatus::Def;
        self.sort_hands();
        Ok(())
    }

    /// Answer the current attack, then refill and check for a winner.
    pub fn defend(&mut self, player_id: &str, action: DefendAction) -> Result<(), GameError> {
        let attacker = self.check_turn(LobbyStatus::Def, player_id)?;

        match action {
            DefendAction::Pass => {
                let taken = std::mem::take(&mut self.attack_pile);
                let hand = self.hand_mut(player_id).ok_or(GameError::NotInLobby)?;
                hand.extend(taken);
                self.player_move = Some(attacker);
            }
            DefendAction::Cover(codes) => {
                if codes.len() != self.attack_pile.len() {
                    return Err(GameError::InvalidSelection);
                }
                let cards = decode_selection(&codes).ok_or(GameError::CardNotOwned)?;
                if has_duplicates(&cards) {
                    return Err(GameError::InvalidSelection);
                }

                let trump_suit = self.trump_suit();
                let beats_all = cards.iter()
                    .zip(self.attack_pile.iter())
                    .all(|(d, a)| can_beat(*d, *a, trump_suit));

                let hand = self.hand_mut(player_id).ok_or(GameError::NotInLobby)?;
                if !holds_all(hand, &cards) {
                    return Err(GameError::CardNotOwned);
                }
                if !beats_all {
                    return Err(GameError::CannotBeat);
                }
                hand.retain(|c| !cards.contains(c));

                let attacked = std::mem::take(&mut self.attack_pile);
                self.fall_pile.extend(attacked);
                self.fall_pile.extend(cards);
                self.player_move = Some(player_id.to_string());
            }
        }

        self.status = LobbyStatus::Move;
        self.refill_and_check_win();
        Ok(())
    }
}
