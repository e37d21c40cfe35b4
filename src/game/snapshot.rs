//! Per-Player State Snapshot
//!
//! GetState response layout (all integers little-endian):
//!
//! ```text
//! ┌────────┬───────┬──────┬──────┬──────────┬──────────────┬─────────────┬──────────┐
//! │ status │ trump │ deck │ fall │ own hand │ opponent hand│ attack pile │ reserved │
//! │ i8     │ u16   │ u8   │ u8   │ seq      │ seq (hidden) │ seq         │ seq (0)  │
//! └────────┴───────┴──────┴──────┴──────────┴──────────────┴─────────────┴──────────┘
//! seq = [u32 count][count × u16 card code]
//! ```
//!
//! Deck and fall counts saturate at 255. Opponent cards are sent as
//! [`CardCode::NONE`] so only their count is revealed.

use serde::{Serialize, Deserialize};

use crate::core::card::CardCode;
use crate::game::state::{Lobby, LobbyStatus};

/// Status as seen by one player. Computed at query time, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i8)]
pub enum ClientStatus {
    /// Waiting for an opponent.
    Idle = 0,
    /// Opponent is attacking.
    OpponentMove = 1,
    /// Your attack.
    YourMove = 2,
    /// Opponent is defending.
    OpponentDef = 3,
    /// Your defense.
    YourDef = 4,
    /// You won.
    Win = 6,
    /// You lost.
    Lose = 7,
}

impl Lobby {
    /// Project the stored status for `player_id`.
    pub fn status_for(&self, player_id: &str) -> ClientStatus {
        let is_active = self.player_move.as_deref() == Some(player_id);
        match self.status {
            LobbyStatus::Idle => ClientStatus::Idle,
            LobbyStatus::Move if is_active => ClientStatus::YourMove,
            LobbyStatus::Move => ClientStatus::OpponentMove,
            LobbyStatus::Def if is_active => ClientStatus::YourDef,
            LobbyStatus::Def => ClientStatus::OpponentDef,
            LobbyStatus::Finish if self.winner.as_deref() == Some(player_id) => ClientStatus::Win,
            LobbyStatus::Finish => ClientStatus::Lose,
        }
    }

    /// Build the snapshot for `player_id`.
    pub fn snapshot_for(&self, player_id: &str) -> StateSnapshot {
        let opponent_cards = self.opponent_of(player_id)
            .and_then(|id| self.hand(id))
            .map_or(0, |hand| hand.len());

        StateSnapshot {
            status: self.status_for(player_id),
            trump: self.trump.code(),
            deck_count: self.deck.len(),
            fall_count: self.fall_pile.len(),
            hand: self.hand(player_id)
                .map(|hand| hand.iter().map(|c| c.code()).collect())
                .unwrap_or_default(),
            opponent_hand: vec![CardCode::NONE; opponent_cards],
            attack_pile: self.attack_pile.iter().map(|c| c.code()).collect(),
        }
    }
}

/// One player's view of a lobby.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    /// Projected status.
    pub status: ClientStatus,
    /// Trump card.
    pub trump: CardCode,
    /// Cards left in the deck.
    pub deck_count: usize,
    /// Cards in the fall pile.
    pub fall_count: usize,
    /// Requesting player's hand.
    pub hand: Vec<CardCode>,
    /// Opponent hand, every card hidden.
    pub opponent_hand: Vec<CardCode>,
    /// Current attack pile.
    pub attack_pile: Vec<CardCode>,
}

impl StateSnapshot {
    /// Serialize to the fixed wire layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let sequences = [&self.hand, &self.opponent_hand, &self.attack_pile];
        let size = 5 + sequences.iter().map(|s| 4 + 2 * s.len()).sum::<usize>() + 4;
        let mut out = Vec::with_capacity(size);

        out.push(self.status as i8 as u8);
        out.extend_from_slice(&self.trump.to_le_bytes());
        out.push(self.deck_count.min(u8::MAX as usize) as u8);
        out.push(self.fall_count.min(u8::MAX as usize) as u8);

        for seq in sequences {
            write_sequence(&mut out, seq);
        }
        // Reserved trailing sequence
        write_sequence(&mut out, &[]);

        out
    }
}

fn write_sequence(out: &mut Vec<u8>, codes: &[CardCode]) {
    out.extend_from_slice(&(codes.len() as u32).to_le_bytes());
    for code in codes {
        out.extend_from_slice(&code.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::card::{Card, Rank, Suit, DECK_SIZE};
    use crate::game::rules::DefendAction;
    use crate::game::state::{fixtures, HAND_SIZE};

    #[test]
    fn test_idle_projection() {
        let mut lobby = Lobby::new("l".to_string(), 1);
        lobby.seat("alice".to_string());
        assert_eq!(lobby.status_for("alice"), ClientStatus::Idle);

        let snapshot = lobby.snapshot_for("alice");
        assert!(snapshot.hand.is_empty());
        assert!(snapshot.opponent_hand.is_empty());
        assert_eq!(snapshot.deck_count, DECK_SIZE);
    }

    #[test]
    fn test_move_and_def_projection() {
        let mut lobby = fixtures::scripted_lobby();
        assert_eq!(lobby.status_for("alice"), ClientStatus::YourMove);
        assert_eq!(lobby.status_for("bob"), ClientStatus::OpponentMove);

        let seven = Card::new(Suit::Hearts, Rank::Seven).code();
        lobby.attack("alice", &[seven]).unwrap();
        assert_eq!(lobby.status_for("alice"), ClientStatus::OpponentDef);
        assert_eq!(lobby.status_for("bob"), ClientStatus::YourDef);
    }

    #[test]
    fn test_finish_projection() {
        let mut lobby = fixtures::scripted_lobby();
        let seven = Card::new(Suit::Hearts, Rank::Seven);
        let mut deck = std::mem::take(&mut lobby.deck);
        lobby.fall_pile.append(&mut deck);
        let alice = lobby.hand_mut("alice").unwrap();
        let rest: Vec<Card> = alice.iter().copied().filter(|c| *c != seven).collect();
        alice.retain(|c| *c == seven);
        lobby.fall_pile.extend(rest);

        lobby.attack("alice", &[seven.code()]).unwrap();
        lobby.defend("bob", DefendAction::Cover(vec![Card::new(Suit::Spades, Rank::Ace).code()])).unwrap();

        assert_eq!(lobby.status_for("alice"), ClientStatus::Win);
        assert_eq!(lobby.status_for("bob"), ClientStatus::Lose);
        assert_eq!(lobby.snapshot_for("alice").to_bytes()[0], 6);
        assert_eq!(lobby.snapshot_for("bob").to_bytes()[0], 7);
    }

    #[test]
    fn test_snapshot_layout() {
        let mut lobby = fixtures::scripted_lobby();
        let seven = Card::new(Suit::Hearts, Rank::Seven).code();
        lobby.attack("alice", &[seven]).unwrap();

        let bytes = lobby.snapshot_for("bob").to_bytes();
        let bob_hand = lobby.hand("bob").unwrap();

        assert_eq!(bytes[0], ClientStatus::YourDef as u8);
        assert_eq!(&bytes[1..3], &fixtures::TRUMP.code().to_le_bytes());
        assert_eq!(bytes[3], (DECK_SIZE - 2 * HAND_SIZE) as u8);
        assert_eq!(bytes[4], 0);

        // Own hand
        let mut offset = 5;
        assert_eq!(&bytes[offset..offset + 4], &(HAND_SIZE as u32).to_le_bytes());
        offset += 4;
        for card in bob_hand {
            assert_eq!(&bytes[offset..offset + 2], &card.code().to_le_bytes());
            offset += 2;
        }

        // Opponent hand is hidden
        assert_eq!(&bytes[offset..offset + 4], &((HAND_SIZE - 1) as u32).to_le_bytes());
        offset += 4;
        for _ in 0..HAND_SIZE - 1 {
            assert_eq!(&bytes[offset..offset + 2], &[0xFF, 0xFF]);
            offset += 2;
        }

        // Attack pile
        assert_eq!(&bytes[offset..offset + 4], &1u32.to_le_bytes());
        offset += 4;
        assert_eq!(&bytes[offset..offset + 2], &seven.to_le_bytes());
        offset += 2;

        // Reserved
        assert_eq!(&bytes[offset..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_counts_saturate() {
        let snapshot = StateSnapshot {
            status: ClientStatus::Idle,
            trump: CardCode::NONE,
            deck_count: 300,
            fall_count: 256,
            hand: vec![],
            opponent_hand: vec![],
            attack_pile: vec![],
        };
        let bytes = snapshot.to_bytes();
        assert_eq!(bytes[3], 255);
        assert_eq!(bytes[4], 255);
        assert_eq!(bytes.len(), 5 + 16);
    }
}
