//! Card Codec
//!
//! 36-card Durak deck and the compact 16-bit wire code for a card.
//!
//! ## Wire Code
//!
//! ```text
//! ┌──────────────┬──────────────┐
//! │ suit (8 bit) │ rank (8 bit) │
//! └──────────────┴──────────────┘
//! ```
//!
//! An absent card is encoded as `0xFFFF`. Decoding returns an explicit
//! `Option<Card>` rather than a sentinel card, so absent and out-of-range
//! codes never masquerade as real cards.

use std::fmt;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Number of cards in a full deck.
pub const DECK_SIZE: usize = 36;

// =============================================================================
// SUIT / RANK
// =============================================================================

/// Card suit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Suit {
    /// Hearts
    Hearts = 0,
    /// Diamonds
    Diamonds = 1,
    /// Spades
    Spades = 2,
    /// Clubs
    Clubs = 3,
}

impl Suit {
    /// All suits in wire order.
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Spades, Suit::Clubs];

    /// Get suit from its wire index (0-3).
    pub fn from_index(index: u8) -> Option<Suit> {
        Self::ALL.get(index as usize).copied()
    }
}

/// Card rank.
///
/// Lower numeric value means a stronger card: `Ace = 0` beats everything
/// of its suit, `Six = 8` beats nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Rank {
    /// Ace (strongest)
    Ace = 0,
    /// King
    King = 1,
    /// Queen
    Queen = 2,
    /// Jack
    Jack = 3,
    /// Ten
    Ten = 4,
    /// Nine
    Nine = 5,
    /// Eight
    Eight = 6,
    /// Seven
    Seven = 7,
    /// Six (weakest)
    Six = 8,
}

impl Rank {
    /// All ranks in wire order.
    pub const ALL: [Rank; 9] = [
        Rank::Ace, Rank::King, Rank::Queen, Rank::Jack, Rank::Ten,
        Rank::Nine, Rank::Eight, Rank::Seven, Rank::Six,
    ];

    /// Get rank from its wire index (0-8).
    pub fn from_index(index: u8) -> Option<Rank> {
        Self::ALL.get(index as usize).copied()
    }
}

// =============================================================================
// CARD
// =============================================================================

/// A playing card. Two cards are equal iff suit and rank match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    /// Suit
    pub suit: Suit,
    /// Rank
    pub rank: Rank,
}

impl Card {
    /// Create a card.
    pub const fn new(suit: Suit, rank: Rank) -> Self {
        Self { suit, rank }
    }

    /// Encode to the 16-bit wire code.
    #[inline]
    pub fn code(self) -> CardCode {
        CardCode(((self.suit as u16) << 8) | self.rank as u16)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} of {:?}", self.rank, self.suit)
    }
}

// =============================================================================
// CARD CODE
// =============================================================================

/// Error decoding a card code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid card code {0:#06x}")]
pub struct CardCodeError(pub u16);

/// 16-bit wire representation of an optional card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardCode(pub u16);

impl CardCode {
    /// Code of an absent card (suit and rank bytes both `0xFF`).
    pub const NONE: CardCode = CardCode(0xFFFF);

    /// Suit byte.
    pub fn suit_byte(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Rank byte.
    pub fn rank_byte(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Decode. `Ok(None)` for [`CardCode::NONE`], `Err` for any other code
    /// that is not a card of the deck.
    pub fn card(self) -> Result<Option<Card>, CardCodeError> {
        if self == Self::NONE {
            return Ok(None);
        }
        match (Suit::from_index(self.suit_byte()), Rank::from_index(self.rank_byte())) {
            (Some(suit), Some(rank)) => Ok(Some(Card::new(suit, rank))),
            _ => Err(CardCodeError(self.0)),
        }
    }

    /// Little-endian bytes as they appear on the wire.
    pub fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }
}

impl From<Card> for CardCode {
    fn from(card: Card) -> Self {
        card.code()
    }
}

impl From<Option<Card>> for CardCode {
    fn from(card: Option<Card>) -> Self {
        card.map(Card::code).unwrap_or(CardCode::NONE)
    }
}

/// Encode an optional card.
pub fn encode(card: Option<Card>) -> CardCode {
    CardCode::from(card)
}

/// Decode a raw wire code.
pub fn decode(code: u16) -> Result<Option<Card>, CardCodeError> {
    CardCode(code).card()
}

/// Build an ordered 36-card deck: every suit crossed with every rank, once.
pub fn build_deck() -> Vec<Card> {
    Suit::ALL
        .iter()
        .flat_map(|&suit| Rank::ALL.iter().map(move |&rank| Card::new(suit, rank)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use proptest::prelude::*;

    #[test]
    fn test_code_layout() {
        let card = Card::new(Suit::Spades, Rank::Seven);
        assert_eq!(card.code(), CardCode(0x0207));
        assert_eq!(card.code().to_le_bytes(), [0x07, 0x02]);
    }

    #[test]
    fn test_every_card_roundtrips() {
        for card in build_deck() {
            assert_eq!(decode(encode(Some(card)).0), Ok(Some(card)));
        }
    }

    #[test]
    fn test_absent_card() {
        assert_eq!(encode(None), CardCode::NONE);
        assert_eq!(CardCode::NONE.card(), Ok(None));
    }

    #[test]
    fn test_out_of_range_codes_rejected() {
        assert_eq!(decode(0x0409), Err(CardCodeError(0x0409)));
        assert_eq!(decode(0x0009), Err(CardCodeError(0x0009)));
        // One 0xFF byte is not the absent card
        assert_eq!(decode(0xFF00), Err(CardCodeError(0xFF00)));
    }

    #[test]
    fn test_build_deck_unique() {
        let deck = build_deck();
        assert_eq!(deck.len(), DECK_SIZE);
        let unique: HashSet<_> = deck.iter().collect();
        assert_eq!(unique.len(), DECK_SIZE);
    }

    proptest! {
        #[test]
        fn prop_decode_never_panics(code in any::<u16>()) {
            if let Ok(Some(card)) = decode(code) {
                prop_assert_eq!(card.code().0, code);
            }
        }
    }
}
