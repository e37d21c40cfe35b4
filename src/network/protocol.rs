//! Protocol Messages
//!
//! Handler codes and request payload layouts. All integers little-endian.
//!
//! | code | name     | payload in                                  |
//! |------|----------|---------------------------------------------|
//! | 2    | Join     | UTF-8 nickname                              |
//! | 3    | GetState | none                                        |
//! | 4    | Attack   | `[u32 count][count × u16 card code]`        |
//! | 5    | Defend   | `[u8 flag][u32 count][count × u16 code]`    |
//!
//! A Defend flag of `0` means pass; the card list is then absent.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::card::CardCode;
use crate::game::rules::DefendAction;

// =============================================================================
// HANDLER CODES
// =============================================================================

/// Request codes understood by the game handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u16)]
pub enum HandlerCode {
    /// Join matchmaking with a nickname.
    Join = 2,
    /// Query the per-player snapshot.
    GetState = 3,
    /// Lay down attack cards.
    Attack = 4,
    /// Cover the attack or pass.
    Defend = 5,
}

impl HandlerCode {
    /// All codes, in wire order.
    pub const ALL: [HandlerCode; 4] = [
        HandlerCode::Join,
        HandlerCode::GetState,
        HandlerCode::Attack,
        HandlerCode::Defend,
    ];

    /// Wire value.
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Look up a wire value.
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }
}

// =============================================================================
// PAYLOAD PARSING
// =============================================================================

/// Malformed request payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Payload ended before a declared field.
    #[error("payload truncated: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required.
        needed: usize,
        /// Bytes present.
        available: usize,
    },
    /// Identity token is not ASCII.
    #[error("identity token is not ASCII")]
    InvalidToken,
}

impl ProtocolError {
    /// Wire status code.
    pub fn status_code(&self) -> u16 {
        1
    }
}

fn read_u32(payload: &[u8], offset: usize) -> Result<u32, ProtocolError> {
    let bytes = payload.get(offset..offset + 4).ok_or(ProtocolError::Truncated {
        needed: offset + 4,
        available: payload.len(),
    })?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_card_list(payload: &[u8], offset: usize) -> Result<Vec<CardCode>, ProtocolError> {
    let count = read_u32(payload, offset)? as usize;
    let start = offset + 4;
    let needed = count.checked_mul(2)
        .and_then(|len| len.checked_add(start))
        .ok_or(ProtocolError::Truncated { needed: usize::MAX, available: payload.len() })?;

    let body = payload.get(start..needed).ok_or(ProtocolError::Truncated {
        needed,
        available: payload.len(),
    })?;
    Ok(body.chunks_exact(2)
        .map(|pair| CardCode(u16::from_le_bytes([pair[0], pair[1]])))
        .collect())
}

/// Parse an Attack payload. Trailing bytes are ignored.
pub fn parse_attack(payload: &[u8]) -> Result<Vec<CardCode>, ProtocolError> {
    read_card_list(payload, 0)
}

/// Parse a Defend payload.
pub fn parse_defend(payload: &[u8]) -> Result<DefendAction, ProtocolError> {
    let flag = *payload.first().ok_or(ProtocolError::Truncated { needed: 1, available: 0 })?;
    if flag == 0 {
        return Ok(DefendAction::Pass);
    }
    Ok(DefendAction::Cover(read_card_list(payload, 1)?))
}

/// Parse a Join payload. Invalid UTF-8 is replaced, never rejected.
pub fn parse_nickname(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload).into_owned()
}

// =============================================================================
// PAYLOAD BUILDING (client side)
// =============================================================================

fn write_card_list(out: &mut Vec<u8>, cards: &[CardCode]) {
    out.extend_from_slice(&(cards.len() as u32).to_le_bytes());
    for card in cards {
        out.extend_from_slice(&card.to_le_bytes());
    }
}

/// Build an Attack payload.
pub fn attack_payload(cards: &[CardCode]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 2 * cards.len());
    write_card_list(&mut out, cards);
    out
}

/// Build a Defend payload.
pub fn defend_payload(action: &DefendAction) -> Vec<u8> {
    match action {
        DefendAction::Pass => vec![0],
        DefendAction::Cover(cards) => {
            let mut out = Vec::with_capacity(5 + 2 * cards.len());
            out.push(1);
            write_card_list(&mut out, cards);
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::card::{Card, Rank, Suit};

    #[test]
    fn test_handler_codes() {
        assert_eq!(HandlerCode::from_code(2), Some(HandlerCode::Join));
        assert_eq!(HandlerCode::from_code(5), Some(HandlerCode::Defend));
        assert_eq!(HandlerCode::from_code(1), None);
        assert_eq!(HandlerCode::from_code(6), None);
        assert_eq!(HandlerCode::Attack.code(), 4);
    }

    #[test]
    fn test_parse_attack() {
        let seven = Card::new(Suit::Hearts, Rank::Seven).code();
        let payload = [1, 0, 0, 0, seven.to_le_bytes()[0], seven.to_le_bytes()[1]];
        assert_eq!(parse_attack(&payload), Ok(vec![seven]));
        assert_eq!(parse_attack(&[0, 0, 0, 0]), Ok(vec![]));
    }

    #[test]
    fn test_parse_attack_truncated() {
        assert_eq!(
            parse_attack(&[1, 0]),
            Err(ProtocolError::Truncated { needed: 4, available: 2 })
        );
        // Count says two cards, only one present
        assert_eq!(
            parse_attack(&[2, 0, 0, 0, 1, 0]),
            Err(ProtocolError::Truncated { needed: 8, available: 6 })
        );
        assert!(parse_attack(&[0xFF, 0xFF, 0xFF, 0xFF]).is_err());
    }

    #[test]
    fn test_parse_defend() {
        assert_eq!(parse_defend(&[0]), Ok(DefendAction::Pass));
        // Pass ignores anything after the flag
        assert_eq!(parse_defend(&[0, 9, 9]), Ok(DefendAction::Pass));

        let ace = Card::new(Suit::Spades, Rank::Ace).code();
        let payload = defend_payload(&DefendAction::Cover(vec![ace]));
        assert_eq!(payload[0], 1);
        assert_eq!(parse_defend(&payload), Ok(DefendAction::Cover(vec![ace])));

        assert!(parse_defend(&[]).is_err());
        assert!(parse_defend(&[1, 1, 0]).is_err());
    }

    #[test]
    fn test_parse_nickname() {
        assert_eq!(parse_nickname(b"Alice"), "Alice");
        assert_eq!(parse_nickname(&[b'A', 0xFF]), "A\u{FFFD}");
        assert_eq!(parse_nickname(&[]), "");
    }

    #[test]
    fn test_malformed_status() {
        let err = parse_attack(&[]).unwrap_err();
        assert_eq!(err.status_code(), 1);
    }
}
