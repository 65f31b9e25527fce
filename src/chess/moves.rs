//! Move value type and UCI coordinate notation.

use std::fmt;
use std::str::FromStr;

use super::board::{parse_square, square_name, Square, BISHOP_ID, KNIGHT_ID, QUEEN_ID, ROOK_ID};

/// Piece a pawn converts to on the last rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Promotion {
    Queen,
    Rook,
    Bishop,
    Knight,
}

impl Promotion {
    pub const ALL: [Promotion; 4] = [
        Promotion::Queen,
        Promotion::Rook,
        Promotion::Bishop,
        Promotion::Knight,
    ];

    /// Unsigned piece id the pawn turns into.
    pub fn piece_id(self) -> i8 {
        match self {
            Promotion::Queen => QUEEN_ID,
            Promotion::Rook => ROOK_ID,
            Promotion::Bishop => BISHOP_ID,
            Promotion::Knight => KNIGHT_ID,
        }
    }

    pub fn uci_char(self) -> char {
        match self {
            Promotion::Queen => 'q',
            Promotion::Rook => 'r',
            Promotion::Bishop => 'b',
            Promotion::Knight => 'n',
        }
    }

    pub fn from_uci_char(c: char) -> Option<Promotion> {
        match c {
            'q' => Some(Promotion::Queen),
            'r' => Some(Promotion::Rook),
            'b' => Some(Promotion::Bishop),
            'n' => Some(Promotion::Knight),
            _ => None,
        }
    }
}

/// A single move: source square, destination square, optional promotion.
/// Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Promotion>,
}

impl Move {
    pub fn new(from: Square, to: Square) -> Self {
        Move {
            from,
            to,
            promotion: None,
        }
    }

    pub fn promoting(from: Square, to: Square, promotion: Promotion) -> Self {
        Move {
            from,
            to,
            promotion: Some(promotion),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", square_name(self.from), square_name(self.to))?;
        if let Some(promo) = self.promotion {
            write!(f, "{}", promo.uci_char())?;
        }
        Ok(())
    }
}

/// Error parsing UCI coordinate notation.
#[derive(Debug, thiserror::Error)]
#[error("not a move in coordinate notation: {text}")]
pub struct ParseMoveError {
    pub text: String,
}

impl FromStr for Move {
    type Err = ParseMoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseMoveError {
            text: s.to_string(),
        };
        // Length check alone is not enough: slicing below is byte-indexed
        // and must not land inside a multi-byte character.
        if !s.is_ascii() || (s.len() != 4 && s.len() != 5) {
            return Err(err());
        }
        let from = parse_square(&s[0..2]).ok_or_else(err)?;
        let to = parse_square(&s[2..4]).ok_or_else(err)?;
        let promotion = match s.len() {
            5 => Some(
                s.chars()
                    .nth(4)
                    .and_then(Promotion::from_uci_char)
                    .ok_or_else(err)?,
            ),
            _ => None,
        };
        Ok(Move {
            from,
            to,
            promotion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_move() {
        let mv: Move = "e2e4".parse().unwrap();
        assert_eq!(mv.from, parse_square("e2").unwrap());
        assert_eq!(mv.to, parse_square("e4").unwrap());
        assert_eq!(mv.promotion, None);
        assert_eq!(mv.to_string(), "e2e4");
    }

    #[test]
    fn test_parse_promotion_move() {
        let mv: Move = "a7a8q".parse().unwrap();
        assert_eq!(mv.promotion, Some(Promotion::Queen));
        assert_eq!(mv.to_string(), "a7a8q");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Move>().is_err());
        assert!("e2".parse::<Move>().is_err());
        assert!("e2e9".parse::<Move>().is_err());
        assert!("e2e4x".parse::<Move>().is_err());
        assert!("e2e4qq".parse::<Move>().is_err());
    }

    #[test]
    fn test_parse_rejects_non_ascii_without_panicking() {
        // Multi-byte characters must come back as a parse error, never a
        // slice panic, since this parser sees raw engine output.
        assert!("a\u{e9}4".parse::<Move>().is_err());
        assert!("e2e\u{2084}".parse::<Move>().is_err());
        assert!("\u{265e}f3".parse::<Move>().is_err());
    }
}
