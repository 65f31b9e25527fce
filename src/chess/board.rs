//! Board snapshot and square arithmetic
//!
//! The board is a linear array of signed piece ids: positive values are
//! white pieces, negative values black, zero is an empty square. Square
//! indexing is a1 = 0 through h8 = 63 (rank * 8 + file), matching the
//! coordinate frame the UCI protocol and FEN use.

use std::fmt;

pub type Board = [i8; 64];
pub type Square = i8;

pub const PAWN_ID: i8 = 1;
pub const KNIGHT_ID: i8 = 2;
pub const BISHOP_ID: i8 = 3;
pub const ROOK_ID: i8 = 4;
pub const QUEEN_ID: i8 = 5;
pub const KING_ID: i8 = 6;

pub const W_PAWN: i8 = PAWN_ID;
pub const W_KING: i8 = KING_ID;
pub const B_PAWN: i8 = -PAWN_ID;
pub const B_KING: i8 = -KING_ID;

/// Side to move / piece ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// Sign used by the board encoding (1 for White, -1 for Black).
    #[inline]
    pub fn sign(self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    #[inline]
    pub fn opponent(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

/// Convert file and rank (both 0-7) to a linear square index.
#[inline]
pub fn square_at(file: i8, rank: i8) -> Square {
    rank * 8 + file
}

/// File (0 = a) of a square.
#[inline]
pub fn file_of(sq: Square) -> i8 {
    sq % 8
}

/// Rank (0 = rank 1) of a square.
#[inline]
pub fn rank_of(sq: Square) -> i8 {
    sq / 8
}

/// Check that file/rank coordinates are on the board.
#[inline]
pub fn on_board(file: i8, rank: i8) -> bool {
    (0..8).contains(&file) && (0..8).contains(&rank)
}

/// Check if a piece belongs to a color. Empty squares belong to nobody.
#[inline]
pub fn piece_belongs_to(piece: i8, color: Color) -> bool {
    match color {
        Color::White => piece > 0,
        Color::Black => piece < 0,
    }
}

/// Color of a piece, if any.
#[inline]
pub fn color_of(piece: i8) -> Option<Color> {
    if piece > 0 {
        Some(Color::White)
    } else if piece < 0 {
        Some(Color::Black)
    } else {
        None
    }
}

/// Parse an algebraic square name like "e4".
pub fn parse_square(name: &str) -> Option<Square> {
    let bytes = name.as_bytes();
    if bytes.len() != 2 {
        return None;
    }
    let file = (bytes[0] as i8) - b'a' as i8;
    let rank = (bytes[1] as i8) - b'1' as i8;
    if on_board(file, rank) {
        Some(square_at(file, rank))
    } else {
        None
    }
}

/// Algebraic name of a square ("e4").
pub fn square_name(sq: Square) -> String {
    let file = (b'a' + file_of(sq) as u8) as char;
    let rank = (b'1' + rank_of(sq) as u8) as char;
    format!("{file}{rank}")
}

/// FEN character for a piece id, uppercase for white.
pub fn piece_char(piece: i8) -> char {
    let c = match piece.abs() {
        PAWN_ID => 'p',
        KNIGHT_ID => 'n',
        BISHOP_ID => 'b',
        ROOK_ID => 'r',
        QUEEN_ID => 'q',
        KING_ID => 'k',
        _ => '?',
    };
    if piece > 0 {
        c.to_ascii_uppercase()
    } else {
        c
    }
}

/// Piece id (always positive) for a FEN character, with its color.
pub fn piece_from_char(c: char) -> Option<i8> {
    let id = match c.to_ascii_lowercase() {
        'p' => PAWN_ID,
        'n' => KNIGHT_ID,
        'b' => BISHOP_ID,
        'r' => ROOK_ID,
        'q' => QUEEN_ID,
        'k' => KING_ID,
        _ => return None,
    };
    Some(if c.is_ascii_uppercase() { id } else { -id })
}

/// Standard starting position.
pub fn starting_board() -> Board {
    let mut board = [0i8; 64];
    let back_rank = [
        ROOK_ID, KNIGHT_ID, BISHOP_ID, QUEEN_ID, KING_ID, BISHOP_ID, KNIGHT_ID, ROOK_ID,
    ];
    for file in 0..8 {
        board[square_at(file, 0) as usize] = back_rank[file as usize];
        board[square_at(file, 1) as usize] = W_PAWN;
        board[square_at(file, 6) as usize] = B_PAWN;
        board[square_at(file, 7) as usize] = -back_rank[file as usize];
    }
    board
}

/// Render the piece-placement field of a FEN string.
pub fn board_to_fen_field(board: &Board) -> String {
    let mut out = String::new();
    for rank in (0..8).rev() {
        let mut empty = 0;
        for file in 0..8 {
            let piece = board[square_at(file, rank) as usize];
            if piece == 0 {
                empty += 1;
            } else {
                if empty > 0 {
                    out.push(char::from_digit(empty, 10).unwrap_or('0'));
                    empty = 0;
                }
                out.push(piece_char(piece));
            }
        }
        if empty > 0 {
            out.push(char::from_digit(empty, 10).unwrap_or('0'));
        }
        if rank > 0 {
            out.push('/');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_roundtrip() {
        for file in 0..8 {
            for rank in 0..8 {
                let sq = square_at(file, rank);
                assert_eq!(file_of(sq), file);
                assert_eq!(rank_of(sq), rank);
            }
        }
    }

    #[test]
    fn test_square_names() {
        assert_eq!(parse_square("a1"), Some(0));
        assert_eq!(parse_square("h1"), Some(7));
        assert_eq!(parse_square("a8"), Some(56));
        assert_eq!(parse_square("h8"), Some(63));
        assert_eq!(parse_square("e4"), Some(28));
        assert_eq!(parse_square("i4"), None);
        assert_eq!(parse_square("e9"), None);
        assert_eq!(square_name(28), "e4");
    }

    #[test]
    fn test_starting_board_layout() {
        let board = starting_board();
        assert_eq!(board[parse_square("e1").unwrap() as usize], KING_ID);
        assert_eq!(board[parse_square("e8").unwrap() as usize], B_KING);
        assert_eq!(board[parse_square("e2").unwrap() as usize], W_PAWN);
        assert_eq!(board[parse_square("d8").unwrap() as usize], -QUEEN_ID);
        assert_eq!(board[parse_square("e4").unwrap() as usize], 0);
    }

    #[test]
    fn test_starting_fen_field() {
        assert_eq!(
            board_to_fen_field(&starting_board()),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR"
        );
    }

    #[test]
    fn test_piece_ownership() {
        assert!(piece_belongs_to(W_PAWN, Color::White));
        assert!(piece_belongs_to(B_KING, Color::Black));
        assert!(!piece_belongs_to(0, Color::White));
        assert!(!piece_belongs_to(0, Color::Black));
        assert_eq!(color_of(W_PAWN), Some(Color::White));
        assert_eq!(color_of(0), None);
    }
}
