//! Position tracker - the authoritative board state
//!
//! A `Position` is a move history plus the snapshot derived from it. The
//! snapshot is always reproducible by replaying the history from the
//! standard starting position, and it is mutated only by appending one
//! legal move at a time through `apply`. Everything downstream (engine
//! adapter, move player, board reader) gets read-only access.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::error::{BotError, BotResult};

use super::board::{
    board_to_fen_field, file_of, rank_of, square_at, square_name, starting_board, Board, Color,
    Square, BISHOP_ID, KING_ID, KNIGHT_ID, PAWN_ID,
};
use super::moves::Move;
use super::rules;

/// Which castlings are still available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastlingRights {
    pub white_kingside: bool,
    pub white_queenside: bool,
    pub black_kingside: bool,
    pub black_queenside: bool,
}

impl Default for CastlingRights {
    fn default() -> Self {
        CastlingRights {
            white_kingside: true,
            white_queenside: true,
            black_kingside: true,
            black_queenside: true,
        }
    }
}

/// Terminal classification of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Ongoing,
    /// Side to move has no legal reply and is in check.
    Checkmate { winner: Color },
    Stalemate,
    /// Fifty-move rule, threefold repetition or dead material.
    DrawByRule,
    /// A resignation (or abort) banner was observed on the page.
    ResignationObserved,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        self != GameStatus::Ongoing
    }
}

/// Tracked game state: move sequence plus derived snapshot.
#[derive(Debug, Clone)]
pub struct Position {
    board: Board,
    side_to_move: Color,
    castling: CastlingRights,
    en_passant: Option<Square>,
    halfmove_clock: u32,
    fullmove_number: u32,
    history: Vec<Move>,
    /// One key per reached position (including the start), for threefold.
    keys: Vec<u64>,
    resigned: bool,
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

impl Position {
    /// Standard starting position, empty history.
    pub fn new() -> Self {
        let mut position = Position {
            board: starting_board(),
            side_to_move: Color::White,
            castling: CastlingRights::default(),
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            history: Vec::new(),
            keys: Vec::new(),
            resigned: false,
        };
        position.keys.push(position.key());
        position
    }

    /// Rebuild a position by replaying a recorded move sequence.
    pub fn replay(moves: &[Move]) -> BotResult<Self> {
        let mut position = Position::new();
        for &mv in moves {
            position.apply(mv)?;
        }
        Ok(position)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn castling(&self) -> CastlingRights {
        self.castling
    }

    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    pub fn history(&self) -> &[Move] {
        &self.history
    }

    /// Moves played so far in UCI notation, for `position startpos moves …`.
    pub fn uci_history(&self) -> Vec<String> {
        self.history.iter().map(|mv| mv.to_string()).collect()
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        rules::legal_moves(self)
    }

    /// Append one legal move. On an illegal move the position is left
    /// completely unchanged and `BotError::IllegalMove` is returned.
    pub fn apply(&mut self, mv: Move) -> BotResult<()> {
        if !self.legal_moves().contains(&mv) {
            return Err(BotError::IllegalMove {
                mv: mv.to_string(),
                reason: format!("not legal for {} in {}", self.side_to_move, self.to_fen()),
            });
        }

        let color = self.side_to_move;
        let piece = self.board[mv.from as usize];
        let is_pawn = piece.abs() == PAWN_ID;
        let is_capture = self.board[mv.to as usize] != 0
            || (is_pawn && Some(mv.to) == self.en_passant && file_of(mv.from) != file_of(mv.to));

        self.update_castling_rights(mv, piece);

        rules::apply_move_to_board(&mut self.board, mv, color, self.en_passant);

        // A double push opens the square behind the pawn for one move.
        self.en_passant = if is_pawn && (rank_of(mv.to) - rank_of(mv.from)).abs() == 2 {
            Some(square_at(file_of(mv.from), (rank_of(mv.from) + rank_of(mv.to)) / 2))
        } else {
            None
        };

        if is_pawn || is_capture {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }
        if color == Color::Black {
            self.fullmove_number += 1;
        }

        self.side_to_move = color.opponent();
        self.history.push(mv);
        let key = self.key();
        self.keys.push(key);
        Ok(())
    }

    fn update_castling_rights(&mut self, mv: Move, piece: i8) {
        if piece.abs() == KING_ID {
            match self.side_to_move {
                Color::White => {
                    self.castling.white_kingside = false;
                    self.castling.white_queenside = false;
                }
                Color::Black => {
                    self.castling.black_kingside = false;
                    self.castling.black_queenside = false;
                }
            }
        }
        // A rook leaving its corner, or anything landing on one, kills the
        // corresponding right.
        for sq in [mv.from, mv.to] {
            match sq {
                0 => self.castling.white_queenside = false,
                7 => self.castling.white_kingside = false,
                56 => self.castling.black_queenside = false,
                63 => self.castling.black_kingside = false,
                _ => {}
            }
        }
    }

    /// Record a resignation/abort observed on the page. The tracker itself
    /// cannot derive this from the move history.
    pub fn mark_resigned(&mut self) {
        self.resigned = true;
    }

    /// Terminal classification of the current position.
    pub fn status(&self) -> GameStatus {
        if self.resigned {
            return GameStatus::ResignationObserved;
        }
        if self.legal_moves().is_empty() {
            return if rules::in_check(&self.board, self.side_to_move) {
                GameStatus::Checkmate {
                    winner: self.side_to_move.opponent(),
                }
            } else {
                GameStatus::Stalemate
            };
        }
        if self.halfmove_clock >= 100 {
            return GameStatus::DrawByRule;
        }
        if let Some(current) = self.keys.last() {
            if self.keys.iter().filter(|k| *k == current).count() >= 3 {
                return GameStatus::DrawByRule;
            }
        }
        if self.is_dead_material() {
            return GameStatus::DrawByRule;
        }
        GameStatus::Ongoing
    }

    /// King vs king, optionally with a single minor piece on either side.
    fn is_dead_material(&self) -> bool {
        let mut minors = 0;
        for &piece in self.board.iter() {
            match piece.abs() {
                0 | KING_ID => {}
                KNIGHT_ID | BISHOP_ID => minors += 1,
                _ => return false,
            }
        }
        minors <= 1
    }

    /// Full FEN string for the current position.
    pub fn to_fen(&self) -> String {
        let mut castling = String::new();
        if self.castling.white_kingside {
            castling.push('K');
        }
        if self.castling.white_queenside {
            castling.push('Q');
        }
        if self.castling.black_kingside {
            castling.push('k');
        }
        if self.castling.black_queenside {
            castling.push('q');
        }
        if castling.is_empty() {
            castling.push('-');
        }
        let en_passant = match self.en_passant {
            Some(sq) => square_name(sq),
            None => "-".to_string(),
        };
        format!(
            "{} {} {} {} {} {}",
            board_to_fen_field(&self.board),
            match self.side_to_move {
                Color::White => 'w',
                Color::Black => 'b',
            },
            castling,
            en_passant,
            self.halfmove_clock,
            self.fullmove_number
        )
    }

    /// Repetition key over everything FEN considers position identity.
    fn key(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.board.hash(&mut hasher);
        self.side_to_move.sign().hash(&mut hasher);
        self.castling.white_kingside.hash(&mut hasher);
        self.castling.white_queenside.hash(&mut hasher);
        self.castling.black_kingside.hash(&mut hasher);
        self.castling.black_queenside.hash(&mut hasher);
        self.en_passant.hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::board::parse_square;

    fn mv(text: &str) -> Move {
        text.parse().unwrap()
    }

    #[test]
    fn test_starting_fen() {
        assert_eq!(
            Position::new().to_fen(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );
    }

    #[test]
    fn test_fen_after_e4() {
        let mut position = Position::new();
        position.apply(mv("e2e4")).unwrap();
        assert_eq!(
            position.to_fen(),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"
        );
    }

    #[test]
    fn test_illegal_move_leaves_position_unchanged() {
        let mut position = Position::new();
        let fen_before = position.to_fen();
        let err = position.apply(mv("e2e5")).unwrap_err();
        assert!(matches!(err, BotError::IllegalMove { .. }));
        assert_eq!(position.to_fen(), fen_before);
        assert!(position.history().is_empty());
    }

    #[test]
    fn test_replay_reproduces_snapshot() {
        let mut position = Position::new();
        for text in ["e2e4", "e7e5", "g1f3", "b8c6", "f1b5", "a7a6", "b5c6", "d7c6"] {
            position.apply(mv(text)).unwrap();
        }
        let replayed = Position::replay(position.history()).unwrap();
        assert_eq!(replayed.board(), position.board());
        assert_eq!(replayed.to_fen(), position.to_fen());
    }

    #[test]
    fn test_king_move_drops_castling_rights() {
        let mut position = Position::new();
        for text in ["e2e4", "e7e5", "e1e2", "g8f6", "e2e1", "f6g8"] {
            position.apply(mv(text)).unwrap();
        }
        assert!(!position.castling().white_kingside);
        assert!(!position.castling().white_queenside);
        assert!(position.castling().black_kingside);
    }

    #[test]
    fn test_threefold_repetition_is_draw() {
        let mut position = Position::new();
        for text in [
            "g1f3", "g8f6", "f3g1", "f6g8", // second occurrence of the start
            "g1f3", "g8f6", "f3g1", "f6g8", // third
        ] {
            position.apply(mv(text)).unwrap();
        }
        assert_eq!(position.status(), GameStatus::DrawByRule);
    }

    #[test]
    fn test_fools_mate_is_checkmate() {
        let mut position = Position::new();
        for text in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            position.apply(mv(text)).unwrap();
        }
        assert_eq!(
            position.status(),
            GameStatus::Checkmate {
                winner: Color::Black
            }
        );
    }

    #[test]
    fn test_resignation_marker() {
        let mut position = Position::new();
        assert_eq!(position.status(), GameStatus::Ongoing);
        position.mark_resigned();
        assert_eq!(position.status(), GameStatus::ResignationObserved);
        assert!(position.status().is_terminal());
    }

    #[test]
    fn test_promotion_replaces_pawn() {
        // Shortest clean path to a white pawn on a7: march the a-pawn and
        // capture through b-file while black shuffles a knight.
        let mut position = Position::new();
        for text in [
            "a2a4", "b7b5", "a4b5", "g8f6", "b5b6", "f6g8", "b6b7", "g8f6", "b7a8q",
        ] {
            position.apply(mv(text)).unwrap();
        }
        let a8 = parse_square("a8").unwrap() as usize;
        assert_eq!(position.board()[a8], crate::chess::board::QUEEN_ID);
        let a7 = parse_square("a7").unwrap() as usize;
        assert_eq!(position.board()[a7], 0);
    }
}
