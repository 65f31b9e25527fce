//! Move legality rules
//!
//! Generates the legal move set for a position: pseudo-legal moves per piece
//! followed by a make/unmake check filter. The full rules matter here, not
//! just piece geometry — the board reader resolves an opponent's move by
//! matching an observed placement against every legal transition, so
//! castling, en passant and promotion variants must all be enumerated.

use super::board::{
    color_of, file_of, on_board, piece_belongs_to, rank_of, square_at, Board, Color, Square,
    BISHOP_ID, KING_ID, KNIGHT_ID, PAWN_ID, QUEEN_ID, ROOK_ID,
};
use super::moves::{Move, Promotion};
use super::position::Position;

const ROOK_DIRS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const BISHOP_DIRS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const KNIGHT_JUMPS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

/// All legal moves for the side to move.
pub fn legal_moves(position: &Position) -> Vec<Move> {
    let color = position.side_to_move();
    let mut moves = Vec::with_capacity(64);

    for sq in 0..64 {
        let piece = position.board()[sq as usize];
        if !piece_belongs_to(piece, color) {
            continue;
        }
        match piece.abs() {
            PAWN_ID => pawn_moves(position, sq, color, &mut moves),
            KNIGHT_ID => step_moves(position, sq, color, &KNIGHT_JUMPS, &mut moves),
            BISHOP_ID => sliding_moves(position, sq, color, &BISHOP_DIRS, &mut moves),
            ROOK_ID => sliding_moves(position, sq, color, &ROOK_DIRS, &mut moves),
            QUEEN_ID => {
                sliding_moves(position, sq, color, &BISHOP_DIRS, &mut moves);
                sliding_moves(position, sq, color, &ROOK_DIRS, &mut moves);
            }
            KING_ID => king_moves(position, sq, color, &mut moves),
            _ => {}
        }
    }

    // Reject anything that leaves our own king attacked.
    moves.retain(|mv| {
        let mut scratch = *position.board();
        apply_move_to_board(&mut scratch, *mv, color, position.en_passant());
        !in_check(&scratch, color)
    });

    moves
}

/// Apply a move to a bare board snapshot. Assumes the move is well formed
/// for `color` (as generated here); handles en passant removal, the castling
/// rook hop and promotion replacement. Castling rights and clocks are the
/// caller's concern.
pub fn apply_move_to_board(board: &mut Board, mv: Move, color: Color, en_passant: Option<Square>) {
    let piece = board[mv.from as usize];

    // En passant: a pawn landing on the vacant en-passant square captures
    // the pawn that just double-pushed past it.
    if piece.abs() == PAWN_ID
        && Some(mv.to) == en_passant
        && file_of(mv.from) != file_of(mv.to)
        && board[mv.to as usize] == 0
    {
        let victim = square_at(file_of(mv.to), rank_of(mv.from));
        board[victim as usize] = 0;
    }

    // Castling: the king travels two files, the rook jumps over.
    if piece.abs() == KING_ID && (file_of(mv.to) - file_of(mv.from)).abs() == 2 {
        let rank = rank_of(mv.from);
        let (rook_from, rook_to) = if file_of(mv.to) > file_of(mv.from) {
            (square_at(7, rank), square_at(5, rank))
        } else {
            (square_at(0, rank), square_at(3, rank))
        };
        board[rook_to as usize] = board[rook_from as usize];
        board[rook_from as usize] = 0;
    }

    board[mv.to as usize] = match mv.promotion {
        Some(promo) => promo.piece_id() * color.sign(),
        None => piece,
    };
    board[mv.from as usize] = 0;
}

fn pawn_moves(position: &Position, from: Square, color: Color, moves: &mut Vec<Move>) {
    let board = position.board();
    let dir = color.sign();
    let start_rank = if color == Color::White { 1 } else { 6 };
    let promo_rank = if color == Color::White { 7 } else { 0 };

    let push_pawn = |to: Square, moves: &mut Vec<Move>| {
        if rank_of(to) == promo_rank {
            for promo in Promotion::ALL {
                moves.push(Move::promoting(from, to, promo));
            }
        } else {
            moves.push(Move::new(from, to));
        }
    };

    // Single and double push onto empty squares.
    let one = from + 8 * dir;
    if (0..64).contains(&one) && board[one as usize] == 0 {
        push_pawn(one, moves);
        if rank_of(from) == start_rank {
            let two = from + 16 * dir;
            if board[two as usize] == 0 {
                moves.push(Move::new(from, two));
            }
        }
    }

    // Diagonal captures, including the en-passant square.
    for df in [-1i8, 1] {
        let file = file_of(from) + df;
        let rank = rank_of(from) + dir;
        if !on_board(file, rank) {
            continue;
        }
        let to = square_at(file, rank);
        let target = board[to as usize];
        if piece_belongs_to(target, color.opponent()) || Some(to) == position.en_passant() {
            push_pawn(to, moves);
        }
    }
}

fn step_moves(
    position: &Position,
    from: Square,
    color: Color,
    offsets: &[(i8, i8)],
    moves: &mut Vec<Move>,
) {
    let board = position.board();
    for &(df, dr) in offsets {
        let file = file_of(from) + df;
        let rank = rank_of(from) + dr;
        if !on_board(file, rank) {
            continue;
        }
        let to = square_at(file, rank);
        if !piece_belongs_to(board[to as usize], color) {
            moves.push(Move::new(from, to));
        }
    }
}

fn sliding_moves(
    position: &Position,
    from: Square,
    color: Color,
    dirs: &[(i8, i8)],
    moves: &mut Vec<Move>,
) {
    let board = position.board();
    for &(df, dr) in dirs {
        let mut file = file_of(from) + df;
        let mut rank = rank_of(from) + dr;
        while on_board(file, rank) {
            let to = square_at(file, rank);
            let target = board[to as usize];
            if target == 0 {
                moves.push(Move::new(from, to));
            } else {
                if piece_belongs_to(target, color.opponent()) {
                    moves.push(Move::new(from, to));
                }
                break;
            }
            file += df;
            rank += dr;
        }
    }
}

fn king_moves(position: &Position, from: Square, color: Color, moves: &mut Vec<Move>) {
    const KING_STEPS: [(i8, i8); 8] = [
        (1, 0),
        (1, 1),
        (0, 1),
        (-1, 1),
        (-1, 0),
        (-1, -1),
        (0, -1),
        (1, -1),
    ];
    step_moves(position, from, color, &KING_STEPS, moves);

    // Castling: rights intact, path clear, king neither in check nor
    // crossing an attacked square.
    let board = position.board();
    let rank = if color == Color::White { 0 } else { 7 };
    if from != square_at(4, rank) || in_check(board, color) {
        return;
    }
    let rights = position.castling();
    let enemy = color.opponent();

    let kingside = if color == Color::White {
        rights.white_kingside
    } else {
        rights.black_kingside
    };
    if kingside
        && board[square_at(5, rank) as usize] == 0
        && board[square_at(6, rank) as usize] == 0
        && board[square_at(7, rank) as usize] == ROOK_ID * color.sign()
        && !is_square_attacked(board, square_at(5, rank), enemy)
        && !is_square_attacked(board, square_at(6, rank), enemy)
    {
        moves.push(Move::new(from, square_at(6, rank)));
    }

    let queenside = if color == Color::White {
        rights.white_queenside
    } else {
        rights.black_queenside
    };
    if queenside
        && board[square_at(1, rank) as usize] == 0
        && board[square_at(2, rank) as usize] == 0
        && board[square_at(3, rank) as usize] == 0
        && board[square_at(0, rank) as usize] == ROOK_ID * color.sign()
        && !is_square_attacked(board, square_at(2, rank), enemy)
        && !is_square_attacked(board, square_at(3, rank), enemy)
    {
        moves.push(Move::new(from, square_at(2, rank)));
    }
}

/// Check if a square is attacked by any piece of `by`.
pub fn is_square_attacked(board: &Board, sq: Square, by: Color) -> bool {
    let file = file_of(sq);
    let rank = rank_of(sq);

    // Pawns attack one rank toward their opponent.
    let pawn_rank = rank - by.sign();
    for df in [-1i8, 1] {
        if on_board(file + df, pawn_rank) {
            let piece = board[square_at(file + df, pawn_rank) as usize];
            if piece == PAWN_ID * by.sign() {
                return true;
            }
        }
    }

    for &(df, dr) in &KNIGHT_JUMPS {
        if on_board(file + df, rank + dr)
            && board[square_at(file + df, rank + dr) as usize] == KNIGHT_ID * by.sign()
        {
            return true;
        }
    }

    // Walk outward along each line until the first piece.
    for (dirs, slider) in [(&ROOK_DIRS, ROOK_ID), (&BISHOP_DIRS, BISHOP_ID)] {
        for &(df, dr) in dirs {
            let mut f = file + df;
            let mut r = rank + dr;
            let mut steps = 1;
            while on_board(f, r) {
                let piece = board[square_at(f, r) as usize];
                if piece != 0 {
                    if color_of(piece) == Some(by) {
                        let kind = piece.abs();
                        if kind == slider || kind == QUEEN_ID || (kind == KING_ID && steps == 1) {
                            return true;
                        }
                    }
                    break;
                }
                f += df;
                r += dr;
                steps += 1;
            }
        }
    }

    false
}

/// Locate the king of a color.
pub fn find_king(board: &Board, color: Color) -> Option<Square> {
    let king = KING_ID * color.sign();
    (0..64).find(|&sq| board[sq as usize] == king)
}

/// Check if the king of a color is attacked.
pub fn in_check(board: &Board, color: Color) -> bool {
    match find_king(board, color) {
        Some(sq) => is_square_attacked(board, sq, color.opponent()),
        None => false,
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
    fn test_twenty_moves_from_start() {
        let position = Position::new();
        assert_eq!(legal_moves(&position).len(), 20);
    }

    #[test]
    fn test_knight_moves_from_start() {
        let position = Position::new();
        let moves = legal_moves(&position);
        let b1 = parse_square("b1").unwrap();
        let from_b1: Vec<_> = moves.iter().filter(|m| m.from == b1).collect();
        assert_eq!(from_b1.len(), 2, "knight on b1 should have Na3 and Nc3");
    }

    #[test]
    fn test_check_must_be_answered() {
        // 1. e4 d5 2. Bb5+ — black's replies must all address the check.
        let mut position = Position::new();
        for text in ["e2e4", "d7d5", "f1b5"] {
            position.apply(mv(text)).unwrap();
        }
        assert!(in_check(position.board(), Color::Black));
        let moves = legal_moves(&position);
        assert!(!moves.is_empty());
        assert!(
            !moves.contains(&mv("g8f6")),
            "a move ignoring the check must not be legal"
        );
        for candidate in &moves {
            let mut scratch = *position.board();
            apply_move_to_board(&mut scratch, *candidate, Color::Black, position.en_passant());
            assert!(!in_check(&scratch, Color::Black));
        }
    }

    #[test]
    fn test_en_passant_capture_removes_pawn() {
        let mut position = Position::new();
        for text in ["e2e4", "a7a6", "e4e5", "d7d5"] {
            position.apply(mv(text)).unwrap();
        }
        let ep = mv("e5d6");
        let moves = legal_moves(&position);
        assert!(moves.contains(&ep), "en passant should be generated");
        position.apply(ep).unwrap();
        assert_eq!(
            position.board()[parse_square("d5").unwrap() as usize],
            0,
            "captured pawn must leave d5"
        );
        assert_eq!(
            position.board()[parse_square("d6").unwrap() as usize],
            crate::chess::board::W_PAWN
        );
    }

    #[test]
    fn test_castling_kingside() {
        let mut position = Position::new();
        for text in ["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "g8f6"] {
            position.apply(mv(text)).unwrap();
        }
        let castle = mv("e1g1");
        assert!(legal_moves(&position).contains(&castle));
        position.apply(castle).unwrap();
        assert_eq!(
            position.board()[parse_square("f1").unwrap() as usize],
            ROOK_ID,
            "rook hops to f1"
        );
        assert_eq!(position.board()[parse_square("h1").unwrap() as usize], 0);
    }

    #[test]
    fn test_castling_through_attacked_square_is_illegal() {
        // Black bishop ends on c4 covering f1; the king may not cross it.
        let mut position = Position::new();
        for text in ["e2e4", "b7b6", "f1c4", "c8a6", "g1f3", "a6c4"] {
            position.apply(mv(text)).unwrap();
        }
        let moves = legal_moves(&position);
        assert!(
            !moves.contains(&mv("e1g1")),
            "castling across the attacked f1 square must be rejected"
        );
    }

    #[test]
    fn test_attack_detection() {
        let board = crate::chess::board::starting_board();
        // The e2 pawn attacks d3 and f3, not the push square.
        assert!(is_square_attacked(
            &board,
            parse_square("f3").unwrap(),
            Color::White
        ));
        assert!(!is_square_attacked(
            &board,
            parse_square("e4").unwrap(),
            Color::White
        ));
    }
}
