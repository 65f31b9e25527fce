//! Position Tracker Integration Tests
//!
//! The tracker against whole games: replay fidelity, FEN progression,
//! special moves, and unique resolution of every ply from raw board
//! snapshots the way the board reader consumes them.

use pilotfish::browser::{resolve_opponent_move, Resolution};
use pilotfish::chess::board::parse_square;
use pilotfish::chess::{Color, GameStatus, Move, Position};

fn mv(text: &str) -> Move {
    text.parse().unwrap()
}

// The Opera Game, Morphy vs allies, Paris 1858. Ends in checkmate.
const OPERA_GAME: &[&str] = &[
    "e2e4", "e7e5", "g1f3", "d7d6", "d2d4", "c8g4", "d4e5", "g4f3", "d1f3", "d6e5", "f1c4",
    "g8f6", "f3b3", "d8e7", "b1c3", "c7c6", "c1g5", "b7b5", "c3b5", "c6b5", "c4b5", "b8d7",
    "e1c1", "a8d8", "d1d7", "d8d7", "h1d1", "e7e6", "b5d7", "f6d7", "b3b8", "d7b8", "d1d8",
];

#[test]
fn test_opera_game_replays_to_checkmate() {
    let mut position = Position::new();
    for &text in OPERA_GAME {
        position.apply(mv(text)).unwrap();
    }
    assert_eq!(
        position.status(),
        GameStatus::Checkmate {
            winner: Color::White
        }
    );
    assert_eq!(position.history().len(), OPERA_GAME.len());

    let replayed = Position::replay(position.history()).unwrap();
    assert_eq!(replayed.to_fen(), position.to_fen());
}

#[test]
fn test_every_ply_resolves_uniquely_from_snapshots() {
    // Feed the reader's resolver each consecutive board of a real game:
    // every ply must come back as exactly that move.
    let mut position = Position::new();
    for &text in OPERA_GAME {
        let mut next = position.clone();
        next.apply(mv(text)).unwrap();
        assert_eq!(
            resolve_opponent_move(&position, next.board()),
            Resolution::Unique(mv(text)),
            "ply {text} did not resolve uniquely"
        );
        position = next;
    }
}

#[test]
fn test_queenside_castling_tracked() {
    // Opera game move 12: white castles long.
    let mut position = Position::new();
    for &text in &OPERA_GAME[..23] {
        position.apply(mv(text)).unwrap();
    }
    // King on c1, rook on d1.
    let c1 = parse_square("c1").unwrap() as usize;
    let d1 = parse_square("d1").unwrap() as usize;
    let e1 = parse_square("e1").unwrap() as usize;
    let a1 = parse_square("a1").unwrap() as usize;
    assert_eq!(position.board()[c1], pilotfish::chess::board::KING_ID);
    assert_eq!(position.board()[d1], pilotfish::chess::board::ROOK_ID);
    assert_eq!(position.board()[e1], 0);
    assert_eq!(position.board()[a1], 0);
    assert!(!position.castling().white_kingside);
    assert!(!position.castling().white_queenside);
}

#[test]
fn test_en_passant_resolves_uniquely() {
    let mut position = Position::new();
    for text in ["e2e4", "g8f6", "e4e5", "d7d5"] {
        position.apply(mv(text)).unwrap();
    }
    assert_eq!(position.en_passant(), parse_square("d6"));

    let mut next = position.clone();
    next.apply(mv("e5d6")).unwrap();
    // The captured pawn leaves d5 even though the capture landed on d6.
    let d5 = parse_square("d5").unwrap() as usize;
    assert_eq!(next.board()[d5], 0);
    assert_eq!(
        resolve_opponent_move(&position, next.board()),
        Resolution::Unique(mv("e5d6"))
    );
}

#[test]
fn test_underpromotion_resolves_uniquely() {
    let mut position = Position::new();
    for text in ["a2a4", "b7b5", "a4b5", "g8f6", "b5b6", "f6g8", "b6b7", "g8f6"] {
        position.apply(mv(text)).unwrap();
    }
    // Knight promotion leaves a different board than queen promotion, so
    // each resolves to its own move.
    let mut knight = position.clone();
    knight.apply(mv("b7a8n")).unwrap();
    assert_eq!(
        resolve_opponent_move(&position, knight.board()),
        Resolution::Unique(mv("b7a8n"))
    );

    let mut queen = position.clone();
    queen.apply(mv("b7a8q")).unwrap();
    assert_eq!(
        resolve_opponent_move(&position, queen.board()),
        Resolution::Unique(mv("b7a8q"))
    );
}

#[test]
fn test_fen_progression_matches_known_values() {
    let mut position = Position::new();
    position.apply(mv("e2e4")).unwrap();
    assert_eq!(
        position.to_fen(),
        "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"
    );
    position.apply(mv("c7c5")).unwrap();
    assert_eq!(
        position.to_fen(),
        "rnbqkbnr/pp1ppppp/8/2p5/4P3/8/PPPP1PPP/RNBQKBNR w KQkq c6 0 2"
    );
    position.apply(mv("g1f3")).unwrap();
    assert_eq!(
        position.to_fen(),
        "rnbqkbnr/pp1ppppp/8/2p5/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2"
    );
}
