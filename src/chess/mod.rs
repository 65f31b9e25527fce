//! Chess domain types: board snapshot, moves, legality rules and the
//! position tracker.

pub mod board;
pub mod moves;
pub mod position;
pub mod rules;

pub use board::{Board, Color, Square};
pub use moves::{Move, Promotion};
pub use position::{CastlingRights, GameStatus, Position};
