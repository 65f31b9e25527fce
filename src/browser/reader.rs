//! Board reader: turns rendered placements into tracked moves
//!
//! The reader never trusts a raw placement. Every observed board is
//! explained as "current position plus exactly one legal move" or it is
//! reported as ambiguous and polled again; the move-history tracker stays
//! the single source of truth.

use std::rc::Rc;

use tracing::{debug, info};

use crate::chess::{Board, Move, Position};
use crate::error::BotResult;
use crate::orchestrator::ObserveBoard;

use super::page::GamePage;

/// What the game-over banner said, classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerOutcome {
    Checkmate,
    Resignation,
    Draw,
    Timeout,
    Aborted,
}

/// Result of one poll of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageObservation {
    /// Placement matches the tracked position; opponent has not moved.
    NoChange,
    /// Placement is the tracked position plus exactly this legal move.
    OpponentMoved(Move),
    /// The page shows a game-over banner.
    GameEnded(BannerOutcome),
    /// Placement could not be read or matched; poll again.
    Ambiguous,
}

/// How an observed placement relates to the tracked position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Unchanged,
    Unique(Move),
    /// Number of legal moves that reproduce the observed board. Zero means
    /// the placement matches no reachable position (partial render or a
    /// missed intermediate move).
    Ambiguous(usize),
}

/// Explain an observed board as at most one legal move from `position`.
pub fn resolve_opponent_move(position: &Position, observed: &Board) -> Resolution {
    if observed == position.board() {
        return Resolution::Unchanged;
    }
    let mut candidates = Vec::new();
    for mv in position.legal_moves() {
        let mut scratch = position.clone();
        if scratch.apply(mv).is_ok() && scratch.board() == observed {
            candidates.push(mv);
        }
    }
    match candidates.as_slice() {
        [only] => Resolution::Unique(*only),
        _ => Resolution::Ambiguous(candidates.len()),
    }
}

/// Classify game-over banner text. `None` for text that does not announce
/// an end (player names, clock labels and the like share the container).
pub fn parse_banner(text: &str) -> Option<BannerOutcome> {
    let text = text.to_lowercase();
    if text.contains("checkmate") {
        Some(BannerOutcome::Checkmate)
    } else if text.contains("resign") {
        Some(BannerOutcome::Resignation)
    } else if text.contains("time out") || text.contains("timeout") || text.contains("left the game")
    {
        Some(BannerOutcome::Timeout)
    } else if text.contains("abort") {
        Some(BannerOutcome::Aborted)
    } else if text.contains("stalemate")
        || text.contains("draw")
        || text.contains("repetition")
        || text.contains("insufficient")
    {
        Some(BannerOutcome::Draw)
    } else {
        None
    }
}

/// Polls the page and reports observations against the tracked position.
pub struct BoardReader {
    page: Rc<GamePage>,
}

impl BoardReader {
    pub fn new(page: Rc<GamePage>) -> Self {
        BoardReader { page }
    }
}

impl ObserveBoard for BoardReader {
    fn poll(&mut self, position: &Position) -> BotResult<PageObservation> {
        // A banner outranks the placement: once the game is over the board
        // may keep rendering the final position indefinitely.
        if let Some(text) = self.page.status_banner()? {
            if let Some(outcome) = parse_banner(&text) {
                info!("[READER] Game-over banner: {text:?}");
                return Ok(PageObservation::GameEnded(outcome));
            }
        }

        let observed = match self.page.read_placement()? {
            Some(board) => board,
            None => return Ok(PageObservation::Ambiguous),
        };

        match resolve_opponent_move(position, &observed) {
            Resolution::Unchanged => Ok(PageObservation::NoChange),
            Resolution::Unique(mv) => {
                info!("[READER] Opponent played {mv}");
                Ok(PageObservation::OpponentMoved(mv))
            }
            Resolution::Ambiguous(count) => {
                debug!("[READER] Placement matched {count} legal moves, retrying");
                Ok(PageObservation::Ambiguous)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(text: &str) -> Move {
        text.parse().unwrap()
    }

    #[test]
    fn test_unchanged_board_resolves_to_unchanged() {
        let position = Position::new();
        let observed = *position.board();
        assert_eq!(
            resolve_opponent_move(&position, &observed),
            Resolution::Unchanged
        );
    }

    #[test]
    fn test_single_reply_resolves_uniquely() {
        let mut position = Position::new();
        position.apply(mv("e2e4")).unwrap();

        let mut after = position.clone();
        after.apply(mv("e7e5")).unwrap();

        assert_eq!(
            resolve_opponent_move(&position, after.board()),
            Resolution::Unique(mv("e7e5"))
        );
    }

    #[test]
    fn test_capture_resolves_uniquely() {
        let mut position = Position::new();
        for text in ["e2e4", "d7d5"] {
            position.apply(mv(text)).unwrap();
        }
        let before = position.clone();
        position.apply(mv("e4d5")).unwrap();
        // From black's perspective: white just took on d5.
        assert_eq!(
            resolve_opponent_move(&before, position.board()),
            Resolution::Unique(mv("e4d5"))
        );
    }

    #[test]
    fn test_unexplainable_board_is_ambiguous() {
        let position = Position::new();
        // Two plies ahead of the tracked position: no single legal move
        // explains it.
        let mut two_ahead = position.clone();
        two_ahead.apply(mv("e2e4")).unwrap();
        two_ahead.apply(mv("e7e5")).unwrap();
        assert_eq!(
            resolve_opponent_move(&position, two_ahead.board()),
            Resolution::Ambiguous(0)
        );
    }

    #[test]
    fn test_partial_render_is_ambiguous() {
        let position = Position::new();
        let mut missing_piece = *position.board();
        missing_piece[0] = 0; // a1 rook not rendered yet
        assert_eq!(
            resolve_opponent_move(&position, &missing_piece),
            Resolution::Ambiguous(0)
        );
    }

    #[test]
    fn test_banner_classification() {
        assert_eq!(parse_banner("Checkmate • White is victorious"), Some(BannerOutcome::Checkmate));
        assert_eq!(parse_banner("Black resigned • White is victorious"), Some(BannerOutcome::Resignation));
        assert_eq!(parse_banner("Draw by mutual agreement"), Some(BannerOutcome::Draw));
        assert_eq!(parse_banner("Stalemate"), Some(BannerOutcome::Draw));
        assert_eq!(parse_banner("White time out • Black is victorious"), Some(BannerOutcome::Timeout));
        assert_eq!(parse_banner("Game aborted"), Some(BannerOutcome::Aborted));
        assert_eq!(parse_banner("anonymous vs anonymous"), None);
    }
}
