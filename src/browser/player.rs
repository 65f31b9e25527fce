//! Move player: dispatches moves to the page and waits for the ack
//!
//! A move is two clicks (source square, destination square) issued as one
//! W3C pointer sequence, plus a promotion-chooser click when the move
//! promotes. Dispatch is not completion: the move only counts once the
//! rendered placement matches the expected board, otherwise the attempt
//! times out as unacknowledged.

use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::chess::{Board, Move};
use crate::error::{BotError, BotResult};
use crate::orchestrator::ExecuteMove;

use super::page::GamePage;

const ACK_POLL_INTERVAL: Duration = Duration::from_millis(100);
const PROMOTION_WAIT: Duration = Duration::from_millis(1500);

/// Clicks moves onto the board and confirms them against the tracker.
pub struct MovePlayer {
    page: Rc<GamePage>,
    ack_timeout: Duration,
}

impl MovePlayer {
    pub fn new(page: Rc<GamePage>, ack_timeout: Duration) -> Self {
        MovePlayer { page, ack_timeout }
    }

    /// Wait for the promotion chooser and pick the piece. The chooser can
    /// render a beat after the destination click lands.
    fn complete_promotion(&self, mv: Move) -> BotResult<()> {
        let promo = match mv.promotion {
            Some(promo) => promo,
            None => return Ok(()),
        };
        let deadline = Instant::now() + PROMOTION_WAIT;
        loop {
            if self.page.click_promotion(promo)? {
                debug!("[PLAYER] Promotion chooser: picked {promo:?}");
                return Ok(());
            }
            if Instant::now() >= deadline {
                // Some boards auto-promote to queen without a chooser; let
                // the ack check decide whether the move actually landed.
                debug!("[PLAYER] No promotion chooser appeared for {mv}");
                return Ok(());
            }
            thread::sleep(Duration::from_millis(50));
        }
    }
}

/// One pointer sequence clicking each point in order.
fn click_sequence(points: &[(f64, f64)]) -> Value {
    let mut actions = Vec::new();
    for (i, &(x, y)) in points.iter().enumerate() {
        if i > 0 {
            actions.push(json!({ "type": "pause", "duration": 60 }));
        }
        actions.push(json!({
            "type": "pointerMove",
            "duration": 0,
            "x": x.round() as i64,
            "y": y.round() as i64
        }));
        actions.push(json!({ "type": "pointerDown", "button": 0 }));
        actions.push(json!({ "type": "pointerUp", "button": 0 }));
    }
    json!([{
        "type": "pointer",
        "id": "mouse",
        "parameters": { "pointerType": "mouse" },
        "actions": actions
    }])
}

impl ExecuteMove for MovePlayer {
    fn execute(&mut self, mv: Move, expected: &Board) -> BotResult<()> {
        let geometry = self.page.geometry()?;
        let from = geometry.square_center(mv.from);
        let to = geometry.square_center(mv.to);

        info!("[PLAYER] Playing {mv}");
        self.page.driver().perform_actions(click_sequence(&[from, to]))?;
        self.page.driver().release_actions()?;
        self.complete_promotion(mv)?;

        // The move counts only once the page renders the expected board.
        let deadline = Instant::now() + self.ack_timeout;
        loop {
            if let Some(board) = self.page.read_placement()? {
                if &board == expected {
                    debug!("[PLAYER] Page acknowledged {mv}");
                    return Ok(());
                }
            }
            if Instant::now() >= deadline {
                return Err(BotError::MoveExecution {
                    timeout_ms: self.ack_timeout.as_millis() as u64,
                });
            }
            thread::sleep(ACK_POLL_INTERVAL);
        }
    }
}
