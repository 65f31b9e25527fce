//! Orchestrator: the turn state machine
//!
//! Single-threaded control loop over three seams: a board observer, a move
//! source and a move executor. The loop owns the position tracker, decides
//! whose turn it is, applies retry policy for ambiguous reads and failed
//! dispatches, and runs the continue/exit prompt between games. Everything
//! behind the seams is swappable, which is how the loop is tested.

use std::fmt;
use std::io::{self, BufRead, Write as _};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::browser::reader::{BannerOutcome, PageObservation};
use crate::chess::{Board, Color, GameStatus, Move, Position};
use crate::engine::{EngineSuggestion, SearchLimits};
use crate::error::{BotError, BotResult};

/// Backoff ceiling for ambiguous-read retries.
const AMBIGUITY_BACKOFF_CAP: Duration = Duration::from_secs(2);

/// Observes the page and reports it relative to the tracked position.
pub trait ObserveBoard {
    fn poll(&mut self, position: &Position) -> BotResult<PageObservation>;
}

/// Produces the move to play in a position.
pub trait MoveSource {
    fn best_move(
        &mut self,
        position: &Position,
        limits: &SearchLimits,
    ) -> BotResult<EngineSuggestion>;

    /// Reset per-game engine state before a fresh game.
    fn new_game(&mut self) -> BotResult<()>;
}

/// Plays a move on the page and confirms it against the expected board.
pub trait ExecuteMove {
    fn execute(&mut self, mv: Move, expected: &Board) -> BotResult<()>;
}

/// Asked between games whether to keep the session going.
pub trait GamePrompt {
    fn next_game(&mut self, outcome: &GameOutcome) -> BotResult<PromptChoice>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptChoice {
    Continue,
    Exit,
}

/// Where the control loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    WaitingForOpponent,
    Thinking,
    Playing,
    GameOver,
    Exited,
}

impl BotState {
    /// Legal edges of the state machine. Self-loops are always allowed.
    pub fn can_transition_to(self, next: BotState) -> bool {
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (BotState::WaitingForOpponent, BotState::Thinking)
                | (BotState::WaitingForOpponent, BotState::GameOver)
                | (BotState::Thinking, BotState::Playing)
                | (BotState::Thinking, BotState::GameOver)
                | (BotState::Playing, BotState::WaitingForOpponent)
                | (BotState::Playing, BotState::GameOver)
                | (BotState::GameOver, BotState::WaitingForOpponent)
                | (BotState::GameOver, BotState::Thinking)
                | (BotState::GameOver, BotState::Exited)
        )
    }
}

/// How a game ended, as far as the session can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    /// The tracked position reached a terminal status.
    Tracked(GameStatus),
    /// The page announced an end the tracker had not derived yet.
    Reported(BannerOutcome),
    /// The game was given up after an unrecoverable in-game error.
    Abandoned,
}

impl fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameOutcome::Tracked(GameStatus::Checkmate { winner }) => {
                write!(f, "checkmate, {winner} wins")
            }
            GameOutcome::Tracked(GameStatus::Stalemate) => write!(f, "stalemate"),
            GameOutcome::Tracked(GameStatus::DrawByRule) => write!(f, "draw by rule"),
            GameOutcome::Tracked(GameStatus::ResignationObserved) => write!(f, "resignation"),
            GameOutcome::Tracked(GameStatus::Ongoing) => write!(f, "ongoing"),
            GameOutcome::Reported(BannerOutcome::Checkmate) => write!(f, "checkmate"),
            GameOutcome::Reported(BannerOutcome::Resignation) => write!(f, "resignation"),
            GameOutcome::Reported(BannerOutcome::Draw) => write!(f, "draw"),
            GameOutcome::Reported(BannerOutcome::Timeout) => write!(f, "timeout"),
            GameOutcome::Reported(BannerOutcome::Aborted) => write!(f, "game aborted"),
            GameOutcome::Abandoned => write!(f, "abandoned after an error"),
        }
    }
}

/// Tuning knobs for the control loop.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Which side this session plays.
    pub my_color: Color,
    pub limits: SearchLimits,
    /// Base interval between board polls; also the backoff base.
    pub poll_interval: Duration,
    /// Consecutive ambiguous reads tolerated before giving up on the game.
    pub max_ambiguous_retries: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            my_color: Color::White,
            limits: SearchLimits::default(),
            poll_interval: Duration::from_millis(250),
            max_ambiguous_retries: 6,
        }
    }
}

/// Delay before ambiguous-read retry number `attempt` (1-based): the poll
/// interval, doubled per attempt, capped.
pub fn ambiguity_backoff(base: Duration, attempt: u32) -> Duration {
    if base >= AMBIGUITY_BACKOFF_CAP {
        return AMBIGUITY_BACKOFF_CAP;
    }
    let factor = 1u32 << attempt.saturating_sub(1).min(16);
    base.checked_mul(factor)
        .unwrap_or(AMBIGUITY_BACKOFF_CAP)
        .min(AMBIGUITY_BACKOFF_CAP)
}

enum TurnEvent {
    OpponentMoved,
    Ended(BannerOutcome),
}

/// The control loop itself, generic over its three seams.
pub struct Orchestrator<O, S, X> {
    reader: O,
    engine: S,
    player: X,
    config: OrchestratorConfig,
    state: BotState,
}

impl<O, S, X> Orchestrator<O, S, X>
where
    O: ObserveBoard,
    S: MoveSource,
    X: ExecuteMove,
{
    pub fn new(reader: O, engine: S, player: X, config: OrchestratorConfig) -> Self {
        Orchestrator {
            reader,
            engine,
            player,
            config,
            state: BotState::WaitingForOpponent,
        }
    }

    pub fn state(&self) -> BotState {
        self.state
    }

    fn transition(&mut self, next: BotState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {:?} -> {:?}",
            self.state,
            next
        );
        if self.state != next {
            debug!("[BOT] {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    /// Drive one game on `position` to its end.
    pub fn play_game(&mut self, position: &mut Position) -> BotResult<GameOutcome> {
        self.engine.new_game()?;
        info!("[BOT] New game as {}", self.config.my_color);

        loop {
            let status = position.status();
            if status.is_terminal() {
                self.transition(BotState::GameOver);
                return Ok(GameOutcome::Tracked(status));
            }

            if position.side_to_move() == self.config.my_color {
                self.transition(BotState::Thinking);
                if let Some(outcome) = self.take_turn(position)? {
                    self.transition(BotState::GameOver);
                    return Ok(outcome);
                }
                self.transition(BotState::WaitingForOpponent);
            } else {
                self.transition(BotState::WaitingForOpponent);
                match self.wait_for_opponent(position)? {
                    TurnEvent::OpponentMoved => {}
                    TurnEvent::Ended(banner) => {
                        self.transition(BotState::GameOver);
                        return Ok(GameOutcome::Reported(banner));
                    }
                }
            }
        }
    }

    /// Think, dispatch, confirm and record one of our moves. Returns an
    /// outcome when the page turned out to have ended the game already.
    fn take_turn(&mut self, position: &mut Position) -> BotResult<Option<GameOutcome>> {
        let suggestion = self.engine.best_move(position, &self.config.limits)?;
        let mv = suggestion.mv;

        // Expected board after our move, derived before touching the page.
        // An illegal suggestion never reaches the board.
        let mut after = position.clone();
        after.apply(mv)?;

        self.transition(BotState::Playing);
        match self.player.execute(mv, after.board()) {
            Ok(()) => {}
            Err(BotError::MoveExecution { timeout_ms }) => {
                // One retry, but look at the page first: the ack may just
                // have been slow, or the game may have ended under us.
                warn!("[BOT] Move {mv} unacknowledged after {timeout_ms} ms, re-checking page");
                match self.reader.poll(position)? {
                    PageObservation::GameEnded(banner) => {
                        return Ok(Some(GameOutcome::Reported(banner)));
                    }
                    PageObservation::OpponentMoved(observed) if observed == mv => {
                        debug!("[BOT] Move {mv} landed late, treating as acknowledged");
                    }
                    _ => self.player.execute(mv, after.board())?,
                }
            }
            Err(e) => return Err(e),
        }

        *position = after;
        Ok(None)
    }

    /// Poll until the opponent moves or the game ends. Ambiguous reads are
    /// retried with doubling backoff against a fixed budget.
    fn wait_for_opponent(&mut self, position: &mut Position) -> BotResult<TurnEvent> {
        let mut ambiguous = 0u32;
        loop {
            match self.reader.poll(position)? {
                PageObservation::NoChange => {
                    ambiguous = 0;
                    thread::sleep(self.config.poll_interval);
                }
                PageObservation::OpponentMoved(mv) => {
                    position.apply(mv)?;
                    return Ok(TurnEvent::OpponentMoved);
                }
                PageObservation::GameEnded(banner) => {
                    return Ok(TurnEvent::Ended(banner));
                }
                PageObservation::Ambiguous => {
                    ambiguous += 1;
                    if ambiguous > self.config.max_ambiguous_retries {
                        return Err(BotError::AmbiguousObservation {
                            attempts: ambiguous,
                        });
                    }
                    let delay = ambiguity_backoff(self.config.poll_interval, ambiguous);
                    debug!("[BOT] Ambiguous read #{ambiguous}, backing off {delay:?}");
                    thread::sleep(delay);
                }
            }
        }
    }

    /// Play games until the prompt says stop or a session-fatal error hits.
    pub fn run(&mut self, prompt: &mut impl GamePrompt) -> BotResult<()> {
        loop {
            let mut position = Position::new();
            let outcome = match self.play_game(&mut position) {
                Ok(outcome) => outcome,
                Err(e) if e.is_session_fatal() => return Err(e),
                Err(e) => {
                    warn!("[BOT] Abandoning game: {e}");
                    self.transition(BotState::GameOver);
                    GameOutcome::Abandoned
                }
            };
            info!("[BOT] Game over: {outcome}");

            match prompt.next_game(&outcome)? {
                PromptChoice::Continue => {
                    self.transition(BotState::WaitingForOpponent);
                }
                PromptChoice::Exit => {
                    self.transition(BotState::Exited);
                    info!("[BOT] Session finished");
                    return Ok(());
                }
            }
        }
    }
}

/// Interactive prompt on the controlling terminal.
pub struct StdinPrompt;

impl GamePrompt for StdinPrompt {
    fn next_game(&mut self, outcome: &GameOutcome) -> BotResult<PromptChoice> {
        println!("Game over: {outcome}");
        print!("Enter to play on, q to exit: ");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        if line.trim().eq_ignore_ascii_case("q") {
            Ok(PromptChoice::Exit)
        } else {
            Ok(PromptChoice::Continue)
        }
    }
}
