//! Error taxonomy for the bot
//!
//! Recoverable conditions (ambiguous reads, unacknowledged moves) are
//! retried by the orchestrator; fatal ones end the current game and fall
//! through to the continue/exit prompt instead of crashing the process.

/// Errors that can occur while driving a game.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// A move failed validation against the tracked position. Not expected
    /// in normal operation: moves come from the engine or from a validated
    /// board diff, so this indicates a reader misdetection.
    #[error("illegal move {mv}: {reason}")]
    IllegalMove { mv: String, reason: String },

    /// The board reader could not uniquely resolve the opponent's move and
    /// the retry budget ran out.
    #[error("board observation still ambiguous after {attempts} attempts")]
    AmbiguousObservation { attempts: u32 },

    /// The external engine process failed to start, died, or stopped
    /// answering within its limits. Fatal to the session.
    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The page did not acknowledge a dispatched move in time.
    #[error("move not acknowledged by the page within {timeout_ms} ms")]
    MoveExecution { timeout_ms: u64 },

    /// WebDriver/transport failure while talking to the page.
    #[error("page error: {0}")]
    Page(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BotError {
    /// Whether this error ends the whole session rather than one game.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, BotError::EngineUnavailable(_))
    }
}

/// Result type alias for bot operations.
pub type BotResult<T> = Result<T, BotError>;
