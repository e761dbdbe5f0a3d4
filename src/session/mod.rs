//! Game session: turn state machine, scoring and clock bookkeeping.

mod game;
mod guard;
mod state;

pub use game::{DEFAULT_OPPONENT_NAME, GameSession, MoveReport, SelectOutcome};
pub use guard::{InboundMove, PeerMoveGuard, RejectedMove, TrustPeer, VerifyPeer};
pub use state::{Captures, Clock, DEFAULT_CLOCK_BUDGET, GameState, Outcome, Phase, Scoreboard};

use peer_chess_rules::{Color, Piece, Square};

/// State-change notification, fired after every session mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A piece was selected and its destinations highlighted.
    Selected {
        /// Selected square.
        from: Square,
        /// Fully legal destinations.
        destinations: Vec<Square>,
    },
    /// A selection was dropped without moving.
    SelectionCleared,
    /// A move was applied to the board.
    MoveApplied {
        /// Side that moved.
        by: Color,
        /// Source square.
        from: Square,
        /// Destination square.
        to: Square,
        /// Piece taken, if any.
        captured: Option<Piece>,
    },
    /// The given side is in check.
    Check(Color),
    /// The game ended.
    GameOver(Outcome),
    /// One clock tick elapsed.
    ClockTick {
        /// White's remaining time.
        white: u32,
        /// Black's remaining time.
        black: u32,
    },
    /// The peer's display name arrived.
    OpponentNamed(String),
    /// The connection dropped after the game had already ended.
    Disconnected,
    /// A new game started.
    Reset,
}

/// Error returned by session actions that are not valid right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum SessionError {
    /// The action needs an active game.
    #[display("Game is already over")]
    GameOver,

    /// The action needs a finished game.
    #[display("Game is still in progress")]
    GameInProgress,

    /// The peer connection is gone.
    #[display("Not connected to a peer")]
    Disconnected,
}

impl std::error::Error for SessionError {}
