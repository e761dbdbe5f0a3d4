//! Session state containers: board, clocks, captures, scores and outcomes.

use peer_chess_rules::{Board, Color, Piece, Square};
use serde::{Deserialize, Serialize};

/// Starting time budget per side, in clock ticks.
pub const DEFAULT_CLOCK_BUDGET: u32 = 600;

/// How a finished game ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The winner checkmated the other side.
    Checkmate {
        /// Winning side.
        winner: Color,
    },
    /// The loser resigned.
    Resignation {
        /// Winning side.
        winner: Color,
    },
    /// The loser's clock ran out.
    Timeout {
        /// Winning side.
        winner: Color,
    },
    /// The peer connection failed or the peer sent something unusable.
    ConnectionLost {
        /// What went wrong.
        reason: String,
    },
}

impl Outcome {
    /// Returns the winner, if the game produced one.
    pub fn winner(&self) -> Option<Color> {
        match self {
            Outcome::Checkmate { winner }
            | Outcome::Resignation { winner }
            | Outcome::Timeout { winner } => Some(*winner),
            Outcome::ConnectionLost { .. } => None,
        }
    }
}

/// Where the session is in its turn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for a piece to be picked.
    AwaitingSelection,
    /// A piece is picked; the next selection is its destination.
    PieceSelected(Square),
    /// Terminal until a new game is started.
    GameOver,
}

/// Remaining time per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    white: u32,
    black: u32,
}

impl Clock {
    /// Creates a clock with the same budget for both sides.
    pub fn new(budget: u32) -> Self {
        Self {
            white: budget,
            black: budget,
        }
    }

    /// Remaining ticks for `color`.
    pub fn remaining(&self, color: Color) -> u32 {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    /// Burns one tick from `color`'s budget and returns what is left.
    pub fn tick(&mut self, color: Color) -> u32 {
        let remaining = match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        };
        *remaining = remaining.saturating_sub(1);
        *remaining
    }
}

/// Pieces each side has captured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Captures {
    by_white: Vec<Piece>,
    by_black: Vec<Piece>,
}

impl Captures {
    /// Records that `capturer` took `piece`.
    pub fn record(&mut self, capturer: Color, piece: Piece) {
        match capturer {
            Color::White => self.by_white.push(piece),
            Color::Black => self.by_black.push(piece),
        }
    }

    /// Pieces taken by `capturer`, in capture order.
    pub fn pieces(&self, capturer: Color) -> &[Piece] {
        match capturer {
            Color::White => &self.by_white,
            Color::Black => &self.by_black,
        }
    }

    /// Total material value taken by `capturer`.
    pub fn material(&self, capturer: Color) -> u32 {
        self.pieces(capturer).iter().map(|p| p.kind.value()).sum()
    }
}

/// Games won per side. Survives new games.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoreboard {
    white: u32,
    black: u32,
}

impl Scoreboard {
    /// Adds one win for `color`.
    pub fn award(&mut self, color: Color) {
        match color {
            Color::White => self.white += 1,
            Color::Black => self.black += 1,
        }
    }

    /// Wins recorded for `color`.
    pub fn get(&self, color: Color) -> u32 {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }
}

/// Complete per-game state. Replaced wholesale on a new game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub(super) board: Board,
    pub(super) side_to_move: Color,
    pub(super) outcome: Option<Outcome>,
    pub(super) clock: Clock,
    pub(super) captures: Captures,
}

impl GameState {
    /// Creates the starting state: initial position, White to move.
    pub fn new(clock_budget: u32) -> Self {
        Self {
            board: Board::initial(),
            side_to_move: Color::White,
            outcome: None,
            clock: Clock::new(clock_budget),
            captures: Captures::default(),
        }
    }

    /// Returns the board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Returns the side whose turn it is.
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// Returns the outcome once the game is over.
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// Checks if the game has ended.
    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Returns the clocks.
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Returns the capture record.
    pub fn captures(&self) -> &Captures {
        &self.captures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peer_chess_rules::PieceKind;

    #[test]
    fn test_clock_saturates_at_zero() {
        let mut clock = Clock::new(2);
        assert_eq!(clock.tick(Color::White), 1);
        assert_eq!(clock.tick(Color::White), 0);
        assert_eq!(clock.tick(Color::White), 0);
        assert_eq!(clock.remaining(Color::Black), 2);
    }

    #[test]
    fn test_material_sums_piece_values() {
        let mut captures = Captures::default();
        captures.record(Color::White, Piece::new(Color::Black, PieceKind::Queen));
        captures.record(Color::White, Piece::new(Color::Black, PieceKind::Pawn));
        captures.record(Color::Black, Piece::new(Color::White, PieceKind::Knight));
        assert_eq!(captures.material(Color::White), 10);
        assert_eq!(captures.material(Color::Black), 3);
        assert_eq!(captures.pieces(Color::White).len(), 2);
    }

    #[test]
    fn test_connection_lost_has_no_winner() {
        let outcome = Outcome::ConnectionLost {
            reason: "reset".into(),
        };
        assert_eq!(outcome.winner(), None);
        assert_eq!(
            Outcome::Timeout {
                winner: Color::Black
            }
            .winner(),
            Some(Color::Black)
        );
    }
}
