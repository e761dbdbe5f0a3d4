//! First-class board invariants.
//!
//! Invariants are logical properties that must hold throughout play.
//! They are checked in debug builds after every locally applied move.

use crate::types::{Board, Color, PieceKind};

/// A logical property that must hold for a given state.
pub trait Invariant<S> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Exactly one king per side is on the board.
///
/// Check detection locates each king; a board without one cannot be
/// evaluated.
pub struct OneKingPerSide;

impl Invariant<Board> for OneKingPerSide {
    fn holds(board: &Board) -> bool {
        [Color::White, Color::Black].into_iter().all(|color| {
            board
                .pieces(color)
                .filter(|(_, piece)| piece.kind == PieceKind::King)
                .count()
                == 1
        })
    }

    fn description() -> &'static str {
        "Each side has exactly one king"
    }
}
