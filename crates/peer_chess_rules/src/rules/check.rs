//! Check, check-escape and checkmate detection.
//!
//! Every function assumes both kings are on the board. The search is a
//! plain copy-and-test scan over all 64×64 square pairs; at this board
//! size that is cheap enough to run after every move.

use super::movement::is_legal_move;
use crate::types::{Board, Color, PieceKind, Square};
use tracing::{debug, instrument};

/// Checks whether `side`'s king is attacked by any opposing piece.
///
/// # Panics
///
/// Panics if `side` has no king on the board.
#[instrument(skip(board), level = "trace")]
pub fn is_in_check(board: &Board, side: Color) -> bool {
    let king = board
        .king_square(side)
        .unwrap_or_else(|| panic!("{side} king missing from the board"));

    board
        .pieces(side.opponent())
        .any(|(sq, piece)| is_legal_move(board, sq, king, piece.color))
}

/// Checks whether moving `from` → `to` leaves the mover's king unattacked.
///
/// The move is played on a copy; `board` is never mutated.
///
/// # Panics
///
/// Panics if `from` is empty.
#[instrument(skip(board), level = "trace")]
pub fn can_escape_check(board: &Board, from: Square, to: Square) -> bool {
    let mover = board
        .get(from)
        .unwrap_or_else(|| panic!("no piece on {from} to test"))
        .color;
    !is_in_check(&board.with_move(from, to), mover)
}

/// Full acceptance test for a move: piece geometry plus king safety.
///
/// A king is never a capture target; games end by checkmate instead.
pub fn is_fully_legal(board: &Board, from: Square, to: Square, side: Color) -> bool {
    let takes_king = board
        .get(to)
        .is_some_and(|piece| piece.kind == PieceKind::King);
    !takes_king && is_legal_move(board, from, to, side) && can_escape_check(board, from, to)
}

/// Every square the piece on `from` may fully legally move to.
#[instrument(skip(board))]
pub fn legal_destinations(board: &Board, from: Square) -> Vec<Square> {
    let Some(piece) = board.get(from) else {
        return Vec::new();
    };
    Square::all()
        .filter(|to| is_fully_legal(board, from, *to, piece.color))
        .collect()
}

/// Checks whether `side` has at least one fully legal move.
#[instrument(skip(board))]
pub fn has_legal_move(board: &Board, side: Color) -> bool {
    board.pieces(side).any(|(from, _)| {
        Square::all().any(|to| is_fully_legal(board, from, to, side))
    })
}

/// Checks whether `side` is checkmated.
///
/// False if `side` is not in check; otherwise true only when no move of
/// any `side` piece gets the king out of check.
#[instrument(skip(board))]
pub fn is_checkmate(board: &Board, side: Color) -> bool {
    if !is_in_check(board, side) {
        return false;
    }
    let mated = !has_legal_move(board, side);
    debug!(%side, mated, "Evaluated checkmate");
    mated
}
