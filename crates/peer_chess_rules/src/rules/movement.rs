//! Per-piece movement legality.
//!
//! Legality here is purely geometric and occupancy based. Whether a move
//! leaves the mover's own king attacked is decided in [`super::check`].

use crate::types::{Board, Color, PieceKind, Square};
use tracing::instrument;

/// Checks whether `side` may move the piece on `from` to `to`.
///
/// Rejects an empty source, a source holding an opposing piece, and a
/// destination holding one of `side`'s own pieces. Castling, en passant
/// and promotion are not modelled.
#[instrument(skip(board), level = "trace")]
pub fn is_legal_move(board: &Board, from: Square, to: Square, side: Color) -> bool {
    let Some(piece) = board.get(from) else {
        return false;
    };
    if piece.color != side {
        return false;
    }
    if board.get(to).is_some_and(|target| target.color == side) {
        return false;
    }

    match piece.kind {
        PieceKind::King => is_king_move(from, to),
        PieceKind::Queen => is_rook_move(board, from, to) || is_bishop_move(board, from, to),
        PieceKind::Rook => is_rook_move(board, from, to),
        PieceKind::Bishop => is_bishop_move(board, from, to),
        PieceKind::Knight => is_knight_move(from, to),
        PieceKind::Pawn => is_pawn_move(board, from, to, side),
    }
}

fn deltas(from: Square, to: Square) -> (i8, i8) {
    (
        to.row() as i8 - from.row() as i8,
        to.col() as i8 - from.col() as i8,
    )
}

fn is_king_move(from: Square, to: Square) -> bool {
    let (dr, dc) = deltas(from, to);
    dr.abs() <= 1 && dc.abs() <= 1
}

fn is_rook_move(board: &Board, from: Square, to: Square) -> bool {
    let (dr, dc) = deltas(from, to);
    (dr == 0 || dc == 0) && !is_path_blocked(board, from, to)
}

fn is_bishop_move(board: &Board, from: Square, to: Square) -> bool {
    let (dr, dc) = deltas(from, to);
    dr.abs() == dc.abs() && !is_path_blocked(board, from, to)
}

fn is_knight_move(from: Square, to: Square) -> bool {
    let (dr, dc) = deltas(from, to);
    matches!((dr.abs(), dc.abs()), (2, 1) | (1, 2))
}

fn is_pawn_move(board: &Board, from: Square, to: Square, side: Color) -> bool {
    let (dr, dc) = deltas(from, to);
    let dir = side.forward();

    if dc == 0 {
        if !board.is_empty(to) {
            return false;
        }
        if dr == dir {
            return true;
        }
        // Double step also requires the skipped square to be empty.
        return dr == 2 * dir
            && from.row() == side.pawn_rank()
            && from
                .offset(dir, 0)
                .is_some_and(|skipped| board.is_empty(skipped));
    }

    dc.abs() == 1
        && dr == dir
        && board.get(to).is_some_and(|target| target.color != side)
}

/// Checks whether any square strictly between `from` and `to` is occupied.
///
/// Walks unit steps along the row, column or diagonal joining the two
/// squares. Callers only pass straight or diagonal pairs.
pub fn is_path_blocked(board: &Board, from: Square, to: Square) -> bool {
    let (dr, dc) = deltas(from, to);
    let (step_r, step_c) = (dr.signum(), dc.signum());

    let mut current = from;
    loop {
        current = match current.offset(step_r, step_c) {
            Some(next) => next,
            None => return false,
        };
        if current == to {
            return false;
        }
        if !board.is_empty(current) {
            return true;
        }
    }
}
