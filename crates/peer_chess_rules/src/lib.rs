//! Pure chess board model and move-legality engine.
//!
//! # Architecture
//!
//! - **Types**: squares, colored pieces and the 8×8 board
//! - **Rules**: per-piece legality, check detection, check escape and
//!   exhaustive checkmate search
//! - **Invariants**: board properties the rules rely on
//!
//! Castling, en passant, promotion and draw detection are not modelled.
//!
//! # Example
//!
//! ```
//! use peer_chess_rules::{rules, Board, Color, Square};
//!
//! let board = Board::initial();
//! assert!(rules::is_legal_move(&board, Square::new(6, 4), Square::new(4, 4), Color::White));
//! assert!(!rules::is_in_check(&board, Color::White));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod invariants;
pub mod rules;
mod types;

pub use invariants::{Invariant, OneKingPerSide};
pub use types::{BOARD_SIZE, Board, Color, Piece, PieceKind, Square};
