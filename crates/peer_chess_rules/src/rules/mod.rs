//! Move legality rules.
//!
//! This module contains pure functions over a [`Board`](crate::Board).
//! Rules never mutate the board they are given; hypothetical moves are
//! played on copies.

pub mod check;
pub mod movement;

pub use check::{
    can_escape_check, has_legal_move, is_checkmate, is_fully_legal, is_in_check,
    legal_destinations,
};
pub use movement::{is_legal_move, is_path_blocked};
