//! Core domain types for the chess board.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use strum::EnumIter;
use tracing::instrument;

/// Board edge length.
pub const BOARD_SIZE: usize = 8;

/// Side in the game.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
pub enum Color {
    /// White (moves first, back rank is row 7).
    White,
    /// Black (back rank is row 0).
    Black,
}

impl Color {
    /// Returns the opposing side.
    pub fn opponent(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Row delta of a forward pawn step.
    pub fn forward(self) -> i8 {
        match self {
            Color::White => -1,
            Color::Black => 1,
        }
    }

    /// Row on which this side's pawns start.
    pub fn pawn_rank(self) -> usize {
        match self {
            Color::White => 6,
            Color::Black => 1,
        }
    }

    /// Row holding this side's back rank pieces.
    pub fn back_rank(self) -> usize {
        match self {
            Color::White => 7,
            Color::Black => 0,
        }
    }
}

/// Kind of chess piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
pub enum PieceKind {
    /// King.
    King,
    /// Queen.
    Queen,
    /// Rook.
    Rook,
    /// Bishop.
    Bishop,
    /// Knight.
    Knight,
    /// Pawn.
    Pawn,
}

impl PieceKind {
    /// Material value credited to the side that captures this piece.
    pub fn value(self) -> u32 {
        match self {
            PieceKind::Pawn => 1,
            PieceKind::Knight | PieceKind::Bishop => 3,
            PieceKind::Rook => 5,
            PieceKind::Queen => 9,
            PieceKind::King => 0,
        }
    }

    /// One-letter code (K, Q, R, B, N, P).
    pub fn code(self) -> char {
        match self {
            PieceKind::King => 'K',
            PieceKind::Queen => 'Q',
            PieceKind::Rook => 'R',
            PieceKind::Bishop => 'B',
            PieceKind::Knight => 'N',
            PieceKind::Pawn => 'P',
        }
    }
}

/// A colored piece. Immutable value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    /// Owning side.
    pub color: Color,
    /// Piece kind.
    pub kind: PieceKind,
}

impl Piece {
    /// Creates a piece.
    pub const fn new(color: Color, kind: PieceKind) -> Self {
        Self { color, kind }
    }

    /// Unicode glyph used when rendering the board.
    pub fn glyph(self) -> char {
        match (self.color, self.kind) {
            (Color::White, PieceKind::King) => '♔',
            (Color::White, PieceKind::Queen) => '♕',
            (Color::White, PieceKind::Rook) => '♖',
            (Color::White, PieceKind::Bishop) => '♗',
            (Color::White, PieceKind::Knight) => '♘',
            (Color::White, PieceKind::Pawn) => '♙',
            (Color::Black, PieceKind::King) => '♚',
            (Color::Black, PieceKind::Queen) => '♛',
            (Color::Black, PieceKind::Rook) => '♜',
            (Color::Black, PieceKind::Bishop) => '♝',
            (Color::Black, PieceKind::Knight) => '♞',
            (Color::Black, PieceKind::Pawn) => '♟',
        }
    }
}

impl std::fmt::Display for Piece {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let color = match self.color {
            Color::White => 'w',
            Color::Black => 'b',
        };
        write!(f, "{}{}", color, self.kind.code())
    }
}

/// A square on the board.
///
/// Row 0 is Black's back rank, row 7 is White's back rank.
/// Coordinates are always in `0..8`; constructing an out-of-range square
/// through [`Square::new`] is a programming error and panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Square {
    row: u8,
    col: u8,
}

impl Square {
    /// Creates a square.
    ///
    /// # Panics
    ///
    /// Panics if `row` or `col` is outside `0..8`.
    #[track_caller]
    pub fn new(row: usize, col: usize) -> Self {
        assert!(
            row < BOARD_SIZE && col < BOARD_SIZE,
            "square ({row}, {col}) is off the board"
        );
        Self {
            row: row as u8,
            col: col as u8,
        }
    }

    /// Creates a square from untrusted coordinates.
    pub fn try_new(row: i64, col: i64) -> Option<Self> {
        let in_range = |v: i64| (0..BOARD_SIZE as i64).contains(&v);
        if in_range(row) && in_range(col) {
            Some(Self::new(row as usize, col as usize))
        } else {
            None
        }
    }

    /// Parses algebraic notation (`e2` is row 6, column 4).
    #[instrument]
    pub fn from_algebraic(s: &str) -> Option<Self> {
        let mut chars = s.trim().chars();
        let file = chars.next()?.to_ascii_lowercase();
        let rank = chars.next()?.to_digit(10)?;
        if chars.next().is_some() || !('a'..='h').contains(&file) || !(1..=8).contains(&rank) {
            return None;
        }
        Some(Self::new(8 - rank as usize, file as usize - 'a' as usize))
    }

    /// Row index (0-7).
    pub fn row(self) -> usize {
        self.row as usize
    }

    /// Column index (0-7).
    pub fn col(self) -> usize {
        self.col as usize
    }

    /// Returns the square offset by the given deltas, if it is on the board.
    pub fn offset(self, d_row: i8, d_col: i8) -> Option<Self> {
        Self::try_new(
            self.row as i64 + d_row as i64,
            self.col as i64 + d_col as i64,
        )
    }

    /// Iterates all 64 squares in row-major order.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..BOARD_SIZE).flat_map(|row| (0..BOARD_SIZE).map(move |col| Square::new(row, col)))
    }
}

impl std::fmt::Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let file = (b'a' + self.col) as char;
        write!(f, "{}{}", file, 8 - self.row)
    }
}

/// 8×8 board of optional pieces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    squares: [[Option<Piece>; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    /// Creates a board with no pieces.
    pub fn empty() -> Self {
        Self {
            squares: [[None; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    /// Creates the standard starting position.
    #[instrument]
    pub fn initial() -> Self {
        const BACK_ROW: [PieceKind; BOARD_SIZE] = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];

        let mut board = Self::empty();
        for color in [Color::White, Color::Black] {
            for (col, kind) in BACK_ROW.iter().enumerate() {
                board.place(Square::new(color.back_rank(), col), Piece::new(color, *kind));
                board.place(
                    Square::new(color.pawn_rank(), col),
                    Piece::new(color, PieceKind::Pawn),
                );
            }
        }
        board
    }

    /// Gets the piece on a square.
    pub fn get(&self, square: Square) -> Option<Piece> {
        self.squares[square.row()][square.col()]
    }

    /// Checks if a square is empty.
    pub fn is_empty(&self, square: Square) -> bool {
        self.get(square).is_none()
    }

    /// Puts a piece on a square, replacing whatever was there.
    pub fn place(&mut self, square: Square, piece: Piece) {
        self.squares[square.row()][square.col()] = Some(piece);
    }

    /// Removes and returns the piece on a square.
    pub fn clear(&mut self, square: Square) -> Option<Piece> {
        self.squares[square.row()][square.col()].take()
    }

    /// Moves whatever is on `from` to `to`, returning the piece previously on `to`.
    ///
    /// No legality is checked.
    pub fn relocate(&mut self, from: Square, to: Square) -> Option<Piece> {
        let moving = self.clear(from);
        std::mem::replace(&mut self.squares[to.row()][to.col()], moving)
    }

    /// Returns a copy of this board with `from` relocated to `to`.
    pub fn with_move(&self, from: Square, to: Square) -> Self {
        let mut copy = self.clone();
        copy.relocate(from, to);
        copy
    }

    /// Locates a side's king.
    pub fn king_square(&self, color: Color) -> Option<Square> {
        Square::all().find(|sq| self.get(*sq) == Some(Piece::new(color, PieceKind::King)))
    }

    /// Iterates every piece belonging to `color` with its square.
    pub fn pieces(&self, color: Color) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| {
            self.get(sq)
                .filter(|piece| piece.color == color)
                .map(|piece| (sq, piece))
        })
    }

    /// Formats the board as a human-readable grid, White at the bottom.
    pub fn display(&self) -> String {
        let mut result = String::new();
        for row in 0..BOARD_SIZE {
            result.push_str(&format!("{} ", BOARD_SIZE - row));
            for col in 0..BOARD_SIZE {
                let symbol = match self.get(Square::new(row, col)) {
                    Some(piece) => piece.glyph(),
                    None if (row + col) % 2 == 0 => '·',
                    None => ' ',
                };
                result.push(symbol);
                result.push(' ');
            }
            result.push('\n');
        }
        result.push_str("  a b c d e f g h");
        result
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_position_layout() {
        let board = Board::initial();
        assert_eq!(
            board.get(Square::new(7, 4)),
            Some(Piece::new(Color::White, PieceKind::King))
        );
        assert_eq!(
            board.get(Square::new(0, 3)),
            Some(Piece::new(Color::Black, PieceKind::Queen))
        );
        assert_eq!(board.pieces(Color::White).count(), 16);
        assert_eq!(board.pieces(Color::Black).count(), 16);
        assert!((2..6).all(|row| (0..8).all(|col| board.is_empty(Square::new(row, col)))));
    }

    #[test]
    fn test_algebraic_round_trip() {
        let e2 = Square::from_algebraic("e2").expect("valid square");
        assert_eq!((e2.row(), e2.col()), (6, 4));
        assert_eq!(e2.to_string(), "e2");
        assert_eq!(Square::from_algebraic("a8"), Some(Square::new(0, 0)));
        assert_eq!(Square::from_algebraic("i1"), None);
        assert_eq!(Square::from_algebraic("e9"), None);
        assert_eq!(Square::from_algebraic("e22"), None);
    }

    #[test]
    fn test_try_new_rejects_off_board() {
        assert!(Square::try_new(-1, 0).is_none());
        assert!(Square::try_new(0, 8).is_none());
        assert_eq!(Square::try_new(7, 7), Some(Square::new(7, 7)));
    }

    #[test]
    #[should_panic(expected = "off the board")]
    fn test_new_panics_off_board() {
        let _ = Square::new(8, 0);
    }

    #[test]
    fn test_relocate_returns_captured() {
        let mut board = Board::empty();
        let rook = Piece::new(Color::White, PieceKind::Rook);
        let knight = Piece::new(Color::Black, PieceKind::Knight);
        board.place(Square::new(7, 0), rook);
        board.place(Square::new(7, 4), knight);

        let captured = board.relocate(Square::new(7, 0), Square::new(7, 4));
        assert_eq!(captured, Some(knight));
        assert_eq!(board.get(Square::new(7, 4)), Some(rook));
        assert!(board.is_empty(Square::new(7, 0)));
    }

    #[test]
    fn test_with_move_leaves_original_untouched() {
        let board = Board::initial();
        let moved = board.with_move(Square::new(6, 4), Square::new(4, 4));
        assert_eq!(board, Board::initial());
        assert!(moved.is_empty(Square::new(6, 4)));
    }

    #[test]
    fn test_piece_values() {
        assert_eq!(PieceKind::Queen.value(), 9);
        assert_eq!(PieceKind::Rook.value(), 5);
        assert_eq!(PieceKind::Bishop.value(), 3);
        assert_eq!(PieceKind::Knight.value(), 3);
        assert_eq!(PieceKind::Pawn.value(), 1);
        assert_eq!(PieceKind::King.value(), 0);
    }
}
