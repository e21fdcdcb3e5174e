use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The two armies. `WHITE` starts on rows 1 and 2 and moves toward row 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opponent(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Color::White => "WHITE",
            Color::Black => "BLACK",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PieceKind {
    King,
    Queen,
    Bishop,
    Knight,
    Rook,
    Pawn,
}

impl PieceKind {
    /// Lowercase algebraic letter, used for the promotion suffix in move text.
    pub fn letter(self) -> char {
        match self {
            PieceKind::King => 'k',
            PieceKind::Queen => 'q',
            PieceKind::Bishop => 'b',
            PieceKind::Knight => 'n',
            PieceKind::Rook => 'r',
            PieceKind::Pawn => 'p',
        }
    }
}

/// A colored piece. Plain value, carries no position of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub color: Color,
    pub kind: PieceKind,
}

impl Piece {
    pub fn new(color: Color, kind: PieceKind) -> Piece {
        Piece { color, kind }
    }
}

/// Raised when a square outside the 8x8 grid is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("square ({row}, {col}) is off the board")]
pub struct OffBoard {
    row: u8,
    col: u8,
}

/// Untrusted wire form of a square; converted through `Square::try_from`
/// so no out-of-range coordinate survives deserialization.
#[derive(Serialize, Deserialize)]
struct RawSquare {
    row: u8,
    col: u8,
}

/// A board coordinate. Row 1 is white's back rank, column 1 is the a-file.
/// Both components are always in `1..=8`; construction validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSquare", into = "RawSquare")]
pub struct Square {
    row: u8,
    col: u8,
}

impl Square {
    pub fn new(row: u8, col: u8) -> Result<Square, OffBoard> {
        if (1..=8).contains(&row) && (1..=8).contains(&col) {
            Ok(Square { row, col })
        } else {
            Err(OffBoard { row, col })
        }
    }

    pub fn row(self) -> u8 {
        self.row
    }

    pub fn col(self) -> u8 {
        self.col
    }

    /// Step by a (row, column) delta. Returns `None` when the step leaves
    /// the board, which is what terminates sliding rays.
    pub fn offset(self, dr: i8, dc: i8) -> Option<Square> {
        let row = self.row as i8 + dr;
        let col = self.col as i8 + dc;
        if (1..=8).contains(&row) && (1..=8).contains(&col) {
            Some(Square {
                row: row as u8,
                col: col as u8,
            })
        } else {
            None
        }
    }

    /// Every square, a1 through h8.
    pub fn all() -> impl Iterator<Item = Square> {
        (1u8..=8).flat_map(|row| (1u8..=8).map(move |col| Square { row, col }))
    }
}

impl TryFrom<RawSquare> for Square {
    type Error = OffBoard;

    fn try_from(raw: RawSquare) -> Result<Square, OffBoard> {
        Square::new(raw.row, raw.col)
    }
}

impl From<Square> for RawSquare {
    fn from(sq: Square) -> RawSquare {
        RawSquare {
            row: sq.row,
            col: sq.col,
        }
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", char::from(b'a' + self.col - 1), self.row)
    }
}

/// A move request: start square, end square, and for a pawn reaching the
/// last rank, the piece it becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub start: Square,
    pub end: Square,
    #[serde(default)]
    pub promotion: Option<PieceKind>,
}

impl Move {
    pub fn new(start: Square, end: Square) -> Move {
        Move {
            start,
            end,
            promotion: None,
        }
    }

    pub fn promoting(start: Square, end: Square, kind: PieceKind) -> Move {
        Move {
            start,
            end,
            promotion: Some(kind),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.start, self.end)?;
        if let Some(kind) = self.promotion {
            write!(f, "{}", kind.letter())?;
        }
        Ok(())
    }
}

const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

/// An 8x8 mailbox of optional pieces. The board is pure storage: it knows
/// how to read, write and relocate pieces, never whether a move is legal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    squares: [[Option<Piece>; 8]; 8],
}

impl Board {
    pub fn empty() -> Board {
        Board {
            squares: [[None; 8]; 8],
        }
    }

    /// The standard starting position.
    pub fn standard() -> Board {
        let mut board = Board::empty();
        for (i, kind) in BACK_RANK.into_iter().enumerate() {
            let col = i as u8 + 1;
            board.set(Square { row: 1, col }, Some(Piece::new(Color::White, kind)));
            board.set(
                Square { row: 2, col },
                Some(Piece::new(Color::White, PieceKind::Pawn)),
            );
            board.set(
                Square { row: 7, col },
                Some(Piece::new(Color::Black, PieceKind::Pawn)),
            );
            board.set(Square { row: 8, col }, Some(Piece::new(Color::Black, kind)));
        }
        board
    }

    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.squares[sq.row as usize - 1][sq.col as usize - 1]
    }

    pub fn set(&mut self, sq: Square, piece: Option<Piece>) {
        self.squares[sq.row as usize - 1][sq.col as usize - 1] = piece;
    }

    /// Relocate the piece on `mv.start` to `mv.end`, replacing whatever was
    /// there and swapping in the promotion piece when one is named. No-op if
    /// the start square is empty; legality lives a layer up.
    pub fn apply(&mut self, mv: Move) {
        let Some(piece) = self.piece_at(mv.start) else {
            return;
        };
        self.set(mv.start, None);
        let placed = match mv.promotion {
            Some(kind) => Piece::new(piece.color, kind),
            None => piece,
        };
        self.set(mv.end, Some(placed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(row: u8, col: u8) -> Square {
        Square::new(row, col).unwrap()
    }

    #[test]
    fn square_rejects_out_of_range() {
        assert!(Square::new(0, 4).is_err());
        assert!(Square::new(9, 4).is_err());
        assert!(Square::new(4, 0).is_err());
        assert!(Square::new(4, 9).is_err());
        assert!(Square::new(1, 1).is_ok());
        assert!(Square::new(8, 8).is_ok());
    }

    #[test]
    fn square_deserialization_validates() {
        let ok: Square = serde_json::from_str(r#"{"row":3,"col":5}"#).unwrap();
        assert_eq!(ok, sq(3, 5));
        assert!(serde_json::from_str::<Square>(r#"{"row":9,"col":5}"#).is_err());
        assert!(serde_json::from_str::<Square>(r#"{"row":0,"col":2}"#).is_err());
    }

    #[test]
    fn offset_stops_at_the_edge() {
        assert_eq!(sq(1, 1).offset(-1, 0), None);
        assert_eq!(sq(8, 8).offset(0, 1), None);
        assert_eq!(sq(4, 4).offset(1, -1), Some(sq(5, 3)));
    }

    #[test]
    fn square_displays_in_algebraic_form() {
        assert_eq!(sq(4, 5).to_string(), "e4");
        assert_eq!(sq(1, 1).to_string(), "a1");
        assert_eq!(sq(8, 8).to_string(), "h8");
    }

    #[test]
    fn move_display_includes_promotion_letter() {
        let plain = Move::new(sq(2, 5), sq(4, 5));
        assert_eq!(plain.to_string(), "e2e4");
        let promo = Move::promoting(sq(7, 2), sq(8, 2), PieceKind::Queen);
        assert_eq!(promo.to_string(), "b7b8q");
    }

    #[test]
    fn standard_position_has_the_usual_layout() {
        let board = Board::standard();
        assert_eq!(
            board.piece_at(sq(1, 5)),
            Some(Piece::new(Color::White, PieceKind::King))
        );
        assert_eq!(
            board.piece_at(sq(8, 4)),
            Some(Piece::new(Color::Black, PieceKind::Queen))
        );
        for col in 1..=8 {
            assert_eq!(
                board.piece_at(sq(2, col)),
                Some(Piece::new(Color::White, PieceKind::Pawn))
            );
            assert_eq!(
                board.piece_at(sq(7, col)),
                Some(Piece::new(Color::Black, PieceKind::Pawn))
            );
        }
        for col in 1..=8 {
            for row in 3..=6 {
                assert_eq!(board.piece_at(sq(row, col)), None);
            }
        }
    }

    #[test]
    fn apply_relocates_and_captures() {
        let mut board = Board::empty();
        board.set(sq(4, 4), Some(Piece::new(Color::White, PieceKind::Rook)));
        board.set(sq(4, 8), Some(Piece::new(Color::Black, PieceKind::Bishop)));
        board.apply(Move::new(sq(4, 4), sq(4, 8)));
        assert_eq!(board.piece_at(sq(4, 4)), None);
        assert_eq!(
            board.piece_at(sq(4, 8)),
            Some(Piece::new(Color::White, PieceKind::Rook))
        );
    }

    #[test]
    fn apply_swaps_in_the_promotion_piece() {
        let mut board = Board::empty();
        board.set(sq(7, 1), Some(Piece::new(Color::White, PieceKind::Pawn)));
        board.apply(Move::promoting(sq(7, 1), sq(8, 1), PieceKind::Knight));
        assert_eq!(
            board.piece_at(sq(8, 1)),
            Some(Piece::new(Color::White, PieceKind::Knight))
        );
    }

    #[test]
    fn apply_on_an_empty_square_changes_nothing() {
        let mut board = Board::standard();
        let before = board.clone();
        board.apply(Move::new(sq(4, 4), sq(5, 4)));
        assert_eq!(board, before);
    }
}
