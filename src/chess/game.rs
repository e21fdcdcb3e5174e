use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::board::{Board, Color, Move, Piece, PieceKind, Square};
use super::movegen::pseudo_legal_moves;

/// Why a move request was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("no piece on {0}")]
    NoPiece(Square),
    #[error("it is {0}'s turn")]
    NotYourTurn(Color),
    #[error("move {0} is not legal")]
    Illegal(Move),
}

/// A position plus whose turn it is. All mutation goes through
/// [`apply_move`](GameState::apply_move), so a state that started from a
/// legal position only ever holds legal positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    board: Board,
    side_to_move: Color,
}

impl Default for GameState {
    fn default() -> GameState {
        GameState::new()
    }
}

impl GameState {
    /// The starting position, white to move.
    pub fn new() -> GameState {
        GameState {
            board: Board::standard(),
            side_to_move: Color::White,
        }
    }

    /// A state over an arbitrary position, mostly useful for endgame setups
    /// and tests.
    pub fn with_position(board: Board, side_to_move: Color) -> GameState {
        GameState {
            board,
            side_to_move,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// Fully legal moves for the piece on `from`: pseudo-legal moves minus
    /// those that would leave the mover's own king in check. Legality of a
    /// move never depends on whose turn it is.
    pub fn legal_moves(&self, from: Square) -> Result<Vec<Move>, MoveError> {
        let piece = self
            .board
            .piece_at(from)
            .ok_or(MoveError::NoPiece(from))?;
        let moves = pseudo_legal_moves(&self.board, from)
            .into_iter()
            .filter(|&mv| {
                let mut scratch = self.board.clone();
                scratch.apply(mv);
                !in_check(&scratch, piece.color)
            })
            .collect();
        Ok(moves)
    }

    /// Validate `mv` against the side to move and the legal move set, then
    /// apply it and pass the turn. On error the state is untouched.
    pub fn apply_move(&mut self, mv: Move) -> Result<(), MoveError> {
        let piece = self
            .board
            .piece_at(mv.start)
            .ok_or(MoveError::NoPiece(mv.start))?;
        if piece.color != self.side_to_move {
            return Err(MoveError::NotYourTurn(self.side_to_move));
        }
        if !self.legal_moves(mv.start)?.contains(&mv) {
            return Err(MoveError::Illegal(mv));
        }
        self.board.apply(mv);
        self.side_to_move = self.side_to_move.opponent();
        Ok(())
    }

    /// True when any enemy piece could capture `color`'s king next move.
    pub fn is_in_check(&self, color: Color) -> bool {
        in_check(&self.board, color)
    }

    /// In check with no legal move anywhere.
    pub fn is_in_checkmate(&self, color: Color) -> bool {
        self.is_in_check(color) && self.has_no_legal_moves(color)
    }

    /// Not in check, but no legal move anywhere.
    pub fn is_in_stalemate(&self, color: Color) -> bool {
        !self.is_in_check(color) && self.has_no_legal_moves(color)
    }

    fn has_no_legal_moves(&self, color: Color) -> bool {
        for sq in Square::all() {
            match self.board.piece_at(sq) {
                Some(piece) if piece.color == color => {
                    if self
                        .legal_moves(sq)
                        .map_or(false, |moves| !moves.is_empty())
                    {
                        return false;
                    }
                }
                _ => {}
            }
        }
        true
    }
}

/// Check detection over a bare board: does any enemy pseudo-legal move end
/// on `color`'s king square? Pseudo-legal is enough here, since a capture
/// of the king would end the game before the attacker's own exposure
/// matters. A board with no king of `color` is never in check.
fn in_check(board: &Board, color: Color) -> bool {
    let Some(king) = king_square(board, color) else {
        return false;
    };
    for from in Square::all() {
        match board.piece_at(from) {
            Some(piece) if piece.color != color => {
                if pseudo_legal_moves(board, from)
                    .iter()
                    .any(|mv| mv.end == king)
                {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

fn king_square(board: &Board, color: Color) -> Option<Square> {
    Square::all().find(|&sq| board.piece_at(sq) == Some(Piece::new(color, PieceKind::King)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(row: u8, col: u8) -> Square {
        Square::new(row, col).unwrap()
    }

    fn mv(from: (u8, u8), to: (u8, u8)) -> Move {
        Move::new(sq(from.0, from.1), sq(to.0, to.1))
    }

    /// White king e1, white rook e2, black rook e8. The white rook is
    /// pinned to the e-file.
    fn pinned_rook_position() -> GameState {
        let mut board = Board::empty();
        board.set(sq(1, 5), Some(Piece::new(Color::White, PieceKind::King)));
        board.set(sq(2, 5), Some(Piece::new(Color::White, PieceKind::Rook)));
        board.set(sq(8, 5), Some(Piece::new(Color::Black, PieceKind::Rook)));
        board.set(sq(8, 1), Some(Piece::new(Color::Black, PieceKind::King)));
        GameState::with_position(board, Color::White)
    }

    #[test]
    fn legal_moves_on_an_empty_square_is_an_error() {
        let state = GameState::new();
        assert_eq!(
            state.legal_moves(sq(4, 4)),
            Err(MoveError::NoPiece(sq(4, 4)))
        );
    }

    #[test]
    fn legal_moves_ignores_whose_turn_it_is() {
        let state = GameState::new();
        // Black pawn moves are reported even though white is to move.
        let moves = state.legal_moves(sq(7, 5)).unwrap();
        assert_eq!(moves.len(), 2);
    }

    #[test]
    fn pinned_rook_may_only_slide_along_the_pin() {
        let state = pinned_rook_position();
        let moves = state.legal_moves(sq(2, 5)).unwrap();
        assert!(!moves.is_empty());
        assert!(moves.iter().all(|m| m.end.col() == 5));
    }

    #[test]
    fn pinned_knight_has_no_moves_at_all() {
        let mut board = Board::empty();
        board.set(sq(1, 5), Some(Piece::new(Color::White, PieceKind::King)));
        board.set(sq(2, 5), Some(Piece::new(Color::White, PieceKind::Knight)));
        board.set(sq(8, 5), Some(Piece::new(Color::Black, PieceKind::Rook)));
        board.set(sq(8, 1), Some(Piece::new(Color::Black, PieceKind::King)));
        let state = GameState::with_position(board, Color::White);
        assert!(state.legal_moves(sq(2, 5)).unwrap().is_empty());
    }

    #[test]
    fn king_cannot_step_into_an_attacked_square() {
        let mut board = Board::empty();
        board.set(sq(1, 5), Some(Piece::new(Color::White, PieceKind::King)));
        board.set(sq(8, 4), Some(Piece::new(Color::Black, PieceKind::Rook)));
        board.set(sq(8, 8), Some(Piece::new(Color::Black, PieceKind::King)));
        let state = GameState::with_position(board, Color::White);
        let moves = state.legal_moves(sq(1, 5)).unwrap();
        // The d-file is covered by the rook.
        assert!(moves.iter().all(|m| m.end.col() != 4));
        assert!(!moves.is_empty());
    }

    #[test]
    fn legal_moves_is_stable_across_repeated_calls() {
        let state = pinned_rook_position();
        let first = state.legal_moves(sq(2, 5)).unwrap();
        let second = state.legal_moves(sq(2, 5)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn apply_move_rejects_out_of_turn_play() {
        let mut state = GameState::new();
        let err = state.apply_move(mv((7, 5), (5, 5))).unwrap_err();
        assert_eq!(err, MoveError::NotYourTurn(Color::White));
        // The rejected request left nothing behind.
        assert_eq!(state, GameState::new());
    }

    #[test]
    fn apply_move_rejects_illegal_requests_without_mutating() {
        let mut state = GameState::new();
        let bad = mv((2, 5), (5, 5));
        assert_eq!(state.apply_move(bad), Err(MoveError::Illegal(bad)));
        assert_eq!(state, GameState::new());
    }

    #[test]
    fn apply_move_alternates_turns() {
        let mut state = GameState::new();
        assert_eq!(state.side_to_move(), Color::White);
        state.apply_move(mv((2, 5), (4, 5))).unwrap();
        assert_eq!(state.side_to_move(), Color::Black);
        state.apply_move(mv((7, 5), (5, 5))).unwrap();
        assert_eq!(state.side_to_move(), Color::White);
    }

    #[test]
    fn fresh_game_has_no_check_and_twenty_moves_each() {
        let state = GameState::new();
        assert!(!state.is_in_check(Color::White));
        assert!(!state.is_in_check(Color::Black));
        for color in [Color::White, Color::Black] {
            let mut total = 0;
            for sq in Square::all() {
                if let Some(piece) = state.board().piece_at(sq) {
                    if piece.color == color {
                        total += state.legal_moves(sq).unwrap().len();
                    }
                }
            }
            assert_eq!(total, 20);
        }
    }

    #[test]
    fn rook_on_the_open_file_gives_check() {
        let state = pinned_rook_position();
        assert!(!state.is_in_check(Color::White));
        let mut board = state.board().clone();
        // Remove the shielding rook and the king is exposed.
        board.set(sq(2, 5), None);
        let exposed = GameState::with_position(board, Color::White);
        assert!(exposed.is_in_check(Color::White));
        assert!(!exposed.is_in_checkmate(Color::White));
    }

    #[test]
    fn fools_mate_is_checkmate() {
        let mut state = GameState::new();
        state.apply_move(mv((2, 6), (3, 6))).unwrap(); // f3
        state.apply_move(mv((7, 5), (5, 5))).unwrap(); // e5
        state.apply_move(mv((2, 7), (4, 7))).unwrap(); // g4
        state.apply_move(mv((8, 4), (4, 8))).unwrap(); // Qh4#
        assert!(state.is_in_check(Color::White));
        assert!(state.is_in_checkmate(Color::White));
        assert!(!state.is_in_stalemate(Color::White));
        assert!(!state.is_in_checkmate(Color::Black));
    }

    /// Black king a8, white queen c7, white king b6: the classic two-piece
    /// stalemate. Black to move has nothing, but is not in check.
    #[test]
    fn cornered_king_is_stalemated() {
        let mut board = Board::empty();
        board.set(sq(8, 1), Some(Piece::new(Color::Black, PieceKind::King)));
        board.set(sq(7, 3), Some(Piece::new(Color::White, PieceKind::Queen)));
        board.set(sq(6, 2), Some(Piece::new(Color::White, PieceKind::King)));
        let state = GameState::with_position(board, Color::Black);
        assert!(state.is_in_stalemate(Color::Black));
        assert!(!state.is_in_check(Color::Black));
        assert!(!state.is_in_checkmate(Color::Black));
        // White is neither stalemated nor in check in the same position.
        assert!(!state.is_in_stalemate(Color::White));
        assert!(!state.is_in_check(Color::White));
    }

    #[test]
    fn checkmate_and_stalemate_never_overlap() {
        let mut fools = GameState::new();
        fools.apply_move(mv((2, 6), (3, 6))).unwrap();
        fools.apply_move(mv((7, 5), (5, 5))).unwrap();
        fools.apply_move(mv((2, 7), (4, 7))).unwrap();
        fools.apply_move(mv((8, 4), (4, 8))).unwrap();
        for state in [GameState::new(), fools, pinned_rook_position()] {
            for color in [Color::White, Color::Black] {
                assert!(!(state.is_in_checkmate(color) && state.is_in_stalemate(color)));
                if state.is_in_checkmate(color) {
                    assert!(state.is_in_check(color));
                }
                if state.is_in_stalemate(color) {
                    assert!(!state.is_in_check(color));
                }
            }
        }
    }

    #[test]
    fn no_legal_move_ever_leaves_the_mover_in_check() {
        let positions = [
            GameState::new(),
            pinned_rook_position(),
            GameState::with_position(
                {
                    let mut board = Board::empty();
                    board.set(sq(1, 5), Some(Piece::new(Color::White, PieceKind::King)));
                    board.set(sq(3, 4), Some(Piece::new(Color::White, PieceKind::Queen)));
                    board.set(sq(5, 5), Some(Piece::new(Color::Black, PieceKind::Rook)));
                    board.set(sq(8, 5), Some(Piece::new(Color::Black, PieceKind::King)));
                    board
                },
                Color::White,
            ),
        ];
        for state in positions {
            let color = state.side_to_move();
            for from in Square::all() {
                match state.board().piece_at(from) {
                    Some(piece) if piece.color == color => {
                        for mv in state.legal_moves(from).unwrap() {
                            let mut scratch = state.clone();
                            scratch.apply_move(mv).unwrap();
                            assert!(
                                !scratch.is_in_check(color),
                                "move {mv} left {color} in check"
                            );
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn promotion_is_applied_through_the_game_state() {
        let mut board = Board::empty();
        board.set(sq(7, 2), Some(Piece::new(Color::White, PieceKind::Pawn)));
        board.set(sq(1, 8), Some(Piece::new(Color::White, PieceKind::King)));
        board.set(sq(6, 6), Some(Piece::new(Color::Black, PieceKind::King)));
        let mut state = GameState::with_position(board, Color::White);
        let moves = state.legal_moves(sq(7, 2)).unwrap();
        assert_eq!(moves.len(), 4);
        state
            .apply_move(Move::promoting(sq(7, 2), sq(8, 2), PieceKind::Queen))
            .unwrap();
        assert_eq!(
            state.board().piece_at(sq(8, 2)),
            Some(Piece::new(Color::White, PieceKind::Queen))
        );
        assert_eq!(state.side_to_move(), Color::Black);
    }
}
