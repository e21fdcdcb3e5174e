//! The chess rules engine: board representation, move generation and the
//! turn-taking game state. Everything here is pure and synchronous; the
//! session layer wraps it for play over the network.

mod board;
mod game;
mod movegen;

pub use board::{Board, Color, Move, OffBoard, Piece, PieceKind, Square};
pub use game::{GameState, MoveError};
pub use movegen::{pseudo_legal_moves, PROMOTION_KINDS};
