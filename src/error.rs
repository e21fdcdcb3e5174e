//! Errors surfaced to WebSocket clients. Each variant's display text is the
//! `error` field of the `ERROR` message sent back to the offending sender.

use thiserror::Error;

use crate::chess::MoveError;
use crate::models::GameId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// The auth token resolves to no identity.
    #[error("invalid auth token")]
    Auth,

    /// The named game does not exist (or has finished and been removed).
    #[error("game {0} does not exist")]
    GameNotFound(GameId),

    /// The rules engine rejected the move; carries the engine's own reason.
    #[error(transparent)]
    IllegalMove(#[from] MoveError),

    /// Acting on a seat or role the sender does not hold.
    #[error("{0}")]
    Forbidden(&'static str),

    /// The command cannot apply to the game in its current state.
    #[error("{0}")]
    InvalidState(&'static str),
}

pub type Result<T> = std::result::Result<T, SessionError>;
