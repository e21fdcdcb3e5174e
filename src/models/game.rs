use serde::{Deserialize, Serialize};

use crate::chess::{Color, GameState};

/// Games are numbered sequentially by the store; identifiers are never
/// reused, even after a finished game is removed.
pub type GameId = u32;

/// Lifecycle of a game record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    /// At least one seat is empty.
    Open,
    /// Both seats are taken and play can proceed.
    Active,
    /// Decided by checkmate, stalemate or resignation.
    Finished,
}

/// What a connected user is to a particular game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Player(Color),
    Observer,
}

impl Role {
    pub fn color(self) -> Option<Color> {
        match self {
            Role::Player(color) => Some(color),
            Role::Observer => None,
        }
    }
}

/// A stored game: the two seats, a display name and the live rules state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub name: String,
    pub white: Option<String>,
    pub black: Option<String>,
    pub status: GameStatus,
    pub state: GameState,
}

impl Game {
    pub fn new(id: GameId, name: impl Into<String>) -> Game {
        Game {
            id,
            name: name.into(),
            white: None,
            black: None,
            status: GameStatus::Open,
            state: GameState::new(),
        }
    }

    /// The role `username` holds in this game right now. Anyone not seated
    /// is an observer.
    pub fn role_of(&self, username: &str) -> Role {
        if self.white.as_deref() == Some(username) {
            Role::Player(Color::White)
        } else if self.black.as_deref() == Some(username) {
            Role::Player(Color::Black)
        } else {
            Role::Observer
        }
    }

    pub fn seat(&self, color: Color) -> Option<&str> {
        match color {
            Color::White => self.white.as_deref(),
            Color::Black => self.black.as_deref(),
        }
    }

    pub fn clear_seat(&mut self, color: Color) {
        match color {
            Color::White => self.white = None,
            Color::Black => self.black = None,
        }
    }
}
