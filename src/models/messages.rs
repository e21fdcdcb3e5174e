use actix::Message;
use serde::{Deserialize, Serialize};

use crate::chess::Move;
use crate::models::game::{Game, GameId};

/// The four things a client can ask of a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    Connect,
    MakeMove,
    Leave,
    Resign,
}

/// One decoded client frame. Every command carries the auth token and the
/// game it targets; only `MAKE_MOVE` uses the `move` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientCommand {
    pub command: CommandKind,
    pub auth_token: String,
    pub game_id: GameId,
    #[serde(default, rename = "move")]
    pub mv: Option<Move>,
}

/// Everything the server pushes down a session socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Full refreshed game record, sent after anything changes it.
    LoadGame { game: Game },
    /// Human-readable event text for display in a client's feed.
    Notification { message: String },
    /// A command failed; delivered only to its sender.
    Error { error: String },
}

/// A serialized [`ServerMessage`] on its way out through a socket actor.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct Outbound(pub String);
