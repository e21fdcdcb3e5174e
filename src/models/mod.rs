pub mod game;
pub mod messages;

pub use game::{Game, GameId, GameStatus, Role};
pub use messages::{ClientCommand, CommandKind, Outbound, ServerMessage};
