//! Session command handling, independent of any transport. The socket
//! actor decodes frames and calls into [`SessionHandler`]; everything that
//! touches game records or fans out messages happens here, so the whole
//! protocol can be driven from tests without opening a socket.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use actix::Recipient;
use log::{info, warn};

use crate::chess::{Move, MoveError};
use crate::error::{Result, SessionError};
use crate::models::{Game, GameId, GameStatus, Outbound, Role, ServerMessage};
use crate::storage::{Auth, GameStore};
use crate::websocket::registry::ConnectionRegistry;

/// One mutex per live game. A command that mutates a game holds its lock
/// from the first read to the last write, so two commands can never
/// interleave on the same record while different games stay independent.
#[derive(Default)]
struct GameLocks {
    table: Mutex<HashMap<GameId, Arc<Mutex<()>>>>,
}

impl GameLocks {
    fn acquire(&self, id: GameId) -> Arc<Mutex<()>> {
        self.table.lock().unwrap().entry(id).or_default().clone()
    }

    /// Forget the lock for a game that no longer exists. Ids are never
    /// reused, so a straggler holding the old handle can only go on to
    /// observe the game's absence.
    fn release(&self, id: GameId) {
        self.table.lock().unwrap().remove(&id);
    }

    /// Forget the entry for an id that turned out to name no game, unless
    /// another command still holds the same handle. The strong count is
    /// stable under the check: every clone is taken inside
    /// [`acquire`](GameLocks::acquire), under the same table lock.
    fn discard_if_unused(&self, id: GameId) {
        let mut table = self.table.lock().unwrap();
        if let Some(entry) = table.get(&id) {
            if Arc::strong_count(entry) <= 2 {
                table.remove(&id);
            }
        }
    }
}

/// What a successful `CONNECT` established; the socket actor keeps this
/// for teardown when the transport drops. `connection_id` records which
/// socket owns the registration, so a stale socket tearing down after a
/// reconnect cannot release its replacement's slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Joined {
    pub username: String,
    pub game_id: GameId,
    pub role: Role,
    pub connection_id: String,
}

/// Executes session commands against the store and fans results out
/// through the connection registry.
pub struct SessionHandler {
    auth: Arc<dyn Auth>,
    store: Arc<dyn GameStore>,
    registry: ConnectionRegistry,
    locks: GameLocks,
}

impl SessionHandler {
    pub fn new(auth: Arc<dyn Auth>, store: Arc<dyn GameStore>) -> SessionHandler {
        SessionHandler {
            auth,
            store,
            registry: ConnectionRegistry::new(),
            locks: GameLocks::default(),
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    fn identify(&self, token: &str) -> Result<String> {
        self.auth.resolve_identity(token).ok_or(SessionError::Auth)
    }

    fn load_game(&self, id: GameId) -> Result<Game> {
        self.store
            .get_game(id)
            .ok_or(SessionError::GameNotFound(id))
    }

    /// `load_game` for the mutating commands, which already hold the
    /// game's lock: a miss also discards the lock entry, so ids that never
    /// named a game cannot grow the lock table.
    fn load_game_for_play(&self, id: GameId) -> Result<Game> {
        self.load_game(id).map_err(|err| {
            self.locks.discard_if_unused(id);
            err
        })
    }

    /// `CONNECT`: register the transport, join the game room, send the
    /// joiner the current game and tell everyone else who arrived.
    /// `connection_id` names the calling socket; it comes back in the
    /// returned [`Joined`] and is checked again at teardown.
    pub fn connect(
        &self,
        transport: Recipient<Outbound>,
        connection_id: &str,
        token: &str,
        game_id: GameId,
    ) -> Result<Joined> {
        let username = self.identify(token)?;
        let game = self.load_game(game_id)?;
        let role = game.role_of(&username);

        let previous = self
            .registry
            .add(&username, connection_id, game_id, transport, role);
        // One room per user: watching a new game gives up the old room
        // slot silently, while any seat on the old record stays held.
        if let Some(old_game) = previous.filter(|&old| old != game_id) {
            self.registry.leave_room(old_game, &username);
            info!(
                "{} moved from game {} to game {}",
                username, old_game, game_id
            );
        }
        self.registry.join_room(game_id, &username);
        self.registry
            .send_to(&username, &ServerMessage::LoadGame { game });

        let arrival = match role {
            Role::Player(color) => format!("{username} joined game as {color}"),
            Role::Observer => format!("{username} is observing"),
        };
        self.registry.broadcast(
            game_id,
            &ServerMessage::Notification { message: arrival },
            Some(&username),
        );
        info!("{} connected to game {} as {:?}", username, game_id, role);
        Ok(Joined {
            username,
            game_id,
            role,
            connection_id: connection_id.to_string(),
        })
    }

    /// `MAKE_MOVE`: validate, apply, persist and announce one move. The
    /// whole sequence runs under the game's lock, so the record other
    /// clients are sent always matches what was persisted.
    pub fn make_move(&self, token: &str, game_id: GameId, mv: Move) -> Result<()> {
        let username = self.identify(token)?;
        let lock = self.locks.acquire(game_id);
        let _guard = lock.lock().unwrap();

        let mut game = self.load_game_for_play(game_id)?;
        if game.status == GameStatus::Finished {
            return Err(SessionError::InvalidState("game is already decided"));
        }
        let role = self
            .registry
            .role_of(&username)
            .ok_or(SessionError::Forbidden("join the game before playing"))?;
        let color = match role {
            Role::Player(color) => color,
            Role::Observer => {
                return Err(SessionError::Forbidden("observers cannot make moves"))
            }
        };
        if color != game.state.side_to_move() {
            return Err(SessionError::IllegalMove(MoveError::NotYourTurn(
                game.state.side_to_move(),
            )));
        }
        game.state.apply_move(mv)?;

        if game.state.is_in_check(color) {
            // Legality filtering should make this impossible.
            warn!(
                "move {} by {} left {} in check after filtering",
                mv, username, color
            );
        }

        let opponent = color.opponent();
        let opponent_label = game
            .seat(opponent)
            .map(str::to_owned)
            .unwrap_or_else(|| opponent.to_string());
        let mut finished = false;
        let verdict = if game.state.is_in_checkmate(opponent) {
            finished = true;
            Some(format!("Checkmate, {username} wins!"))
        } else if game.state.is_in_stalemate(opponent) {
            finished = true;
            Some(format!("{opponent_label} in stalemate, {username} wins!"))
        } else if game.state.is_in_check(opponent) {
            Some(format!("{opponent_label} is in check"))
        } else {
            None
        };
        if finished {
            game.status = GameStatus::Finished;
        }
        self.store.put_game(game.clone());

        self.registry
            .broadcast(game_id, &ServerMessage::LoadGame { game }, None);
        self.registry.broadcast(
            game_id,
            &ServerMessage::Notification {
                message: format!("{username} made move {mv}"),
            },
            Some(&username),
        );
        if let Some(message) = verdict {
            self.registry
                .broadcast(game_id, &ServerMessage::Notification { message }, None);
        }
        info!("{} played {} in game {}", username, mv, game_id);

        if finished {
            // Decided games are announced once and then removed for good.
            self.store.delete_game(game_id);
            self.locks.release(game_id);
            info!("game {} finished", game_id);
        }
        Ok(())
    }

    /// `LEAVE`: give up the seat (making the game joinable again), drop
    /// out of the room and tell the others. Observers just drop out.
    pub fn leave(&self, token: &str, game_id: GameId) -> Result<()> {
        let username = self.identify(token)?;
        let lock = self.locks.acquire(game_id);
        let _guard = lock.lock().unwrap();

        let mut game = self.load_game_for_play(game_id)?;
        let seated = game.role_of(&username);
        let connected = self
            .registry
            .role_of(&username)
            .ok_or(SessionError::Forbidden("join the game before leaving it"))?;
        if seated != connected {
            return Err(SessionError::Forbidden("cannot make another user leave"));
        }
        if let Role::Player(color) = seated {
            game.clear_seat(color);
            if game.status == GameStatus::Active {
                game.status = GameStatus::Open;
            }
            self.store.put_game(game);
        }

        self.registry.remove(&username);
        self.registry.leave_room(game_id, &username);
        self.registry.broadcast(
            game_id,
            &ServerMessage::Notification {
                message: format!("{username} left game"),
            },
            Some(&username),
        );
        info!("{} left game {}", username, game_id);
        Ok(())
    }

    /// `RESIGN`: the seated sender forfeits, the opponent wins, and the
    /// game is over for everyone in the room.
    pub fn resign(&self, token: &str, game_id: GameId) -> Result<()> {
        let username = self.identify(token)?;
        let lock = self.locks.acquire(game_id);
        let _guard = lock.lock().unwrap();

        let game = self.load_game_for_play(game_id)?;
        let Role::Player(color) = game.role_of(&username) else {
            return Err(SessionError::Forbidden("observers cannot resign"));
        };
        if !self.registry.room_exists(game_id) {
            return Err(SessionError::InvalidState(
                "cannot resign, game is already decided",
            ));
        }

        let opponent = color.opponent();
        let winner = game
            .seat(opponent)
            .map(str::to_owned)
            .unwrap_or_else(|| opponent.to_string());
        self.registry.broadcast(
            game_id,
            &ServerMessage::Notification {
                message: format!("{username} resigned, {winner} wins!"),
            },
            None,
        );
        self.registry.clear_room(game_id);
        self.registry.remove(&username);

        self.store.delete_game(game_id);
        self.locks.release(game_id);
        info!("{} resigned game {}", username, game_id);
        Ok(())
    }

    /// Transport-level teardown for a socket that closed without `LEAVE`.
    /// Releases the connection and room slot while this socket still owns
    /// them; a registration already replaced by a reconnect is left alone.
    /// Seats and game records are untouched either way.
    pub fn disconnect(&self, joined: &Joined) {
        if self.registry.remove_connection(
            &joined.username,
            &joined.connection_id,
            joined.game_id,
        ) {
            info!(
                "{} disconnected from game {}",
                joined.username, joined.game_id
            );
        } else {
            info!("stale teardown for {} ignored", joined.username);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_hands_every_caller_the_same_lock() {
        let locks = GameLocks::default();
        let first = locks.acquire(3);
        let second = locks.acquire(3);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &locks.acquire(4)));
    }

    #[test]
    fn discarding_a_missed_lock_leaves_shared_entries_alone() {
        let locks = GameLocks::default();

        // Sole holder of an id that named no game: the entry goes away.
        let lock = locks.acquire(7);
        let guard = lock.lock().unwrap();
        locks.discard_if_unused(7);
        assert!(locks.table.lock().unwrap().is_empty());
        drop(guard);

        // Another command still holds the handle, so the entry stays put.
        let mine = locks.acquire(9);
        let theirs = locks.acquire(9);
        assert!(Arc::ptr_eq(&mine, &theirs));
        locks.discard_if_unused(9);
        assert!(locks.table.lock().unwrap().contains_key(&9));

        drop(theirs);
        locks.discard_if_unused(9);
        assert!(locks.table.lock().unwrap().is_empty());
    }
}
