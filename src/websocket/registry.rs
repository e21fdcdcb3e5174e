use std::collections::HashMap;
use std::sync::Mutex;

use actix::prelude::SendError;
use actix::Recipient;
use log::{info, warn};

use crate::models::{GameId, Outbound, Role, ServerMessage};

/// One live socket, addressed by the username that opened it. The `id`
/// names the owning socket, so a stale socket's late teardown can be told
/// apart from the registration that replaced it.
struct Connection {
    id: String,
    game_id: GameId,
    recipient: Recipient<Outbound>,
    role: Role,
}

/// Who is connected, and which game room each username sits in. All methods
/// take `&self`; the registry is shared across socket actors and session
/// code behind short-lived mutexes. Sends are made on snapshots taken under
/// the lock, never while holding it.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<String, Connection>>,
    rooms: Mutex<HashMap<GameId, Vec<String>>>,
}

impl ConnectionRegistry {
    pub fn new() -> ConnectionRegistry {
        ConnectionRegistry::default()
    }

    /// Register a socket for `username`, replacing any earlier one; the old
    /// socket simply stops receiving. Returns the game the replaced
    /// connection sat in, so the caller can release that room slot.
    pub fn add(
        &self,
        username: &str,
        id: &str,
        game_id: GameId,
        recipient: Recipient<Outbound>,
        role: Role,
    ) -> Option<GameId> {
        let mut connections = self.connections.lock().unwrap();
        let previous = connections.insert(
            username.to_string(),
            Connection {
                id: id.to_string(),
                game_id,
                recipient,
                role,
            },
        );
        previous.map(|old| {
            info!("replaced existing connection for {}", username);
            old.game_id
        })
    }

    /// Drop `username`'s socket. Safe to call for users never registered.
    pub fn remove(&self, username: &str) {
        self.connections.lock().unwrap().remove(username);
    }

    /// Teardown on behalf of one specific socket: drop `username`'s
    /// registration and room slot only while connection `id` still owns
    /// them. Returns false when a newer socket has replaced the
    /// registration, which then keeps both its entry and its room slot.
    pub fn remove_connection(&self, username: &str, id: &str, game_id: GameId) -> bool {
        let mut connections = self.connections.lock().unwrap();
        match connections.get(username) {
            Some(conn) if conn.id == id => {}
            _ => return false,
        }
        connections.remove(username);
        // Still under the connections lock, so a reconnect cannot slip in
        // between the two removals.
        prune_member(&mut self.rooms.lock().unwrap(), game_id, username);
        true
    }

    /// The role recorded when `username` connected, if they still are.
    pub fn role_of(&self, username: &str) -> Option<Role> {
        self.connections
            .lock()
            .unwrap()
            .get(username)
            .map(|conn| conn.role)
    }

    /// Put `username` in the room for `game_id`. Joining twice is a no-op.
    pub fn join_room(&self, game_id: GameId, username: &str) {
        let mut rooms = self.rooms.lock().unwrap();
        let members = rooms.entry(game_id).or_default();
        if !members.iter().any(|name| name == username) {
            members.push(username.to_string());
        }
    }

    /// Take `username` out of one room; the room disappears with its last
    /// member.
    pub fn leave_room(&self, game_id: GameId, username: &str) {
        prune_member(&mut self.rooms.lock().unwrap(), game_id, username);
    }

    /// Dissolve the whole room at once, as when a game is decided.
    pub fn clear_room(&self, game_id: GameId) {
        self.rooms.lock().unwrap().remove(&game_id);
    }

    pub fn room_exists(&self, game_id: GameId) -> bool {
        self.rooms.lock().unwrap().contains_key(&game_id)
    }

    #[cfg(test)]
    pub fn room_members(&self, game_id: GameId) -> Vec<String> {
        self.rooms
            .lock()
            .unwrap()
            .get(&game_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Deliver `message` to a single user. Transport trouble is logged and
    /// swallowed; callers never fail because a recipient went away.
    pub fn send_to(&self, username: &str, message: &ServerMessage) {
        let Some(payload) = encode(message) else {
            return;
        };
        let recipient = self
            .connections
            .lock()
            .unwrap()
            .get(username)
            .map(|conn| conn.recipient.clone());
        match recipient {
            Some(recipient) => {
                if let Err(err) = recipient.try_send(Outbound(payload)) {
                    warn!("dropping message for {}: {}", username, send_failure(&err));
                }
            }
            None => warn!("no connection registered for {}", username),
        }
    }

    /// Deliver `message` to every room member, minus `except` when given.
    /// Members whose sockets turn out to be closed are reaped from both
    /// maps afterwards.
    pub fn broadcast(&self, game_id: GameId, message: &ServerMessage, except: Option<&str>) {
        let Some(payload) = encode(message) else {
            return;
        };
        let members = match self.rooms.lock().unwrap().get(&game_id) {
            Some(members) => members.clone(),
            None => {
                info!("no connections in game {}", game_id);
                return;
            }
        };
        let targets: Vec<(String, String, Recipient<Outbound>)> = {
            let connections = self.connections.lock().unwrap();
            members
                .iter()
                .filter(|name| except != Some(name.as_str()))
                .filter_map(|name| {
                    connections
                        .get(name)
                        .map(|conn| (name.clone(), conn.id.clone(), conn.recipient.clone()))
                })
                .collect()
        };
        let mut closed = Vec::new();
        for (name, id, recipient) in targets {
            match recipient.try_send(Outbound(payload.clone())) {
                Ok(()) => {}
                // A slow client loses this message but keeps its seat.
                Err(SendError::Full(_)) => {
                    warn!("dropping message for {}: mailbox full", name)
                }
                Err(SendError::Closed(_)) => closed.push((name, id)),
            }
        }
        for (name, id) in closed {
            // Reap only while the dead socket still owns the entry; a
            // reconnect racing this broadcast keeps its fresh registration.
            if self.remove_connection(&name, &id, game_id) {
                warn!("reaping closed connection for {}", name);
            }
        }
    }
}

fn prune_member(rooms: &mut HashMap<GameId, Vec<String>>, game_id: GameId, username: &str) {
    if let Some(members) = rooms.get_mut(&game_id) {
        members.retain(|name| name != username);
        if members.is_empty() {
            rooms.remove(&game_id);
        }
    }
}

fn encode(message: &ServerMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(payload) => Some(payload),
        Err(err) => {
            warn!("failed to serialize server message: {}", err);
            None
        }
    }
}

fn send_failure(err: &SendError<Outbound>) -> &'static str {
    match err {
        SendError::Full(_) => "mailbox full",
        SendError::Closed(_) => "socket closed",
    }
}
