//! User, token and game persistence. The session layer only sees the
//! [`Auth`] and [`GameStore`] traits so it can be exercised in tests with
//! a plain in-memory store, which is also the only implementation shipped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use thiserror::Error;
use uuid::Uuid;

use crate::chess::Color;
use crate::models::{Game, GameId, GameStatus};

/// Lobby-level failures, mapped onto HTTP statuses by the routes layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Error: bad request")]
    BadRequest,
    #[error("Error: unauthorized")]
    Unauthorized,
    #[error("Error: already taken")]
    AlreadyTaken,
}

/// Resolves session tokens to usernames.
pub trait Auth: Send + Sync {
    fn resolve_identity(&self, token: &str) -> Option<String>;
}

/// Game record storage. Reads hand out snapshots; writers put whole
/// records back.
pub trait GameStore: Send + Sync {
    fn create_game(&self, name: &str) -> GameId;
    fn get_game(&self, id: GameId) -> Option<Game>;
    fn put_game(&self, game: Game);
    fn delete_game(&self, id: GameId);
    fn list_games(&self) -> Vec<Game>;
}

/// A registered account.
#[derive(Debug, Clone)]
pub struct User {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// Everything lives in mutex-guarded maps; game ids come from a counter
/// that only ever moves forward.
pub struct MemoryStore {
    users: Mutex<HashMap<String, User>>,
    tokens: Mutex<HashMap<String, String>>,
    games: Mutex<HashMap<GameId, Game>>,
    next_game_id: AtomicU32,
}

impl Default for MemoryStore {
    fn default() -> MemoryStore {
        MemoryStore::new()
    }
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore {
            users: Mutex::new(HashMap::new()),
            tokens: Mutex::new(HashMap::new()),
            games: Mutex::new(HashMap::new()),
            next_game_id: AtomicU32::new(1),
        }
    }

    /// Create an account and log it in, returning a fresh token.
    pub fn register(&self, username: &str, password: &str, email: &str) -> Result<String, StoreError> {
        if username.is_empty() || password.is_empty() || email.is_empty() {
            return Err(StoreError::BadRequest);
        }
        let mut users = self.users.lock().unwrap();
        if users.contains_key(username) {
            return Err(StoreError::AlreadyTaken);
        }
        users.insert(
            username.to_string(),
            User {
                username: username.to_string(),
                password: password.to_string(),
                email: email.to_string(),
            },
        );
        drop(users);
        Ok(self.mint_token(username))
    }

    /// Check credentials and mint a token. Each login gets its own token;
    /// older tokens stay valid until logged out.
    pub fn login(&self, username: &str, password: &str) -> Result<String, StoreError> {
        let users = self.users.lock().unwrap();
        match users.get(username) {
            Some(user) if user.password == password => {}
            _ => return Err(StoreError::Unauthorized),
        }
        drop(users);
        Ok(self.mint_token(username))
    }

    /// Revoke a token. Revoking an unknown token is a no-op.
    pub fn logout(&self, token: &str) {
        self.tokens.lock().unwrap().remove(token);
    }

    /// Seat `username` on `color` in one step, so two users racing for the
    /// same seat cannot both win it. Re-claiming a seat you already hold
    /// succeeds; once both seats fill, the game turns `ACTIVE`.
    pub fn claim_seat(&self, id: GameId, color: Color, username: &str) -> Result<Game, StoreError> {
        let mut games = self.games.lock().unwrap();
        let game = games.get_mut(&id).ok_or(StoreError::BadRequest)?;
        let seat = match color {
            Color::White => &mut game.white,
            Color::Black => &mut game.black,
        };
        match seat {
            Some(holder) if holder.as_str() != username => return Err(StoreError::AlreadyTaken),
            _ => *seat = Some(username.to_string()),
        }
        if game.status == GameStatus::Open && game.white.is_some() && game.black.is_some() {
            game.status = GameStatus::Active;
        }
        Ok(game.clone())
    }

    fn mint_token(&self, username: &str) -> String {
        let token = Uuid::new_v4().to_string();
        self.tokens
            .lock()
            .unwrap()
            .insert(token.clone(), username.to_string());
        token
    }
}

impl Auth for MemoryStore {
    fn resolve_identity(&self, token: &str) -> Option<String> {
        self.tokens.lock().unwrap().get(token).cloned()
    }
}

impl GameStore for MemoryStore {
    fn create_game(&self, name: &str) -> GameId {
        let id = self.next_game_id.fetch_add(1, Ordering::Relaxed);
        self.games.lock().unwrap().insert(id, Game::new(id, name));
        id
    }

    fn get_game(&self, id: GameId) -> Option<Game> {
        self.games.lock().unwrap().get(&id).cloned()
    }

    fn put_game(&self, game: Game) {
        self.games.lock().unwrap().insert(game.id, game);
    }

    fn delete_game(&self, id: GameId) {
        self.games.lock().unwrap().remove(&id);
    }

    fn list_games(&self) -> Vec<Game> {
        let mut games: Vec<Game> = self.games.lock().unwrap().values().cloned().collect();
        games.sort_by_key(|game| game.id);
        games
    }
}
