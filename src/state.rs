use std::sync::Arc;

use crate::storage::{Auth, GameStore, MemoryStore};
use crate::websocket::SessionHandler;

/// Shared application state handed to every worker. The concrete store
/// backs both lobby routes and, through the trait handles, live sessions.
pub struct AppState {
    pub store: Arc<MemoryStore>,
    pub sessions: SessionHandler,
}

impl AppState {
    pub fn new(store: Arc<MemoryStore>) -> AppState {
        let auth: Arc<dyn Auth> = store.clone();
        let games: Arc<dyn GameStore> = store.clone();
        AppState {
            sessions: SessionHandler::new(auth, games),
            store,
        }
    }
}
