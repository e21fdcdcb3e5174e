use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use log::info;

use chess_arena::routes::configure_routes;
use chess_arena::state::AppState;
use chess_arena::storage::MemoryStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let addr =
        std::env::var("CHESS_ARENA_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    info!("Starting chess arena server at http://{}", addr);

    // Create shared application state
    let app_state = web::Data::new(AppState::new(Arc::new(MemoryStore::new())));

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(configure_routes)
    })
    .bind(addr)?
    .run()
    .await
}
