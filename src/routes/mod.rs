//! Lobby HTTP surface: accounts, sessions and game setup. Play itself
//! happens over the WebSocket at `/ws`; these routes only get users to the
//! point where a `CONNECT` command can succeed.

use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::chess::Color;
use crate::models::{Game, GameId};
use crate::state::AppState;
use crate::storage::{Auth, GameStore, StoreError};

impl ResponseError for StoreError {
    fn status_code(&self) -> StatusCode {
        match self {
            StoreError::BadRequest => StatusCode::BAD_REQUEST,
            StoreError::Unauthorized => StatusCode::UNAUTHORIZED,
            StoreError::AlreadyTaken => StatusCode::FORBIDDEN,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "message": self.to_string() }))
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    username: String,
    auth_token: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateGameRequest {
    pub game_name: String,
}

#[derive(Debug, Serialize)]
struct CreateGameResponse {
    game_id: GameId,
}

#[derive(Debug, Deserialize)]
pub struct JoinGameRequest {
    pub game_id: GameId,
    pub player_color: Color,
}

#[derive(Debug, Serialize)]
struct GameListResponse {
    games: Vec<Game>,
}

/// The raw `authorization` header is the session token.
fn auth_token(req: &HttpRequest) -> Result<&str, StoreError> {
    req.headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .ok_or(StoreError::Unauthorized)
}

fn identify(state: &AppState, req: &HttpRequest) -> Result<String, StoreError> {
    state
        .store
        .resolve_identity(auth_token(req)?)
        .ok_or(StoreError::Unauthorized)
}

async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, StoreError> {
    let token = state
        .store
        .register(&body.username, &body.password, &body.email)?;
    info!("registered user {}", body.username);
    Ok(HttpResponse::Ok().json(TokenResponse {
        username: body.username.clone(),
        auth_token: token,
    }))
}

async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, StoreError> {
    let token = state.store.login(&body.username, &body.password)?;
    Ok(HttpResponse::Ok().json(TokenResponse {
        username: body.username.clone(),
        auth_token: token,
    }))
}

async fn logout(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, StoreError> {
    // Only a well-formed header can name a token to revoke; revoking an
    // already-dead token is fine.
    let token = auth_token(&req)?;
    state.store.logout(token);
    Ok(HttpResponse::Ok().json(json!({})))
}

async fn list_games(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, StoreError> {
    identify(&state, &req)?;
    Ok(HttpResponse::Ok().json(GameListResponse {
        games: state.store.list_games(),
    }))
}

async fn create_game(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateGameRequest>,
) -> Result<HttpResponse, StoreError> {
    let username = identify(&state, &req)?;
    if body.game_name.is_empty() {
        return Err(StoreError::BadRequest);
    }
    let game_id = state.store.create_game(&body.game_name);
    info!("{} created game {} ({})", username, game_id, body.game_name);
    Ok(HttpResponse::Ok().json(CreateGameResponse { game_id }))
}

async fn join_game(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<JoinGameRequest>,
) -> Result<HttpResponse, StoreError> {
    let username = identify(&state, &req)?;
    let game = state
        .store
        .claim_seat(body.game_id, body.player_color, &username)?;
    info!(
        "{} joined game {} as {}",
        username, body.game_id, body.player_color
    );
    Ok(HttpResponse::Ok().json(game))
}

/// Configure the HTTP routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws").route(web::get().to(crate::websocket::ws_index)))
        .service(web::resource("/user").route(web::post().to(register)))
        .service(
            web::resource("/session")
                .route(web::post().to(login))
                .route(web::delete().to(logout)),
        )
        .service(
            web::resource("/game")
                .route(web::get().to(list_games))
                .route(web::post().to(create_game))
                .route(web::put().to(join_game)),
        );
}
