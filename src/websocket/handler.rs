use actix::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::{info, warn};
use uuid::Uuid;

use crate::models::{ClientCommand, CommandKind, Outbound, ServerMessage};
use crate::state::AppState;
use crate::websocket::session::Joined;

/// One client socket. The actor only decodes frames into commands and
/// writes outbound text; all game behavior lives in the session handler.
pub struct GameSocket {
    pub id: String,
    pub state: web::Data<AppState>,
    /// Set once a `CONNECT` succeeds, used for teardown on close.
    pub joined: Option<Joined>,
}

impl Actor for GameSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, _: &mut Self::Context) {
        info!("WebSocket connection started: {}", self.id);
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        // A socket that drops without LEAVE still frees its registry slots.
        if let Some(joined) = self.joined.take() {
            self.state.sessions.disconnect(&joined);
        }
        info!("WebSocket connection closed: {}", self.id);
        Running::Stop
    }
}

impl Handler<Outbound> for GameSocket {
    type Result = ();

    fn handle(&mut self, msg: Outbound, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for GameSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                // Do nothing for pong messages
            }
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<ClientCommand>(&text) {
                Ok(cmd) => self.dispatch(cmd, ctx),
                Err(e) => {
                    warn!("error parsing client command: {}", e);
                    self.send_error(ctx, &format!("invalid message format: {}", e));
                }
            },
            Ok(ws::Message::Binary(_)) => {
                warn!("binary messages are not supported");
                self.send_error(ctx, "binary messages are not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                info!("connection {} closed: {:?}", self.id, reason);
                ctx.close(reason);
                ctx.stop();
            }
            _ => {
                ctx.stop();
            }
        }
    }
}

impl GameSocket {
    fn dispatch(&mut self, cmd: ClientCommand, ctx: &mut ws::WebsocketContext<Self>) {
        let state = self.state.clone();
        let result = match cmd.command {
            CommandKind::Connect => {
                let socket_id = self.id.clone();
                state
                    .sessions
                    .connect(
                        ctx.address().recipient(),
                        &socket_id,
                        &cmd.auth_token,
                        cmd.game_id,
                    )
                    .map(|joined| {
                        self.joined = Some(joined);
                    })
            }
            CommandKind::MakeMove => {
                let Some(mv) = cmd.mv else {
                    self.send_error(ctx, "MAKE_MOVE requires a move");
                    return;
                };
                state.sessions.make_move(&cmd.auth_token, cmd.game_id, mv)
            }
            CommandKind::Leave => {
                state.sessions.leave(&cmd.auth_token, cmd.game_id).map(|()| {
                    self.joined = None;
                })
            }
            CommandKind::Resign => {
                state.sessions.resign(&cmd.auth_token, cmd.game_id).map(|()| {
                    self.joined = None;
                })
            }
        };
        // Failures go back to the sender alone; nobody else hears about them.
        if let Err(err) = result {
            info!(
                "command {:?} on connection {} rejected: {}",
                cmd.command, self.id, err
            );
            self.send_error(ctx, &err.to_string());
        }
    }

    fn send_error(&self, ctx: &mut ws::WebsocketContext<Self>, message: &str) {
        let payload = ServerMessage::Error {
            error: message.to_string(),
        };
        match serde_json::to_string(&payload) {
            Ok(text) => ctx.text(text),
            Err(e) => warn!("error serializing error message: {}", e),
        }
    }
}

/// WebSocket entry point, mounted at `GET /ws`.
pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let id = Uuid::new_v4().to_string();
    info!("new WebSocket connection: {}", id);
    let socket = GameSocket {
        id,
        state: state.clone(),
        joined: None,
    };
    ws::start(socket, &req, stream)
}
