//! A small real-time chess server: a self-contained rules engine plus an
//! actix-web lobby and WebSocket session layer for playing over the wire.

pub mod chess;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
pub mod storage;
pub mod websocket;
