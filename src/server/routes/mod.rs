//! HTTP route handlers

pub mod chat;
pub mod health;
pub mod models;
pub mod ws;

use actix_web::web;

/// Configure the API routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/v1")
            .route("/chat/completions", web::post().to(chat::chat_completions))
            .route("/models", web::get().to(models::list_models))
            .route("/ws", web::get().to(ws::websocket)),
    );
}
