// HTTP request handlers for the authorization handshake
pub mod auth;
pub mod health;

pub use auth::{auth_callback, auth_logout, auth_start};
pub use health::health;

use actix_web::web;

/// Register the broker routes
///
/// Expects a `web::Data<AuthBroker>` in app data.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/auth/start", web::get().to(auth_start))
        .route("/auth/callback", web::get().to(auth_callback))
        .route("/auth/logout", web::get().to(auth_logout))
        .route("/auth/logout", web::post().to(auth_logout))
        .route("/ping", web::get().to(health));
}
