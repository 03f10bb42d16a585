//! HTTP surface (actix-web)

pub mod middleware;
pub mod services;
pub mod state;

use actix_web::web;

pub use state::AppState;

use crate::config::IdentityMode;

/// Mount every route for the configured identity mode.
///
/// Shared by the server and the integration tests.
pub fn configure(mode: IdentityMode) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        services::health_routes(cfg);
        match mode {
            IdentityMode::Query => services::redirect_routes(cfg),
            IdentityMode::Oauth => services::auth_routes(cfg),
        }
    }
}
