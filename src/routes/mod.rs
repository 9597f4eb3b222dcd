pub mod auth;
pub mod health;

use axum::{Router, routing::get};

use crate::AppState;

/// Assemble the bridge's routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth/login", get(auth::login))
        .route("/auth/logout", get(auth::logout))
        .route("/health", get(health::health_check))
        .with_state(state)
}
