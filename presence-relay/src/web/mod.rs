//! Web server module.
//!
//! Routes:
//! - `POST /` - Zoom presence webhook (always 200 unless the signature is bad)
//! - `GET|POST|DELETE /api/v1/users` - allow-list management behind a bearer key
//! - `GET /health` - liveness
//! - any other `GET` - static assets, falling back to the index page

pub mod auth;
pub mod handlers;
pub mod signature;

use axum::{
    routing::{get, get_service},
    Router,
};
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

pub use handlers::{
    create_user, delete_user, health, list_users, presence_webhook, AppState, HealthResponse,
    WebhookResponse,
};
pub use signature::verify_zoom_signature;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let assets =
        ServeDir::new(&state.config.assets_dir).fallback(ServeFile::new(&state.config.index_file));

    Router::new()
        .route("/", get_service(assets.clone()).post(presence_webhook))
        .route("/health", get(health))
        .route(
            "/api/v1/users",
            get(list_users).post(create_user).delete(delete_user),
        )
        .fallback_service(assets)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
