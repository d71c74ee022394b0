pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::screening::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // Role catalogue
        .route("/api/v1/roles", get(handlers::handle_list_roles))
        .route("/api/v1/roles/:role", get(handlers::handle_get_role))
        // Screening sessions
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_delete_session),
        )
        .route(
            "/api/v1/sessions/:id/document",
            post(handlers::handle_upload_document),
        )
        .route(
            "/api/v1/sessions/:id/evaluate",
            post(handlers::handle_evaluate),
        )
        .route("/api/v1/sessions/:id/reset", post(handlers::handle_reset))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}
