//! Route definitions for CropWatch

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        // Forecast lookup (public)
        .route("/forecast", get(handlers::get_forecast))
        // Public history feed
        .route("/uploads/recent", get(handlers::recent_uploads))
        // Protected routes - uploads
        .nest("/uploads", upload_routes(state.clone()))
        // Protected routes - profile
        .nest("/profile", profile_routes(state))
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
}

/// Upload routes (protected)
fn upload_routes(state: AppState) -> Router<AppState> {
    let max_upload_bytes = state.config.storage.max_upload_bytes;

    Router::new()
        .route(
            "/",
            get(handlers::list_uploads)
                .post(handlers::create_upload)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route(
            "/:upload_id",
            get(handlers::get_upload).delete(handlers::delete_upload),
        )
        .route("/:upload_id/risk", get(handlers::get_upload_risk))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Profile routes (protected)
fn profile_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        .route("/password", post(handlers::change_password))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
