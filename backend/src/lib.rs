//! CropWatch backend
//!
//! Farmers upload corn leaf images, get a disease classification and see a
//! daily forecast correlated with disease-spread risk for their location.

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;

pub use config::Config;

use external::WeatherClient;
use services::{ClassifierHandle, MediaStore, UploadService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    pub weather: WeatherClient,
    pub classifier: ClassifierHandle,
    pub media: MediaStore,
}

impl AppState {
    pub fn upload_service(&self) -> UploadService {
        UploadService::new(
            self.db.clone(),
            self.media.clone(),
            self.classifier.clone(),
            self.weather.clone(),
            self.config.weather.default_units,
        )
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "CropWatch API v1.0"
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
