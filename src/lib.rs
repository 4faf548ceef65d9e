//! Library Lending Server
//!
//! Book catalog and loan ledger exposed as a REST JSON API, plus a set of
//! browsable pages that drive the same API on behalf of signed-in visitors.

use std::sync::Arc;

use axum::Router;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod web;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
    pub api_client: web::client::ApiClient,
}

impl AppState {
    pub fn new(config: AppConfig, repository: repository::Repository) -> Self {
        let services = services::Services::new(repository, config.auth.clone());
        let api_client = web::client::ApiClient::new(config.web.api_base_url.clone());

        Self {
            config: Arc::new(config),
            services: Arc::new(services),
            api_client,
        }
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api::routes().with_state(state.clone()))
        .merge(web::routes().with_state(state))
        .merge(api::openapi::create_openapi_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
