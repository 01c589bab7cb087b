//! Shared state and the router.
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::auth::BasicCredentials;
use crate::api::handlers;
use crate::config::Config;
use crate::pipeline::Pipeline;

pub struct AppState {
    pub pipeline: Pipeline,
    pub output_dir: PathBuf,
    pub gallery_credentials: Option<BasicCredentials>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        let gallery_credentials = BasicCredentials::from_parts(config.admin_user.clone(), config.admin_pass.clone());
        if gallery_credentials.is_none() {
            tracing::warn!("ADMIN_USER/ADMIN_PASS not set; gallery endpoints will reject every request");
        }
        AppState {
            pipeline: Pipeline::from_config(config),
            output_dir: config.output_dir.clone(),
            gallery_credentials,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/generate_prompt", post(handlers::generate_prompt))
        .route("/generate_image", post(handlers::generate_image))
        .route("/generate", post(handlers::generate))
        .route("/queue_status", get(handlers::queue_status))
        .route("/history", get(handlers::history))
        .route("/gallery", get(handlers::gallery_list))
        .route("/gallery/:filename", get(handlers::gallery_file))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
